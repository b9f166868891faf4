// SPDX-FileCopyrightText: 2025 some100 <ootinnyoo@outlook.com>
// SPDX-License-Identifier: MIT

//! A command line interface frontend to `bootmenu-rs`.

use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use bootmenu_rs_core::{
    boot::{
        BootMgr,
        config::{BootConfig, CONFIG_PATH},
        mode::BootMode,
        report::ConsoleReporter,
    },
    system::{device::AdbState, fs::dump_lines, log_backend::ConsoleLogger},
};
use getargs::{Arg, Options};

/// Parses a mode given either by its canonical name or by its ordinal.
fn parse_mode(value: &str) -> anyhow::Result<BootMode> {
    if let Ok(index) = value.parse::<usize>() {
        return BootMode::from_index(index)
            .with_context(|| format!("The mode index {index} is not in range of the list"));
    }

    BootMode::ALL
        .into_iter()
        .find(|mode| mode.encode() == value)
        .with_context(|| format!("Unknown mode: {value}"))
}

/// The actual main function of the program, which returns an [`anyhow::Result`].
///
/// # Errors
///
/// May return an `Error` if an argument is invalid, or the requested action failed.
fn main_func() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().collect();
    let app_filename = args.first().map_or("bootmenu-rs-cli", String::as_str);

    // the configuration must be known before anything else is done, so look for it first
    let mut config_path = PathBuf::from(CONFIG_PATH);
    let mut opts = Options::new(args.iter().skip(1).map(String::as_str));
    while let Ok(Some(arg)) = opts.next_arg() {
        if matches!(arg, Arg::Short('c') | Arg::Long("config")) {
            config_path = opts
                .value()
                .ok()
                .context("A path was not passed into the config argument")?
                .into();
        }
    }

    let config = BootConfig::new(&config_path);
    ConsoleLogger::install(config.log_level);

    let mut boot_mgr = BootMgr::new(config);

    let mut opts = Options::new(args.iter().skip(1).map(String::as_str));
    while let Ok(Some(arg)) = opts.next_arg() {
        match arg {
            Arg::Short('c') | Arg::Long("config") => {
                let _ = opts.value(); // already handled
            }
            Arg::Short('l') | Arg::Long("list") => {
                let default = boot_mgr.default_mode();
                for mode in BootMode::ALL {
                    let mark = if default == Some(mode) { '*' } else { ' ' };
                    let available = if boot_mgr.is_available(mode) { "" } else { " (no script)" };
                    println!("{mark}{}: {mode}{available}", mode.index());
                }
                return Ok(());
            }
            Arg::Short('g') | Arg::Long("get") => {
                println!("{}", boot_mgr.resolve_boot_target(false));
                return Ok(());
            }
            Arg::Short('d') | Arg::Long("set-default") => {
                let value = opts
                    .value()
                    .ok()
                    .context("A mode was not passed into the set-default argument")?;
                let mode = parse_mode(value)?;
                boot_mgr.set_default(mode.index())?;
                println!("Done..");
                return Ok(());
            }
            Arg::Short('n') | Arg::Long("next-boot") => {
                let value = opts
                    .value()
                    .ok()
                    .context("A mode was not passed into the next-boot argument")?;
                let mode = parse_mode(value)?;
                boot_mgr.set_next_boot(mode)?;
                println!("Done..");
                return Ok(());
            }
            Arg::Short('b') | Arg::Long("boot") => {
                let value = opts
                    .value()
                    .ok()
                    .context("A mode was not passed into the boot argument")?;
                let mode = parse_mode(value)?;
                if mode == BootMode::BootMenu {
                    bail!("The boot menu cannot be booted from the command line");
                }
                boot_mgr.attempt_boot(mode, true)?;
                return Ok(());
            }
            Arg::Short('B') | Arg::Long("bypass") => {
                let state = if boot_mgr.is_bypassed() { "yes" } else { "no" };
                println!("{state}");
                return Ok(());
            }
            Arg::Short('s') | Arg::Long("status") => {
                let device = boot_mgr.device();
                println!("Battery Level: {}%", device.battery_level());
                println!("USB connected: {}", device.usb_connected());
                println!("ADB ready: {}", device.adb_state() == AdbState::Ready);
                return Ok(());
            }
            Arg::Long("dump") => {
                let path = opts
                    .value()
                    .ok()
                    .context("A path was not passed into the dump argument")?;
                let lines = dump_lines(Path::new(path), &mut ConsoleReporter);
                if lines == 0 {
                    bail!("Nothing to dump from {path}");
                }
                return Ok(());
            }
            Arg::Short('h') | Arg::Long("help") => break, // ignore any other arguments when help is specified
            Arg::Short(invalid) => eprintln!("Error: Unknown short argument: -{invalid}"),
            Arg::Long(invalid) => eprintln!("Error: Unknown long argument: --{invalid}"),
            Arg::Positional(invalid) => eprintln!("Error: Unknown positional argument: {invalid}"),
        }
    }

    println!(
        r"Usage: {app_filename} [OPTIONS] [ARGS]...

-h, --help               display this help and exit
-c, --config PATH        read the configuration from PATH
-l, --list               display the boot modes and exit
-g, --get                display the mode this boot would use
-d, --set-default MODE   set the default boot mode
-n, --next-boot MODE     set the boot mode for the next boot only
-b, --boot MODE          boot the given mode now
-B, --bypass             display whether signature checks are bypassed
-s, --status             display the battery and USB state
    --dump PATH          print a log file

MODE is either a mode name or its index in the list."
    );

    Ok(())
}

/// The main function of the program.
fn main() -> std::process::ExitCode {
    match main_func() {
        Ok(()) => std::process::ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            std::process::ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_mode() {
        assert_eq!(parse_mode("2nd-boot").ok(), Some(BootMode::SecondBoot));
        assert_eq!(parse_mode("4").ok(), Some(BootMode::Recovery));
        assert!(parse_mode("5").is_err());
        assert!(parse_mode("2ND-BOOT").is_err());
        assert!(parse_mode("").is_err());
    }
}
