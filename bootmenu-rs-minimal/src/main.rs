// SPDX-FileCopyrightText: 2025 some100 <ootinnyoo@outlook.com>
// SPDX-License-Identifier: MIT

//! Extremely minimal text frontend for the boot menu.
//!
//! At startup the boot target is resolved. Any mode other than the boot menu is booted right away without an
//! operator. Otherwise the menus are shown as numbered lists on stdout, and picked by typing a number on stdin.
//!
//! If this binary was installed in place of a system binary (any name other than `bootmenu`), the original binary is
//! run first with the same arguments, so that whatever init expected of it still happens.

use std::{
    ffi::{OsStr, OsString},
    io::{self, BufRead, Write},
    path::{Path, PathBuf},
};

use anyhow::Context;
use bootmenu_rs_core::{
    boot::{
        BootMgr,
        config::{BootConfig, CONFIG_PATH},
        menu::{MenuDispatcher, MenuResult, show_main_menu},
        mode::BootMode,
    },
    system::{log_backend::ConsoleLogger, passthrough::real_execute, runner::ScriptRunner},
};
use log::{error, info, warn};

/// The name this binary is installed as when it does not replace anything.
const OWN_NAME: &str = "bootmenu";

/// Presents menus as numbered lines, reading the choice from a line of input.
struct LineDispatcher<R: BufRead, W: Write> {
    /// Where choices are read from.
    input: R,

    /// Where menus are drawn.
    output: W,
}

impl<R: BufRead, W: Write> LineDispatcher<R, W> {
    /// Draws a menu. Errors are ignored, there is nowhere else to show them.
    fn draw(&mut self, headers: &[&str], labels: &[&str], selected: usize) {
        for header in headers {
            let _ = writeln!(self.output, "{header}");
        }
        for (i, label) in labels.iter().enumerate() {
            let cursor = if i == selected { '>' } else { ' ' };
            let _ = writeln!(self.output, "{cursor}{i}: {label}");
        }
        let _ = write!(self.output, "Select [{selected}], or q to go back: ");
        let _ = self.output.flush();
    }
}

impl<R: BufRead, W: Write> MenuDispatcher for LineDispatcher<R, W> {
    fn select(&mut self, headers: &[&str], labels: &[&str], selected: usize) -> MenuResult {
        loop {
            self.draw(headers, labels, selected);

            let mut line = String::new();
            match self.input.read_line(&mut line) {
                Ok(0) | Err(_) => return MenuResult::GoBack, // closed input backs out of every menu
                Ok(_) => (),
            }

            match line.trim() {
                "" => return MenuResult::Selected(selected),
                "q" => return MenuResult::GoBack,
                choice => match choice.parse() {
                    Ok(idx) if idx < labels.len() => return MenuResult::Selected(idx),
                    _ => {
                        let _ = writeln!(self.output, "Invalid choice: {choice}");
                    }
                },
            }
        }
    }
}

/// Checks if the binary was started under the name of some other binary.
fn is_hijacked(argv0: &OsStr) -> bool {
    Path::new(argv0).file_name().is_some_and(|name| name != OWN_NAME)
}

/// Runs the original binary if this one was started in its place.
///
/// A failing original is only logged. The boot target must still be resolved and booted regardless.
fn run_hijacked(runner: &ScriptRunner, args: &[OsString]) {
    if let Some(argv0) = args.first()
        && is_hijacked(argv0)
        && let Err(e) = real_execute(runner, args)
    {
        error!("Could not run the original {}: {e}", argv0.to_string_lossy());
    }
}

/// Runs the original binary if needed, then resolves and consumes the boot target.
fn resolve_after_passthrough(boot_mgr: &BootMgr, args: &[OsString]) -> BootMode {
    run_hijacked(boot_mgr.runner(), args);
    boot_mgr.resolve_boot_target(true)
}

/// The actual main function of the program, which returns an [`anyhow::Result`].
///
/// # Errors
///
/// May return an `Error` if the resolved boot mode failed.
fn main_func() -> anyhow::Result<()> {
    let args: Vec<OsString> = std::env::args_os().collect();

    let config_path =
        std::env::var_os("BOOTMENU_CONFIG").map_or_else(|| PathBuf::from(CONFIG_PATH), PathBuf::from);
    let config = BootConfig::new(&config_path);
    ConsoleLogger::install(config.log_level);

    let mut boot_mgr = BootMgr::new(config);

    let mode = resolve_after_passthrough(&boot_mgr, &args);
    if mode != BootMode::BootMenu {
        return boot_mgr
            .attempt_boot(mode, false)
            .with_context(|| format!("Could not boot {mode}"));
    }

    let device = boot_mgr.device();
    if let Err(e) = device.led_alert("green", 255) {
        warn!("Could not light the green LED: {e}");
    }
    info!("Battery Level: {}%", device.battery_level());

    let stdin = io::stdin();
    let mut dispatcher = LineDispatcher {
        input: stdin.lock(),
        output: io::stdout(),
    };
    let booted = show_main_menu(&mut boot_mgr, &mut dispatcher);
    info!("Leaving the boot menu (booted: {booted})");

    if let Err(e) = device.led_alert("green", 0) {
        warn!("Could not turn off the green LED: {e}");
    }
    Ok(())
}

/// The main function of the program.
///
/// Errors are logged rather than returned as a failure. This runs as part of the boot process, and the rest of the
/// boot must go on regardless.
fn main() {
    if let Err(e) = main_func() {
        error!("{e:#}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dispatch(input: &str, labels: &[&str], selected: usize) -> (MenuResult, String) {
        let mut dispatcher = LineDispatcher {
            input: input.as_bytes(),
            output: Vec::new(),
        };
        let result = dispatcher.select(&["header"], labels, selected);
        (result, String::from_utf8_lossy(&dispatcher.output).into_owned())
    }

    #[test]
    fn test_line_dispatcher() {
        let labels = ["a", "b", "c"];
        assert_eq!(dispatch("2\n", &labels, 0).0, MenuResult::Selected(2));
        assert_eq!(dispatch("\n", &labels, 1).0, MenuResult::Selected(1));
        assert_eq!(dispatch("q\n", &labels, 0).0, MenuResult::GoBack);
        assert_eq!(dispatch("", &labels, 0).0, MenuResult::GoBack);

        let (result, output) = dispatch("7\n0\n", &labels, 0);
        assert_eq!(result, MenuResult::Selected(0));
        assert!(output.contains("Invalid choice: 7"));
        assert!(output.starts_with("header\n>0: a\n 1: b\n"));
    }

    #[test]
    fn test_failed_passthrough_still_resolves() -> std::io::Result<()> {
        use std::{fs, os::unix::fs::PermissionsExt};

        let dir = tempfile::tempdir()?;
        let real = dir.path().join("logwrapper.bin");
        fs::write(&real, "#!/bin/sh\nexit 1\n")?;
        fs::set_permissions(&real, fs::Permissions::from_mode(0o755))?;

        let config = BootConfig {
            default_mode_file: dir.path().join("default_bootmode.conf"),
            next_mode_file: dir.path().join("bootmode.conf"),
            bypass_file: dir.path().join("bypass"),
            ..BootConfig::default()
        };
        fs::write(&config.next_mode_file, "2nd-boot")?;
        let next_mode_file = config.next_mode_file.clone();
        let boot_mgr = BootMgr::new(config);

        let args = [dir.path().join("logwrapper").into_os_string(), "-d".into()];
        assert_eq!(resolve_after_passthrough(&boot_mgr, &args), BootMode::SecondBoot);
        assert!(!next_mode_file.exists());
        Ok(())
    }

    #[test]
    fn test_is_hijacked() {
        assert!(!is_hijacked(OsStr::new("/system/bin/bootmenu")));
        assert!(!is_hijacked(OsStr::new("bootmenu")));
        assert!(is_hijacked(OsStr::new("/system/bin/logwrapper")));
    }
}
