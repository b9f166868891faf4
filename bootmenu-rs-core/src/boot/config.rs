// SPDX-FileCopyrightText: 2025 some100 <ootinnyoo@outlook.com>
// SPDX-License-Identifier: MIT

//! Provides [`BootConfig`], the configuration file for the boot menu.
//!
//! This parses space separated key value pairs, the format of which is defined in
//! the [`BootConfig`] struct.
//!
//! Example configuration:
//!
//! ```text
//! # Where the persistent default mode is stored
//! default_mode_file /system/bootmenu/config/default_bootmode.conf
//!
//! # Where the one-shot mode for the next boot is stored
//! next_mode_file /cache/recovery/bootmode.conf
//!
//! # The flag read by the secure boot stage
//! bypass_file /data/.bootmenu_bypass
//!
//! # Where the boot and tool scripts live, as <name>.sh
//! script_dir /system/bootmenu/script
//!
//! # Where relative programs are searched if they cannot be found
//! bin_dir /system/bin
//!
//! # The countdown after a script that returned, in ticks of tick_ms milliseconds
//! countdown 2
//! tick_ms 1000
//!
//! # The maximum log level (off, error, warn, info, debug, trace)
//! log_level info
//! ```

use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use log::{LevelFilter, warn};

use crate::{
    boot::mode::BootMode,
    system::{
        fs::{self, FsError},
        helper::script_path,
    },
};

/// The hardcoded configuration path for the [`BootConfig`].
pub const CONFIG_PATH: &str = "/system/bootmenu/config/bootmenu.conf";

/// The configuration file for the boot menu.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BootConfig {
    /// The record holding the persistent default mode.
    pub default_mode_file: PathBuf,

    /// The record holding the one-shot mode for the next boot.
    pub next_mode_file: PathBuf,

    /// The record holding the signature bypass flag.
    pub bypass_file: PathBuf,

    /// The directory holding the boot and tool scripts.
    pub script_dir: PathBuf,

    /// The directory that relative programs fall back to.
    pub bin_dir: PathBuf,

    /// The amount of countdown ticks after a script returned successfully.
    pub countdown: u32,

    /// The length of a countdown tick.
    pub tick: Duration,

    /// The maximum level of log messages.
    pub log_level: LevelFilter,

    /// The directory holding the LED class devices.
    pub led_dir: PathBuf,

    /// The USB device mode switch.
    pub usb_mode_switch: PathBuf,

    /// The backing file of the USB mass storage LUN.
    pub ums_lun_file: PathBuf,

    /// The block device shared as a whole over USB mass storage.
    pub mmc_device: PathBuf,

    /// The battery capacity in percent.
    pub battery_level: PathBuf,

    /// Whether the USB charger is online.
    pub usb_online: PathBuf,

    /// Whether the AC charger is online.
    pub ac_online: PathBuf,

    /// The state file of the USB daemon.
    pub adb_state: PathBuf,
}

impl BootConfig {
    /// Creates a new [`BootConfig`] from the file at `path`.
    ///
    /// If the file does not exist or could not be read, the default [`BootConfig`] is returned.
    #[must_use = "Has no effect if the result is unused"]
    pub fn new(path: &Path) -> Self {
        match fs::read_text(path) {
            Ok(content) => Self::get_boot_config(content.as_bytes()),
            Err(FsError::NotFound) => Self::default(),
            Err(e) => {
                warn!("Could not read {}: {e}", path.display());
                Self::default()
            }
        }
    }

    /// Parses the contents of a [`BootConfig`] format string.
    #[must_use = "Has no effect if the result is unused"]
    pub fn get_boot_config(content: &[u8]) -> Self {
        let mut config = Self::default();

        if let Ok(content) = str::from_utf8(content) {
            for line in content.lines() {
                let line = line.trim();
                if line.is_empty() || line.starts_with('#') {
                    continue;
                }

                if let Some((key, value)) = line.split_once(char::is_whitespace) {
                    let value = value.trim();
                    match &*key.to_ascii_lowercase() {
                        "default_mode_file" => config.default_mode_file = value.into(),
                        "next_mode_file" => config.next_mode_file = value.into(),
                        "bypass_file" => config.bypass_file = value.into(),
                        "script_dir" => config.script_dir = value.into(),
                        "bin_dir" => config.bin_dir = value.into(),
                        "countdown" => {
                            if let Ok(value) = value.parse() {
                                config.countdown = value;
                            }
                        }
                        "tick_ms" => {
                            if let Ok(value) = value.parse() {
                                config.tick = Duration::from_millis(value);
                            }
                        }
                        "log_level" => {
                            if let Ok(value) = value.parse() {
                                config.log_level = value;
                            }
                        }
                        "led_dir" => config.led_dir = value.into(),
                        "usb_mode_switch" => config.usb_mode_switch = value.into(),
                        "ums_lun_file" => config.ums_lun_file = value.into(),
                        "mmc_device" => config.mmc_device = value.into(),
                        "battery_level" => config.battery_level = value.into(),
                        "usb_online" => config.usb_online = value.into(),
                        "ac_online" => config.ac_online = value.into(),
                        "adb_state" => config.adb_state = value.into(),
                        _ => (),
                    }
                }
            }
        }

        config
    }

    /// Gets the script that boots a mode.
    #[must_use = "Has no effect if the result is unused"]
    pub fn mode_script(&self, mode: BootMode) -> PathBuf {
        script_path(&self.script_dir, mode.encode())
    }

    /// Gets a tool script by name, like `adbd` or `format_ext4`.
    #[must_use = "Has no effect if the result is unused"]
    pub fn tool_script(&self, name: &str) -> PathBuf {
        script_path(&self.script_dir, name)
    }
}

impl Default for BootConfig {
    fn default() -> Self {
        Self {
            default_mode_file: "/system/bootmenu/config/default_bootmode.conf".into(),
            next_mode_file: "/cache/recovery/bootmode.conf".into(),
            bypass_file: "/data/.bootmenu_bypass".into(),
            script_dir: "/system/bootmenu/script".into(),
            bin_dir: crate::system::runner::DEFAULT_BIN_DIR.into(),
            countdown: 2,
            tick: Duration::from_secs(1),
            log_level: LevelFilter::Info,
            led_dir: "/sys/class/leds".into(),
            usb_mode_switch: "/dev/usb_device_mode".into(),
            ums_lun_file: "/sys/devices/platform/usb_mass_storage/lun0/file".into(),
            mmc_device: "/dev/block/mmcblk1".into(),
            battery_level: "/sys/class/power_supply/battery/capacity".into(),
            usb_online: "/sys/class/power_supply/usb/online".into(),
            ac_online: "/sys/class/power_supply/ac/online".into(),
            adb_state: "/tmp/usbd_current_state".into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn test_full_config() {
        let config = r"
            # comment
            default_mode_file /data/default
            next_mode_file    /cache/next
            bypass_file /data/bypass
            script_dir /vendor/scripts
            bin_dir /vendor/bin
            countdown 5
            tick_ms 10
            log_level debug
            led_dir /leds
            adb_state /run/usbd
        "
        .as_bytes();

        let config = BootConfig::get_boot_config(config);
        assert_eq!(config.default_mode_file, PathBuf::from("/data/default"));
        assert_eq!(config.next_mode_file, PathBuf::from("/cache/next"));
        assert_eq!(config.bypass_file, PathBuf::from("/data/bypass"));
        assert_eq!(config.bin_dir, PathBuf::from("/vendor/bin"));
        assert_eq!(config.countdown, 5);
        assert_eq!(config.tick, Duration::from_millis(10));
        assert_eq!(config.log_level, LevelFilter::Debug);
        assert_eq!(config.led_dir, PathBuf::from("/leds"));
        assert_eq!(config.adb_state, PathBuf::from("/run/usbd"));
        assert_eq!(
            config.mode_script(BootMode::SecondBootUart),
            PathBuf::from("/vendor/scripts/2nd-boot-uart.sh")
        );
        assert_eq!(
            config.tool_script("adbd"),
            PathBuf::from("/vendor/scripts/adbd.sh")
        );
    }

    #[test]
    fn test_malformed_values_keep_defaults() {
        let config = BootConfig::get_boot_config(b"countdown many\ntick_ms -1\nlog_level loud\nunknown key");
        assert_eq!(config, BootConfig::default());
    }

    #[test]
    fn test_missing_file() {
        let config = BootConfig::new(Path::new("/nonexistent/bootmenu.conf"));
        assert_eq!(config, BootConfig::default());
    }

    proptest! {
        #[test]
        fn doesnt_panic(x in any::<Vec<u8>>()) {
            let _ = BootConfig::get_boot_config(&x);
        }

        #[test]
        fn sets_countdown(x in any::<u32>()) {
            let config = BootConfig::get_boot_config(format!("countdown {x}").as_bytes());
            prop_assert_eq!(config.countdown, x);
        }
    }
}
