// SPDX-FileCopyrightText: 2025 some100 <ootinnyoo@outlook.com>
// SPDX-License-Identifier: MIT

//! Device control files.
//!
//! These are single file writes and reads against sysfs or device nodes, for LEDs, the USB gadget and the battery.
//! None of them hold any state of their own.

use std::{
    io,
    path::{Path, PathBuf},
};

use log::{error, info};

use crate::{
    boot::config::BootConfig,
    system::fs::{self, FsError},
};

/// The USB daemon state that means the ADB daemon is up.
const ADB_READY_STATE: &str = "usb_mode_charge_adb";

/// The readiness of the ADB daemon, as last checked.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AdbState {
    /// The daemon is running and a host is connected over USB.
    Ready,

    /// The daemon must be (re)started.
    NotReady,
}

/// The device control files.
#[derive(Clone, Debug)]
pub struct DeviceControls {
    /// The directory holding the LED class devices.
    led_dir: PathBuf,

    /// The USB device mode switch.
    usb_mode_switch: PathBuf,

    /// The backing file of the USB mass storage LUN.
    ums_lun_file: PathBuf,

    /// The battery capacity in percent.
    battery_level: PathBuf,

    /// Whether the USB charger is online.
    usb_online: PathBuf,

    /// Whether the AC charger is online.
    ac_online: PathBuf,

    /// The state file of the USB daemon.
    adb_state: PathBuf,
}

impl DeviceControls {
    /// Creates a new [`DeviceControls`] from the paths in a [`BootConfig`].
    #[must_use = "Has no effect if the result is unused"]
    pub fn from_config(config: &BootConfig) -> Self {
        Self {
            led_dir: config.led_dir.clone(),
            usb_mode_switch: config.usb_mode_switch.clone(),
            ums_lun_file: config.ums_lun_file.clone(),
            battery_level: config.battery_level.clone(),
            usb_online: config.usb_online.clone(),
            ac_online: config.ac_online.clone(),
            adb_state: config.adb_state.clone(),
        }
    }

    /// Sets the brightness of an LED by color, like `red` or `green`.
    ///
    /// # Errors
    ///
    /// May return an `Error` if the brightness file could not be written.
    pub fn led_alert(&self, color: &str, value: u32) -> io::Result<()> {
        let path = self.led_dir.join(color).join("brightness");
        fs::write_control(&path, value.to_string().as_bytes())
    }

    /// Switches the USB gadget into a device mode, like `acm` or `msc_adb`.
    ///
    /// # Errors
    ///
    /// May return an `Error` if the mode switch could not be written.
    pub fn set_usb_device_mode(&self, mode: &str) -> io::Result<()> {
        match fs::write_control(&self.usb_mode_switch, mode.as_bytes()) {
            Ok(()) => {
                info!("set usb mode={mode}");
                Ok(())
            }
            Err(e) => {
                error!("Can't open {} ({e})", self.usb_mode_switch.display());
                Err(e)
            }
        }
    }

    /// Sets the backing file of the USB mass storage LUN. An empty path stops sharing.
    ///
    /// # Errors
    ///
    /// May return an `Error` if the LUN file could not be written.
    pub fn mount_usb_storage(&self, part: &Path) -> io::Result<()> {
        use std::os::unix::ffi::OsStrExt;

        fs::write_control(&self.ums_lun_file, part.as_os_str().as_bytes()).inspect_err(|e| {
            error!("Unable to write to lun file ({e})");
        })
    }

    /// Reads the battery level in percent. An unreadable level is 0.
    #[must_use = "Has no effect if the result is unused"]
    pub fn battery_level(&self) -> u32 {
        read_number(&self.battery_level).unwrap_or(0)
    }

    /// Checks if a USB host is connected, meaning USB is online while AC is not.
    #[must_use = "Has no effect if the result is unused"]
    pub fn usb_connected(&self) -> bool {
        matches!(read_number(&self.usb_online), Some(state) if state != 0)
            && read_number(&self.ac_online) == Some(0)
    }

    /// Checks if the ADB daemon is ready.
    ///
    /// When it is not ready, the stale daemon state is cleared so that the daemon gets restarted.
    #[must_use = "Has no effect if the result is unused"]
    pub fn adb_state(&self) -> AdbState {
        let started = matches!(fs::read_token(&self.adb_state), Ok(Some(state)) if state == ADB_READY_STATE);

        if started && self.usb_connected() {
            AdbState::Ready
        } else {
            if fs::exists(&self.adb_state)
                && let Err(e) = fs::write_control(&self.adb_state, b"\n")
            {
                error!("Could not clear {}: {e}", self.adb_state.display());
            }
            AdbState::NotReady
        }
    }
}

/// Reads a decimal number from a control file.
fn read_number(path: &Path) -> Option<u32> {
    match fs::read_token(path) {
        Ok(token) => token?.parse().ok(),
        Err(FsError::NotFound) => None,
        Err(e) => {
            log::warn!("Could not read {}: {e}", path.display());
            None
        }
    }
}
