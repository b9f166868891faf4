// SPDX-FileCopyrightText: 2025 some100 <ootinnyoo@outlook.com>
// SPDX-License-Identifier: MIT

//! Provides [`reset`] and [`stock_recovery`], which reboot the device.
//!
//! Pending writes are synced to storage before the kernel is asked to restart. Both functions only ever return if the
//! kernel refused the request, for example when the caller lacks the privilege to reboot.

use std::io;

use crate::system::fs::sync;

/// The argument passed to the kernel to restart into the vendor recovery.
const RECOVERY_ARG: &std::ffi::CStr = c"recovery";

/// Restarts the device.
///
/// Returns the reason if the restart was refused.
#[must_use = "Has no effect if the result is unused"]
pub fn reset() -> io::Error {
    sync();
    // SAFETY: reboot takes a plain command value and does not touch memory.
    unsafe { libc::reboot(libc::RB_AUTOBOOT) };
    io::Error::last_os_error()
}

/// Restarts the device into the stock vendor recovery, bypassing the boot menu entirely.
///
/// Returns the reason if the restart was refused.
#[must_use = "Has no effect if the result is unused"]
pub fn stock_recovery() -> io::Error {
    sync();
    // SAFETY: the raw reboot syscall with RESTART2 reads a nul terminated string argument, which is static here.
    unsafe {
        libc::syscall(
            libc::SYS_reboot,
            libc::LINUX_REBOOT_MAGIC1,
            libc::LINUX_REBOOT_MAGIC2,
            libc::LINUX_REBOOT_CMD_RESTART2,
            RECOVERY_ARG.as_ptr(),
        )
    };
    io::Error::last_os_error()
}
