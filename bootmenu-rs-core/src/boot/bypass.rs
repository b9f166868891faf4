// SPDX-FileCopyrightText: 2025 some100 <ootinnyoo@outlook.com>
// SPDX-License-Identifier: MIT

//! Signature bypass flag.
//!
//! The secure boot stage reads a flag file before it verifies the next image. While it reads `yes`, verification is
//! skipped. This is needed for the vendor scripts to start an alternate kernel, but a flag stuck at `yes` would leave
//! the device with signature checks disabled for good.
//!
//! Outside of a boot attempt the flag must therefore always read `no`. The [`BypassGuard`] arms the flag when it is
//! created and disarms it when it is dropped, so that every path out of a boot attempt, including early returns and
//! unwinding, restores the flag.

use std::{
    io,
    path::{Path, PathBuf},
};

use log::error;

use crate::system::fs;

/// The file-backed signature bypass flag.
#[derive(Clone, Debug)]
pub struct BypassFlag {
    /// The path to the flag record.
    path: PathBuf,
}

impl BypassFlag {
    /// Creates a new [`BypassFlag`] given the path of its record.
    #[must_use = "Has no effect if the result is unused"]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Writes `yes` or `no` to the flag.
    ///
    /// # Errors
    ///
    /// May return an `Error` if the record could not be written.
    pub fn set(&self, enabled: bool) -> io::Result<()> {
        let value: &[u8] = if enabled { b"yes" } else { b"no" };
        fs::write_synced(&self.path, value)
    }

    /// Checks if signature verification is currently bypassed.
    ///
    /// Only a record reading exactly `yes` counts. Anything else, including a missing or unreadable record, is not
    /// bypassed.
    #[must_use = "Has no effect if the result is unused"]
    pub fn is_bypassed(&self) -> bool {
        matches!(fs::read_token(&self.path), Ok(Some(token)) if token == "yes")
    }

    /// Returns the path of the flag record.
    #[must_use = "Has no effect if the result is unused"]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// A guard for [`BypassFlag`]. When created, it will arm the flag. When the guard is eventually dropped, the flag
/// will be disarmed.
pub struct BypassGuard<'a> {
    /// The flag that is armed.
    flag: &'a BypassFlag,
}

impl<'a> BypassGuard<'a> {
    /// Create a new [`BypassGuard`]. Arms the flag and returns the guard.
    ///
    /// Failing to arm the flag does not fail the guard. The attempt goes on with whatever value is already stored,
    /// and the flag is still disarmed on drop.
    pub fn new(flag: &'a BypassFlag) -> Self {
        if let Err(e) = flag.set(true) {
            error!("Failed to arm bypass flag {}: {e}", flag.path.display());
        }
        Self { flag }
    }
}

impl Drop for BypassGuard<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.flag.set(false) {
            error!(
                "Failed to disarm bypass flag {}: {e}",
                self.flag.path.display()
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs as stdfs;

    use super::*;

    #[test]
    fn test_set_and_check() -> io::Result<()> {
        let dir = tempfile::tempdir()?;
        let flag = BypassFlag::new(dir.path().join("bypass"));
        assert!(!flag.is_bypassed());

        flag.set(true)?;
        assert!(flag.is_bypassed());
        flag.set(false)?;
        assert!(!flag.is_bypassed());
        assert_eq!(stdfs::read_to_string(flag.path())?, "no");
        Ok(())
    }

    #[test]
    fn test_fail_closed() -> io::Result<()> {
        let dir = tempfile::tempdir()?;
        let flag = BypassFlag::new(dir.path().join("bypass"));
        for content in ["YES", "yess", "", "1", "true"] {
            stdfs::write(flag.path(), content)?;
            assert!(!flag.is_bypassed(), "{content:?} must not bypass");
        }
        Ok(())
    }

    #[test]
    fn test_guard_disarms() -> io::Result<()> {
        let dir = tempfile::tempdir()?;
        let flag = BypassFlag::new(dir.path().join("bypass"));
        {
            let _guard = BypassGuard::new(&flag);
            assert!(flag.is_bypassed());
        }
        assert!(!flag.is_bypassed());
        Ok(())
    }

    #[test]
    fn test_guard_unwritable() {
        let flag = BypassFlag::new("/nonexistent/dir/bypass");
        assert!(flag.set(true).is_err());
        let guard = BypassGuard::new(&flag);
        drop(guard);
        assert!(!flag.is_bypassed());
    }
}
