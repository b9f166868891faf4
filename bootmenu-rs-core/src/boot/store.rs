// SPDX-FileCopyrightText: 2025 some100 <ootinnyoo@outlook.com>
// SPDX-License-Identifier: MIT

//! Provides [`BootModeStore`], the persistent records of the default and next-boot modes.
//!
//! There are two independent records, each a flat file holding one canonical mode name:
//!
//! 1. The default mode, which persists across any number of boots and is only ever replaced explicitly.
//! 2. The next-boot mode, which applies to exactly one boot. It is deleted once it has been consumed.
//!
//! Reads never fail. A record that is missing or unreadable degrades to a fallback. Writes on the other hand are
//! always reported to the caller, and the default mode is verified by reading it back after it is written.

use std::{
    io,
    path::{Path, PathBuf},
};

use log::{info, warn};
use thiserror::Error;

use crate::{
    boot::{config::BootConfig, mode::BootMode},
    system::fs::{self, FsError},
};

/// An `Error` that may result from writing a boot mode record.
#[derive(Error, Debug)]
pub enum WriteError {
    /// The record could not be opened, written, or synced.
    #[error("Could not write boot mode record: {0}")]
    Io(#[from] io::Error),

    /// The record read back as a different mode than the one written.
    #[error("Boot mode record read back as {found} (expected {expected})")]
    VerifyMismatch {
        /// The mode that was written.
        expected: BootMode,

        /// The mode that was resolved after writing.
        found: BootMode,
    },

    /// The ordinal does not belong to any mode.
    #[error("Bad mode {0}")]
    BadMode(usize),
}

/// The persistent storage of the default and next-boot modes.
#[derive(Clone, Debug)]
pub struct BootModeStore {
    /// The path to the default mode record.
    default_path: PathBuf,

    /// The path to the one-shot next-boot mode record.
    next_path: PathBuf,
}

impl BootModeStore {
    /// Creates a new [`BootModeStore`] given the paths of both records.
    #[must_use = "Has no effect if the result is unused"]
    pub fn new(default_path: impl Into<PathBuf>, next_path: impl Into<PathBuf>) -> Self {
        Self {
            default_path: default_path.into(),
            next_path: next_path.into(),
        }
    }

    /// Creates a new [`BootModeStore`] from the paths in a [`BootConfig`].
    #[must_use = "Has no effect if the result is unused"]
    pub fn from_config(config: &BootConfig) -> Self {
        Self::new(&config.default_mode_file, &config.next_mode_file)
    }

    /// Reads the default mode.
    ///
    /// Returns `None` if no default mode is configured, which is distinct from a default of
    /// [`BootMode::BootMenu`]. Callers that need a mode should coerce `None` into [`BootMode::BootMenu`].
    #[must_use = "Has no effect if the result is unused"]
    pub fn read_default(&self) -> Option<BootMode> {
        let token = read_record(&self.default_path)?;
        let mode = BootMode::decode(&token);
        info!("default_bootmode={} ({mode})", mode.index());
        Some(mode)
    }

    /// Writes the default mode, then verifies it.
    ///
    /// The verification re-reads the record through the next-boot resolution path without consuming anything, so
    /// a pending one-shot mode takes precedence during the check just like it would on the next boot.
    ///
    /// # Errors
    ///
    /// May return an `Error` if the record could not be written, or did not read back as `mode`.
    pub fn write_default(&self, mode: BootMode) -> Result<(), WriteError> {
        fs::write_synced(&self.default_path, mode.encode().as_bytes())?;

        let found = self.read_next_boot(false, false);
        if found == mode {
            Ok(())
        } else {
            Err(WriteError::VerifyMismatch {
                expected: mode,
                found,
            })
        }
    }

    /// Writes the default mode given its ordinal.
    ///
    /// # Errors
    ///
    /// May return [`WriteError::BadMode`] without touching the record if the ordinal does not belong to any mode,
    /// otherwise see [`Self::write_default`].
    pub fn write_default_index(&self, index: usize) -> Result<(), WriteError> {
        self.write_default(BootMode::try_from(index)?)
    }

    /// Resolves the mode for the next boot.
    ///
    /// If a one-shot record exists it wins over the default mode. When `consume` is true, the one-shot record is
    /// deleted so that it only ever applies once. A record that is empty, oversized or unreadable still counts as
    /// present, and resolves to [`BootMode::BootMenu`]. When `announce` is true, the resolved one-shot mode is logged.
    /// Without a one-shot record, this falls back to the default mode, or [`BootMode::BootMenu`] if there is none.
    #[must_use = "Has no effect if the result is unused"]
    pub fn read_next_boot(&self, consume: bool, announce: bool) -> BootMode {
        let mode = match fs::read_token(&self.next_path) {
            Err(FsError::NotFound) => return self.read_default().unwrap_or_default(),
            Ok(token) => BootMode::decode(token.as_deref().unwrap_or_default()),
            Err(e) => {
                warn!("Could not read {}: {e}", self.next_path.display());
                BootMode::BootMenu
            }
        };

        if consume && let Err(e) = fs::remove(&self.next_path) {
            warn!(
                "Failed to remove one-shot boot mode {}: {e}",
                self.next_path.display()
            );
        }

        if announce {
            info!("bootmode={} ({mode})", mode.index());
        }
        mode
    }

    /// Writes the mode for the next boot only.
    ///
    /// This is best effort, and is not read back. It will be consumed on the next boot.
    ///
    /// # Errors
    ///
    /// May return an `Error` if the record could not be written.
    pub fn write_next_boot(&self, mode: BootMode) -> Result<(), WriteError> {
        fs::write_synced(&self.next_path, mode.encode().as_bytes())?;
        info!("Next boot mode set to {mode}");
        Ok(())
    }

    /// Returns the path of the default mode record.
    #[must_use = "Has no effect if the result is unused"]
    pub fn default_path(&self) -> &Path {
        &self.default_path
    }

    /// Returns the path of the one-shot mode record.
    #[must_use = "Has no effect if the result is unused"]
    pub fn next_path(&self) -> &Path {
        &self.next_path
    }
}

/// Reads the token of a record, degrading every failure to `None`.
fn read_record(path: &Path) -> Option<String> {
    match fs::read_token(path) {
        Ok(token) => token,
        Err(FsError::NotFound) => None,
        Err(e) => {
            warn!("Could not read {}: {e}", path.display());
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs as stdfs;

    use tempfile::TempDir;

    use super::*;

    fn store() -> (TempDir, BootModeStore) {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let store = BootModeStore::new(
            dir.path().join("default_bootmode.conf"),
            dir.path().join("bootmode.conf"),
        );
        (dir, store)
    }

    #[test]
    fn test_no_default() {
        let (_dir, store) = store();
        assert_eq!(store.read_default(), None);
        assert_eq!(store.read_next_boot(true, true), BootMode::BootMenu);
    }

    #[test]
    fn test_write_default_roundtrip() -> Result<(), WriteError> {
        let (_dir, store) = store();
        for mode in BootMode::ALL {
            store.write_default(mode)?;
            assert_eq!(store.read_default(), Some(mode));
        }
        Ok(())
    }

    #[test]
    fn test_write_default_bad_mode() -> Result<(), WriteError> {
        let (_dir, store) = store();
        store.write_default(BootMode::SecondSystem)?;
        assert!(matches!(
            store.write_default_index(5),
            Err(WriteError::BadMode(5))
        ));
        assert_eq!(store.read_default(), Some(BootMode::SecondSystem));
        Ok(())
    }

    #[test]
    fn test_write_default_verifies_through_one_shot() -> Result<(), WriteError> {
        let (_dir, store) = store();
        store.write_next_boot(BootMode::Recovery)?;
        assert!(matches!(
            store.write_default(BootMode::SecondBoot),
            Err(WriteError::VerifyMismatch {
                expected: BootMode::SecondBoot,
                found: BootMode::Recovery,
            })
        ));

        // the check must not have consumed the one-shot record
        assert_eq!(store.read_next_boot(true, false), BootMode::Recovery);
        store.write_default(BootMode::SecondBoot)?;
        Ok(())
    }

    #[test]
    fn test_one_shot_consumed() -> Result<(), WriteError> {
        let (_dir, store) = store();
        store.write_default(BootMode::SecondSystem)?;
        store.write_next_boot(BootMode::SecondBootUart)?;

        assert_eq!(store.read_next_boot(false, false), BootMode::SecondBootUart);
        assert_eq!(store.read_next_boot(true, true), BootMode::SecondBootUart);
        assert!(!store.next_path().exists());
        assert_eq!(store.read_next_boot(true, true), BootMode::SecondSystem);
        Ok(())
    }

    #[test]
    fn test_unrecognized_record() -> Result<(), io::Error> {
        let (_dir, store) = store();
        stdfs::write(store.default_path(), "windows")?;
        assert_eq!(store.read_default(), Some(BootMode::BootMenu));

        stdfs::write(store.default_path(), "2nd-boot")?;
        stdfs::write(store.next_path(), "")?;
        assert_eq!(store.read_next_boot(true, false), BootMode::BootMenu);
        assert!(!store.next_path().exists());
        assert_eq!(store.read_next_boot(true, false), BootMode::SecondBoot);
        Ok(())
    }

    #[test]
    fn test_corrupt_one_shot_consumed() -> Result<(), io::Error> {
        let (_dir, store) = store();
        stdfs::write(store.default_path(), "2nd-boot")?;

        for content in [vec![b'x'; 100], vec![0xff, 0xfe], b"2nd-system-please".to_vec()] {
            stdfs::write(store.next_path(), &content)?;
            assert_eq!(store.read_next_boot(false, false), BootMode::BootMenu);
            assert!(store.next_path().exists()); // only consumed on request

            assert_eq!(store.read_next_boot(true, true), BootMode::BootMenu);
            assert!(!store.next_path().exists());
            assert_eq!(store.read_next_boot(true, true), BootMode::SecondBoot);
        }
        Ok(())
    }

    #[test]
    fn test_unwritable_record() {
        let store = BootModeStore::new("/nonexistent/dir/default", "/nonexistent/dir/next");
        assert!(matches!(
            store.write_default(BootMode::Recovery),
            Err(WriteError::Io(_))
        ));
        assert!(store.write_next_boot(BootMode::Recovery).is_err());
        assert_eq!(store.read_default(), None);
    }
}
