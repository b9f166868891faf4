// SPDX-FileCopyrightText: 2025 some100 <ootinnyoo@outlook.com>
// SPDX-License-Identifier: MIT

//! Provides [`BootError`], which encapsulates other errors

use thiserror::Error;

/// An `Error` resulting from the program.
#[derive(Error, Debug)]
pub enum BootError {
    /// A boot mode record could not be written or did not read back correctly.
    #[error("Boot Mode Store Error")]
    Store(#[from] crate::boot::store::WriteError),

    /// A boot script was missing, could not be started, or did not exit successfully.
    #[error("Script Failed: {0}")]
    ScriptFailed(#[from] crate::system::runner::RunError),

    /// A mode was out of range, or its script is not present on this device.
    #[error("Bad boot mode {0}")]
    BadMode(usize),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        boot::store::WriteError,
        system::runner::{RunError, WaitStatus},
    };

    #[test]
    fn test_conversions() {
        let e = BootError::from(WriteError::BadMode(7));
        assert!(matches!(e, BootError::Store(WriteError::BadMode(7))));

        let e = BootError::from(RunError::Failed(WaitStatus::Exited(2)));
        assert_eq!(e.to_string(), "Script Failed: Script failed (exit status 2)");
        assert_eq!(BootError::BadMode(9).to_string(), "Bad boot mode 9");
    }
}
