// SPDX-FileCopyrightText: 2025 some100 <ootinnyoo@outlook.com>
// SPDX-License-Identifier: MIT

//! Running the binary that the boot menu was installed in place of.
//!
//! To get started early in the boot process, the boot menu may be installed over a system binary that init runs
//! anyway (like `logwrapper`). The original binary is then kept next to it with a `.bin` suffix, and must still be
//! run with the exact arguments that init passed.

use std::ffi::{OsStr, OsString};

use crate::system::runner::{RunError, ScriptRunner};

/// Gets the path of the original binary given the path the boot menu was started as.
#[must_use = "Has no effect if the result is unused"]
pub fn real_executable(hijacked: &OsStr) -> OsString {
    let mut real = hijacked.to_owned();
    real.push(".bin");
    real
}

/// Runs the original binary with every argument after `argv[0]`, and waits for it.
///
/// # Errors
///
/// May return an `Error` if `args` is empty, the binary could not be started, or it did not exit with status 0.
pub fn real_execute(runner: &ScriptRunner, args: &[OsString]) -> Result<(), RunError> {
    let (hijacked, rest) = args.split_first().ok_or(RunError::InvalidArgs)?;
    let real = real_executable(hijacked);

    let argv: Vec<&OsStr> = [real.as_os_str()]
        .into_iter()
        .chain(rest.iter().map(OsString::as_os_str))
        .collect();

    let status = runner.exec(&argv)?;
    if status.success() {
        Ok(())
    } else {
        Err(RunError::Failed(status))
    }
}

#[cfg(test)]
mod tests {
    use std::{fs, os::unix::fs::PermissionsExt};

    use super::*;
    use crate::system::runner::{WaitStatus, tests::{exec_lock, write_script}};

    #[test]
    fn test_real_executable() {
        assert_eq!(
            real_executable(OsStr::new("/system/bin/logwrapper")),
            OsString::from("/system/bin/logwrapper.bin")
        );
    }

    #[test]
    fn test_real_execute_passes_arguments() {
        let _lock = exec_lock();
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let hijacked = dir.path().join("logwrapper");
        let real = dir.path().join("logwrapper.bin");
        write_script(&real, r#"[ "$1" = "-d" ] && [ "$2" = "two words" ]"#);
        fs::set_permissions(&real, fs::Permissions::from_mode(0o755)).expect("Failed to chmod");

        let runner = ScriptRunner::new(dir.path());
        let args = [hijacked.into_os_string(), "-d".into(), "two words".into()];
        assert!(real_execute(&runner, &args).is_ok());

        let args = [args[0].clone(), "-x".into()];
        assert!(matches!(
            real_execute(&runner, &args),
            Err(RunError::Failed(WaitStatus::Exited(1)))
        ));
        assert!(matches!(real_execute(&runner, &[]), Err(RunError::InvalidArgs)));
    }
}
