// SPDX-FileCopyrightText: 2025 some100 <ootinnyoo@outlook.com>
// SPDX-License-Identifier: MIT

//! Provides [`ScriptRunner`], which runs a vendor script as a child process and waits for it.
//!
//! No shell is involved. The child replaces its image with the script directly, inherits the environment of the
//! parent, and receives no arguments besides its own path.
//!
//! # Safety
//!
//! This uses unsafe for the raw process and signal primitives of libc.
//!
//! 1. `SIGCHLD` is blocked in the calling thread from just before the fork until the child has been reaped. This way
//!    the child cannot exit and be reaped by anything else before the parent waits on it. The previous mask is put
//!    back by [`SignalMaskGuard`], so it is restored on every path, including a failed fork.
//! 2. Between `fork` and `execv`, the child only calls async-signal-safe functions (`pthread_sigmask`, `execv`,
//!    `write`, `_exit`). Every buffer it touches is built before the fork, so nothing is allocated in the child.
//! 3. While waiting, `SIGINT` and `SIGQUIT` are ignored so that an interrupt key does not kill the parent while the
//!    script keeps running. The previous handlers are put back by [`IgnoredSignalsGuard`].

use std::{
    ffi::{CString, OsStr},
    fs::{self as stdfs, Permissions},
    io,
    mem::MaybeUninit,
    os::unix::fs::PermissionsExt,
    path::{Path, PathBuf},
    ptr,
};

use bitflags::bitflags;
use libc::c_char;
use log::{error, info, warn};
use thiserror::Error;

use crate::system::{
    fs,
    helper::{join_cstring, os_to_cstring},
};

/// The directory that relative programs are looked up in when they cannot be found as given.
pub const DEFAULT_BIN_DIR: &str = "/system/bin";

/// The exit status reported by a child that could not start its program.
pub const EXEC_FAILED_STATUS: i32 = 127;

bitflags! {
    /// Unix permission bits of a script.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct ScriptMode: u32 {
        /// Owner may read.
        const OWNER_READ = 0o400;
        /// Owner may write.
        const OWNER_WRITE = 0o200;
        /// Owner may execute.
        const OWNER_EXEC = 0o100;
        /// Group may read.
        const GROUP_READ = 0o040;
        /// Group may execute.
        const GROUP_EXEC = 0o010;
        /// Others may read.
        const OTHER_READ = 0o004;
        /// Others may execute.
        const OTHER_EXEC = 0o001;

        /// The mode every script is set to before it is run (`0755`).
        const SCRIPT = Self::OWNER_READ.bits()
            | Self::OWNER_WRITE.bits()
            | Self::OWNER_EXEC.bits()
            | Self::GROUP_READ.bits()
            | Self::GROUP_EXEC.bits()
            | Self::OTHER_READ.bits()
            | Self::OTHER_EXEC.bits();
    }
}

/// How a child process ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WaitStatus {
    /// The child exited normally with an exit code.
    Exited(i32),

    /// The child was killed by a signal.
    Signaled(i32),

    /// The child ended in some other way, given as the raw wait status.
    Other(i32),

    /// The child could not be waited for.
    Lost,
}

impl WaitStatus {
    /// Classifies a raw status as returned by `waitpid`.
    #[must_use = "Has no effect if the result is unused"]
    pub fn from_raw(raw: i32) -> Self {
        if libc::WIFEXITED(raw) {
            Self::Exited(libc::WEXITSTATUS(raw))
        } else if libc::WIFSIGNALED(raw) {
            Self::Signaled(libc::WTERMSIG(raw))
        } else {
            Self::Other(raw)
        }
    }

    /// Checks if the child exited normally with status 0.
    #[must_use = "Has no effect if the result is unused"]
    pub const fn success(self) -> bool {
        matches!(self, Self::Exited(0))
    }
}

impl core::fmt::Display for WaitStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Exited(code) => write!(f, "exit status {code}"),
            Self::Signaled(signal) => write!(f, "killed by signal {signal}"),
            Self::Other(raw) => write!(f, "wait status {raw:#x}"),
            Self::Lost => f.write_str("child lost"),
        }
    }
}

/// An `Error` that may result from running a script.
#[derive(Error, Debug)]
pub enum RunError {
    /// The script does not exist, or is not a regular file.
    #[error("Script not found: {}", .0.display())]
    NotFound(PathBuf),

    /// The script ran, but did not exit with status 0.
    #[error("Script failed ({0})")]
    Failed(WaitStatus),

    /// The child process could not be created.
    #[error("Could not create child process: {0}")]
    Spawn(#[source] io::Error),

    /// The argument vector was empty, or contained a nul byte.
    #[error("Invalid argument vector")]
    InvalidArgs,
}

/// Runs scripts as child processes.
#[derive(Clone, Debug)]
pub struct ScriptRunner {
    /// The directory that relative programs fall back to.
    bin_dir: PathBuf,
}

impl Default for ScriptRunner {
    fn default() -> Self {
        Self::new(DEFAULT_BIN_DIR)
    }
}

impl ScriptRunner {
    /// Creates a new [`ScriptRunner`] given the fallback binary directory.
    #[must_use = "Has no effect if the result is unused"]
    pub fn new(bin_dir: impl Into<PathBuf>) -> Self {
        Self {
            bin_dir: bin_dir.into(),
        }
    }

    /// Runs a script and waits for it to finish.
    ///
    /// The script must be an existing regular file. It is made executable before it is started, regardless of what
    /// its permissions were before.
    ///
    /// # Errors
    ///
    /// May return an `Error` if the script does not exist, the child could not be created, or the script did not
    /// exit with status 0.
    pub fn run(&self, path: &Path) -> Result<WaitStatus, RunError> {
        if !fs::is_regular_file(path) {
            error!("Script not found: {}", path.display());
            return Err(RunError::NotFound(path.to_owned()));
        }

        info!("exec {}", path.display());

        if let Err(e) = stdfs::set_permissions(path, Permissions::from_mode(ScriptMode::SCRIPT.bits())) {
            warn!("Could not make {} executable: {e}", path.display());
        }

        let status = self.exec(&[path.as_os_str()])?;
        if status.success() {
            Ok(status)
        } else {
            error!("Error in {} (Result: {status})", path.display());
            Err(RunError::Failed(status))
        }
    }

    /// Spawns `argv[0]` with the given argument vector and waits for it, without checking anything beforehand.
    ///
    /// If the program cannot be found and its path is relative, the child retries exactly once under the fallback
    /// binary directory. If that fails too, the child prints the last path it tried and exits with
    /// [`EXEC_FAILED_STATUS`].
    ///
    /// The returned status is whatever the child ended with, successful or not.
    ///
    /// # Errors
    ///
    /// May return an `Error` if the argument vector is invalid, or the child could not be created or waited for.
    pub fn exec(&self, argv: &[&OsStr]) -> Result<WaitStatus, RunError> {
        let args = argv
            .iter()
            .map(|arg| os_to_cstring(arg))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| RunError::InvalidArgs)?;
        let program = args.first().ok_or(RunError::InvalidArgs)?;

        let fallback_path = if program.as_bytes().starts_with(b"/") {
            None
        } else {
            Some(join_cstring(&self.bin_dir, program.as_bytes()).map_err(|_| RunError::InvalidArgs)?)
        };

        let argp = build_argp(&args, None);
        let message = exec_failed_message(program);
        let fallback = fallback_path
            .as_ref()
            .map(|path| (build_argp(&args, Some(path)), exec_failed_message(path)));

        let mask = SignalMaskGuard::block_sigchld();

        // SAFETY: the child only calls async-signal-safe functions on buffers prepared above, see the module docs.
        let pid = unsafe { libc::fork() };
        match pid {
            -1 => {
                let e = io::Error::last_os_error();
                drop(mask);
                return Err(RunError::Spawn(e));
            }
            0 => {
                // SAFETY: every pointer here refers to a nul terminated buffer or vector that outlives the calls.
                unsafe {
                    mask.restore_in_child();
                    exec_child(
                        &argp,
                        message.as_bytes(),
                        fallback
                            .as_ref()
                            .map(|(argp, message)| (argp.as_slice(), message.as_bytes())),
                    )
                }
            }
            _ => (),
        }

        let ignored = IgnoredSignalsGuard::ignore_interactive();
        let status = wait_for(pid);
        drop(mask);
        drop(ignored);

        Ok(status.map_or(WaitStatus::Lost, WaitStatus::from_raw))
    }

    /// Returns the fallback binary directory.
    #[must_use = "Has no effect if the result is unused"]
    pub fn bin_dir(&self) -> &Path {
        &self.bin_dir
    }
}

/// Builds a nul terminated vector of argument pointers, optionally replacing the program path.
fn build_argp(args: &[CString], program: Option<&CString>) -> Vec<*const c_char> {
    args.iter()
        .enumerate()
        .map(|(i, arg)| match program {
            Some(program) if i == 0 => program.as_ptr(),
            _ => arg.as_ptr(),
        })
        .chain([ptr::null()])
        .collect()
}

/// Builds the message a child prints when it could not start `path`.
fn exec_failed_message(path: &CString) -> String {
    format!("E:Can't run {}\n", path.to_string_lossy())
}

/// Checks if a failed `execv` should be retried under the fallback directory.
fn retries_fallback(errno: Option<i32>) -> bool {
    errno == Some(libc::ENOENT)
}

/// Replaces the image of a freshly forked child, never returning.
///
/// The message printed on failure names the last path that was actually tried.
///
/// # Safety
///
/// Must only be called in a child right after `fork`. Every argument vector must be nul terminated, and point to nul
/// terminated strings that stay alive for the call.
unsafe fn exec_child(
    argp: &[*const c_char],
    message: &[u8],
    fallback: Option<(&[*const c_char], &[u8])>,
) -> ! {
    // SAFETY: guaranteed by the caller.
    unsafe {
        libc::execv(argp[0], argp.as_ptr());

        let mut message = message;
        if let Some((fallback, fallback_message)) = fallback
            && retries_fallback(io::Error::last_os_error().raw_os_error())
        {
            libc::execv(fallback[0], fallback.as_ptr());
            message = fallback_message;
        }

        libc::write(libc::STDOUT_FILENO, message.as_ptr().cast(), message.len());
        libc::_exit(EXEC_FAILED_STATUS)
    }
}

/// Waits for a child, retrying when interrupted. Returns the raw status.
fn wait_for(pid: libc::pid_t) -> io::Result<i32> {
    loop {
        let mut status = 0;
        // SAFETY: status is a valid pointer to an integer for the duration of the call.
        if unsafe { libc::waitpid(pid, &raw mut status, 0) } != -1 {
            return Ok(status);
        }

        let e = io::Error::last_os_error();
        if e.kind() != io::ErrorKind::Interrupted {
            return Err(e);
        }
    }
}

/// A guard that blocks `SIGCHLD` in the current thread, restoring the previous mask when dropped.
struct SignalMaskGuard {
    /// The signal mask before `SIGCHLD` was blocked.
    previous: libc::sigset_t,
}

impl SignalMaskGuard {
    /// Blocks `SIGCHLD` and saves the previous mask.
    fn block_sigchld() -> Self {
        let mut mask = MaybeUninit::<libc::sigset_t>::uninit();
        let mut previous = MaybeUninit::<libc::sigset_t>::uninit();
        // SAFETY: sigemptyset initializes mask before sigaddset and pthread_sigmask read it, and pthread_sigmask
        // always writes the previous mask when given a valid pointer.
        unsafe {
            libc::sigemptyset(mask.as_mut_ptr());
            libc::sigaddset(mask.as_mut_ptr(), libc::SIGCHLD);
            libc::pthread_sigmask(libc::SIG_BLOCK, mask.as_ptr(), previous.as_mut_ptr());
            Self {
                previous: previous.assume_init(),
            }
        }
    }

    /// Restores the previous mask inside a forked child, without running the destructor.
    ///
    /// # Safety
    ///
    /// Must only be called in a child right after `fork`.
    unsafe fn restore_in_child(&self) {
        // SAFETY: previous is an initialized signal set, and pthread_sigmask is async-signal-safe.
        unsafe {
            libc::pthread_sigmask(libc::SIG_SETMASK, &raw const self.previous, ptr::null_mut());
        }
    }
}

impl Drop for SignalMaskGuard {
    fn drop(&mut self) {
        // SAFETY: previous is an initialized signal set saved by block_sigchld.
        unsafe {
            libc::pthread_sigmask(libc::SIG_SETMASK, &raw const self.previous, ptr::null_mut());
        }
    }
}

/// A guard that ignores `SIGINT` and `SIGQUIT`, restoring the previous handlers when dropped.
struct IgnoredSignalsGuard {
    /// The previous disposition of each ignored signal.
    previous: [(libc::c_int, libc::sigaction); 2],
}

impl IgnoredSignalsGuard {
    /// Ignores the interactive interrupt and quit signals.
    fn ignore_interactive() -> Self {
        Self {
            previous: [libc::SIGINT, libc::SIGQUIT].map(|signal| (signal, ignore_signal(signal))),
        }
    }
}

impl Drop for IgnoredSignalsGuard {
    fn drop(&mut self) {
        for (signal, action) in &self.previous {
            // SAFETY: action is the disposition previously returned by sigaction for this signal.
            unsafe {
                libc::sigaction(*signal, action, ptr::null_mut());
            }
        }
    }
}

/// Sets a signal to be ignored, returning its previous disposition.
fn ignore_signal(signal: libc::c_int) -> libc::sigaction {
    // SAFETY: an all zero sigaction is a valid value (no flags, default handler), and both pointers are valid.
    unsafe {
        let mut action: libc::sigaction = core::mem::zeroed();
        action.sa_sigaction = libc::SIG_IGN;
        libc::sigemptyset(&raw mut action.sa_mask);

        let mut previous: libc::sigaction = core::mem::zeroed();
        libc::sigaction(signal, &raw const action, &raw mut previous);
        previous
    }
}
