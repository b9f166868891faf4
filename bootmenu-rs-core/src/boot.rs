// SPDX-FileCopyrightText: 2025 some100 <ootinnyoo@outlook.com>
// SPDX-License-Identifier: MIT

//! Provides [`BootMgr`], a struct which ties the mode records, the bypass flag and the script runner together.
//!
//! A boot attempt goes through the following states:
//!
//! ```text
//! Idle -> BypassArmed -> ScriptRunning -> Succeeded -> BypassDisarmed
//!                                     \-> Failed ----/
//! ```
//!
//! Most boot scripts restart the device themselves, in which case the attempt never returns. A script that does
//! return successfully is followed by a short countdown, so the operator can read what happened.

use std::{fmt, path::PathBuf, thread, time::Duration};

use log::{debug, info};

use crate::{
    BootResult,
    boot::{
        bypass::{BypassFlag, BypassGuard},
        config::BootConfig,
        mode::BootMode,
        report::{ConsoleReporter, LogReporter, Reporter},
        store::BootModeStore,
    },
    error::BootError,
    system::{
        device::DeviceControls,
        fs,
        runner::{RunError, ScriptRunner, WaitStatus},
    },
};

pub mod action;
pub mod bypass;
pub mod config;
pub mod menu;
pub mod mode;
pub mod report;
pub mod store;

/// The state of a boot attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AttemptState {
    /// Nothing has happened yet.
    Idle,

    /// The bypass flag was armed.
    BypassArmed,

    /// The script is running.
    ScriptRunning,

    /// The script returned with status 0.
    Succeeded,

    /// The script was missing or did not return with status 0.
    Failed,

    /// The bypass flag was disarmed again. This is the final state of every attempt.
    BypassDisarmed,
}

/// The record of one boot attempt.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BootAttempt {
    /// The mode that was booted.
    pub mode: BootMode,

    /// The script that was run for the mode.
    pub script: PathBuf,

    /// The current state of the attempt.
    pub state: AttemptState,

    /// Whether the attempt reached [`AttemptState::Succeeded`] before it was disarmed.
    pub succeeded: bool,

    /// How the script ended, if it was started.
    pub status: Option<WaitStatus>,

    /// The amount of countdown ticks that elapsed.
    pub ticks: u32,
}

impl BootAttempt {
    /// Creates a new idle [`BootAttempt`].
    fn new(mode: BootMode, script: PathBuf) -> Self {
        Self {
            mode,
            script,
            state: AttemptState::Idle,
            succeeded: false,
            status: None,
            ticks: 0,
        }
    }

    /// Moves the attempt into a new state.
    fn advance(&mut self, state: AttemptState) {
        debug!("boot attempt {}: {:?} -> {state:?}", self.mode, self.state);
        self.succeeded |= state == AttemptState::Succeeded;
        self.state = state;
    }
}

/// The two progress sinks. Exactly one of them is used for any message.
struct Reporters {
    /// Used when an operator is watching.
    console: Box<dyn Reporter>,

    /// Used when running unattended.
    log: Box<dyn Reporter>,
}

impl Reporters {
    /// Selects the sink for a message.
    fn get(&mut self, interactive: bool) -> &mut dyn Reporter {
        if interactive {
            &mut *self.console
        } else {
            &mut *self.log
        }
    }
}

/// The boot orchestrator.
pub struct BootMgr {
    /// The configuration of the boot menu.
    pub boot_config: BootConfig,

    /// The default and next-boot mode records.
    store: BootModeStore,

    /// The signature bypass flag.
    bypass: BypassFlag,

    /// The runner for boot and tool scripts.
    runner: ScriptRunner,

    /// The progress sinks.
    reporters: Reporters,

    /// The most recent boot attempt.
    last_attempt: Option<BootAttempt>,
}

impl BootMgr {
    /// Creates a new [`BootMgr`] from a [`BootConfig`], reporting to stdout and the log.
    #[must_use = "Has no effect if the result is unused"]
    pub fn new(boot_config: BootConfig) -> Self {
        Self::with_reporters(boot_config, Box::new(ConsoleReporter), Box::new(LogReporter))
    }

    /// Creates a new [`BootMgr`] with custom progress sinks for interactive and unattended use.
    #[must_use = "Has no effect if the result is unused"]
    pub fn with_reporters(
        boot_config: BootConfig,
        console: Box<dyn Reporter>,
        log: Box<dyn Reporter>,
    ) -> Self {
        Self {
            store: BootModeStore::from_config(&boot_config),
            bypass: BypassFlag::new(&boot_config.bypass_file),
            runner: ScriptRunner::new(&boot_config.bin_dir),
            boot_config,
            reporters: Reporters { console, log },
            last_attempt: None,
        }
    }

    /// Boots into a mode by running its script.
    ///
    /// The bypass flag is armed for the duration of the attempt, and disarmed again on every path out of it. If the
    /// script returns successfully (without restarting the device), a countdown is reported before returning.
    /// Progress goes to the console if `interactive`, otherwise to the log.
    ///
    /// # Errors
    ///
    /// May return an `Error` if the script is missing, could not be started, or did not exit with status 0. A failed
    /// attempt is never retried.
    pub fn attempt_boot(&mut self, mode: BootMode, interactive: bool) -> BootResult<()> {
        let mut attempt = BootAttempt::new(mode, self.boot_config.mode_script(mode));

        let result = {
            let _guard = BypassGuard::new(&self.bypass);
            attempt.advance(AttemptState::BypassArmed);

            let reporter = self.reporters.get(interactive);
            reporter.report(format_args!("Start {mode} boot....\n"));

            attempt.advance(AttemptState::ScriptRunning);
            match self.runner.run(&attempt.script) {
                Ok(status) => {
                    attempt.status = Some(status);
                    attempt.advance(AttemptState::Succeeded);
                    countdown(
                        reporter,
                        self.boot_config.countdown,
                        self.boot_config.tick,
                        &mut attempt,
                    );
                    Ok(())
                }
                Err(e) => {
                    if let RunError::Failed(status) = &e {
                        attempt.status = Some(*status);
                    }
                    attempt.advance(AttemptState::Failed);
                    Err(BootError::ScriptFailed(e))
                }
            }
        }; // the guard disarms the flag here

        attempt.advance(AttemptState::BypassDisarmed);
        self.last_attempt = Some(attempt);
        result
    }

    /// Resolves the mode that this boot should use.
    ///
    /// A pending one-shot mode takes precedence over the default mode, and is deleted if `consume_one_shot` is true.
    #[must_use = "Has no effect if the result is unused"]
    pub fn resolve_boot_target(&self, consume_one_shot: bool) -> BootMode {
        self.store.read_next_boot(consume_one_shot, true)
    }

    /// Sets the default mode given its ordinal.
    ///
    /// # Errors
    ///
    /// May return [`BootError::BadMode`] without writing anything if the ordinal does not belong to a mode, or the
    /// script of the mode does not exist on this device. May also return an `Error` if the record could not be
    /// written or verified.
    pub fn set_default(&mut self, index: usize) -> BootResult<()> {
        let mode = BootMode::from_index(index)
            .filter(|&mode| self.is_available(mode))
            .ok_or(BootError::BadMode(index))?;

        info!("Set {mode}...");
        self.store.write_default(mode)?;
        Ok(())
    }

    /// Sets the mode for the next boot only.
    ///
    /// # Errors
    ///
    /// May return an `Error` if the record could not be written.
    pub fn set_next_boot(&mut self, mode: BootMode) -> BootResult<()> {
        self.store.write_next_boot(mode)?;
        Ok(())
    }

    /// Gets the default mode, if one is configured.
    #[must_use = "Has no effect if the result is unused"]
    pub fn default_mode(&self) -> Option<BootMode> {
        self.store.read_default()
    }

    /// Checks if a mode can be booted on this device, meaning its script exists.
    ///
    /// The boot menu itself needs no script and is always available.
    #[must_use = "Has no effect if the result is unused"]
    pub fn is_available(&self, mode: BootMode) -> bool {
        mode == BootMode::BootMenu || fs::is_regular_file(&self.boot_config.mode_script(mode))
    }

    /// Checks if a tool script exists on this device.
    #[must_use = "Has no effect if the result is unused"]
    pub fn has_tool(&self, name: &str) -> bool {
        fs::is_regular_file(&self.boot_config.tool_script(name))
    }

    /// Runs a tool script by name, without touching the bypass flag.
    ///
    /// # Errors
    ///
    /// May return an `Error` if the script is missing, could not be started, or did not exit with status 0.
    pub fn run_tool(&mut self, name: &str) -> BootResult<()> {
        self.runner.run(&self.boot_config.tool_script(name))?;
        Ok(())
    }

    /// Checks if signature verification is currently bypassed.
    #[must_use = "Has no effect if the result is unused"]
    pub fn is_bypassed(&self) -> bool {
        self.bypass.is_bypassed()
    }

    /// Reports progress text, to the console if `interactive`, otherwise to the log.
    pub fn report(&mut self, interactive: bool, args: fmt::Arguments<'_>) {
        self.reporters.get(interactive).report(args);
    }

    /// Returns the most recent boot attempt.
    #[must_use = "Has no effect if the result is unused"]
    pub fn last_attempt(&self) -> Option<&BootAttempt> {
        self.last_attempt.as_ref()
    }

    /// Returns the script runner.
    #[must_use = "Has no effect if the result is unused"]
    pub fn runner(&self) -> &ScriptRunner {
        &self.runner
    }

    /// Returns the device controls described by the configuration.
    #[must_use = "Has no effect if the result is unused"]
    pub fn device(&self) -> DeviceControls {
        DeviceControls::from_config(&self.boot_config)
    }
}

/// Counts down after a script that returned, one tick at a time.
fn countdown(reporter: &mut dyn Reporter, ticks: u32, tick: Duration, attempt: &mut BootAttempt) {
    for i in (1..=ticks).rev() {
        reporter.report(format_args!("{i}..\n"));
        thread::sleep(tick);
        attempt.ticks += 1;
    }
}
