// SPDX-FileCopyrightText: 2025 some100 <ootinnyoo@outlook.com>
// SPDX-License-Identifier: MIT

//! Simple console backend for the [`log`] crate.

use std::{
    io::Write,
    time::{SystemTime, UNIX_EPOCH},
};

use log::{LevelFilter, Metadata, Record};

/// A simple logging backend that writes to stderr.
pub struct ConsoleLogger {
    /// The most verbose level that is printed.
    level: LevelFilter,
}

impl Default for ConsoleLogger {
    fn default() -> Self {
        Self::new(LevelFilter::Info)
    }
}

impl ConsoleLogger {
    /// Constructs a new [`ConsoleLogger`].
    #[must_use = "Has no effect if the result is unused"]
    pub const fn new(level: LevelFilter) -> Self {
        Self { level }
    }

    /// Constructs a new [`ConsoleLogger`], then immediately leaks it so that it can be used with `set_logger`.
    #[must_use = "Has no effect if the result is unused"]
    pub fn static_new(level: LevelFilter) -> &'static Self {
        Box::leak(Box::new(Self::new(level)))
    }

    /// Installs a leaked [`ConsoleLogger`] as the global logger, and sets the maximum level to match.
    ///
    /// Does nothing if a logger was already installed.
    pub fn install(level: LevelFilter) {
        let _ = log::set_logger(Self::static_new(level)).map(|()| log::set_max_level(level));
    }
}

impl log::Log for ConsoleLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let time = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap_or_default();
            let level = record.level();
            let file = record.file().unwrap_or_default();
            let line = record.line().unwrap_or_default();
            let args = record.args();
            let _ = writeln!(
                std::io::stderr().lock(),
                "[{}.{:03} {level} {file}:{line}] - {args}",
                time.as_secs(),
                time.subsec_millis()
            );
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}
