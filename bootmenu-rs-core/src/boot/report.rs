// SPDX-FileCopyrightText: 2025 some100 <ootinnyoo@outlook.com>
// SPDX-License-Identifier: MIT

//! Provides [`Reporter`], the sink for progress text shown to the operator.
//!
//! A boot attempt reports its progress either to the operator's screen or to the system log, never both. The
//! orchestrator picks between the two through an explicit interactive flag.

use std::{
    fmt,
    io::{self, Write},
};

/// A sink for formatted progress text.
pub trait Reporter {
    /// Print formatted text to the sink.
    fn report(&mut self, args: fmt::Arguments<'_>);
}

/// Prints progress text straight to stdout, for an operator watching the screen.
#[derive(Default)]
pub struct ConsoleReporter;

impl Reporter for ConsoleReporter {
    fn report(&mut self, args: fmt::Arguments<'_>) {
        let mut stdout = io::stdout().lock();
        let _ = stdout.write_fmt(args);
        let _ = stdout.flush();
    }
}

/// Redirects progress text to the system log at the info level.
#[derive(Default)]
pub struct LogReporter;

impl Reporter for LogReporter {
    fn report(&mut self, args: fmt::Arguments<'_>) {
        let line = args.to_string();
        log::info!("{}", line.trim_end());
    }
}

/// Keeps every reported line in memory.
#[cfg(test)]
#[derive(Clone, Default)]
pub(crate) struct RecordingReporter(std::rc::Rc<std::cell::RefCell<Vec<String>>>);

#[cfg(test)]
impl RecordingReporter {
    /// Returns a copy of the lines reported so far.
    pub(crate) fn lines(&self) -> Vec<String> {
        self.0.borrow().clone()
    }
}

#[cfg(test)]
impl Reporter for RecordingReporter {
    fn report(&mut self, args: fmt::Arguments<'_>) {
        self.0.borrow_mut().push(args.to_string());
    }
}
