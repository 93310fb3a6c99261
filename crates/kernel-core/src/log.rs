// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 The Priorikern Authors

//! One diagnostic line per failure, kept in a ring buffer the REPL drains
//! and prints.
//!
//! The original kernel wrote straight to the serial console on every
//! error. Here the kernel core stays free of any I/O dependency; it only
//! records what happened, and `kernel-repl` decides how (and whether) to
//! display it.

use core::fmt;

use kernel_abi::{KernelError, ProcessId};

const LOG_CAPACITY: usize = 64;

/// One failed operation, tagged with enough context to print a useful line.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Diagnostic {
    Memory(KernelError),
    Process(KernelError, ProcessId),
    Scheduler(KernelError),
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Memory(err) => write!(f, "[memory] {err}"),
            Self::Process(err, pid) => write!(f, "[process {pid}] {err}"),
            Self::Scheduler(err) => write!(f, "[scheduler] {err}"),
        }
    }
}

/// Fixed-capacity ring of diagnostics. Once full, new entries are dropped
/// until the log is drained - losing the newest diagnostic is preferable to
/// an unbounded allocation in a `no_std` kernel.
pub struct DiagnosticLog {
    entries: [Option<Diagnostic>; LOG_CAPACITY],
    len: usize,
}

impl DiagnosticLog {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: [None; LOG_CAPACITY],
            len: 0,
        }
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        if self.len < LOG_CAPACITY {
            self.entries[self.len] = Some(diagnostic);
            self.len += 1;
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = Diagnostic> + '_ {
        self.entries[..self.len].iter().filter_map(|e| *e)
    }

    pub fn clear(&mut self) {
        self.entries = [None; LOG_CAPACITY];
        self.len = 0;
    }
}

impl Default for DiagnosticLog {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_and_iterate_preserves_order() {
        let mut log = DiagnosticLog::new();
        log.push(Diagnostic::Memory(KernelError::OutOfMemory));
        log.push(Diagnostic::Process(KernelError::UnknownProcess, ProcessId::new(3)));

        let collected: std::vec::Vec<_> = log.iter().collect();
        assert_eq!(collected.len(), 2);
        assert_eq!(collected[0], Diagnostic::Memory(KernelError::OutOfMemory));
    }

    #[test]
    fn clear_empties_the_log() {
        let mut log = DiagnosticLog::new();
        log.push(Diagnostic::Memory(KernelError::DoubleFree));
        log.clear();
        assert!(log.is_empty());
        assert_eq!(log.iter().count(), 0);
    }

    #[test]
    fn overflow_drops_new_entries_silently() {
        let mut log = DiagnosticLog::new();
        for _ in 0..LOG_CAPACITY + 10 {
            log.push(Diagnostic::Memory(KernelError::OutOfMemory));
        }
        assert_eq!(log.len(), LOG_CAPACITY);
    }

    #[test]
    fn display_formats_include_context() {
        let diag = Diagnostic::Process(KernelError::TableFull, ProcessId::new(5));
        assert_eq!(std::format!("{diag}"), "[process 5] process table full");
    }
}
