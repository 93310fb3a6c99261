// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 The Priorikern Authors

//! Process state machine.

use core::fmt;

/// A process's position in the state machine described in the process
/// control block model.
///
/// Legal transitions are enforced by `kernel_core::process::ProcessTable`,
/// not by this type itself - it is plain data.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProcessState {
    /// In the ready queue, waiting to be dispatched.
    Ready,
    /// Currently dispatched; at most one process is `Current` at a time.
    Current,
    /// Voluntarily blocked (e.g. IPC receive on an empty mailbox).
    Blocked,
    /// Waiting on an event other than a message (reserved for future use).
    Waiting,
    /// Timed block. Treated identically to `Blocked`: nothing in this
    /// kernel wakes a sleeping process automatically, an explicit unblock
    /// is required.
    Sleeping,
    /// Terminated. Terminal state; the PCB is torn down and removed from
    /// every table once a process reaches it.
    Terminated,
}

impl ProcessState {
    /// Returns `true` if this state counts as "blocked" for statistics
    /// purposes (`Blocked`, `Waiting`, or `Sleeping`).
    #[must_use]
    pub const fn is_blocked_like(self) -> bool {
        matches!(self, Self::Blocked | Self::Waiting | Self::Sleeping)
    }
}

impl fmt::Display for ProcessState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Ready => "READY",
            Self::Current => "CURRENT",
            Self::Blocked => "BLOCKED",
            Self::Waiting => "WAITING",
            Self::Sleeping => "SLEEPING",
            Self::Terminated => "TERMINATED",
        };
        f.write_str(name)
    }
}
