// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 The Priorikern Authors

//! Scheduling policy selection.

use core::fmt;

/// Which policy the scheduler uses to pick the next process to dispatch.
///
/// All four policies currently dequeue the head of the same
/// priority-ordered ready queue; see `kernel_core::scheduler` for the
/// rationale and the known caveat around `RoundRobin`/`Fcfs` with mixed
/// priorities.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SchedulingPolicy {
    RoundRobin,
    Priority,
    PriorityRoundRobin,
    Fcfs,
}

impl fmt::Display for SchedulingPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::RoundRobin => "round-robin",
            Self::Priority => "priority",
            Self::PriorityRoundRobin => "priority+rr",
            Self::Fcfs => "fcfs",
        };
        f.write_str(name)
    }
}
