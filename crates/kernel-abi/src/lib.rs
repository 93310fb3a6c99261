// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 The Priorikern Authors

//! Shared ABI types for the Priorikern scheduler core.
//!
//! These are the plain-data types that both `kernel-core` (the allocator,
//! process table and scheduler) and `kernel-repl` (the command-line binding)
//! need to agree on. Keeping them dependency-free means either side can be
//! linked against without pulling in the other.

#![cfg_attr(not(test), no_std)]

mod constants;
mod error;
mod pid;
mod policy;
mod priority;
mod state;

pub use constants::*;
pub use error::KernelError;
pub use pid::ProcessId;
pub use policy::SchedulingPolicy;
pub use priority::Priority;
pub use state::ProcessState;
