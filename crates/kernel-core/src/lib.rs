// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 The Priorikern Authors

//! Priorikern scheduler core: a bump-arena heap allocator, process table
//! with priority-ordered ready queue, preemptive priority scheduler, and an
//! in-kernel IPC mailbox.
//!
//! Processes in this kernel are accounting records, not running code: there
//! is no backing memory, no real instruction stream, and no real CPU to
//! interrupt. Every module here models the bookkeeping a real kernel would
//! do around those things, exactly - which is also what makes it testable
//! in full from user space.

#![cfg_attr(not(test), no_std)]

pub mod heap;
pub mod kernel;
pub mod log;
pub mod process;
pub mod scheduler;
pub mod stack;

pub use heap::{Heap, HeapBlock, HeapStats};
pub use kernel::{Kernel, ProcessInfo};
pub use log::{Diagnostic, DiagnosticLog};
pub use process::{ContextFrame, Pcb, ProcessName, ProcessTable};
pub use scheduler::{Cpu, Scheduler, SchedulerConfig, SchedulerStats, TickOutcome};
pub use stack::StackTable;

pub use kernel_abi::{
    KernelError, Priority, ProcessId, ProcessState, SchedulingPolicy, MAILBOX_CAPACITY,
    MAX_NAME_LEN, MAX_PROCESSES, MAX_PROCESS_STACKS,
};
