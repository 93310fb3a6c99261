// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 The Priorikern Authors

//! Layout and capacity constants shared across the kernel core.

/// Start address of the simulated kernel heap arena.
pub const HEAP_START: usize = 0x0020_0000;

/// Size of the kernel heap arena in bytes (30 MiB).
pub const HEAP_SIZE: usize = 0x01E0_0000;

/// Size of a single process stack slot (16 KiB).
pub const STACK_SIZE: usize = 0x4000;

/// Start address of the stack region, immediately after the heap arena.
pub const STACK_REGION_START: usize = HEAP_START + HEAP_SIZE;

/// Maximum number of heap block records tracked by the allocator metadata table.
pub const MAX_BLOCKS: usize = 1024;

/// Maximum number of live processes the process table can hold.
pub const MAX_PROCESSES: usize = 32;

/// Maximum number of stack slots, one per potentially-live process.
pub const MAX_PROCESS_STACKS: usize = 32;

/// Alignment unit for heap allocations, in bytes.
pub const ALIGNMENT: usize = 4;

/// A free block is only split off if the remainder exceeds this many bytes;
/// smaller remainders stay attached to avoid pathological micro-blocks.
pub const SPLIT_THRESHOLD: usize = 32;

/// Maximum length of a process name, not counting the terminator.
pub const MAX_NAME_LEN: usize = 31;

/// Mailbox capacity, in 32-bit words, per process.
pub const MAILBOX_CAPACITY: usize = 16;

/// Default time quantum assigned to a newly created process, in ticks.
pub const DEFAULT_QUANTUM: u32 = 100;

/// Minimum quantum a caller may assign to a process.
pub const MIN_QUANTUM: u32 = 10;

/// Maximum quantum a caller may assign to a process.
pub const MAX_QUANTUM: u32 = 1000;

/// Number of ready-queue ticks a process waits before it becomes eligible for an aging boost.
pub const AGING_THRESHOLD: u32 = 100;

/// How often (in ticks) the scheduler re-checks the ready queue for aging boosts.
pub const AGING_BOOST_INTERVAL: u32 = 50;

/// Clamp a caller-supplied quantum into `[MIN_QUANTUM, MAX_QUANTUM]`.
#[must_use]
pub const fn clamp_quantum(quantum: u32) -> u32 {
    if quantum < MIN_QUANTUM {
        MIN_QUANTUM
    } else if quantum > MAX_QUANTUM {
        MAX_QUANTUM
    } else {
        quantum
    }
}
