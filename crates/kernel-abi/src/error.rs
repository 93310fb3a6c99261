// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 The Priorikern Authors

//! Kernel error kinds.
//!
//! Every fallible core operation returns `Result<_, KernelError>` instead of
//! the sentinel return values (null pointers, negative status codes) the
//! original C kernel used. The error itself never unwinds anything: callers
//! are expected to match on it, log a diagnostic, and move on exactly as the
//! original did.

use core::fmt;

/// The reason a fallible kernel operation failed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KernelError {
    /// The heap has no free block large enough to satisfy the request, even
    /// after a full coalescing pass.
    OutOfMemory,
    /// `free`/`reallocate` was given an address that does not start a known
    /// block.
    InvalidAddress,
    /// `free` was called on a block that is already free.
    DoubleFree,
    /// The stack slot table has no free slots left.
    StackExhausted,
    /// The process table already holds `MAX_PROCESSES` live entries.
    TableFull,
    /// No process with the given PID exists.
    UnknownProcess,
    /// A process's mailbox already holds `MAILBOX_CAPACITY` messages.
    MailboxFull,
    /// `receive` was called on an empty mailbox; the caller has been
    /// transitioned to `Blocked` as a side effect.
    NoMessage,
}

impl fmt::Display for KernelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let message = match self {
            Self::OutOfMemory => "out of memory",
            Self::InvalidAddress => "invalid address",
            Self::DoubleFree => "double free",
            Self::StackExhausted => "no free stack slots",
            Self::TableFull => "process table full",
            Self::UnknownProcess => "unknown process",
            Self::MailboxFull => "mailbox full",
            Self::NoMessage => "no message",
        };
        f.write_str(message)
    }
}
