// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 The Priorikern Authors

//! Process control blocks and the priority-ordered ready queue.
//!
//! The ready queue is an intrusive doubly-linked list: each [`Pcb`] carries
//! its own `prev`/`next` links instead of living behind a raw pointer. It is
//! kept sorted by descending priority with FIFO order preserved among equal
//! priorities, so dequeuing the head is always the correct next process to
//! run for every scheduling policy.

use core::fmt;

use kernel_abi::{
    clamp_quantum, KernelError, Priority, ProcessId, ProcessState, MAILBOX_CAPACITY, MAX_NAME_LEN,
    MAX_PROCESSES,
};

use crate::stack::StackTable;

/// Saved CPU register image for a single process.
///
/// Deliberately minimal: this kernel never runs user code, so only the
/// fields needed to prove the `switch(A, B); switch(B, A)` round-trip law
/// holds are modeled.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ContextFrame {
    pub instruction_pointer: usize,
    pub stack_pointer: usize,
    pub flags: u32,
}

/// Fixed-capacity FIFO mailbox used by the IPC primitive.
#[derive(Clone, Copy)]
pub struct Mailbox {
    slots: [u32; MAILBOX_CAPACITY],
    head: usize,
    len: usize,
}

impl Mailbox {
    const fn new() -> Self {
        Self {
            slots: [0; MAILBOX_CAPACITY],
            head: 0,
            len: 0,
        }
    }

    fn send(&mut self, message: u32) -> Result<(), KernelError> {
        if self.len == MAILBOX_CAPACITY {
            return Err(KernelError::MailboxFull);
        }
        let tail = (self.head + self.len) % MAILBOX_CAPACITY;
        self.slots[tail] = message;
        self.len += 1;
        Ok(())
    }

    fn receive(&mut self) -> Result<u32, KernelError> {
        if self.len == 0 {
            return Err(KernelError::NoMessage);
        }
        let message = self.slots[self.head];
        self.head = (self.head + 1) % MAILBOX_CAPACITY;
        self.len -= 1;
        Ok(message)
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// A short, fixed-capacity process name. Longer names are truncated at a
/// UTF-8 character boundary rather than rejected.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct ProcessName {
    bytes: [u8; MAX_NAME_LEN],
    len: u8,
}

impl ProcessName {
    #[must_use]
    pub fn new(name: &str) -> Self {
        let mut bytes = [0u8; MAX_NAME_LEN];
        let mut len = 0usize;
        for ch in name.chars() {
            let mut encode_buf = [0u8; 4];
            let encoded = ch.encode_utf8(&mut encode_buf);
            if len + encoded.len() > MAX_NAME_LEN {
                break;
            }
            bytes[len..len + encoded.len()].copy_from_slice(encoded.as_bytes());
            len += encoded.len();
        }
        Self {
            bytes,
            len: len as u8,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        core::str::from_utf8(&self.bytes[..usize::from(self.len)]).unwrap_or("")
    }
}

impl fmt::Debug for ProcessName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for ProcessName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A process control block.
#[derive(Clone, Copy)]
pub struct Pcb {
    pub pid: ProcessId,
    /// The process that was current when this one was created, or
    /// [`ProcessId::NONE`] if none was.
    pub parent: ProcessId,
    pub name: ProcessName,
    pub state: ProcessState,
    pub priority: Priority,
    pub base_priority: Priority,
    pub heap_addr: Option<usize>,
    pub stack_base: usize,
    pub context: ContextFrame,
    pub quantum: u32,
    pub remaining_quantum: u32,
    pub required_time: u32,
    pub elapsed_time: u32,
    /// The tick count at which this process was created.
    pub creation_tick: u64,
    /// Ticks waited in the ready queue since the last aging boost (or
    /// creation). Reset whenever the process is boosted or re-enters the
    /// ready queue.
    pub age: u32,
    /// Total ticks this process has ever spent waiting in the ready queue,
    /// accumulated over its whole lifetime. Never reset.
    pub wait_time: u32,
    pub(crate) mailbox: Mailbox,
    pub waiting_for_msg: bool,
    /// Tracks ready-queue membership independently of `state`, so dequeuing
    /// and a later `set_state` call never both try to unlink the same node.
    in_ready: bool,
    prev: Option<ProcessId>,
    next: Option<ProcessId>,
}

/// The process table: a fixed arena of PCBs plus the ready queue threaded
/// through them.
pub struct ProcessTable {
    slots: [Option<Pcb>; MAX_PROCESSES],
    next_pid: ProcessId,
    ready_head: Option<ProcessId>,
    ready_tail: Option<ProcessId>,
}

impl ProcessTable {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            slots: [None; MAX_PROCESSES],
            next_pid: ProcessId::new(1),
            ready_head: None,
            ready_tail: None,
        }
    }

    fn get(&self, pid: ProcessId) -> Option<&Pcb> {
        self.slots.iter().flatten().find(|pcb| pcb.pid == pid)
    }

    fn get_mut(&mut self, pid: ProcessId) -> Option<&mut Pcb> {
        self.slots.iter_mut().flatten().find(|pcb| pcb.pid == pid)
    }

    #[must_use]
    pub fn pcb(&self, pid: ProcessId) -> Option<&Pcb> {
        self.get(pid)
    }

    /// Iterate every live PCB, in table order (not ready-queue order).
    pub fn iter(&self) -> impl Iterator<Item = &Pcb> {
        self.slots.iter().flatten()
    }

    #[must_use]
    pub fn count(&self) -> usize {
        self.slots.iter().flatten().count()
    }

    #[must_use]
    pub fn ready_head(&self) -> Option<ProcessId> {
        self.ready_head
    }

    fn ready_insert(&mut self, pid: ProcessId) {
        let priority = self.get(pid).expect("pid must exist").priority;
        let mut cursor = self.ready_head;
        while let Some(node) = cursor {
            if self.get(node).expect("linked node must exist").priority < priority {
                break;
            }
            cursor = self.get(node).expect("linked node must exist").next;
        }

        match cursor {
            None => {
                let prev = self.ready_tail;
                if let Some(p) = prev {
                    self.get_mut(p).expect("tail must exist").next = Some(pid);
                } else {
                    self.ready_head = Some(pid);
                }
                let pcb = self.get_mut(pid).expect("pid must exist");
                pcb.prev = prev;
                pcb.next = None;
                pcb.in_ready = true;
                self.ready_tail = Some(pid);
            }
            Some(node) => {
                let prev = self.get(node).expect("node must exist").prev;
                {
                    let pcb = self.get_mut(pid).expect("pid must exist");
                    pcb.prev = prev;
                    pcb.next = Some(node);
                    pcb.in_ready = true;
                }
                self.get_mut(node).expect("node must exist").prev = Some(pid);
                match prev {
                    Some(p) => self.get_mut(p).expect("prev must exist").next = Some(pid),
                    None => self.ready_head = Some(pid),
                }
            }
        }
    }

    /// Unlink `pid` from the ready queue. A no-op if it is not currently
    /// linked in, so callers never need to track membership themselves.
    fn ready_remove(&mut self, pid: ProcessId) {
        let Some(pcb) = self.get(pid) else { return };
        if !pcb.in_ready {
            return;
        }
        let (prev, next) = (pcb.prev, pcb.next);
        match prev {
            Some(p) => self.get_mut(p).expect("prev must exist").next = next,
            None => self.ready_head = next,
        }
        match next {
            Some(n) => self.get_mut(n).expect("next must exist").prev = prev,
            None => self.ready_tail = prev,
        }
        let pcb = self.get_mut(pid).expect("pid must exist");
        pcb.prev = None;
        pcb.next = None;
        pcb.in_ready = false;
    }

    /// Pop the head of the ready queue.
    pub fn ready_dequeue(&mut self) -> Option<ProcessId> {
        let head = self.ready_head?;
        self.ready_remove(head);
        Some(head)
    }

    /// Create a new process. PIDs are only consumed on success: a rejected
    /// creation (table full) never burns a PID.
    ///
    /// `parent` is the creating process's PID ([`ProcessId::NONE`] if there
    /// was none) and `creation_tick` is the scheduler's current tick count,
    /// both recorded for display only.
    pub fn create(
        &mut self,
        name: &str,
        priority: Priority,
        quantum: u32,
        required_time: u32,
        stack_base: usize,
        heap_addr: Option<usize>,
        parent: ProcessId,
        creation_tick: u64,
    ) -> Result<ProcessId, KernelError> {
        let slot = self
            .slots
            .iter()
            .position(Option::is_none)
            .ok_or(KernelError::TableFull)?;

        let pid = self.next_pid;
        self.next_pid = self.next_pid.next();
        let quantum = clamp_quantum(quantum);

        self.slots[slot] = Some(Pcb {
            pid,
            parent,
            name: ProcessName::new(name),
            state: ProcessState::Ready,
            priority,
            base_priority: priority,
            heap_addr,
            stack_base,
            context: ContextFrame {
                instruction_pointer: 0,
                stack_pointer: StackTable::top_of(stack_base),
                flags: 0x202,
            },
            quantum,
            remaining_quantum: quantum,
            required_time,
            elapsed_time: 0,
            creation_tick,
            age: 0,
            wait_time: 0,
            mailbox: Mailbox::new(),
            waiting_for_msg: false,
            in_ready: false,
            prev: None,
            next: None,
        });
        self.ready_insert(pid);
        Ok(pid)
    }

    /// Remove a process entirely, returning the resources it held so the
    /// caller can release them from the heap and stack tables.
    pub fn reap(&mut self, pid: ProcessId) -> Result<(usize, Option<usize>), KernelError> {
        let slot = self
            .slots
            .iter()
            .position(|s| matches!(s, Some(pcb) if pcb.pid == pid))
            .ok_or(KernelError::UnknownProcess)?;

        self.ready_remove(pid);
        let pcb = self.slots[slot].take().expect("slot exists");
        Ok((pcb.stack_base, pcb.heap_addr))
    }

    /// Transition a process to a new state, maintaining ready-queue
    /// membership. A no-op if the process is already in `new_state`.
    pub fn set_state(&mut self, pid: ProcessId, new_state: ProcessState) -> Result<(), KernelError> {
        let old_state = self.get(pid).ok_or(KernelError::UnknownProcess)?.state;
        if old_state == new_state {
            return Ok(());
        }
        self.ready_remove(pid);
        self.get_mut(pid).ok_or(KernelError::UnknownProcess)?.state = new_state;
        if new_state == ProcessState::Ready {
            self.get_mut(pid).expect("pid must exist").age = 0;
            self.ready_insert(pid);
        }
        Ok(())
    }

    /// Raise a process's priority by one step (capped at `Critical`) and
    /// reposition it in the ready queue if it is currently waiting there.
    pub fn boost_priority(&mut self, pid: ProcessId) -> Result<(), KernelError> {
        let was_ready = self.get(pid).ok_or(KernelError::UnknownProcess)?.in_ready;
        self.ready_remove(pid);
        {
            let pcb = self.get_mut(pid).expect("pid must exist");
            pcb.priority = pcb.priority.boosted();
            pcb.age = 0;
        }
        if was_ready {
            self.ready_insert(pid);
        }
        Ok(())
    }

    /// Set a process's priority outright, repositioning it in the ready
    /// queue if necessary.
    pub fn set_priority(&mut self, pid: ProcessId, priority: Priority) -> Result<(), KernelError> {
        let was_ready = self.get(pid).ok_or(KernelError::UnknownProcess)?.in_ready;
        self.ready_remove(pid);
        self.get_mut(pid).expect("pid must exist").priority = priority;
        if was_ready {
            self.ready_insert(pid);
        }
        Ok(())
    }

    #[must_use]
    pub fn priority(&self, pid: ProcessId) -> Option<Priority> {
        self.get(pid).map(|pcb| pcb.priority)
    }

    #[must_use]
    pub fn context(&self, pid: ProcessId) -> Option<ContextFrame> {
        self.get(pid).map(|pcb| pcb.context)
    }

    pub fn save_context(&mut self, pid: ProcessId, frame: ContextFrame) -> Result<(), KernelError> {
        self.get_mut(pid).ok_or(KernelError::UnknownProcess)?.context = frame;
        Ok(())
    }

    pub fn reset_quantum(&mut self, pid: ProcessId) -> Result<(), KernelError> {
        let pcb = self.get_mut(pid).ok_or(KernelError::UnknownProcess)?;
        pcb.remaining_quantum = pcb.quantum;
        Ok(())
    }

    /// Account one tick of execution time against the current process.
    pub fn tick_current(&mut self, pid: ProcessId) -> Result<(), KernelError> {
        let pcb = self.get_mut(pid).ok_or(KernelError::UnknownProcess)?;
        pcb.elapsed_time = pcb.elapsed_time.saturating_add(1);
        pcb.remaining_quantum = pcb.remaining_quantum.saturating_sub(1);
        Ok(())
    }

    /// A `required_time` of zero means the process never completes on its
    /// own and must be explicitly terminated.
    #[must_use]
    pub fn is_complete(&self, pid: ProcessId) -> Option<bool> {
        self.get(pid)
            .map(|pcb| pcb.required_time != 0 && pcb.elapsed_time >= pcb.required_time)
    }

    #[must_use]
    pub fn quantum_expired(&self, pid: ProcessId) -> Option<bool> {
        self.get(pid).map(|pcb| pcb.remaining_quantum == 0)
    }

    /// Increment the age and cumulative wait time of every process
    /// currently sitting in the ready queue. Called once per scheduler
    /// tick. `age` resets on boost or re-entry to the ready queue;
    /// `wait_time` is a lifetime total and is never reset.
    pub fn increment_ready_wait(&mut self) {
        let mut cursor = self.ready_head;
        while let Some(pid) = cursor {
            cursor = self.get(pid).expect("linked node must exist").next;
            let pcb = self.get_mut(pid).expect("linked node must exist");
            pcb.age += 1;
            pcb.wait_time += 1;
        }
    }

    /// Boost every ready process whose `age` has reached `threshold`,
    /// skipping those already at `Critical`. Returns the number of
    /// processes boosted.
    pub fn run_aging(&mut self, threshold: u32) -> usize {
        let mut members = [ProcessId::NONE; MAX_PROCESSES];
        let mut count = 0;
        let mut cursor = self.ready_head;
        while let Some(pid) = cursor {
            members[count] = pid;
            count += 1;
            cursor = self.get(pid).expect("linked node must exist").next;
        }

        let mut boosted = 0;
        for &pid in &members[..count] {
            let eligible = self
                .get(pid)
                .is_some_and(|pcb| pcb.age >= threshold && !pcb.priority.is_critical());
            if eligible {
                let _ = self.boost_priority(pid);
                boosted += 1;
            }
        }
        boosted
    }

    /// Deliver a message to `target`'s mailbox, waking it if it was
    /// blocked waiting for one.
    pub fn send(&mut self, target: ProcessId, message: u32) -> Result<(), KernelError> {
        {
            let pcb = self.get_mut(target).ok_or(KernelError::UnknownProcess)?;
            pcb.mailbox.send(message)?;
        }
        let was_waiting = self.get(target).expect("pid must exist").waiting_for_msg;
        if was_waiting {
            self.get_mut(target).expect("pid must exist").waiting_for_msg = false;
            self.set_state(target, ProcessState::Ready)?;
        }
        Ok(())
    }

    /// Take the next message out of `pid`'s mailbox. If empty, `pid` is
    /// transitioned to `Blocked` and `NoMessage` is returned.
    pub fn receive(&mut self, pid: ProcessId) -> Result<u32, KernelError> {
        let result = self
            .get_mut(pid)
            .ok_or(KernelError::UnknownProcess)?
            .mailbox
            .receive();

        match result {
            Ok(message) => Ok(message),
            Err(KernelError::NoMessage) => {
                self.get_mut(pid).expect("pid must exist").waiting_for_msg = true;
                self.set_state(pid, ProcessState::Blocked)?;
                Err(KernelError::NoMessage)
            }
            Err(other) => Err(other),
        }
    }

    #[must_use]
    pub fn has_message(&self, pid: ProcessId) -> Option<bool> {
        self.get(pid).map(|pcb| !pcb.mailbox.is_empty())
    }
}

impl Default for ProcessTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table_with(n: usize, priority: Priority) -> (ProcessTable, [ProcessId; 8]) {
        let mut table = ProcessTable::new();
        let mut pids = [ProcessId::NONE; 8];
        for (i, pid) in pids.iter_mut().enumerate().take(n) {
            *pid = table
                .create("p", priority, 100, 0, 0x1000 * i, None, ProcessId::NONE, 0)
                .unwrap();
        }
        (table, pids)
    }

    #[test]
    fn ready_queue_is_fifo_within_equal_priority() {
        let (mut table, pids) = table_with(3, Priority::Normal);
        assert_eq!(table.ready_dequeue(), Some(pids[0]));
        assert_eq!(table.ready_dequeue(), Some(pids[1]));
        assert_eq!(table.ready_dequeue(), Some(pids[2]));
        assert_eq!(table.ready_dequeue(), None);
    }

    #[test]
    fn ready_queue_orders_by_priority_descending() {
        let mut table = ProcessTable::new();
        let low = table
            .create("low", Priority::Low, 100, 0, 0, None, ProcessId::NONE, 0)
            .unwrap();
        let high = table
            .create("high", Priority::High, 100, 0, 0, None, ProcessId::NONE, 0)
            .unwrap();
        let normal = table
            .create("normal", Priority::Normal, 100, 0, 0, None, ProcessId::NONE, 0)
            .unwrap();

        assert_eq!(table.ready_dequeue(), Some(high));
        assert_eq!(table.ready_dequeue(), Some(normal));
        assert_eq!(table.ready_dequeue(), Some(low));
    }

    #[test]
    fn table_full_does_not_burn_a_pid() {
        let mut table = ProcessTable::new();
        for _ in 0..MAX_PROCESSES {
            table
                .create("p", Priority::Normal, 100, 0, 0, None, ProcessId::NONE, 0)
                .unwrap();
        }
        assert_eq!(
            table.create("overflow", Priority::Normal, 100, 0, 0, None, ProcessId::NONE, 0),
            Err(KernelError::TableFull)
        );

        table.reap(ProcessId::new(1)).unwrap();
        let recycled = table
            .create("p", Priority::Normal, 100, 0, 0, None, ProcessId::NONE, 0)
            .unwrap();
        assert_eq!(recycled, ProcessId::new(u32::try_from(MAX_PROCESSES).unwrap() + 1));
    }

    #[test]
    fn boost_repositions_in_ready_queue() {
        let mut table = ProcessTable::new();
        let a = table
            .create("a", Priority::Low, 100, 0, 0, None, ProcessId::NONE, 0)
            .unwrap();
        let b = table
            .create("b", Priority::High, 100, 0, 0, None, ProcessId::NONE, 0)
            .unwrap();

        assert_eq!(table.ready_head(), Some(b));
        table.boost_priority(a).unwrap();
        table.boost_priority(a).unwrap();
        assert_eq!(table.priority(a), Some(Priority::High));
        // a was boosted after b arrived, so b (FIFO) still leads.
        assert_eq!(table.ready_head(), Some(b));
    }

    #[test]
    fn boost_never_exceeds_critical() {
        let mut table = ProcessTable::new();
        let pid = table
            .create("p", Priority::Critical, 100, 0, 0, None, ProcessId::NONE, 0)
            .unwrap();
        for _ in 0..5 {
            table.boost_priority(pid).unwrap();
        }
        assert_eq!(table.priority(pid), Some(Priority::Critical));
    }

    #[test]
    fn ipc_send_to_blocked_receiver_unblocks_it() {
        let mut table = ProcessTable::new();
        let pid = table
            .create("p", Priority::Normal, 100, 0, 0, None, ProcessId::NONE, 0)
            .unwrap();
        table.ready_dequeue();
        assert_eq!(table.receive(pid), Err(KernelError::NoMessage));
        assert_eq!(table.get(pid).unwrap().state, ProcessState::Blocked);

        table.send(pid, 42).unwrap();
        assert_eq!(table.get(pid).unwrap().state, ProcessState::Ready);
        assert_eq!(table.receive(pid), Ok(42));
    }

    #[test]
    fn mailbox_full_is_reported() {
        let mut table = ProcessTable::new();
        let pid = table
            .create("p", Priority::Normal, 100, 0, 0, None, ProcessId::NONE, 0)
            .unwrap();
        for i in 0..MAILBOX_CAPACITY as u32 {
            table.send(pid, i).unwrap();
        }
        assert_eq!(table.send(pid, 99), Err(KernelError::MailboxFull));
    }

    #[test]
    fn aging_boosts_long_waiters_only() {
        let mut table = ProcessTable::new();
        let waiter = table
            .create("waiter", Priority::Low, 100, 0, 0, None, ProcessId::NONE, 0)
            .unwrap();
        for _ in 0..10 {
            table.increment_ready_wait();
        }
        let fresh = table
            .create("fresh", Priority::Low, 100, 0, 0, None, ProcessId::NONE, 0)
            .unwrap();

        let boosted = table.run_aging(10);
        assert_eq!(boosted, 1);
        assert_eq!(table.priority(waiter), Some(Priority::Normal));
        assert_eq!(table.priority(fresh), Some(Priority::Low));
        // Boosting resets age but the lifetime wait_time total survives.
        assert_eq!(table.get(waiter).unwrap().age, 0);
        assert_eq!(table.get(waiter).unwrap().wait_time, 10);
    }

    #[test]
    fn creation_records_parent_and_tick_and_synthesizes_a_context() {
        let mut table = ProcessTable::new();
        let parent = table
            .create("shell", Priority::Normal, 100, 0, 0, None, ProcessId::NONE, 0)
            .unwrap();
        let child = table
            .create("worker", Priority::Normal, 100, 0, 0x4000, None, parent, 42)
            .unwrap();

        let pcb = table.pcb(child).unwrap();
        assert_eq!(pcb.parent, parent);
        assert_eq!(pcb.creation_tick, 42);
        assert_eq!(pcb.context.stack_pointer, StackTable::top_of(0x4000));
        assert_eq!(pcb.context.flags, 0x202);
    }

    #[test]
    fn unknown_process_operations_fail_cleanly() {
        let mut table = ProcessTable::new();
        let bogus = ProcessId::new(999);
        assert_eq!(
            table.set_state(bogus, ProcessState::Ready),
            Err(KernelError::UnknownProcess)
        );
        assert_eq!(table.reap(bogus), Err(KernelError::UnknownProcess));
    }
}
