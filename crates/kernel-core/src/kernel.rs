// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 The Priorikern Authors

//! Top-level facade wiring the heap, stack table, process table and
//! scheduler together into the single entry point `kernel-repl` drives.

use kernel_abi::{KernelError, Priority, ProcessId, ProcessState};

use crate::heap::{Heap, HeapStats};
use crate::log::{Diagnostic, DiagnosticLog};
use crate::process::{Pcb, ProcessName, ProcessTable};
use crate::scheduler::{Scheduler, SchedulerConfig, SchedulerStats, TickOutcome};
use crate::stack::StackTable;

/// A read-only snapshot of one process, shaped for the `ps`/`info` commands.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProcessInfo {
    pub pid: ProcessId,
    pub parent: ProcessId,
    pub name: ProcessName,
    pub state: ProcessState,
    pub priority: Priority,
    pub remaining_quantum: u32,
    pub required_time: u32,
    pub elapsed_time: u32,
    pub creation_tick: u64,
    pub age: u32,
    pub wait_time: u32,
}

impl ProcessInfo {
    fn from_pcb(pcb: &Pcb) -> Self {
        Self {
            pid: pcb.pid,
            parent: pcb.parent,
            name: pcb.name,
            state: pcb.state,
            priority: pcb.priority,
            remaining_quantum: pcb.remaining_quantum,
            required_time: pcb.required_time,
            elapsed_time: pcb.elapsed_time,
            creation_tick: pcb.creation_tick,
            age: pcb.age,
            wait_time: pcb.wait_time,
        }
    }
}

/// The whole kernel core: memory, processes, and the scheduler that ties
/// them together.
pub struct Kernel {
    heap: Heap,
    stacks: StackTable,
    processes: ProcessTable,
    scheduler: Scheduler,
    diagnostics: DiagnosticLog,
}

impl Kernel {
    #[must_use]
    pub fn new(config: SchedulerConfig) -> Self {
        Self {
            heap: Heap::new(),
            stacks: StackTable::new(),
            processes: ProcessTable::new(),
            scheduler: Scheduler::new(config),
            diagnostics: DiagnosticLog::new(),
        }
    }

    /// Create a process: reserve a stack slot, a symbolic heap allocation
    /// for its PCB bookkeeping, and a process-table entry, then let a newly
    /// arrived high-priority process preempt immediately if warranted.
    pub fn create_process(
        &mut self,
        name: &str,
        priority: Priority,
        quantum: u32,
        required_time: u32,
    ) -> Result<ProcessId, KernelError> {
        let stack_base = self.stacks.allocate().map_err(|e| {
            self.diagnostics.push(Diagnostic::Memory(e));
            e
        })?;

        let heap_addr = match self.heap.allocate(PCB_BOOKKEEPING_SIZE) {
            Ok(addr) => Some(addr),
            Err(e) => {
                self.diagnostics.push(Diagnostic::Memory(e));
                let _ = self.stacks.free(stack_base);
                return Err(e);
            }
        };

        let parent = self.scheduler.current().unwrap_or(ProcessId::NONE);
        let creation_tick = self.scheduler.stats().total_ticks;
        let pid = match self.processes.create(
            name,
            priority,
            quantum,
            required_time,
            stack_base,
            heap_addr,
            parent,
            creation_tick,
        ) {
            Ok(pid) => pid,
            Err(e) => {
                self.diagnostics.push(Diagnostic::Process(e, ProcessId::NONE));
                let _ = self.heap.free(heap_addr);
                let _ = self.stacks.free(stack_base);
                return Err(e);
            }
        };

        let _ = self.scheduler.maybe_preempt(&mut self.processes);
        Ok(pid)
    }

    /// Tear down a process outright, reclaiming its stack slot and heap
    /// bookkeeping allocation.
    pub fn terminate_process(&mut self, pid: ProcessId) -> Result<(), KernelError> {
        if self.scheduler.current() == Some(pid) {
            self.scheduler.vacate_current();
        }
        match self.processes.reap(pid) {
            Ok((stack_base, heap_addr)) => {
                let _ = self.stacks.free(stack_base);
                let _ = self.heap.free(heap_addr);
                if self.scheduler.current().is_none() {
                    let _ = self.scheduler.schedule(&mut self.processes);
                }
                Ok(())
            }
            Err(e) => {
                self.diagnostics.push(Diagnostic::Process(e, pid));
                Err(e)
            }
        }
    }

    pub fn set_priority(&mut self, pid: ProcessId, priority: Priority) -> Result<(), KernelError> {
        self.processes.set_priority(pid, priority).inspect_err(|&e| {
            self.diagnostics.push(Diagnostic::Process(e, pid));
        })?;
        let _ = self.scheduler.maybe_preempt(&mut self.processes);
        Ok(())
    }

    /// Advance the clock by one tick. Runs the scheduler and frees any
    /// resources a just-completed process held.
    pub fn tick(&mut self) -> Result<TickOutcome, KernelError> {
        let outcome = self.scheduler.tick(&mut self.processes)?;
        if let TickOutcome::Completed {
            stack_base,
            heap_addr,
            ..
        } = outcome
        {
            let _ = self.stacks.free(stack_base);
            let _ = self.heap.free(heap_addr);
        }
        Ok(outcome)
    }

    /// Advance the clock by `count` ticks, collecting each outcome.
    pub fn run_ticks(&mut self, count: u32, mut on_outcome: impl FnMut(TickOutcome)) -> Result<(), KernelError> {
        for _ in 0..count {
            let outcome = self.tick()?;
            on_outcome(outcome);
        }
        Ok(())
    }

    pub fn send_message(&mut self, target: ProcessId, message: u32) -> Result<(), KernelError> {
        self.processes.send(target, message).inspect_err(|&e| {
            self.diagnostics.push(Diagnostic::Process(e, target));
        })?;
        let _ = self.scheduler.maybe_preempt(&mut self.processes);
        Ok(())
    }

    pub fn receive_message(&mut self, pid: ProcessId) -> Result<u32, KernelError> {
        self.processes.receive(pid).inspect_err(|&e| {
            if e != KernelError::NoMessage {
                self.diagnostics.push(Diagnostic::Process(e, pid));
            }
        })
    }

    #[must_use]
    pub fn process_info(&self, pid: ProcessId) -> Option<ProcessInfo> {
        self.processes.pcb(pid).map(ProcessInfo::from_pcb)
    }

    pub fn process_list(&self) -> impl Iterator<Item = ProcessInfo> + '_ {
        self.processes.iter().map(ProcessInfo::from_pcb)
    }

    #[must_use]
    pub fn heap_stats(&self) -> HeapStats {
        self.heap.stats()
    }

    #[must_use]
    pub const fn scheduler_stats(&self) -> SchedulerStats {
        self.scheduler.stats()
    }

    pub fn reset_scheduler_stats(&mut self) {
        self.scheduler.reset_stats();
    }

    #[must_use]
    pub const fn scheduler_config(&self) -> SchedulerConfig {
        self.scheduler.config()
    }

    pub fn set_scheduler_config(&mut self, config: SchedulerConfig) {
        self.scheduler.set_config(config);
    }

    #[must_use]
    pub const fn current_process(&self) -> Option<ProcessId> {
        self.scheduler.current()
    }

    pub fn diagnostics(&self) -> impl Iterator<Item = Diagnostic> + '_ {
        self.diagnostics.iter()
    }

    pub fn clear_diagnostics(&mut self) {
        self.diagnostics.clear();
    }
}

/// Symbolic size charged against the heap for a process's own bookkeeping
/// allocation. Mirrors the original kernel charging `sizeof(pcb_t)` against
/// the arena for each created process.
const PCB_BOOKKEEPING_SIZE: usize = 128;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_and_terminate_releases_resources() {
        let mut kernel = Kernel::new(SchedulerConfig::default());
        let before = kernel.heap_stats();
        let pid = kernel
            .create_process("worker", Priority::Normal, 100, 0)
            .unwrap();
        assert!(kernel.heap_stats().used > before.used);

        kernel.terminate_process(pid).unwrap();
        assert_eq!(kernel.heap_stats().used, before.used);
        assert!(kernel.process_info(pid).is_none());
    }

    #[test]
    fn terminating_current_process_reschedules() {
        let mut kernel = Kernel::new(SchedulerConfig::default());
        let a = kernel.create_process("a", Priority::Normal, 100, 0).unwrap();
        let b = kernel.create_process("b", Priority::Normal, 100, 0).unwrap();
        assert_eq!(kernel.current_process(), Some(a));

        kernel.terminate_process(a).unwrap();
        assert_eq!(kernel.current_process(), Some(b));
    }

    #[test]
    fn terminate_unknown_process_reports_diagnostic() {
        let mut kernel = Kernel::new(SchedulerConfig::default());
        let bogus = ProcessId::new(999);
        assert_eq!(kernel.terminate_process(bogus), Err(KernelError::UnknownProcess));
        assert_eq!(kernel.diagnostics().count(), 1);
    }

    #[test]
    fn ipc_round_trip_through_kernel() {
        let mut kernel = Kernel::new(SchedulerConfig::default());
        let sender = kernel.create_process("sender", Priority::Normal, 100, 0).unwrap();
        let receiver = kernel.create_process("receiver", Priority::Normal, 100, 0).unwrap();

        assert_eq!(kernel.receive_message(receiver), Err(KernelError::NoMessage));
        kernel.send_message(receiver, 7).unwrap();
        assert_eq!(kernel.receive_message(receiver), Ok(7));
        let _ = sender;
    }

    #[test]
    fn running_out_of_stacks_surfaces_stack_exhausted() {
        let mut kernel = Kernel::new(SchedulerConfig::default());
        let mut last = Ok(ProcessId::NONE);
        for _ in 0..64 {
            last = kernel.create_process("p", Priority::Normal, 100, 0);
            if last.is_err() {
                break;
            }
        }
        assert_eq!(last, Err(KernelError::StackExhausted));
    }
}
