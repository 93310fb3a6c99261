// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 The Priorikern Authors

//! Preemptive priority scheduler.
//!
//! All four [`SchedulingPolicy`] variants currently dequeue the head of the
//! same priority-ordered ready queue maintained by [`ProcessTable`]. That is
//! a deliberate simplification carried over from the spec this module
//! implements: `RoundRobin` and `Fcfs` are "priority-blind" only in the
//! sense that they do not themselves reorder the queue, but since the queue
//! is always priority-ordered they still favor higher-priority processes.
//! A true FCFS or round-robin policy would need its own queue discipline;
//! that is out of scope here.

use kernel_abi::{ProcessId, ProcessState, SchedulingPolicy, AGING_BOOST_INTERVAL, AGING_THRESHOLD, DEFAULT_QUANTUM, KernelError};

use crate::process::{ContextFrame, ProcessTable};

/// Tunable scheduler parameters, settable at runtime via `schedconf`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SchedulerConfig {
    pub policy: SchedulingPolicy,
    pub default_quantum: u32,
    pub aging_threshold: u32,
    pub aging_boost_interval: u32,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            policy: SchedulingPolicy::PriorityRoundRobin,
            default_quantum: DEFAULT_QUANTUM,
            aging_threshold: AGING_THRESHOLD,
            aging_boost_interval: AGING_BOOST_INTERVAL,
        }
    }
}

/// Running totals surfaced by the `schedstats` command.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SchedulerStats {
    pub total_ticks: u64,
    pub idle_ticks: u64,
    pub context_switches: u64,
    pub preemptions: u64,
    pub voluntary_yields: u64,
    pub processes_completed: u64,
    pub aging_boosts: u64,
}

/// What happened on a single call to [`Scheduler::tick`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TickOutcome {
    /// No process is running and none was ready to dispatch.
    Idle,
    /// A process was dispatched onto an otherwise-idle CPU.
    Dispatched(ProcessId),
    /// The current process kept running; nothing warranted a dispatch
    /// decision this tick.
    Running(ProcessId),
    /// The running process's quantum expired; it went back to the ready
    /// queue and another process (possibly the same one) was dispatched.
    Preempted(ProcessId),
    /// The running process reached its required execution time and was
    /// torn down. Carries the resources the caller must release.
    Completed {
        pid: ProcessId,
        stack_base: usize,
        heap_addr: Option<usize>,
    },
}

/// A single physical register file, standing in for real CPU state.
///
/// Context switches save the outgoing process's frame into its PCB and
/// load the incoming one into this struct. Because there is exactly one
/// `Cpu` and exactly one save slot per process, `switch(a, b)` followed by
/// `switch(b, a)` always restores the original frames bit for bit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Cpu {
    frame: ContextFrame,
}

impl Cpu {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            frame: ContextFrame {
                instruction_pointer: 0,
                stack_pointer: 0,
                flags: 0,
            },
        }
    }

    #[must_use]
    pub const fn frame(&self) -> ContextFrame {
        self.frame
    }

    /// Save the currently-loaded frame into `outgoing`, then load `incoming`.
    pub fn switch(&mut self, outgoing: &mut ContextFrame, incoming: ContextFrame) {
        *outgoing = self.frame;
        self.frame = incoming;
    }
}

impl Default for Cpu {
    fn default() -> Self {
        Self::new()
    }
}

/// The scheduler itself: policy, bookkeeping, and the single CPU.
pub struct Scheduler {
    config: SchedulerConfig,
    stats: SchedulerStats,
    current: Option<ProcessId>,
    cpu: Cpu,
    ticks_since_aging: u32,
}

impl Scheduler {
    #[must_use]
    pub fn new(config: SchedulerConfig) -> Self {
        Self {
            config,
            stats: SchedulerStats::default(),
            current: None,
            cpu: Cpu::new(),
            ticks_since_aging: 0,
        }
    }

    #[must_use]
    pub const fn config(&self) -> SchedulerConfig {
        self.config
    }

    pub fn set_config(&mut self, config: SchedulerConfig) {
        self.config = config;
    }

    #[must_use]
    pub const fn stats(&self) -> SchedulerStats {
        self.stats
    }

    pub fn reset_stats(&mut self) {
        self.stats = SchedulerStats::default();
    }

    #[must_use]
    pub const fn current(&self) -> Option<ProcessId> {
        self.current
    }

    /// Vacate the CPU without going through the usual save-and-requeue
    /// dance. Used only when the current process is about to be destroyed
    /// outright, so there is no point saving a context or re-inserting it
    /// into the ready queue for the instant before its PCB is freed.
    pub fn vacate_current(&mut self) -> Option<ProcessId> {
        self.current.take()
    }

    /// The dispatch algorithm: demote whatever is `Current` back to `Ready`,
    /// then select and dispatch the new head of the ready queue. Selecting
    /// the same process that was already running is permitted - it still
    /// counts as a dispatch decision, but no context switch is performed
    /// and `context_switches` is not incremented.
    pub fn schedule(&mut self, processes: &mut ProcessTable) -> Result<Option<ProcessId>, KernelError> {
        let previous = self.current.take();
        if let Some(prev) = previous {
            processes.set_state(prev, ProcessState::Ready)?;
        }

        let Some(next) = processes.ready_dequeue() else {
            return Ok(None);
        };

        processes.set_state(next, ProcessState::Current)?;
        processes.reset_quantum(next)?;
        self.current = Some(next);

        if previous == Some(next) {
            return Ok(Some(next));
        }

        let incoming = processes.context(next).ok_or(KernelError::UnknownProcess)?;
        let mut outgoing = ContextFrame::default();
        self.cpu.switch(&mut outgoing, incoming);
        if let Some(prev) = previous {
            processes.save_context(prev, outgoing)?;
        }
        self.stats.context_switches += 1;
        Ok(Some(next))
    }

    /// Voluntarily give up the CPU: counts separately from a forced
    /// preemption, then runs the ordinary dispatch algorithm.
    pub fn yield_now(&mut self, processes: &mut ProcessTable) -> Result<Option<ProcessId>, KernelError> {
        self.stats.voluntary_yields += 1;
        self.schedule(processes)
    }

    /// If a higher-priority process is waiting and something lower is
    /// running, preempt immediately instead of waiting for quantum expiry.
    pub fn maybe_preempt(&mut self, processes: &mut ProcessTable) -> Result<bool, KernelError> {
        let Some(current) = self.current else {
            return self.schedule(processes).map(|dispatched| dispatched.is_some());
        };
        let Some(head) = processes.ready_head() else {
            return Ok(false);
        };
        let current_priority = processes.priority(current).ok_or(KernelError::UnknownProcess)?;
        let head_priority = processes.priority(head).ok_or(KernelError::UnknownProcess)?;
        if head_priority > current_priority {
            self.stats.preemptions += 1;
            self.schedule(processes)?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    /// Explicit, REPL-triggerable aging pass (as opposed to the automatic
    /// one `tick` runs every `aging_boost_interval` ticks).
    pub fn age_processes(&mut self, processes: &mut ProcessTable) -> u64 {
        let boosted = processes.run_aging(self.config.aging_threshold) as u64;
        self.stats.aging_boosts += boosted;
        boosted
    }

    /// Advance the clock by one tick.
    pub fn tick(&mut self, processes: &mut ProcessTable) -> Result<TickOutcome, KernelError> {
        self.stats.total_ticks += 1;
        processes.increment_ready_wait();

        self.ticks_since_aging += 1;
        if self.ticks_since_aging >= self.config.aging_boost_interval {
            self.ticks_since_aging = 0;
            self.age_processes(processes);
        }

        let Some(pid) = self.current else {
            self.stats.idle_ticks += 1;
            return Ok(match self.schedule(processes)? {
                Some(next) => TickOutcome::Dispatched(next),
                None => TickOutcome::Idle,
            });
        };

        processes.tick_current(pid)?;

        if processes.is_complete(pid).ok_or(KernelError::UnknownProcess)? {
            processes.set_state(pid, ProcessState::Terminated)?;
            let (stack_base, heap_addr) = processes.reap(pid)?;
            self.stats.processes_completed += 1;
            self.current = None;
            self.schedule(processes)?;
            return Ok(TickOutcome::Completed {
                pid,
                stack_base,
                heap_addr,
            });
        }

        if processes.quantum_expired(pid).ok_or(KernelError::UnknownProcess)? {
            self.stats.preemptions += 1;
            self.schedule(processes)?;
            return Ok(TickOutcome::Preempted(pid));
        }

        Ok(TickOutcome::Running(pid))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kernel_abi::Priority;

    fn fresh() -> (Scheduler, ProcessTable) {
        (Scheduler::new(SchedulerConfig::default()), ProcessTable::new())
    }

    #[test]
    fn schedule_dispatches_ready_head() {
        let (mut sched, mut processes) = fresh();
        let pid = processes.create("p", Priority::Normal, 100, 0, 0, None, ProcessId::NONE, 0).unwrap();
        assert_eq!(sched.schedule(&mut processes).unwrap(), Some(pid));
        assert_eq!(sched.current(), Some(pid));
        assert_eq!(sched.stats().context_switches, 1);
    }

    #[test]
    fn redundant_schedule_reselects_same_process_without_a_real_switch() {
        let (mut sched, mut processes) = fresh();
        let pid = processes.create("p", Priority::Normal, 100, 0, 0, None, ProcessId::NONE, 0).unwrap();
        sched.schedule(&mut processes).unwrap();
        assert_eq!(sched.stats().context_switches, 1);

        // Nothing else is ready, so re-running the dispatch algorithm just
        // puts the same process back on the CPU - a dispatch, but not a
        // real context switch.
        sched.schedule(&mut processes).unwrap();
        assert_eq!(sched.current(), Some(pid));
        assert_eq!(sched.stats().context_switches, 1);
    }

    #[test]
    fn schedule_yields_to_a_waiting_process_of_equal_priority() {
        let (mut sched, mut processes) = fresh();
        let a = processes.create("a", Priority::Normal, 100, 0, 0, None, ProcessId::NONE, 0).unwrap();
        let b = processes.create("b", Priority::Normal, 100, 0, 0, None, ProcessId::NONE, 0).unwrap();
        sched.schedule(&mut processes).unwrap();
        assert_eq!(sched.current(), Some(a));

        // The dispatch algorithm always demotes the outgoing current process
        // before reselecting, so a competing ready process takes over.
        sched.schedule(&mut processes).unwrap();
        assert_eq!(sched.current(), Some(b));
        assert_eq!(sched.stats().context_switches, 2);
    }

    #[test]
    fn voluntary_yield_has_its_own_counter() {
        let (mut sched, mut processes) = fresh();
        let pid = processes.create("p", Priority::Normal, 100, 0, 0, None, ProcessId::NONE, 0).unwrap();
        sched.schedule(&mut processes).unwrap();

        sched.yield_now(&mut processes).unwrap();
        assert_eq!(sched.stats().voluntary_yields, 1);
        assert_eq!(sched.stats().preemptions, 0);
        // Nothing else is ready, so the process resumes immediately.
        assert_eq!(sched.current(), Some(pid));
    }

    #[test]
    fn idle_ticks_are_counted_when_nothing_is_ready() {
        let (mut sched, mut processes) = fresh();
        assert_eq!(sched.tick(&mut processes).unwrap(), TickOutcome::Idle);
        assert_eq!(sched.tick(&mut processes).unwrap(), TickOutcome::Idle);
        assert_eq!(sched.stats().idle_ticks, 2);
        assert_eq!(sched.stats().total_ticks, 2);
    }

    #[test]
    fn cpu_switch_round_trip_preserves_context() {
        let mut cpu = Cpu::new();
        let frame_a = ContextFrame {
            instruction_pointer: 0x1000,
            stack_pointer: 0x2000,
            flags: 1,
        };
        let frame_b = ContextFrame {
            instruction_pointer: 0x3000,
            stack_pointer: 0x4000,
            flags: 2,
        };

        let mut discard = ContextFrame::default();
        cpu.switch(&mut discard, frame_a);

        let mut saved_a = ContextFrame::default();
        cpu.switch(&mut saved_a, frame_b);
        assert_eq!(saved_a, frame_a);

        let mut saved_b = ContextFrame::default();
        cpu.switch(&mut saved_b, saved_a);
        assert_eq!(saved_b, frame_b);
        assert_eq!(cpu.frame(), frame_a);
    }

    #[test]
    fn higher_priority_arrival_preempts_current() {
        let (mut sched, mut processes) = fresh();
        let low = processes.create("low", Priority::Low, 100, 0, 0, None, ProcessId::NONE, 0).unwrap();
        sched.schedule(&mut processes).unwrap();
        assert_eq!(sched.current(), Some(low));

        let high = processes.create("high", Priority::High, 100, 0, 0, None, ProcessId::NONE, 0).unwrap();
        let preempted = sched.maybe_preempt(&mut processes).unwrap();
        assert!(preempted);
        assert_eq!(sched.current(), Some(high));
    }

    #[test]
    fn quantum_expiry_preempts_and_requeues() {
        let (mut sched, mut processes) = fresh();
        let pid = processes.create("p", Priority::Normal, 2, 0, 0, None, ProcessId::NONE, 0).unwrap();
        sched.schedule(&mut processes).unwrap();

        sched.tick(&mut processes).unwrap();
        let outcome = sched.tick(&mut processes).unwrap();
        assert_eq!(outcome, TickOutcome::Preempted(pid));
        // Requeued and immediately redispatched since nothing else is ready.
        assert_eq!(sched.current(), Some(pid));
    }

    #[test]
    fn required_time_reached_terminates_process() {
        let (mut sched, mut processes) = fresh();
        let pid = processes.create("p", Priority::Normal, 100, 3, 0x1000, Some(0x2000), ProcessId::NONE, 0).unwrap();
        sched.schedule(&mut processes).unwrap();

        sched.tick(&mut processes).unwrap();
        sched.tick(&mut processes).unwrap();
        let outcome = sched.tick(&mut processes).unwrap();
        assert_eq!(
            outcome,
            TickOutcome::Completed {
                pid,
                stack_base: 0x1000,
                heap_addr: Some(0x2000)
            }
        );
        assert_eq!(sched.current(), None);
        assert_eq!(sched.stats().processes_completed, 1);
    }

    #[test]
    fn zero_required_time_never_completes() {
        let (mut sched, mut processes) = fresh();
        let pid = processes.create("p", Priority::Normal, 50, 0, 0, None, ProcessId::NONE, 0).unwrap();
        sched.schedule(&mut processes).unwrap();
        for _ in 0..200 {
            sched.tick(&mut processes).unwrap();
        }
        assert_eq!(sched.current(), Some(pid));
    }

    #[test]
    fn aging_eventually_boosts_starved_process() {
        let (mut sched, mut processes) = fresh();
        let running = processes.create("running", Priority::Critical, 10_000, 0, 0, None, ProcessId::NONE, 0).unwrap();
        sched.schedule(&mut processes).unwrap();
        assert_eq!(sched.current(), Some(running));

        let starved = processes.create("starved", Priority::Low, 100, 0, 0, None, ProcessId::NONE, 0).unwrap();
        let threshold = sched.config().aging_threshold;
        let interval = sched.config().aging_boost_interval;
        let ticks_needed = u64::from(threshold.max(interval)) + u64::from(interval) + 1;
        for _ in 0..ticks_needed {
            sched.tick(&mut processes).unwrap();
        }
        assert!(processes.priority(starved).unwrap() > Priority::Low);
    }
}
