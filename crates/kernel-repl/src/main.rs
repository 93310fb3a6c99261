// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 The Priorikern Authors

//! Interactive shell for the Priorikern scheduler core.
//!
//! Mirrors the read-eval-print structure of the kernel's bare-metal Lonala
//! REPL, but reads from standard input instead of a UART: this kernel is an
//! accounting model meant to be driven and inspected from a host, not code
//! meant to run on the target it simulates.

mod commands;

use std::io::{self, BufRead, Write};

use kernel_abi::{KernelError, ProcessId};
use kernel_core::{Kernel, SchedulerConfig, TickOutcome};

use commands::{Command, ParseError, SchedConfUpdate};

fn main() {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut kernel = Kernel::new(SchedulerConfig::default());

    println!("priorikern shell - type 'help' for commands");

    loop {
        print!("kernel> ");
        let _ = stdout.flush();

        let mut line = String::new();
        match stdin.lock().read_line(&mut line) {
            Ok(0) => break, // EOF
            Ok(_) => {}
            Err(err) => {
                eprintln!("error: failed to read input: {err}");
                break;
            }
        }

        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match commands::parse(line) {
            Ok(Command::Quit) => break,
            Ok(command) => execute(&mut kernel, command),
            Err(ParseError::Empty) => {}
            Err(err) => println!("error: {err}"),
        }

        drain_diagnostics(&mut kernel);
    }
}

fn drain_diagnostics(kernel: &mut Kernel) {
    for diag in kernel.diagnostics() {
        println!("{diag}");
    }
    kernel.clear_diagnostics();
}

fn execute(kernel: &mut Kernel, command: Command) {
    match command {
        Command::Create {
            name,
            priority,
            quantum,
            required_time,
        } => {
            let quantum = quantum.unwrap_or_else(|| kernel.scheduler_config().default_quantum);
            match kernel.create_process(&name, priority, quantum, required_time) {
                Ok(pid) => println!("created {name} as pid {pid}"),
                Err(err) => print_kernel_error(&err),
            }
        }
        Command::Kill(pid) => match kernel.terminate_process(pid) {
            Ok(()) => println!("terminated pid {pid}"),
            Err(err) => print_kernel_error(&err),
        },
        Command::Tick(count) => run_ticks(kernel, count),
        Command::Info(pid) => print_process_info(kernel, pid),
        Command::Ps => print_process_list(kernel),
        Command::Send { target, message } => match kernel.send_message(target, message) {
            Ok(()) => println!("sent {message} to pid {target}"),
            Err(err) => print_kernel_error(&err),
        },
        Command::Receive(pid) => match kernel.receive_message(pid) {
            Ok(message) => println!("pid {pid} received {message}"),
            Err(err) => print_kernel_error(&err),
        },
        Command::MemStats => print_mem_stats(kernel),
        Command::SchedStats => print_sched_stats(kernel),
        Command::ResetStats => {
            kernel.reset_scheduler_stats();
            println!("scheduler stats reset");
        }
        Command::SchedConf(update) => print_or_apply_sched_conf(kernel, update),
        Command::Help => print_help(),
        Command::Quit => {}
    }
}

fn run_ticks(kernel: &mut Kernel, count: u32) {
    let mut completed = 0u32;
    let mut preempted = 0u32;
    let result = kernel.run_ticks(count, |outcome| match outcome {
        TickOutcome::Completed { pid, .. } => {
            completed += 1;
            println!("pid {pid} completed");
        }
        TickOutcome::Preempted(pid) => {
            preempted += 1;
            println!("pid {pid} preempted (quantum expired)");
        }
        TickOutcome::Dispatched(pid) => println!("pid {pid} dispatched"),
        TickOutcome::Running(_) | TickOutcome::Idle => {}
    });
    if let Err(err) = result {
        print_kernel_error(&err);
    }
    println!("ran {count} tick(s): {completed} completed, {preempted} preempted");
}

fn print_process_info(kernel: &Kernel, pid: ProcessId) {
    match kernel.process_info(pid) {
        Some(info) => {
            println!("pid:        {}", info.pid);
            println!("parent:     {}", info.parent);
            println!("name:       {}", info.name);
            println!("state:      {}", info.state);
            println!("priority:   {}", info.priority);
            println!("quantum:    {} remaining", info.remaining_quantum);
            println!("required:   {} / elapsed {}", info.required_time, info.elapsed_time);
            println!("created:    tick {}", info.creation_tick);
            println!("age:        {}", info.age);
            println!("wait_time:  {}", info.wait_time);
        }
        None => print_kernel_error(&KernelError::UnknownProcess),
    }
}

fn print_process_list(kernel: &Kernel) {
    println!("{:>5} {:<16} {:<10} {:<9} {:>9}", "PID", "NAME", "STATE", "PRIORITY", "WAIT");
    for info in kernel.process_list() {
        println!(
            "{:>5} {:<16} {:<10} {:<9} {:>9}",
            info.pid, info.name, info.state, info.priority, info.wait_time
        );
    }
}

fn print_mem_stats(kernel: &Kernel) {
    let stats = kernel.heap_stats();
    println!("heap total:  {}", stats.total);
    println!("heap used:   {}", stats.used);
    println!("heap free:   {}", stats.free);
    println!("allocations: {}", stats.num_allocations);
    println!("blocks:      {}", stats.num_blocks);
}

fn print_sched_stats(kernel: &Kernel) {
    let stats = kernel.scheduler_stats();
    println!("total ticks:        {}", stats.total_ticks);
    println!("idle ticks:         {}", stats.idle_ticks);
    println!("context switches:   {}", stats.context_switches);
    println!("preemptions:        {}", stats.preemptions);
    println!("voluntary yields:   {}", stats.voluntary_yields);
    println!("processes completed: {}", stats.processes_completed);
    println!("aging boosts:       {}", stats.aging_boosts);
}

fn print_or_apply_sched_conf(kernel: &mut Kernel, update: Option<SchedConfUpdate>) {
    if let Some(update) = update {
        kernel.set_scheduler_config(SchedulerConfig {
            policy: update.policy,
            default_quantum: update.default_quantum,
            aging_threshold: update.aging_threshold,
            aging_boost_interval: update.aging_boost_interval,
        });
    }
    let config = kernel.scheduler_config();
    println!("policy:              {}", config.policy);
    println!("default quantum:     {}", config.default_quantum);
    println!("aging threshold:     {}", config.aging_threshold);
    println!("aging boost interval: {}", config.aging_boost_interval);
}

fn print_kernel_error(err: &KernelError) {
    println!("error: {err}");
}

fn print_help() {
    println!("commands:");
    println!("  create <name> [priority] [quantum] [required_time]");
    println!("  kill <pid>");
    println!("  tick [count]");
    println!("  info <pid>");
    println!("  ps");
    println!("  send <pid> <message>");
    println!("  recv <pid>");
    println!("  memstats");
    println!("  schedstats");
    println!("  reset-stats");
    println!("  schedconf [policy quantum aging_threshold aging_interval]");
    println!("  quit");
}
