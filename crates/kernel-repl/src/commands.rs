// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 The Priorikern Authors

//! Command line grammar for the REPL.

use std::fmt;

use kernel_abi::{Priority, ProcessId, SchedulingPolicy};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Create {
        name: String,
        priority: Priority,
        quantum: Option<u32>,
        required_time: u32,
    },
    Kill(ProcessId),
    Tick(u32),
    Info(ProcessId),
    Ps,
    Send {
        target: ProcessId,
        message: u32,
    },
    Receive(ProcessId),
    MemStats,
    SchedStats,
    ResetStats,
    SchedConf(Option<SchedConfUpdate>),
    Help,
    Quit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedConfUpdate {
    pub policy: SchedulingPolicy,
    pub default_quantum: u32,
    pub aging_threshold: u32,
    pub aging_boost_interval: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    Empty,
    UnknownCommand(String),
    MissingArgument(&'static str),
    InvalidNumber(String),
    InvalidPriority(String),
    InvalidPid(String),
    InvalidPolicy(String),
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "empty command"),
            Self::UnknownCommand(cmd) => write!(f, "unknown command: {cmd}"),
            Self::MissingArgument(arg) => write!(f, "missing argument: {arg}"),
            Self::InvalidNumber(raw) => write!(f, "not a number: {raw}"),
            Self::InvalidPriority(raw) => write!(f, "not a priority: {raw}"),
            Self::InvalidPid(raw) => write!(f, "not a pid: {raw}"),
            Self::InvalidPolicy(raw) => write!(f, "not a policy: {raw}"),
        }
    }
}

fn parse_u32(raw: &str) -> Result<u32, ParseError> {
    raw.parse().map_err(|_| ParseError::InvalidNumber(raw.to_string()))
}

fn parse_pid(raw: &str) -> Result<ProcessId, ParseError> {
    raw.parse::<u32>()
        .map(ProcessId::new)
        .map_err(|_| ParseError::InvalidPid(raw.to_string()))
}

fn parse_priority(raw: &str) -> Result<Priority, ParseError> {
    Priority::parse(raw).ok_or_else(|| ParseError::InvalidPriority(raw.to_string()))
}

fn parse_policy(raw: &str) -> Result<SchedulingPolicy, ParseError> {
    match raw.to_ascii_lowercase().as_str() {
        "rr" | "round-robin" | "roundrobin" => Ok(SchedulingPolicy::RoundRobin),
        "priority" | "prio" => Ok(SchedulingPolicy::Priority),
        "priority+rr" | "priorityrr" | "prr" => Ok(SchedulingPolicy::PriorityRoundRobin),
        "fcfs" => Ok(SchedulingPolicy::Fcfs),
        _ => Err(ParseError::InvalidPolicy(raw.to_string())),
    }
}

/// Parse one line of user input into a [`Command`].
pub fn parse(line: &str) -> Result<Command, ParseError> {
    let mut tokens = line.split_whitespace();
    let verb = tokens.next().ok_or(ParseError::Empty)?;

    match verb {
        "create" => {
            let name = tokens.next().ok_or(ParseError::MissingArgument("name"))?.to_string();
            let priority = tokens.next().map_or(Ok(Priority::Normal), parse_priority)?;
            let quantum = tokens.next().map(parse_u32).transpose()?;
            let required_time = tokens.next().map_or(Ok(0), parse_u32)?;
            Ok(Command::Create {
                name,
                priority,
                quantum,
                required_time,
            })
        }
        "kill" => {
            let pid = tokens.next().ok_or(ParseError::MissingArgument("pid"))?;
            Ok(Command::Kill(parse_pid(pid)?))
        }
        "tick" => {
            let count = tokens.next().map_or(Ok(1), parse_u32)?;
            Ok(Command::Tick(count))
        }
        "info" => {
            let pid = tokens.next().ok_or(ParseError::MissingArgument("pid"))?;
            Ok(Command::Info(parse_pid(pid)?))
        }
        "ps" => Ok(Command::Ps),
        "send" => {
            let target = tokens.next().ok_or(ParseError::MissingArgument("pid"))?;
            let message = tokens.next().ok_or(ParseError::MissingArgument("message"))?;
            Ok(Command::Send {
                target: parse_pid(target)?,
                message: parse_u32(message)?,
            })
        }
        "recv" => {
            let pid = tokens.next().ok_or(ParseError::MissingArgument("pid"))?;
            Ok(Command::Receive(parse_pid(pid)?))
        }
        "memstats" => Ok(Command::MemStats),
        "schedstats" => Ok(Command::SchedStats),
        "reset-stats" => Ok(Command::ResetStats),
        "schedconf" => {
            let Some(policy) = tokens.next() else {
                return Ok(Command::SchedConf(None));
            };
            let policy = parse_policy(policy)?;
            let default_quantum = tokens.next().map_or(Ok(100), parse_u32)?;
            let aging_threshold = tokens.next().map_or(Ok(100), parse_u32)?;
            let aging_boost_interval = tokens.next().map_or(Ok(50), parse_u32)?;
            Ok(Command::SchedConf(Some(SchedConfUpdate {
                policy,
                default_quantum,
                aging_threshold,
                aging_boost_interval,
            })))
        }
        "help" => Ok(Command::Help),
        "quit" | "exit" => Ok(Command::Quit),
        other => Err(ParseError::UnknownCommand(other.to_string())),
    }
}
