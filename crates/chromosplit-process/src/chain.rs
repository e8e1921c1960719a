//! Streaming chains of external programs.
//!
//! A [`PipelineChain`] connects stage *n*'s stdout directly to stage *n+1*'s stdin,
//! like a shell pipeline. Only the first stage's input and the last stage's output
//! touch the filesystem.
//!
//! # Wait discipline
//!
//! The chain owns two rules that every caller would otherwise have to repeat:
//!
//! 1. The parent never keeps a copy of an intermediate pipe. Each upstream stdout
//!    handle is moved into the downstream [`Command`](std::process::Command) and is
//!    closed as soon as that stage has been spawned, so an upstream writer sees
//!    `EPIPE` (rather than blocking forever) if its reader exits early.
//! 2. The terminal stage is awaited first. Waiting on an upstream stage while the
//!    downstream stage is still running can deadlock once a pipe buffer fills.
//!    Upstream stages are reaped only after the terminal stage has exited, so no
//!    child outlives [`PipelineChain::run`].

use std::process::{Child, ChildStdout, Stdio};

use log::debug;

use crate::invocation::Invocation;
use crate::outcome::ExitOutcome;
use crate::process::{Input, Output, StderrMode};

/// An ordered list of programs connected by pipes.
#[derive(Debug, Clone, Default)]
pub struct PipelineChain {
    stages: Vec<Invocation>,
    stdin: Input,
    stdout: Output,
    stderr: StderrMode,
}

impl PipelineChain {
    /// Creates an empty chain reading from and writing to nothing.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a stage to the end of the chain.
    #[must_use]
    pub fn stage(mut self, invocation: Invocation) -> Self {
        self.stages.push(invocation);
        self
    }

    /// Sets what the first stage reads.
    #[must_use]
    pub fn stdin(mut self, stdin: Input) -> Self {
        self.stdin = stdin;
        self
    }

    /// Sets where the last stage writes.
    #[must_use]
    pub fn stdout(mut self, stdout: Output) -> Self {
        self.stdout = stdout;
        self
    }

    /// Sets stderr handling for every stage.
    #[must_use]
    pub fn stderr(mut self, stderr: StderrMode) -> Self {
        self.stderr = stderr;
        self
    }

    /// The stages in chain order.
    #[must_use]
    pub fn stages(&self) -> &[Invocation] {
        &self.stages
    }

    /// Where the last stage writes.
    #[must_use]
    pub fn output(&self) -> &Output {
        &self.stdout
    }

    /// Starts every stage, waits for the terminal stage, then reaps the rest.
    ///
    /// If a stage cannot be started, the stages after it are never started and the
    /// already-running upstream stages lose their reader and terminate on their own.
    pub fn run(&self) -> ChainOutcome {
        let mut outcomes: Vec<Option<ExitOutcome>> = vec![None; self.stages.len()];
        let mut children: Vec<(usize, Child)> = Vec::with_capacity(self.stages.len());
        let mut upstream: Option<ChildStdout> = None;
        let last = self.stages.len().saturating_sub(1);

        for (idx, invocation) in self.stages.iter().enumerate() {
            let stdin = match upstream.take() {
                Some(pipe) => Stdio::from(pipe),
                None => match self.stdin.open() {
                    Ok(stdin) => stdin,
                    Err(e) => {
                        outcomes[idx] = Some(ExitOutcome::spawn_failed(&self.stdin.describe(), &e));
                        break;
                    }
                },
            };
            let stdout = if idx == last {
                match self.stdout.open() {
                    Ok(stdout) => stdout,
                    Err(e) => {
                        outcomes[idx] =
                            Some(ExitOutcome::spawn_failed(&self.stdout.describe(), &e));
                        break;
                    }
                }
            } else {
                Stdio::piped()
            };

            debug!("Starting chain stage {}/{}: {}", idx + 1, self.stages.len(), invocation);
            let mut command = invocation.command();
            command.stdin(stdin).stdout(stdout).stderr(self.stderr.stdio());

            match command.spawn() {
                Ok(mut child) => {
                    if idx != last {
                        upstream = child.stdout.take();
                    }
                    children.push((idx, child));
                }
                Err(e) => {
                    outcomes[idx] = Some(ExitOutcome::spawn_failed(invocation.program(), &e));
                    break;
                }
            }
            // `command` drops here, closing the parent's ends of the pipes it was given.
        }

        // An aborted chain leaves the last spawned stage's stdout with us; closing it
        // lets that stage (and everything upstream of it) finish.
        drop(upstream);

        // Terminal (or last started) stage first, then upstream stages in reverse.
        while let Some((idx, mut child)) = children.pop() {
            outcomes[idx] = Some(match child.wait() {
                Ok(status) => ExitOutcome::from_status(status),
                Err(e) => ExitOutcome::spawn_failed(self.stages[idx].program(), &e),
            });
        }

        ChainOutcome { outcomes }
    }
}

/// Per-stage outcomes of a [`PipelineChain`] run, in chain order.
///
/// `None` marks a stage that was never started because an earlier stage could not
/// be spawned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainOutcome {
    outcomes: Vec<Option<ExitOutcome>>,
}

impl ChainOutcome {
    /// Builds an outcome from per-stage results, in chain order.
    #[must_use]
    pub fn new(outcomes: Vec<Option<ExitOutcome>>) -> Self {
        Self { outcomes }
    }

    /// Outcomes in chain order.
    #[must_use]
    pub fn outcomes(&self) -> &[Option<ExitOutcome>] {
        &self.outcomes
    }

    /// Outcome of the stage at `idx`, if it was started.
    #[must_use]
    pub fn stage(&self, idx: usize) -> Option<&ExitOutcome> {
        self.outcomes.get(idx).and_then(Option::as_ref)
    }

    /// Returns true if every stage started and exited with status zero.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.outcomes.iter().all(|o| o.as_ref().is_some_and(ExitOutcome::is_success))
    }

    /// The stage to blame for a failed chain, with its outcome.
    ///
    /// Upstream stages killed by `SIGPIPE` are only blamed when no other stage
    /// failed, since a broken pipe normally means a downstream reader exited first.
    #[must_use]
    pub fn first_failure(&self) -> Option<(usize, &ExitOutcome)> {
        let mut failures = self
            .outcomes
            .iter()
            .enumerate()
            .filter_map(|(idx, o)| o.as_ref().map(|o| (idx, o)))
            .filter(|(_, o)| !o.is_success());

        let first = failures.next()?;
        if !first.1.is_broken_pipe() {
            return Some(first);
        }
        failures.find(|(_, o)| !o.is_broken_pipe()).or(Some(first))
    }
}
