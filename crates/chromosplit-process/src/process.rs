//! Running a single external program to completion.
//!
//! An [`ExternalProcess`] wires a program's stdin and stdout to files (or to
//! nothing), starts it, and blocks until it exits. Failing to open a wired file is
//! reported as [`ExitOutcome::SpawnFailed`] just like a missing binary, so callers
//! have a single outcome to inspect.

use std::fs::File;
use std::io;
use std::path::PathBuf;
use std::process::Stdio;

use log::debug;

use crate::invocation::Invocation;
use crate::outcome::ExitOutcome;

/// Where a program (or the first program of a chain) reads from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Input {
    /// Reads nothing (`/dev/null`).
    #[default]
    Null,
    /// Reads an existing file.
    File(PathBuf),
}

impl Input {
    pub(crate) fn open(&self) -> io::Result<Stdio> {
        match self {
            Self::Null => Ok(Stdio::null()),
            Self::File(path) => Ok(Stdio::from(File::open(path)?)),
        }
    }

    pub(crate) fn describe(&self) -> String {
        match self {
            Self::Null => "/dev/null".to_string(),
            Self::File(path) => path.display().to_string(),
        }
    }
}

/// Where a program (or the last program of a chain) writes to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Output {
    /// Discards everything written.
    #[default]
    Null,
    /// Creates (or truncates) a file and writes into it.
    File(PathBuf),
}

impl Output {
    pub(crate) fn open(&self) -> io::Result<Stdio> {
        match self {
            Self::Null => Ok(Stdio::null()),
            Self::File(path) => Ok(Stdio::from(File::create(path)?)),
        }
    }

    pub(crate) fn describe(&self) -> String {
        match self {
            Self::Null => "/dev/null".to_string(),
            Self::File(path) => path.display().to_string(),
        }
    }
}

/// What happens to a program's diagnostic stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StderrMode {
    /// Shares this process's stderr.
    #[default]
    Inherit,
    /// Discards it.
    Null,
}

impl StderrMode {
    pub(crate) fn stdio(self) -> Stdio {
        match self {
            Self::Inherit => Stdio::inherit(),
            Self::Null => Stdio::null(),
        }
    }
}

/// One supervised external program with its stdio wiring.
#[derive(Debug, Clone)]
pub struct ExternalProcess {
    invocation: Invocation,
    stdin: Input,
    stdout: Output,
    stderr: StderrMode,
}

impl ExternalProcess {
    /// Creates a process reading from and writing to nothing.
    #[must_use]
    pub fn new(invocation: Invocation) -> Self {
        Self {
            invocation,
            stdin: Input::Null,
            stdout: Output::Null,
            stderr: StderrMode::Inherit,
        }
    }

    /// Sets the stdin wiring.
    #[must_use]
    pub fn stdin(mut self, stdin: Input) -> Self {
        self.stdin = stdin;
        self
    }

    /// Sets the stdout wiring.
    #[must_use]
    pub fn stdout(mut self, stdout: Output) -> Self {
        self.stdout = stdout;
        self
    }

    /// Sets the stderr handling.
    #[must_use]
    pub fn stderr(mut self, stderr: StderrMode) -> Self {
        self.stderr = stderr;
        self
    }

    /// The invocation this process runs.
    #[must_use]
    pub fn invocation(&self) -> &Invocation {
        &self.invocation
    }

    /// Where the program writes.
    #[must_use]
    pub fn output(&self) -> &Output {
        &self.stdout
    }

    /// Starts the program and blocks until it exits.
    pub fn run(&self) -> ExitOutcome {
        debug!(
            "Running: {} < {} > {}",
            self.invocation,
            self.stdin.describe(),
            self.stdout.describe()
        );

        let stdin = match self.stdin.open() {
            Ok(stdin) => stdin,
            Err(e) => return ExitOutcome::spawn_failed(&self.stdin.describe(), &e),
        };
        let stdout = match self.stdout.open() {
            Ok(stdout) => stdout,
            Err(e) => return ExitOutcome::spawn_failed(&self.stdout.describe(), &e),
        };

        let mut command = self.invocation.command();
        command.stdin(stdin).stdout(stdout).stderr(self.stderr.stdio());

        match command.status() {
            Ok(status) => ExitOutcome::from_status(status),
            Err(e) => ExitOutcome::spawn_failed(self.invocation.program(), &e),
        }
    }
}
