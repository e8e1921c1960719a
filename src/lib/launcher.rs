//! The seam between region jobs and the operating system.
//!
//! Jobs never spawn programs directly; they hand fully wired processes and chains
//! to a [`Launcher`]. Production code uses [`ProcessLauncher`]; tests substitute
//! launchers that count or fake invocations.

use chromosplit_process::{ChainOutcome, ExitOutcome, ExternalProcess, PipelineChain};

/// Runs external processes on behalf of region jobs.
pub trait Launcher: Send + Sync {
    /// Runs one process to completion.
    fn run(&self, process: &ExternalProcess) -> ExitOutcome;

    /// Runs a piped chain to completion.
    fn run_chain(&self, chain: &PipelineChain) -> ChainOutcome;
}

/// Launches real child processes.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessLauncher;

impl Launcher for ProcessLauncher {
    fn run(&self, process: &ExternalProcess) -> ExitOutcome {
        process.run()
    }

    fn run_chain(&self, chain: &PipelineChain) -> ChainOutcome {
        chain.run()
    }
}
