//! Launchers and helpers shared by the unit tests.

use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use chromosplit_process::{
    ChainOutcome, ExitOutcome, ExternalProcess, Invocation, Output, PipelineChain,
};
use parking_lot::Mutex;

use crate::launcher::Launcher;
use crate::stage::StageKind;

type Respond = Box<dyn Fn(&Invocation) -> ExitOutcome + Send + Sync>;

/// Identifies the stage of an invocation built by `PipelineSpec::samtools_varscan`.
pub(crate) fn stage_of(invocation: &Invocation) -> StageKind {
    match invocation.arguments().first().map(String::as_str) {
        Some("view") => StageKind::Extract,
        Some("mpileup") => StageKind::Transform,
        _ => StageKind::Call,
    }
}

/// A launcher that never starts a process.
///
/// Every invocation is recorded and answered by a closure. Successful runs write
/// their output file: call artifacts get a one-record VCF naming the artifact's
/// contig, anything else gets the argv. Failed runs leave an empty output file.
/// Concurrently running launches are counted so tests can assert a high-water mark.
pub(crate) struct ScriptedLauncher {
    respond: Respond,
    invocations: Mutex<Vec<Invocation>>,
    running: AtomicUsize,
    high_water: AtomicUsize,
    delay: Duration,
    empty_artifacts: bool,
}

impl ScriptedLauncher {
    pub(crate) fn new<F>(respond: F) -> Self
    where
        F: Fn(&Invocation) -> ExitOutcome + Send + Sync + 'static,
    {
        Self {
            respond: Box::new(respond),
            invocations: Mutex::new(Vec::new()),
            running: AtomicUsize::new(0),
            high_water: AtomicUsize::new(0),
            delay: Duration::ZERO,
            empty_artifacts: false,
        }
    }

    pub(crate) fn succeeding() -> Self {
        Self::new(|_| ExitOutcome::Succeeded)
    }

    /// Fails the first `times` invocations of `stage`, then succeeds.
    pub(crate) fn failing_first(stage: StageKind, times: usize) -> Self {
        let seen = Arc::new(AtomicUsize::new(0));
        Self::new(move |invocation| {
            if stage_of(invocation) == stage && seen.fetch_add(1, Ordering::SeqCst) < times {
                ExitOutcome::Exited(1)
            } else {
                ExitOutcome::Succeeded
            }
        })
    }

    /// Fails every invocation whose argv mentions `needle`.
    pub(crate) fn failing_when(needle: &'static str, stage: StageKind) -> Self {
        Self::new(move |invocation| {
            if stage_of(invocation) == stage && invocation.argv().iter().any(|a| a.contains(needle))
            {
                ExitOutcome::Exited(1)
            } else {
                ExitOutcome::Succeeded
            }
        })
    }

    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub(crate) fn with_empty_artifacts(mut self) -> Self {
        self.empty_artifacts = true;
        self
    }

    pub(crate) fn invocations(&self) -> Vec<Invocation> {
        self.invocations.lock().clone()
    }

    pub(crate) fn invocation_count(&self) -> usize {
        self.invocations.lock().len()
    }

    pub(crate) fn high_water_mark(&self) -> usize {
        self.high_water.load(Ordering::SeqCst)
    }

    fn begin(&self) {
        let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.high_water.fetch_max(now, Ordering::SeqCst);
        if !self.delay.is_zero() {
            thread::sleep(self.delay);
        }
    }

    fn end(&self) {
        self.running.fetch_sub(1, Ordering::SeqCst);
    }

    fn answer(&self, invocation: &Invocation) -> ExitOutcome {
        self.invocations.lock().push(invocation.clone());
        (self.respond)(invocation)
    }

    fn write_output(&self, output: &Output, last: &Invocation) {
        let Output::File(path) = output else { return };
        let contents = if path.extension().is_some_and(|ext| ext == "vcf") {
            if self.empty_artifacts {
                String::new()
            } else {
                vcf_for(path)
            }
        } else {
            format!("{last}\n")
        };
        fs::write(path, contents).unwrap();
    }
}

fn vcf_for(path: &Path) -> String {
    let stem = path.file_stem().unwrap().to_string_lossy();
    let contig = stem.rsplit_once('_').map_or(&*stem, |(name, _rank)| name);
    format!("##fileformat=VCFv4.1\n#CHROM\tPOS\n{contig}\t100\n")
}

impl Launcher for ScriptedLauncher {
    fn run(&self, process: &ExternalProcess) -> ExitOutcome {
        self.begin();
        let outcome = self.answer(process.invocation());
        if outcome.is_success() {
            self.write_output(process.output(), process.invocation());
        } else if let Output::File(path) = process.output() {
            // A redirected stdout exists even when the tool fails.
            fs::write(path, b"").unwrap();
        }
        self.end();
        outcome
    }

    fn run_chain(&self, chain: &PipelineChain) -> ChainOutcome {
        self.begin();
        let outcomes: Vec<Option<ExitOutcome>> =
            chain.stages().iter().map(|invocation| Some(self.answer(invocation))).collect();
        if outcomes.iter().flatten().all(ExitOutcome::is_success) {
            if let Some(last) = chain.stages().last() {
                self.write_output(chain.output(), last);
            }
        }
        self.end();
        ChainOutcome::new(outcomes)
    }
}
