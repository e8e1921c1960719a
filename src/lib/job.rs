//! The per-region state machine.
//!
//! ```text
//! pending -> extracting -> transforming -> calling -> merged-ready
//!     \           \              \             \
//!      +-----------+--------------+-------------+--> failed
//! ```
//!
//! A [`RegionJob`] is created and driven by exactly one worker thread. Any stage
//! that does not succeed moves the job straight to `failed`, recording the stage
//! and the cause; later stages are never started. Terminal states are final.
//! Retries, when enabled, restart the whole sequence from `pending`.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::slice;
use std::time::{Duration, Instant};

use chromosplit_process::{
    ChainOutcome, ExitOutcome, ExternalProcess, Input, Output, PipelineChain, StderrMode,
};
use log::{debug, info, warn};

use crate::cancel::CancellationToken;
use crate::config::{ExecutionMode, Retention};
use crate::launcher::Launcher;
use crate::logging::format_duration;
use crate::region::Region;
use crate::stage::{PipelineSpec, StageInput, StageKind};
use crate::workspace::{RegionScratch, Workspace};

/// Where a region job is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobState {
    /// Dispatched, no stage started yet.
    Pending,
    /// Running the extraction stage.
    Extracting,
    /// Running the transform (pileup) stage.
    Transforming,
    /// Running the calling stage.
    Calling,
    /// Finished with a non-empty artifact ready to merge.
    MergedReady,
    /// A stage failed; see the job's [`JobFailure`].
    Failed,
}

impl JobState {
    /// Returns true for `merged-ready` and `failed`.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::MergedReady | Self::Failed)
    }

    /// Returns true if the machine may move from `self` to `next`.
    #[must_use]
    pub fn can_transition_to(self, next: JobState) -> bool {
        use JobState::{Calling, Extracting, Failed, MergedReady, Pending, Transforming};
        match (self, next) {
            (Pending, Extracting)
            | (Extracting, Transforming)
            | (Transforming, Calling)
            | (Calling, MergedReady) => true,
            (from, Failed) => !from.is_terminal(),
            _ => false,
        }
    }

    /// The state a job is in while `stage` runs.
    #[must_use]
    pub fn running(stage: StageKind) -> Self {
        match stage {
            StageKind::Extract => Self::Extracting,
            StageKind::Transform => Self::Transforming,
            StageKind::Call => Self::Calling,
        }
    }

    /// Lower-case name used in logs and reports.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Extracting => "extracting",
            Self::Transforming => "transforming",
            Self::Calling => "calling",
            Self::MergedReady => "merged-ready",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a stage did not succeed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureCause {
    /// The external program did not exit successfully.
    Exit(ExitOutcome),
    /// The calling stage succeeded but left an empty or missing artifact.
    EmptyArtifact,
    /// Scratch space for the stage could not be prepared.
    Workspace(String),
    /// The run was cancelled before the stage started.
    Cancelled,
}

impl fmt::Display for FailureCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exit(outcome) => write!(f, "{outcome}"),
            Self::EmptyArtifact => f.write_str("produced an empty or missing artifact"),
            Self::Workspace(reason) => f.write_str(reason),
            Self::Cancelled => f.write_str("cancelled before the stage started"),
        }
    }
}

/// The stage a job failed in, and why.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobFailure {
    stage: StageKind,
    cause: FailureCause,
}

impl JobFailure {
    /// Creates a failure record.
    #[must_use]
    pub fn new(stage: StageKind, cause: FailureCause) -> Self {
        Self { stage, cause }
    }

    /// The stage that failed.
    #[must_use]
    pub fn stage(&self) -> StageKind {
        self.stage
    }

    /// What went wrong.
    #[must_use]
    pub fn cause(&self) -> &FailureCause {
        &self.cause
    }

    fn is_retryable(&self) -> bool {
        matches!(self.cause, FailureCause::Exit(_) | FailureCause::EmptyArtifact)
    }
}

impl fmt::Display for JobFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.cause)
    }
}

/// Outcome of one started stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageRecord {
    /// The stage.
    pub stage: StageKind,
    /// How its program finished.
    pub outcome: ExitOutcome,
    /// Wall time spent in the stage (the whole chain for piped stages).
    pub elapsed: Duration,
}

/// Everything a job needs from the run, shared read-only across workers.
#[derive(Clone, Copy)]
pub struct JobContext<'a> {
    /// Stage templates.
    pub spec: &'a PipelineSpec,
    /// The alignment inputs, all extracted for every region.
    pub sources: &'a [PathBuf],
    /// Scratch storage for the run.
    pub workspace: &'a Workspace,
    /// How processes are started.
    pub launcher: &'a dyn Launcher,
    /// Disk relay or streaming.
    pub mode: ExecutionMode,
    /// Which intermediates survive.
    pub retention: Retention,
    /// Additional attempts after a failed one.
    pub retries: u32,
    /// Tool stderr handling.
    pub stderr: StderrMode,
    /// Checked before each stage.
    pub cancel: &'a CancellationToken,
}

/// Execution record for one region.
#[derive(Debug, Clone)]
pub struct RegionJob {
    region: Region,
    state: JobState,
    stages: Vec<StageRecord>,
    failure: Option<JobFailure>,
    artifact: Option<PathBuf>,
    attempts: u32,
    elapsed: Duration,
}

impl RegionJob {
    /// Creates a pending job.
    #[must_use]
    pub fn new(region: Region) -> Self {
        Self {
            region,
            state: JobState::Pending,
            stages: Vec::new(),
            failure: None,
            artifact: None,
            attempts: 0,
            elapsed: Duration::ZERO,
        }
    }

    /// Runs `region` through every stage and returns the terminal job.
    ///
    /// Scratch belonging to the region is released before returning, on both the
    /// success and the failure path; a failed job's partial artifact is removed.
    #[must_use]
    pub fn run(region: Region, ctx: &JobContext<'_>) -> Self {
        let started = Instant::now();
        let mut job = Self::new(region);
        let mut scratch = ctx.workspace.scratch(&job.region);

        loop {
            job.attempts += 1;
            match job.attempt(ctx, &mut scratch) {
                Ok(artifact) => {
                    job.artifact = Some(artifact);
                    job.transition(JobState::MergedReady);
                    break;
                }
                Err(failure) => {
                    if let Err(e) = scratch.discard_artifact() {
                        warn!("{}: {e:#}", job.region);
                    }
                    if failure.is_retryable() && job.attempts <= ctx.retries {
                        warn!(
                            "{}: {} stage {}; retrying (attempt {} of {})",
                            job.region,
                            failure.stage,
                            failure,
                            job.attempts + 1,
                            ctx.retries + 1
                        );
                        job.restart();
                        continue;
                    }
                    job.fail(failure);
                    break;
                }
            }
        }

        scratch.release(ctx.retention);
        job.elapsed = started.elapsed();
        job.log_terminal();
        job
    }

    /// The region this job processes.
    #[must_use]
    pub fn region(&self) -> &Region {
        &self.region
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> JobState {
        self.state
    }

    /// Started stages of the last attempt, in order.
    #[must_use]
    pub fn stages(&self) -> &[StageRecord] {
        &self.stages
    }

    /// Failure details for a failed job.
    #[must_use]
    pub fn failure(&self) -> Option<&JobFailure> {
        self.failure.as_ref()
    }

    /// The call artifact of a successful job.
    #[must_use]
    pub fn artifact(&self) -> Option<&Path> {
        self.artifact.as_deref()
    }

    /// Number of attempts made.
    #[must_use]
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Wall time across all attempts.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Returns true if the job reached `merged-ready`.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.state == JobState::MergedReady
    }

    /// Moves the job to `failed`. Has no effect on a terminal job.
    pub(crate) fn fail(&mut self, failure: JobFailure) {
        if self.transition(JobState::Failed) {
            self.failure = Some(failure);
        }
    }

    fn transition(&mut self, next: JobState) -> bool {
        if !self.state.can_transition_to(next) {
            return false;
        }
        self.state = next;
        true
    }

    fn restart(&mut self) {
        if !self.state.is_terminal() {
            self.state = JobState::Pending;
            self.stages.clear();
        }
    }

    /// Enters the state for `stage`, unless the run was cancelled.
    fn enter(&mut self, stage: StageKind, ctx: &JobContext<'_>) -> Result<(), JobFailure> {
        if ctx.cancel.is_cancelled() {
            return Err(JobFailure::new(stage, FailureCause::Cancelled));
        }
        self.transition(JobState::running(stage));
        Ok(())
    }

    fn attempt(
        &mut self,
        ctx: &JobContext<'_>,
        scratch: &mut RegionScratch,
    ) -> Result<PathBuf, JobFailure> {
        let artifact = match (ctx.mode, ctx.sources.len()) {
            (ExecutionMode::DiskRelay, _) => self.run_disk_relay(ctx, scratch)?,
            (ExecutionMode::StreamingPipe, 1) => self.run_streaming(ctx, scratch)?,
            (ExecutionMode::StreamingPipe, _) => self.run_joint_streaming(ctx, scratch)?,
        };
        check_artifact(&artifact)?;
        Ok(artifact)
    }

    /// Every stage writes a scratch file read by the next.
    fn run_disk_relay(
        &mut self,
        ctx: &JobContext<'_>,
        scratch: &mut RegionScratch,
    ) -> Result<PathBuf, JobFailure> {
        let extracted = self.extract_to_disk(ctx, scratch)?;

        self.enter(StageKind::Transform, ctx)?;
        let pileup = acquire(scratch, StageKind::Transform, 0)?;
        let invocation = ctx
            .spec
            .stage(StageKind::Transform)
            .build(&self.region, StageInput::Files(&extracted));
        self.run_stage(ctx, StageKind::Transform, ExternalProcess::new(invocation), &pileup)?;
        scratch.complete(&pileup);

        self.enter(StageKind::Call, ctx)?;
        let artifact = acquire(scratch, StageKind::Call, 0)?;
        let invocation = ctx
            .spec
            .stage(StageKind::Call)
            .build(&self.region, StageInput::Files(slice::from_ref(&pileup)));
        self.run_stage(ctx, StageKind::Call, ExternalProcess::new(invocation), &artifact)?;

        Ok(artifact)
    }

    /// `extract | transform | call`, nothing written but the artifact.
    fn run_streaming(
        &mut self,
        ctx: &JobContext<'_>,
        scratch: &mut RegionScratch,
    ) -> Result<PathBuf, JobFailure> {
        self.enter(StageKind::Extract, ctx)?;
        let artifact = acquire(scratch, StageKind::Call, 0)?;
        let extract =
            ctx.spec.stage(StageKind::Extract).build(&self.region, StageInput::Files(ctx.sources));
        let transform = ctx.spec.stage(StageKind::Transform).build(&self.region, StageInput::Pipe);
        let call = ctx.spec.stage(StageKind::Call).build(&self.region, StageInput::Pipe);
        let chain = PipelineChain::new().stage(extract).stage(transform).stage(call);

        self.run_chain(ctx, &StageKind::ALL, chain, &artifact)?;
        Ok(artifact)
    }

    /// Extractions go to disk (the transform takes them as positional inputs);
    /// `transform | call` is piped.
    fn run_joint_streaming(
        &mut self,
        ctx: &JobContext<'_>,
        scratch: &mut RegionScratch,
    ) -> Result<PathBuf, JobFailure> {
        let extracted = self.extract_to_disk(ctx, scratch)?;

        self.enter(StageKind::Transform, ctx)?;
        let artifact = acquire(scratch, StageKind::Call, 0)?;
        let transform = ctx
            .spec
            .stage(StageKind::Transform)
            .build(&self.region, StageInput::Files(&extracted));
        let call = ctx.spec.stage(StageKind::Call).build(&self.region, StageInput::Pipe);
        let chain = PipelineChain::new().stage(transform).stage(call);

        self.run_chain(ctx, &[StageKind::Transform, StageKind::Call], chain, &artifact)?;
        Ok(artifact)
    }

    /// Extracts the region from every source into its own scratch file.
    fn extract_to_disk(
        &mut self,
        ctx: &JobContext<'_>,
        scratch: &mut RegionScratch,
    ) -> Result<Vec<PathBuf>, JobFailure> {
        self.enter(StageKind::Extract, ctx)?;
        let mut extracted = Vec::with_capacity(ctx.sources.len());
        for (idx, source) in ctx.sources.iter().enumerate() {
            let output = acquire(scratch, StageKind::Extract, idx)?;
            let invocation = ctx
                .spec
                .stage(StageKind::Extract)
                .build(&self.region, StageInput::Files(slice::from_ref(source)));
            self.run_stage(ctx, StageKind::Extract, ExternalProcess::new(invocation), &output)?;
            scratch.complete(&output);
            extracted.push(output);
        }
        Ok(extracted)
    }

    fn run_stage(
        &mut self,
        ctx: &JobContext<'_>,
        stage: StageKind,
        process: ExternalProcess,
        output: &Path,
    ) -> Result<(), JobFailure> {
        let process = process
            .stdin(Input::Null)
            .stdout(Output::File(output.to_path_buf()))
            .stderr(ctx.stderr);
        debug!("{}: {stage}: {}", self.region, process.invocation());

        let started = Instant::now();
        let outcome = ctx.launcher.run(&process);
        self.stages.push(StageRecord { stage, outcome: outcome.clone(), elapsed: started.elapsed() });

        if outcome.is_success() {
            Ok(())
        } else {
            Err(JobFailure::new(stage, FailureCause::Exit(outcome)))
        }
    }

    /// Runs a piped chain whose stages are `kinds`, recording every started stage.
    fn run_chain(
        &mut self,
        ctx: &JobContext<'_>,
        kinds: &[StageKind],
        chain: PipelineChain,
        output: &Path,
    ) -> Result<(), JobFailure> {
        let chain = chain.stdout(Output::File(output.to_path_buf())).stderr(ctx.stderr);
        for (stage, invocation) in kinds.iter().zip(chain.stages()) {
            debug!("{}: {stage}: {invocation}", self.region);
        }

        let started = Instant::now();
        let result = ctx.launcher.run_chain(&chain);
        let elapsed = started.elapsed();

        for (stage, outcome) in kinds.iter().zip(result.outcomes()) {
            if let Some(outcome) = outcome {
                self.stages.push(StageRecord { stage: *stage, outcome: outcome.clone(), elapsed });
            }
        }

        match blame(kinds, &result) {
            Some(failure) => {
                self.advance_to(failure.stage);
                Err(failure)
            }
            None => {
                self.advance_to(StageKind::Call);
                Ok(())
            }
        }
    }

    /// Walks the state forward to the running state of `stage`.
    fn advance_to(&mut self, stage: StageKind) {
        let target = JobState::running(stage);
        for kind in StageKind::ALL {
            let state = JobState::running(kind);
            if self.state.can_transition_to(state) {
                self.transition(state);
            }
            if state == target {
                break;
            }
        }
    }

    fn log_terminal(&self) {
        match &self.failure {
            None => info!(
                "{}: {} in {} ({} attempt(s))",
                self.region,
                self.state,
                format_duration(self.elapsed),
                self.attempts
            ),
            Some(failure) => warn!(
                "{}: failed during {} stage: {} ({} attempt(s))",
                self.region, failure.stage, failure, self.attempts
            ),
        }
    }
}

/// Picks the failing stage of a chain, if any.
fn blame(kinds: &[StageKind], result: &ChainOutcome) -> Option<JobFailure> {
    if let Some((idx, outcome)) = result.first_failure() {
        return Some(JobFailure::new(kinds[idx], FailureCause::Exit(outcome.clone())));
    }
    result.outcomes().iter().position(Option::is_none).map(|idx| {
        JobFailure::new(
            kinds[idx],
            FailureCause::Exit(ExitOutcome::SpawnFailed("stage was not started".to_string())),
        )
    })
}

fn acquire(
    scratch: &mut RegionScratch,
    stage: StageKind,
    index: usize,
) -> Result<PathBuf, JobFailure> {
    scratch
        .acquire(stage, index)
        .map_err(|e| JobFailure::new(stage, FailureCause::Workspace(format!("{e:#}"))))
}

fn check_artifact(artifact: &Path) -> Result<(), JobFailure> {
    match fs::metadata(artifact) {
        Ok(meta) if meta.len() > 0 => Ok(()),
        _ => Err(JobFailure::new(StageKind::Call, FailureCause::EmptyArtifact)),
    }
}
