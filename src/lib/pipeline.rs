//! Orchestration of one region-parallel run.
//!
//! ```text
//! sources --discover--> regions --WorkerPool--> RegionJob per region --> ResultMerger
//!                          |                         |
//!                      Workspace::create        RegionScratch (per job)
//! ```
//!
//! Every fatal check (headers, workspace collision, pool size) happens before the
//! first region is dispatched. Region failures are recorded, not propagated; the
//! run as a whole fails only when the merge cannot be completed, or when the
//! caller asked to stop at the first failed region.

use std::path::{Path, PathBuf};

use anyhow::{Result, bail};
use chromosplit_process::{ExternalProcess, StderrMode};
use log::{info, warn};

use crate::bam_io::find_index;
use crate::cancel::CancellationToken;
use crate::catalog::{AlignmentSource, discover};
use crate::config::{ExecutionMode, Retention};
use crate::errors::ChromosplitError;
use crate::job::{JobContext, RegionJob};
use crate::launcher::{Launcher, ProcessLauncher};
use crate::logging::{OperationTimer, log_run_summary};
use crate::merge::{MergeFormat, MergePolicy, MergeSummary, ResultMerger};
use crate::metrics::{RegionMetric, write_metrics};
use crate::pool::WorkerPool;
use crate::region::Region;
use crate::stage::{PipelineSpec, index_invocation};
use crate::workspace::Workspace;

/// Default number of regions processed at once.
pub const DEFAULT_REGIONS_IN_PARALLEL: usize = 2;

/// Knobs shared by every run.
#[derive(Debug, Clone, Copy)]
pub struct RunSettings {
    /// Disk relay or streaming.
    pub mode: ExecutionMode,
    /// Maximum regions in flight.
    pub regions_in_parallel: usize,
    /// Which files survive the run.
    pub retention: Retention,
    /// Extra attempts per region.
    pub retries: u32,
    /// Stop dispatching after the first failed region and fail the run.
    pub fail_fast: bool,
    /// Whether missing regions block the merge.
    pub merge_policy: MergePolicy,
    /// How artifacts are joined.
    pub merge_format: MergeFormat,
    /// Tool stderr handling.
    pub stderr: StderrMode,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            mode: ExecutionMode::default(),
            regions_in_parallel: DEFAULT_REGIONS_IN_PARALLEL,
            retention: Retention::default(),
            retries: 0,
            fail_fast: false,
            merge_policy: MergePolicy::default(),
            merge_format: MergeFormat::default(),
            stderr: StderrMode::Inherit,
        }
    }
}

/// Aggregate of a finished run.
#[derive(Debug)]
pub struct RunResult {
    /// Terminal jobs in canonical region order.
    pub jobs: Vec<RegionJob>,
    /// Regions never started because the run was cancelled.
    pub not_dispatched: Vec<Region>,
    /// The merge, if one was requested.
    pub merge: Option<MergeSummary>,
}

impl RunResult {
    /// Jobs that reached `merged-ready`.
    pub fn succeeded(&self) -> impl Iterator<Item = &RegionJob> {
        self.jobs.iter().filter(|job| job.is_success())
    }

    /// Jobs that failed.
    pub fn failed(&self) -> impl Iterator<Item = &RegionJob> {
        self.jobs.iter().filter(|job| !job.is_success())
    }

    /// Path of the merged artifact, if one was produced.
    #[must_use]
    pub fn merged_output(&self) -> Option<&Path> {
        self.merge.as_ref().map(|summary| summary.output.as_path())
    }

    fn first_failure(&self) -> Option<ChromosplitError> {
        self.failed().find_map(|job| {
            job.failure().map(|failure| ChromosplitError::StageFailure {
                region: job.region().name().to_string(),
                stage: failure.stage().to_string(),
                detail: failure.to_string(),
            })
        })
    }
}

/// One run over a set of alignment sources sharing a region set.
pub struct RegionPipeline<'a> {
    spec: &'a PipelineSpec,
    sources: Vec<AlignmentSource>,
    work_dir: PathBuf,
    output: Option<PathBuf>,
    report: Option<PathBuf>,
    settings: RunSettings,
    launcher: &'a dyn Launcher,
    cancel: CancellationToken,
}

impl<'a> RegionPipeline<'a> {
    /// Creates a run with default settings and real processes.
    #[must_use]
    pub fn new(spec: &'a PipelineSpec, sources: Vec<AlignmentSource>, work_dir: impl Into<PathBuf>) -> Self {
        Self {
            spec,
            sources,
            work_dir: work_dir.into(),
            output: None,
            report: None,
            settings: RunSettings::default(),
            launcher: &ProcessLauncher,
            cancel: CancellationToken::new(),
        }
    }

    /// Merges the region artifacts into `output`. Without it the artifacts are
    /// left in the workspace's `calls` directory.
    #[must_use]
    pub fn output(mut self, output: Option<PathBuf>) -> Self {
        self.output = output;
        self
    }

    /// Writes a per-region TSV report.
    #[must_use]
    pub fn report(mut self, report: Option<PathBuf>) -> Self {
        self.report = report;
        self
    }

    /// Replaces the run settings.
    #[must_use]
    pub fn settings(mut self, settings: RunSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Starts processes through `launcher`.
    #[must_use]
    pub fn launcher(mut self, launcher: &'a dyn Launcher) -> Self {
        self.launcher = launcher;
        self
    }

    /// Shares a cancellation token with the caller.
    #[must_use]
    pub fn cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Runs every region and merges the results.
    ///
    /// # Errors
    ///
    /// * [`ChromosplitError::Configuration`] if the output or report directory
    ///   does not exist
    /// * [`ChromosplitError::HeaderInconsistency`] / [`ChromosplitError::NoRegions`]
    ///   before anything is created
    /// * [`ChromosplitError::PathCollision`] if the work directory exists
    /// * [`ChromosplitError::MergeIncomplete`] if a merge was requested and
    ///   regions are missing under [`MergePolicy::CompleteOnly`]
    /// * [`ChromosplitError::StageFailure`] for the first failed region when
    ///   `fail_fast` is set
    pub fn execute(&self) -> Result<RunResult> {
        require_parent_dir("--output", self.output.as_deref())?;
        require_parent_dir("--report", self.report.as_deref())?;
        let regions = discover(&self.sources)?;
        info!("Discovered {} region(s) across {} input(s)", regions.len(), self.sources.len());

        let pool = WorkerPool::new(self.settings.regions_in_parallel)?
            .with_cancellation(self.cancel.clone());
        let workspace = Workspace::create(&self.work_dir)?;
        let input_paths: Vec<PathBuf> =
            self.sources.iter().map(|source| source.path().to_path_buf()).collect();
        let retention = self.settings.retention.for_mode(self.settings.mode, input_paths.len());

        let ctx = JobContext {
            spec: self.spec,
            sources: &input_paths,
            workspace: &workspace,
            launcher: self.launcher,
            mode: self.settings.mode,
            retention,
            retries: self.settings.retries,
            stderr: self.settings.stderr,
            cancel: &self.cancel,
        };

        let timer = OperationTimer::new(&format!(
            "Processing {} region(s), {} at a time, in {} mode",
            regions.len(),
            pool.max_concurrency(),
            self.settings.mode
        ));
        let outcome = pool.run_all(regions.clone(), |region| {
            let job = RegionJob::run(region, &ctx);
            if self.settings.fail_fast && !job.is_success() {
                self.cancel.cancel();
            }
            job
        });

        let mut jobs = outcome.completed;
        jobs.sort_by(|a, b| a.region().cmp(b.region()));
        let mut not_dispatched = outcome.not_dispatched;
        not_dispatched.sort();
        log_run_summary(&jobs, not_dispatched.len());
        timer.log_completion(jobs.len() as u64, "region(s)");

        let mut result = RunResult { jobs, not_dispatched, merge: None };
        if let Some(report) = &self.report {
            if let Err(e) = write_report(report, &result) {
                self.abandon(workspace, &result, retention);
                return Err(e);
            }
        }

        if self.settings.fail_fast {
            if let Some(err) = result.first_failure() {
                self.abandon(workspace, &result, retention);
                return Err(err.into());
            }
        }

        let Some(output) = &self.output else {
            info!("Per-region calls left in {}", workspace.calls_dir().display());
            return Ok(result);
        };

        let artifacts: Vec<(Region, PathBuf)> = result
            .succeeded()
            .filter_map(|job| job.artifact().map(|path| (job.region().clone(), path.to_path_buf())))
            .collect();
        let merger = ResultMerger::new(self.settings.merge_format, self.settings.merge_policy)
            .remove_inputs(!retention.keep_region_calls);
        match merger.merge(&regions, &artifacts, output) {
            Ok(summary) => {
                result.merge = Some(summary);
                workspace.finish();
                Ok(result)
            }
            Err(e) => {
                self.abandon(workspace, &result, retention);
                Err(e)
            }
        }
    }

    /// Removes the artifacts of a run that will not be merged, then the workspace.
    fn abandon(&self, workspace: Workspace, result: &RunResult, retention: Retention) {
        if retention.keep_region_calls {
            warn!("Per-region calls kept in {}", workspace.calls_dir().display());
            return;
        }
        for path in result.succeeded().filter_map(RegionJob::artifact) {
            if let Err(e) = std::fs::remove_file(path) {
                warn!("Could not remove {}: {e}", path.display());
            }
        }
        workspace.finish();
    }
}

/// Fails when `path` would land in a directory that does not exist.
fn require_parent_dir(parameter: &str, path: Option<&Path>) -> Result<()> {
    let Some(parent) = path.and_then(Path::parent) else { return Ok(()) };
    if parent.as_os_str().is_empty() || parent.is_dir() {
        return Ok(());
    }
    Err(ChromosplitError::configuration(
        parameter,
        format!("directory '{}' does not exist", parent.display()),
    )
    .into())
}

fn write_report(path: &Path, result: &RunResult) -> Result<()> {
    let mut rows: Vec<RegionMetric> = result.jobs.iter().map(RegionMetric::from).collect();
    rows.extend(result.not_dispatched.iter().map(RegionMetric::not_dispatched));
    rows.sort_by_key(|row| row.rank);
    write_metrics(path, &rows)?;
    info!("Wrote region report to {}", path.display());
    Ok(())
}

/// Builds a `samtools index` for every input that has no index yet.
///
/// # Errors
///
/// Returns an error naming the first input whose indexing failed.
pub fn index_missing(
    sources: &[PathBuf],
    samtools: &Path,
    launcher: &dyn Launcher,
    stderr: StderrMode,
) -> Result<()> {
    for bam in sources {
        if find_index(bam).is_some() {
            continue;
        }
        info!("Indexing {}", bam.display());
        let outcome =
            launcher.run(&ExternalProcess::new(index_invocation(samtools, bam)).stderr(stderr));
        if !outcome.is_success() {
            bail!("Failed to index {}: samtools {outcome}", bam.display());
        }
    }
    Ok(())
}
