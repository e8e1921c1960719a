//! Per-region run report.
//!
//! One row per region, written as TSV with [`fgoxide::io::DelimFile`].

use std::path::Path;

use anyhow::{Context, Result};
use fgoxide::io::DelimFile;
use serde::{Deserialize, Serialize};

use crate::job::RegionJob;

/// A metric type that can be serialized to TSV files.
pub trait Metric: Serialize + for<'de> Deserialize<'de> + Clone + Default {
    /// Human-readable name for this metric type, used in error messages.
    fn metric_name() -> &'static str;
}

/// Terminal status of one region.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RegionMetric {
    /// Region name.
    pub region: String,
    /// Position in the canonical order.
    pub rank: usize,
    /// Terminal state (`merged-ready`, `failed`, or `not-dispatched`).
    pub state: String,
    /// The failing stage, empty on success.
    pub failed_stage: String,
    /// Failure detail, empty on success.
    pub detail: String,
    /// Attempts made.
    pub attempts: u32,
    /// Wall time in seconds.
    pub elapsed_seconds: f64,
}

impl Metric for RegionMetric {
    fn metric_name() -> &'static str {
        "region"
    }
}

impl From<&RegionJob> for RegionMetric {
    fn from(job: &RegionJob) -> Self {
        let (failed_stage, detail) = job
            .failure()
            .map(|f| (f.stage().to_string(), f.to_string()))
            .unwrap_or_default();
        Self {
            region: job.region().name().to_string(),
            rank: job.region().rank(),
            state: job.state().to_string(),
            failed_stage,
            detail,
            attempts: job.attempts(),
            elapsed_seconds: job.elapsed().as_secs_f64(),
        }
    }
}

impl RegionMetric {
    /// Row for a region that was never started.
    #[must_use]
    pub fn not_dispatched(region: &crate::region::Region) -> Self {
        Self {
            region: region.name().to_string(),
            rank: region.rank(),
            state: "not-dispatched".to_string(),
            ..Self::default()
        }
    }
}

/// Write metrics to a TSV file with consistent error handling.
///
/// # Errors
/// Returns an error if the file cannot be created or written to
pub fn write_metrics<P: AsRef<Path>, T: Metric>(path: P, metrics: &[T]) -> Result<()> {
    let path_ref = path.as_ref();
    DelimFile::default().write_tsv(&path_ref, metrics).with_context(|| {
        format!("Failed to write {} metrics: {}", T::metric_name(), path_ref.display())
    })
}
