//! Run configuration: tool token files, execution mode and retention.
//!
//! Token files are read once at startup into immutable shared lists, so every
//! region job builds its argument vectors from the same snapshot without locking.

use std::fmt;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::ValueEnum;
use log::{info, warn};

use chromosplit_process::StderrMode;

/// Default token file for the transform (pileup) stage, looked up in the working directory.
pub const DEFAULT_TRANSFORM_CONF: &str = "samtools.conf";

/// Default token file for the calling stage, looked up in the working directory.
pub const DEFAULT_CALLER_CONF: &str = "varscan.conf";

/// Splits token-file contents into argument tokens.
///
/// One token per line; trailing carriage returns are stripped, and blank lines
/// and lines starting with `#` are skipped.
///
/// # Example
///
/// ```
/// use chromosplit_lib::config::parse_tokens;
///
/// assert_eq!(parse_tokens("# comment\n-q\r\n20\n\n"), ["-q", "20"]);
/// ```
#[must_use]
pub fn parse_tokens(contents: &str) -> Vec<String> {
    contents
        .lines()
        .map(|line| line.trim_end_matches('\r'))
        .filter(|line| !line.trim().is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}

/// Reads a token file.
///
/// # Errors
///
/// Returns an error if the file cannot be read.
pub fn load_tokens(path: &Path) -> Result<Arc<[String]>> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read token file: {}", path.display()))?;
    Ok(parse_tokens(&contents).into())
}

/// Reads the token file for a stage, falling back to `default_name` in the
/// working directory when no path is given.
///
/// A missing file is not an error: the stage runs with its defaults and a
/// warning is logged.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read.
pub fn load_optional_tokens(
    path: Option<&Path>,
    default_name: &str,
    stage: &str,
) -> Result<Arc<[String]>> {
    let path = path.unwrap_or_else(|| Path::new(default_name));
    if !path.exists() {
        warn!("{} not found; the {stage} stage will run with default arguments", path.display());
        return Ok(Arc::from(Vec::new()));
    }
    let tokens = load_tokens(path)?;
    info!("Loaded {} {stage} argument(s) from {}", tokens.len(), path.display());
    Ok(tokens)
}

/// How one stage's output reaches the next stage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum ExecutionMode {
    /// Every stage writes a scratch file that the next stage reads.
    #[default]
    #[value(name = "disk-relay")]
    DiskRelay,
    /// Stages are connected by pipes; only the first input and last output touch disk.
    #[value(name = "streaming-pipe")]
    StreamingPipe,
}

impl fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DiskRelay => f.write_str("disk-relay"),
            Self::StreamingPipe => f.write_str("streaming-pipe"),
        }
    }
}

/// What happens to the standard error of external tools.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum ToolStderr {
    /// Tool diagnostics go to this program's stderr.
    #[default]
    Inherit,
    /// Tool diagnostics are discarded.
    Null,
}

impl From<ToolStderr> for StderrMode {
    fn from(value: ToolStderr) -> Self {
        match value {
            ToolStderr::Inherit => StderrMode::Inherit,
            ToolStderr::Null => StderrMode::Null,
        }
    }
}

/// Which per-region files survive the run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[allow(clippy::struct_excessive_bools)]
pub struct Retention {
    /// Keep the per-region extracted alignments.
    pub keep_extracted: bool,
    /// Keep the per-region pileup.
    pub keep_pileup: bool,
    /// Keep the per-region call artifacts after merging.
    pub keep_region_calls: bool,
}

impl Retention {
    /// Builds the retention policy from the command-line flags; `keep_all`
    /// implies both intermediate flags.
    #[must_use]
    pub fn new(keep_extracted: bool, keep_pileup: bool, keep_all: bool, keep_region_calls: bool) -> Self {
        Self {
            keep_extracted: keep_extracted || keep_all,
            keep_pileup: keep_pileup || keep_all,
            keep_region_calls,
        }
    }

    /// Clears the flags for intermediates that are never written in `mode`.
    ///
    /// In streaming mode the pileup is always piped, and so is the extraction when
    /// there is a single input.
    #[must_use]
    pub fn for_mode(self, mode: ExecutionMode, input_count: usize) -> Self {
        if mode == ExecutionMode::DiskRelay {
            return self;
        }
        let extract_piped = input_count <= 1;
        if self.keep_pileup || (self.keep_extracted && extract_piped) {
            warn!("Intermediate files are piped in {mode} mode and cannot be kept");
        }
        Self {
            keep_extracted: self.keep_extracted && !extract_piped,
            keep_pileup: false,
            keep_region_calls: self.keep_region_calls,
        }
    }
}
