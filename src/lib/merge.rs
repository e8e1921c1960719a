//! Deterministic reassembly of per-region artifacts.
//!
//! The merged file is written to a temporary file next to the destination and
//! renamed into place only once every contributing artifact has been copied, so
//! the destination is never observed truncated or half-written, and is not
//! touched at all when the merge is refused.

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::ValueEnum;
use log::{info, warn};
use tempfile::NamedTempFile;

use crate::errors::ChromosplitError;
use crate::region::Region;

/// How artifacts are joined.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum MergeFormat {
    /// VCF-aware: `#` header lines are taken from the first artifact only.
    #[default]
    Vcf,
    /// Byte-for-byte concatenation.
    Concat,
}

/// Whether regions without an artifact block the merge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MergePolicy {
    /// Every requested region must have an artifact.
    #[default]
    CompleteOnly,
    /// Merge whatever is available and report the rest.
    AllowPartial,
}

/// What a merge wrote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeSummary {
    /// The merged file.
    pub output: PathBuf,
    /// Regions merged, in output order.
    pub merged: Vec<String>,
    /// Requested regions left out (only with [`MergePolicy::AllowPartial`]).
    pub missing: Vec<String>,
}

/// Concatenates per-region artifacts in canonical region order.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResultMerger {
    format: MergeFormat,
    policy: MergePolicy,
    remove_inputs: bool,
}

impl ResultMerger {
    /// Creates a merger.
    #[must_use]
    pub fn new(format: MergeFormat, policy: MergePolicy) -> Self {
        Self { format, policy, remove_inputs: false }
    }

    /// Deletes the contributing artifacts after a successful merge.
    #[must_use]
    pub fn remove_inputs(mut self, remove: bool) -> Self {
        self.remove_inputs = remove;
        self
    }

    /// Merges `artifacts` covering `requested` into `output`.
    ///
    /// `artifacts` may arrive in any order; the output follows region rank.
    ///
    /// # Errors
    ///
    /// Returns [`ChromosplitError::MergeIncomplete`] without touching `output` if
    /// a requested region has no artifact under [`MergePolicy::CompleteOnly`], or
    /// if no artifact is available at all. I/O failures are reported with context.
    pub fn merge(
        &self,
        requested: &[Region],
        artifacts: &[(Region, PathBuf)],
        output: &Path,
    ) -> Result<MergeSummary> {
        let by_name: HashMap<&str, &(Region, PathBuf)> =
            artifacts.iter().map(|entry| (entry.0.name(), entry)).collect();

        let mut ordered: Vec<&Region> = requested.iter().collect();
        ordered.sort();
        let missing: Vec<String> = ordered
            .iter()
            .filter(|region| {
                by_name.get(region.name()).is_none_or(|(_, path)| !path.is_file())
            })
            .map(|region| region.name().to_string())
            .collect();

        if missing.len() == ordered.len()
            || (!missing.is_empty() && self.policy == MergePolicy::CompleteOnly)
        {
            return Err(ChromosplitError::MergeIncomplete { missing }.into());
        }
        if !missing.is_empty() {
            warn!("Merging without {} region(s): {}", missing.len(), missing.join(", "));
        }

        let contributing: Vec<&(Region, PathBuf)> = ordered
            .iter()
            .filter_map(|region| by_name.get(region.name()).copied())
            .filter(|(_, path)| path.is_file())
            .collect();

        self.write_atomically(&contributing, output)?;
        info!("Merged {} region(s) into {}", contributing.len(), output.display());

        if self.remove_inputs {
            for (_, path) in &contributing {
                if let Err(e) = fs::remove_file(path) {
                    warn!("Could not remove {}: {e}", path.display());
                }
            }
        }

        Ok(MergeSummary {
            output: output.to_path_buf(),
            merged: contributing.iter().map(|(region, _)| region.name().to_string()).collect(),
            missing,
        })
    }

    fn write_atomically(&self, contributing: &[&(Region, PathBuf)], output: &Path) -> Result<()> {
        let parent = match output.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let temp = NamedTempFile::new_in(parent)
            .with_context(|| format!("Failed to create temporary file in {}", parent.display()))?;

        {
            let mut writer = BufWriter::new(temp.as_file());
            for (idx, (region, path)) in contributing.iter().enumerate() {
                let file = File::open(path)
                    .with_context(|| format!("Failed to open artifact for {region}: {}", path.display()))?;
                match self.format {
                    MergeFormat::Concat => {
                        io::copy(&mut BufReader::new(file), &mut writer)?;
                    }
                    MergeFormat::Vcf => copy_vcf(BufReader::new(file), &mut writer, idx == 0)?,
                }
            }
            writer.flush()?;
        }

        temp.persist(output)
            .map_err(|e| e.error)
            .with_context(|| format!("Failed to write merged output: {}", output.display()))?;
        Ok(())
    }
}

/// Copies VCF lines, dropping `#` header lines unless `keep_header` is set.
/// Every copied line is newline-terminated.
fn copy_vcf<R: BufRead, W: Write>(mut reader: R, writer: &mut W, keep_header: bool) -> io::Result<()> {
    let mut line = Vec::new();
    loop {
        line.clear();
        if reader.read_until(b'\n', &mut line)? == 0 {
            return Ok(());
        }
        if !keep_header && line.first() == Some(&b'#') {
            continue;
        }
        writer.write_all(&line)?;
        if line.last() != Some(&b'\n') {
            writer.write_all(b"\n")?;
        }
    }
}
