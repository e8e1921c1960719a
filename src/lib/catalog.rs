//! Region discovery across one or more alignment sources.
//!
//! Every source contributes the reference-sequence names from its header. All
//! sources used together must declare the same set of names (order may differ);
//! the agreed set is returned in canonical natural order.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use anyhow::Result as AnyhowResult;
use log::debug;
use rayon::prelude::*;

use crate::bam_io::{find_index, read_bam_header, reference_names};
use crate::errors::{ChromosplitError, Result};
use crate::region::{Region, canonical_regions, natural_compare};

/// An alignment file together with the region names its header declares.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlignmentSource {
    path: PathBuf,
    regions: Vec<String>,
}

impl AlignmentSource {
    /// Creates a source from an already-known list of region names.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, regions: Vec<String>) -> Self {
        Self { path: path.into(), regions }
    }

    /// Reads the header of a BAM file.
    ///
    /// # Errors
    ///
    /// Returns an error if the header cannot be read.
    pub fn open(path: &Path) -> AnyhowResult<Self> {
        let header = read_bam_header(path)?;
        let regions = reference_names(&header, path)?;
        debug!("{}: {} reference sequences", path.display(), regions.len());
        Ok(Self::new(path, regions))
    }

    /// Reads the headers of several BAM files in parallel, preserving input order.
    ///
    /// # Errors
    ///
    /// Returns the first error encountered.
    pub fn open_all(paths: &[PathBuf]) -> AnyhowResult<Vec<Self>> {
        paths.par_iter().map(|path| Self::open(path)).collect()
    }

    /// Path of the alignment file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Region names in header order.
    #[must_use]
    pub fn regions(&self) -> &[String] {
        &self.regions
    }
}

/// Computes the canonical region list shared by all `sources`.
///
/// # Errors
///
/// * [`ChromosplitError::Configuration`] if `sources` is empty
/// * [`ChromosplitError::NoRegions`] if the first source declares no regions
/// * [`ChromosplitError::HeaderInconsistency`] naming the first source whose
///   region set differs from the first source's
///
/// # Example
///
/// ```
/// use chromosplit_lib::catalog::{AlignmentSource, discover};
///
/// let a = AlignmentSource::new("a.bam", vec!["chr2".into(), "chr10".into(), "chr1".into()]);
/// let b = AlignmentSource::new("b.bam", vec!["chr1".into(), "chr2".into(), "chr10".into()]);
/// let regions = discover(&[a, b]).unwrap();
/// let names: Vec<&str> = regions.iter().map(|r| r.name()).collect();
/// assert_eq!(names, ["chr1", "chr2", "chr10"]);
/// ```
pub fn discover(sources: &[AlignmentSource]) -> Result<Vec<Region>> {
    let Some((reference, others)) = sources.split_first() else {
        return Err(ChromosplitError::configuration("input", "no alignment sources were given"));
    };

    if reference.regions.is_empty() {
        return Err(ChromosplitError::NoRegions { path: reference.path.display().to_string() });
    }

    let expected: BTreeSet<&str> = reference.regions.iter().map(String::as_str).collect();
    for source in others {
        let actual: BTreeSet<&str> = source.regions.iter().map(String::as_str).collect();
        if actual != expected {
            return Err(ChromosplitError::HeaderInconsistency {
                source_path: source.path.display().to_string(),
                reference_path: reference.path.display().to_string(),
                missing: sorted_difference(&expected, &actual),
                unexpected: sorted_difference(&actual, &expected),
            });
        }
    }

    let regions = canonical_regions(expected);
    debug!(
        "Regions: {}",
        regions.iter().map(Region::name).collect::<Vec<_>>().join(", ")
    );
    Ok(regions)
}

/// Checks that every input has a `.bai` or `.csi` index, which region
/// extraction needs.
///
/// # Errors
///
/// Returns [`ChromosplitError::Configuration`] naming the first unindexed input.
pub fn require_indexes(paths: &[PathBuf]) -> Result<()> {
    match paths.iter().find(|path| find_index(path).is_none()) {
        Some(path) => Err(ChromosplitError::configuration(
            "input",
            format!(
                "'{}' has no index (.bai or .csi); run samtools index or pass --index-missing",
                path.display()
            ),
        )),
        None => Ok(()),
    }
}

fn sorted_difference(left: &BTreeSet<&str>, right: &BTreeSet<&str>) -> Vec<String> {
    let mut names: Vec<String> = left.difference(right).map(|name| (*name).to_string()).collect();
    names.sort_by(|a, b| natural_compare(a, b));
    names
}
