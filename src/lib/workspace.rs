//! Run-scoped scratch storage.
//!
//! Layout under the run root:
//!
//! ```text
//! <root>/
//!   calls/<stem>.vcf          per-region call artifacts, consumed by the merge
//!   <stem>/<stem>.<i>.bam     region extracted from input i
//!   <stem>/<stem>.pileup      region pileup
//! ```
//!
//! Directories are never reused: creating one that already exists fails with
//! [`ChromosplitError::PathCollision`] and leaves the existing directory alone.
//! Removal only ever targets files this workspace handed out, and directories are
//! removed with `remove_dir`, so anything unexpected left behind is reported
//! rather than deleted.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::{debug, warn};

use crate::config::Retention;
use crate::errors::ChromosplitError;
use crate::region::Region;
use crate::stage::StageKind;

/// Name of the directory holding per-region call artifacts.
pub const CALLS_DIR: &str = "calls";

/// Extension of per-region call artifacts.
pub const ARTIFACT_EXTENSION: &str = "vcf";

/// Creates `path` as a new directory, failing if it already exists.
///
/// # Errors
///
/// Returns [`ChromosplitError::PathCollision`] if `path` exists, or the I/O error
/// if it cannot be created.
pub fn create_fresh_dir(path: &Path) -> Result<()> {
    match fs::create_dir(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::AlreadyExists => {
            Err(ChromosplitError::PathCollision { path: path.display().to_string() }.into())
        }
        Err(e) => {
            Err(e).with_context(|| format!("Failed to create directory: {}", path.display()))
        }
    }
}

/// Removes an empty directory, warning instead of failing when it cannot be removed.
///
/// Returns true if the directory is gone.
pub fn remove_dir_or_warn(path: &Path) -> bool {
    match fs::remove_dir(path) {
        Ok(()) => true,
        Err(e) if e.kind() == ErrorKind::NotFound => true,
        Err(e) => {
            warn!("Could not remove {}: {e}", path.display());
            false
        }
    }
}

fn remove_file_if_exists(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Err(e) if e.kind() != ErrorKind::NotFound => {
            Err(e).with_context(|| format!("Failed to remove {}", path.display()))
        }
        _ => Ok(()),
    }
}

/// The scratch root of one run.
#[derive(Debug)]
pub struct Workspace {
    root: PathBuf,
    calls_dir: PathBuf,
}

impl Workspace {
    /// Creates the run root and its `calls` directory.
    ///
    /// Missing parent directories are created; the root itself must not exist.
    ///
    /// # Errors
    ///
    /// Returns [`ChromosplitError::PathCollision`] if `root` already exists.
    pub fn create(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        if root.exists() {
            return Err(ChromosplitError::PathCollision { path: root.display().to_string() }.into());
        }
        if let Some(parent) = root.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }
        create_fresh_dir(&root)?;
        let calls_dir = root.join(CALLS_DIR);
        create_fresh_dir(&calls_dir)?;
        debug!("Created workspace {}", root.display());
        Ok(Self { root, calls_dir })
    }

    /// The run root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The directory holding per-region call artifacts.
    #[must_use]
    pub fn calls_dir(&self) -> &Path {
        &self.calls_dir
    }

    /// Scratch space for one region. Nothing is created until a path is acquired.
    #[must_use]
    pub fn scratch(&self, region: &Region) -> RegionScratch {
        let stem = region.file_stem();
        RegionScratch {
            dir: self.root.join(&stem),
            artifact: self.calls_dir.join(format!("{stem}.{ARTIFACT_EXTENSION}")),
            stem,
            dir_created: false,
            acquired: Vec::new(),
        }
    }

    /// Removes the `calls` directory and the root if they are empty.
    ///
    /// Returns true if the root is gone.
    pub fn finish(self) -> bool {
        remove_dir_or_warn(&self.calls_dir);
        let removed = remove_dir_or_warn(&self.root);
        if removed {
            debug!("Removed workspace {}", self.root.display());
        }
        removed
    }
}

/// Scratch paths belonging to one region, owned by the worker running it.
#[derive(Debug)]
pub struct RegionScratch {
    stem: String,
    dir: PathBuf,
    artifact: PathBuf,
    dir_created: bool,
    acquired: Vec<Acquired>,
}

/// A path handed out by [`RegionScratch::acquire`].
#[derive(Debug)]
struct Acquired {
    stage: StageKind,
    path: PathBuf,
    complete: bool,
}

impl RegionScratch {
    /// The region's scratch directory (created lazily).
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the region's call artifact.
    #[must_use]
    pub fn artifact(&self) -> &Path {
        &self.artifact
    }

    /// Returns the output path for `stage`, creating the region directory on
    /// first use. `index` distinguishes the extraction of each input.
    ///
    /// Acquiring the same path twice returns it again without checks, and marks
    /// it incomplete until [`RegionScratch::complete`] is called again.
    ///
    /// # Errors
    ///
    /// Returns [`ChromosplitError::PathCollision`] if the region directory or the
    /// call artifact already exists when first acquired.
    pub fn acquire(&mut self, stage: StageKind, index: usize) -> Result<PathBuf> {
        let path = match stage {
            StageKind::Extract => self.dir.join(format!("{}.{index}.bam", self.stem)),
            StageKind::Transform => self.dir.join(format!("{}.pileup", self.stem)),
            StageKind::Call => self.artifact.clone(),
        };
        if let Some(entry) = self.acquired.iter_mut().find(|a| a.path == path) {
            entry.complete = false;
            return Ok(path);
        }

        match stage {
            StageKind::Call => {
                if path.exists() {
                    return Err(
                        ChromosplitError::PathCollision { path: path.display().to_string() }.into()
                    );
                }
            }
            StageKind::Extract | StageKind::Transform => {
                if !self.dir_created {
                    create_fresh_dir(&self.dir)?;
                    self.dir_created = true;
                }
            }
        }
        self.acquired.push(Acquired { stage, path: path.clone(), complete: false });
        Ok(path)
    }

    /// Records that the stage writing `path` finished successfully. Only
    /// completed intermediates are eligible for retention.
    pub fn complete(&mut self, path: &Path) {
        if let Some(entry) = self.acquired.iter_mut().find(|a| a.path == path) {
            entry.complete = true;
        }
    }

    /// Removes the call artifact after a failed attempt.
    ///
    /// Nothing is removed unless this scratch acquired the artifact, so a path
    /// that collided with another file is never touched.
    ///
    /// # Errors
    ///
    /// Returns an error if the artifact exists but cannot be removed.
    pub fn discard_artifact(&mut self) -> Result<()> {
        if !self.acquired.iter().any(|a| a.path == self.artifact) {
            return Ok(());
        }
        remove_file_if_exists(&self.artifact)
    }

    /// Removes the intermediates not retained by `retention`, then the region
    /// directory. Keep flags apply only to intermediates whose stage completed;
    /// partial output of a failed stage is always removed. A directory that
    /// cannot be removed is reported, not forced.
    ///
    /// The call artifact is left in place.
    pub fn release(self, retention: Retention) {
        let mut kept = 0usize;
        for Acquired { stage, path, complete } in &self.acquired {
            let keep = match stage {
                StageKind::Extract => retention.keep_extracted,
                StageKind::Transform => retention.keep_pileup,
                StageKind::Call => continue,
            };
            if keep && *complete && path.exists() {
                kept += 1;
            } else if let Err(e) = remove_file_if_exists(path) {
                warn!("{e:#}");
            }
        }

        if !self.dir_created {
            return;
        }
        if kept > 0 {
            debug!("Kept {kept} intermediate file(s) in {}", self.dir.display());
        } else {
            remove_dir_or_warn(&self.dir);
        }
    }
}
