//! Input selection: explicit paths, a directory scan, or a list file.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::errors::ChromosplitError;
use crate::region::natural_compare;
use crate::validation::validate_file_exists;

/// Extension that identifies alignment inputs in directory scans and list files.
pub const BAM_EXTENSION: &str = "bam";

/// Where the alignment inputs come from. Exactly one kind is used per run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputSource {
    /// Paths given directly.
    Paths(Vec<PathBuf>),
    /// Every `*.bam` directly inside a directory (not recursive).
    Directory(PathBuf),
    /// A text file with one BAM path per line.
    List(PathBuf),
}

impl InputSource {
    /// Builds the source from the three mutually exclusive options.
    ///
    /// # Errors
    ///
    /// Returns [`ChromosplitError::Configuration`] unless exactly one option is set.
    pub fn from_options(
        paths: &[PathBuf],
        directory: Option<&Path>,
        list: Option<&Path>,
    ) -> crate::errors::Result<Self> {
        let given = usize::from(!paths.is_empty())
            + usize::from(directory.is_some())
            + usize::from(list.is_some());
        if given != 1 {
            return Err(ChromosplitError::configuration(
                "input",
                format!(
                    "exactly one of --input, --input-dir or --input-list is required, got {given}"
                ),
            ));
        }

        Ok(match (directory, list) {
            (Some(dir), None) => Self::Directory(dir.to_path_buf()),
            (None, Some(list)) => Self::List(list.to_path_buf()),
            _ => Self::Paths(paths.to_vec()),
        })
    }

    /// Expands the source into the ordered list of BAM paths, each checked to exist.
    ///
    /// # Errors
    ///
    /// Returns an error if a directory or list cannot be read, a list entry does
    /// not name a `.bam` file, any path does not exist, or no input is found.
    pub fn resolve(&self) -> Result<Vec<PathBuf>> {
        let paths = match self {
            Self::Paths(paths) => paths.clone(),
            Self::Directory(dir) => scan_directory(dir)?,
            Self::List(list) => read_list(list)?,
        };

        if paths.is_empty() {
            return Err(ChromosplitError::configuration(
                "input",
                format!("no BAM files found in {}", self.describe()),
            )
            .into());
        }
        for path in &paths {
            validate_file_exists(path, "Input BAM")?;
        }
        Ok(paths)
    }

    fn describe(&self) -> String {
        match self {
            Self::Paths(_) => "--input".to_string(),
            Self::Directory(dir) => dir.display().to_string(),
            Self::List(list) => list.display().to_string(),
        }
    }
}

fn has_bam_extension(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == BAM_EXTENSION)
}

fn scan_directory(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for entry in fs::read_dir(dir)
        .with_context(|| format!("Failed to read input directory: {}", dir.display()))?
    {
        let path = entry?.path();
        if path.is_file() && has_bam_extension(&path) {
            paths.push(path);
        }
    }
    paths.sort_by(|a, b| natural_compare(&a.to_string_lossy(), &b.to_string_lossy()));
    Ok(paths)
}

fn read_list(list: &Path) -> Result<Vec<PathBuf>> {
    let contents = fs::read_to_string(list)
        .with_context(|| format!("Failed to read input list: {}", list.display()))?;

    let mut paths = Vec::new();
    for line in contents.lines().map(str::trim).filter(|line| !line.is_empty()) {
        let path = PathBuf::from(line);
        if !has_bam_extension(&path) {
            return Err(ChromosplitError::configuration(
                "--input-list",
                format!("'{line}' in {} is not a .bam file", list.display()),
            )
            .into());
        }
        paths.push(path);
    }
    Ok(paths)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn touch(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, b"").unwrap();
        path
    }

    #[test]
    fn test_from_options_exactly_one() {
        let paths = vec![PathBuf::from("a.bam")];
        let dir = Path::new("in");
        let list = Path::new("list.txt");

        assert!(InputSource::from_options(&[], None, None).is_err());
        assert!(InputSource::from_options(&paths, Some(dir), None).is_err());
        assert!(InputSource::from_options(&[], Some(dir), Some(list)).is_err());
        assert_eq!(
            InputSource::from_options(&paths, None, None).unwrap(),
            InputSource::Paths(paths.clone())
        );
        assert_eq!(
            InputSource::from_options(&[], Some(dir), None).unwrap(),
            InputSource::Directory(dir.to_path_buf())
        );
        assert_eq!(
            InputSource::from_options(&[], None, Some(list)).unwrap(),
            InputSource::List(list.to_path_buf())
        );
    }

    #[test]
    fn test_directory_scan_filters_and_sorts() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "s10.bam");
        touch(dir.path(), "s2.bam");
        touch(dir.path(), "s2.bam.bai");
        touch(dir.path(), "notes.txt");
        fs::create_dir(dir.path().join("nested.bam")).unwrap();

        let paths = InputSource::Directory(dir.path().to_path_buf()).resolve().unwrap();
        let names: Vec<_> =
            paths.iter().map(|p| p.file_name().unwrap().to_string_lossy().into_owned()).collect();
        assert_eq!(names, ["s2.bam", "s10.bam"]);
    }

    #[test]
    fn test_directory_scan_empty() {
        let dir = TempDir::new().unwrap();
        let err = InputSource::Directory(dir.path().to_path_buf()).resolve().unwrap_err();
        assert!(err.to_string().contains("no BAM files found"));
    }

    #[test]
    fn test_list_file() {
        let dir = TempDir::new().unwrap();
        let a = touch(dir.path(), "a.bam");
        let b = touch(dir.path(), "b.bam");
        let list = dir.path().join("inputs.txt");
        fs::write(&list, format!("{}\n\n  {}  \n", a.display(), b.display())).unwrap();

        assert_eq!(InputSource::List(list).resolve().unwrap(), [a, b]);
    }

    #[test]
    fn test_list_file_rejects_non_bam() {
        let dir = TempDir::new().unwrap();
        let list = dir.path().join("inputs.txt");
        fs::write(&list, "sample.cram\n").unwrap();

        let err = InputSource::List(list).resolve().unwrap_err();
        assert!(err.to_string().contains("is not a .bam file"));
    }

    #[test]
    fn test_paths_must_exist() {
        let err = InputSource::Paths(vec![PathBuf::from("/nonexistent/a.bam")]).resolve().unwrap_err();
        assert!(err.to_string().contains("does not exist"));
    }
}
