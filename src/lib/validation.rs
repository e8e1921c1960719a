//! Input validation utilities
//!
//! Common checks for command-line parameters, file paths and external tool
//! locations, reported through the structured errors in [`crate::errors`].

use crate::errors::{ChromosplitError, Result};
use std::env;
use std::path::{Path, PathBuf};

/// Validate that a file exists
///
/// # Arguments
/// * `path` - Path to validate
/// * `description` - Human-readable description of the file (e.g., "Input BAM", "Caller jar")
///
/// # Errors
/// Returns an error if the file does not exist
///
/// # Example
/// ```
/// use chromosplit_lib::validation::validate_file_exists;
///
/// let result = validate_file_exists("/nonexistent/file.bam", "Input BAM");
/// assert!(result.is_err());
/// ```
pub fn validate_file_exists<P: AsRef<Path>>(path: P, description: &str) -> Result<()> {
    let path_ref = path.as_ref();
    if !path_ref.is_file() {
        return Err(ChromosplitError::InvalidFileFormat {
            file_type: description.to_string(),
            path: path_ref.display().to_string(),
            reason: "File does not exist".to_string(),
        });
    }
    Ok(())
}

/// Validate that a concurrency setting is at least one
///
/// # Errors
/// Returns an error if `value` is zero
///
/// # Example
/// ```
/// use chromosplit_lib::validation::validate_concurrency;
///
/// assert!(validate_concurrency(4, "--regions-in-parallel").is_ok());
/// assert!(validate_concurrency(0, "--regions-in-parallel").is_err());
/// ```
pub fn validate_concurrency(value: usize, name: &str) -> Result<()> {
    if value == 0 {
        return Err(ChromosplitError::configuration(name, "must be at least 1"));
    }
    Ok(())
}

/// Resolve an external tool to an executable path.
///
/// A value containing a path separator must name an existing file. A bare
/// program name is looked up on `PATH`.
///
/// # Errors
/// Returns a [`ChromosplitError::Configuration`] error naming `parameter` when
/// the tool cannot be found.
pub fn resolve_tool(program: &str, parameter: &str) -> Result<PathBuf> {
    if program.is_empty() {
        return Err(ChromosplitError::configuration(parameter, "tool location is empty"));
    }

    let candidate = Path::new(program);
    if candidate.components().count() > 1 || candidate.is_absolute() {
        if candidate.is_file() {
            return Ok(candidate.to_path_buf());
        }
        return Err(ChromosplitError::configuration(
            parameter,
            format!("'{program}' does not exist or is not a file"),
        ));
    }

    env::var_os("PATH")
        .iter()
        .flat_map(env::split_paths)
        .map(|dir| dir.join(program))
        .find(|path| is_executable(path))
        .ok_or_else(|| {
            ChromosplitError::configuration(parameter, format!("'{program}' was not found on PATH"))
        })
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata().is_ok_and(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use tempfile::{NamedTempFile, TempDir};

    #[test]
    fn test_validate_file_exists_valid() {
        let temp_file = NamedTempFile::new().unwrap();
        validate_file_exists(temp_file.path(), "Test file").unwrap();
    }

    #[test]
    fn test_validate_file_exists_invalid() {
        let result = validate_file_exists("/nonexistent/file.bam", "Input BAM");
        let err_msg = result.unwrap_err().to_string();
        assert!(err_msg.contains("Input BAM"));
        assert!(err_msg.contains("does not exist"));
    }

    #[test]
    fn test_validate_file_exists_rejects_directory() {
        let dir = TempDir::new().unwrap();
        assert!(validate_file_exists(dir.path(), "Caller jar").is_err());
    }

    #[rstest]
    #[case(0, false)]
    #[case(1, true)]
    #[case(64, true)]
    fn test_validate_concurrency(#[case] value: usize, #[case] ok: bool) {
        assert_eq!(validate_concurrency(value, "--regions-in-parallel").is_ok(), ok);
    }

    #[cfg(unix)]
    #[test]
    fn test_resolve_tool_on_path() {
        let resolved = resolve_tool("sh", "--samtools").unwrap();
        assert!(resolved.ends_with("sh"));
    }

    #[test]
    fn test_resolve_tool_missing_bare_name() {
        let err = resolve_tool("definitely-not-a-real-tool-xyz", "--samtools").unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("--samtools"));
        assert!(msg.contains("not found on PATH"));
    }

    #[test]
    fn test_resolve_tool_explicit_path() {
        let temp_file = NamedTempFile::new().unwrap();
        let path = temp_file.path().to_str().unwrap();
        assert_eq!(resolve_tool(path, "--java").unwrap(), temp_file.path());

        let err = resolve_tool("/nonexistent/bin/java", "--java").unwrap_err();
        assert!(err.to_string().contains("does not exist"));
    }

    #[test]
    fn test_resolve_tool_empty() {
        assert!(resolve_tool("", "--java").is_err());
    }
}
