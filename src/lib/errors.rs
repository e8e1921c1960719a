//! Custom error types for chromosplit operations.

use thiserror::Error;

/// Result type alias for chromosplit operations
pub type Result<T> = std::result::Result<T, ChromosplitError>;

/// Error type for chromosplit operations
#[derive(Error, Debug)]
pub enum ChromosplitError {
    /// Invalid or missing configuration (paths, tool locations, input selection)
    #[error("Invalid configuration '{parameter}': {reason}")]
    Configuration {
        /// The parameter or setting at fault
        parameter: String,
        /// Explanation of why it's invalid
        reason: String,
    },

    /// File format error
    #[error("Invalid {file_type} file '{path}': {reason}")]
    InvalidFileFormat {
        /// Type of file (e.g., "BAM", "token list")
        file_type: String,
        /// Path to the file
        path: String,
        /// Explanation of the problem
        reason: String,
    },

    /// Two alignment sources disagree on their region sets
    #[error(
        "Header of '{source_path}' does not match '{reference_path}': missing [{}], unexpected [{}]",
        .missing.join(", "),
        .unexpected.join(", ")
    )]
    HeaderInconsistency {
        /// The source whose header diverges
        source_path: String,
        /// The source it was compared against
        reference_path: String,
        /// Regions present in the reference but absent from the divergent source
        missing: Vec<String>,
        /// Regions present in the divergent source but absent from the reference
        unexpected: Vec<String>,
    },

    /// An alignment source declares no regions at all
    #[error("No regions found in the header of '{path}'")]
    NoRegions {
        /// Path to the source
        path: String,
    },

    /// A scratch path that must be created fresh already exists
    #[error("'{path}' already exists; please remove, rename or move it")]
    PathCollision {
        /// The pre-existing path
        path: String,
    },

    /// Merging was requested but some regions never produced an artifact
    #[error("Cannot merge: {} region(s) did not complete: {}", .missing.len(), .missing.join(", "))]
    MergeIncomplete {
        /// Regions with no completed artifact
        missing: Vec<String>,
    },

    /// A region failed and the caller asked for that to fail the run
    #[error("Region '{region}' failed during {stage}: {detail}")]
    StageFailure {
        /// The region name
        region: String,
        /// The stage that failed
        stage: String,
        /// Exit detail of the failing stage
        detail: String,
    },
}

impl ChromosplitError {
    /// Shorthand for a [`ChromosplitError::Configuration`] error.
    pub fn configuration(parameter: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Configuration { parameter: parameter.into(), reason: reason.into() }
    }
}
