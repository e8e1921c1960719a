//! BAM header access and index discovery.
//!
//! Only alignment headers are ever read in-process; the records themselves are
//! handled by the external tools.

use std::fs::File;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use bstr::ByteSlice;
use noodles::sam::Header;

use crate::errors::ChromosplitError;

/// Index file extensions recognized next to a BAM, in lookup order.
const INDEX_SUFFIXES: [&str; 2] = ["bai", "csi"];

/// Reads the header of a BAM file.
///
/// # Errors
///
/// Returns an error if the file cannot be opened or is not a valid BAM.
///
/// # Example
///
/// ```no_run
/// use chromosplit_lib::bam_io::read_bam_header;
///
/// let header = read_bam_header("input.bam").unwrap();
/// println!("{} reference sequences", header.reference_sequences().len());
/// ```
pub fn read_bam_header<P: AsRef<Path>>(path: P) -> Result<Header> {
    let path_ref = path.as_ref();
    let file = File::open(path_ref)
        .with_context(|| format!("Failed to open input BAM: {}", path_ref.display()))?;

    let mut reader = noodles::bam::io::Reader::new(file);
    let header = reader
        .read_header()
        .with_context(|| format!("Failed to read header from: {}", path_ref.display()))?;

    Ok(header)
}

/// Returns the reference-sequence names declared by a header, in header order.
///
/// # Errors
///
/// Returns [`ChromosplitError::InvalidFileFormat`] if a name is not valid UTF-8.
pub fn reference_names(header: &Header, path: &Path) -> Result<Vec<String>> {
    header
        .reference_sequences()
        .keys()
        .map(|name| {
            name.to_str().map(str::to_owned).map_err(|_| {
                ChromosplitError::InvalidFileFormat {
                    file_type: "BAM".to_string(),
                    path: path.display().to_string(),
                    reason: format!("reference name is not valid UTF-8: {}", name.as_bstr()),
                }
                .into()
            })
        })
        .collect()
}

/// Locates an existing index for a BAM file.
///
/// Both `<name>.bam.bai` and `<name>.bai` (plus the `.csi` variants) are
/// accepted.
#[must_use]
pub fn find_index(bam: &Path) -> Option<PathBuf> {
    INDEX_SUFFIXES.iter().find_map(|suffix| {
        let mut appended = bam.as_os_str().to_owned();
        appended.push(".");
        appended.push(suffix);
        let appended = PathBuf::from(appended);
        if appended.is_file() {
            return Some(appended);
        }
        let replaced = bam.with_extension(suffix);
        replaced.is_file().then_some(replaced)
    })
}
