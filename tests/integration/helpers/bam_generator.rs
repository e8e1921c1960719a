//! Utilities for generating test BAM data programmatically.

use std::fs::File;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

use noodles::sam::Header;
use noodles::sam::alignment::io::Write as _;
use noodles::sam::header::record::value::{Map, map::ReferenceSequence};

/// Writes a header-only BAM declaring `names` as its reference sequences, plus
/// an empty `.bai` next to it.
///
/// Region discovery only reads the header, so no records are needed, and the
/// fake samtools never reads the index.
pub fn write_header_only_bam(path: &Path, names: &[&str]) -> PathBuf {
    let bam = write_unindexed_bam(path, names);
    let mut index = bam.as_os_str().to_owned();
    index.push(".bai");
    File::create(PathBuf::from(index)).unwrap();
    bam
}

/// Writes a header-only BAM with no index.
pub fn write_unindexed_bam(path: &Path, names: &[&str]) -> PathBuf {
    let mut builder = Header::builder();
    for name in names {
        builder = builder.add_reference_sequence(
            *name,
            Map::<ReferenceSequence>::new(NonZeroUsize::new(10_000).unwrap()),
        );
    }
    let header = builder.build();

    let mut writer = noodles::bam::io::Writer::new(File::create(path).unwrap());
    writer.write_header(&header).unwrap();
    writer.finish(&header).unwrap();
    path.to_path_buf()
}
