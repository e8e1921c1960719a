//! End-to-end tests for `chromosplit regions`.

use std::fs;

use tempfile::TempDir;

use crate::helpers::{chromosplit, run, stderr, write_header_only_bam};

#[test]
fn test_regions_prints_natural_order() {
    let dir = TempDir::new().unwrap();
    let bam = write_header_only_bam(
        &dir.path().join("sample.bam"),
        &["chrX", "chr10", "chr2", "chr1", "chrM"],
    );

    let result = run(chromosplit(dir.path()).args(["-q", "regions", "-i"]).arg(&bam));

    assert!(result.status.success(), "regions failed: {}", stderr(&result));
    assert_eq!(String::from_utf8(result.stdout).unwrap(), "chr1\nchr2\nchr10\nchrM\nchrX\n");
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 2, "no scratch may be created");
}

#[test]
fn test_regions_to_file() {
    let dir = TempDir::new().unwrap();
    let bam = write_header_only_bam(&dir.path().join("sample.bam"), &["chr2", "chr1"]);
    let output = dir.path().join("regions.txt");

    let result = run(chromosplit(dir.path()).args(["regions", "-i"]).arg(&bam).arg("-o").arg(&output));

    assert!(result.status.success(), "regions failed: {}", stderr(&result));
    assert_eq!(fs::read_to_string(&output).unwrap(), "chr1\nchr2\n");
}

#[test]
fn test_regions_inconsistent_headers() {
    let dir = TempDir::new().unwrap();
    let a = write_header_only_bam(&dir.path().join("a.bam"), &["chr1", "chr2"]);
    let b = write_header_only_bam(&dir.path().join("b.bam"), &["chr1", "chr3"]);

    let result = run(chromosplit(dir.path()).args(["regions", "-i"]).arg(&a).arg(&b));

    assert!(!result.status.success());
    let err = stderr(&result);
    assert!(err.contains("missing [chr2]"), "{err}");
    assert!(err.contains("unexpected [chr3]"), "{err}");
}

#[test]
fn test_regions_requires_one_input_source() {
    let dir = TempDir::new().unwrap();
    let result = run(chromosplit(dir.path()).arg("regions"));
    assert!(!result.status.success());
}
