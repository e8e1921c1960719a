//! End-to-end tests for `chromosplit batch`.

use std::fs;

use tempfile::TempDir;

use crate::helpers::{FakeTools, chromosplit, run, stderr, write_header_only_bam};

#[test]
fn test_batch_writes_one_output_per_input() {
    let dir = TempDir::new().unwrap();
    let tools = FakeTools::install(dir.path());
    let bams = dir.path().join("bams");
    fs::create_dir(&bams).unwrap();
    write_header_only_bam(&bams.join("tumor.bam"), &["chr2", "chr1"]);
    write_header_only_bam(&bams.join("normal.bam"), &["chrX", "chr3"]);
    let out = dir.path().join("calls");

    let result = run(chromosplit(dir.path())
        .arg("batch")
        .args(tools.args())
        .arg("--input-dir")
        .arg(&bams)
        .arg("--output-dir")
        .arg(&out)
        .args(["--files-in-parallel", "2", "--regions-in-parallel", "2"]));

    assert!(result.status.success(), "batch failed: {}", stderr(&result));
    assert_eq!(
        fs::read_to_string(out.join("tumor.vcf")).unwrap(),
        "##fileformat=VCFv4.1\n#CHROM\tPOS\nchr1\t100\nchr2\t100\n"
    );
    assert_eq!(
        fs::read_to_string(out.join("normal.vcf")).unwrap(),
        "##fileformat=VCFv4.1\n#CHROM\tPOS\nchr3\t100\nchrX\t100\n"
    );
    assert!(!dir.path().join("chromosplit_batch").exists(), "work dir should be removed");
}

#[test]
fn test_batch_failure_in_one_input_spares_the_other() {
    let dir = TempDir::new().unwrap();
    let tools = FakeTools::install(dir.path());
    let first = write_header_only_bam(&dir.path().join("first.bam"), &["chr1"]);
    let second = write_header_only_bam(&dir.path().join("second.bam"), &["chr1", "chrM"]);
    let out = dir.path().join("calls");

    let result = run(chromosplit(dir.path())
        .env("FAIL_REGION", "chrM")
        .arg("batch")
        .args(tools.args())
        .arg("-i")
        .arg(&first)
        .arg(&second)
        .arg("-O")
        .arg(&out));

    assert!(!result.status.success());
    assert!(stderr(&result).contains("1 of 2 input(s) failed"));
    assert!(out.join("first.vcf").is_file());
    assert!(!out.join("second.vcf").exists());
}

#[test]
fn test_batch_rejects_existing_work_dir() {
    let dir = TempDir::new().unwrap();
    let tools = FakeTools::install(dir.path());
    let bam = write_header_only_bam(&dir.path().join("sample.bam"), &["chr1"]);
    fs::create_dir(dir.path().join("chromosplit_batch")).unwrap();

    let result = run(chromosplit(dir.path())
        .arg("batch")
        .args(tools.args())
        .arg("-i")
        .arg(&bam)
        .arg("-O")
        .arg(dir.path().join("calls")));

    assert!(!result.status.success());
    assert!(stderr(&result).contains("already exists"));
}
