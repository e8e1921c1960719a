//! End-to-end tests for `chromosplit call`.

use std::fs;
use std::path::{Path, PathBuf};

use rstest::rstest;
use tempfile::TempDir;

use crate::helpers::{
    FakeTools, chromosplit, run, stderr, write_header_only_bam, write_unindexed_bam,
};

const EXPECTED_VCF: &str = "##fileformat=VCFv4.1\n#CHROM\tPOS\nchr1\t100\nchr2\t100\nchr10\t100\n";

struct Fixture {
    dir: TempDir,
    tools: FakeTools,
    bam: PathBuf,
}

impl Fixture {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let tools = FakeTools::install(dir.path());
        let bam = write_header_only_bam(&dir.path().join("sample.bam"), &["chr10", "chr2", "chr1"]);
        Self { dir, tools, bam }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    fn call(&self) -> std::process::Command {
        let mut command = chromosplit(self.dir.path());
        command.arg("call").args(self.tools.args());
        command
    }
}

fn read(path: &Path) -> String {
    fs::read_to_string(path).unwrap()
}

#[rstest]
#[case("disk-relay")]
#[case("streaming-pipe")]
fn test_call_merges_in_natural_order(#[case] mode: &str) {
    let fx = Fixture::new();
    let output = fx.path("out.vcf");

    let result = run(fx.call().arg("-i").arg(&fx.bam).arg("-o").arg(&output).args(["--mode", mode]));

    assert!(result.status.success(), "call failed: {}", stderr(&result));
    assert_eq!(read(&output), EXPECTED_VCF);
    assert!(!fx.path("chromosplit_sample").exists(), "work dir should be removed");
}

#[test]
fn test_call_reruns_are_byte_identical() {
    let fx = Fixture::new();
    let first = fx.path("first.vcf");
    let second = fx.path("second.vcf");

    for output in [&first, &second] {
        let result =
            run(fx.call().arg("-i").arg(&fx.bam).arg("-o").arg(output).args(["-t", "3"]));
        assert!(result.status.success(), "call failed: {}", stderr(&result));
    }

    assert_eq!(fs::read(&first).unwrap(), fs::read(&second).unwrap());
}

#[rstest]
#[case("disk-relay")]
#[case("streaming-pipe")]
fn test_joint_call_over_two_inputs(#[case] mode: &str) {
    let fx = Fixture::new();
    let other = write_header_only_bam(&fx.path("other.bam"), &["chr1", "chr2", "chr10"]);
    let output = fx.path("joint.vcf");

    let result = run(fx
        .call()
        .arg("-i")
        .arg(&fx.bam)
        .arg(&other)
        .arg("-o")
        .arg(&output)
        .args(["--mode", mode]));

    assert!(result.status.success(), "call failed: {}", stderr(&result));
    assert_eq!(
        read(&output),
        "##fileformat=VCFv4.1\n#CHROM\tPOS\n\
         chr1\t100\nchr1\t100\nchr2\t100\nchr2\t100\nchr10\t100\nchr10\t100\n"
    );
}

#[test]
fn test_failed_region_blocks_merge() {
    let fx = Fixture::new();
    let output = fx.path("out.vcf");

    let result =
        run(fx.call().env("FAIL_REGION", "chr2").arg("-i").arg(&fx.bam).arg("-o").arg(&output));

    assert!(!result.status.success());
    let err = stderr(&result);
    assert!(err.contains("chr2"), "stderr should name the failed region: {err}");
    assert!(!output.exists(), "no partial output may be written");
    assert!(!fx.path("chromosplit_sample").exists(), "work dir should be removed");
}

#[test]
fn test_allow_partial_merges_the_rest() {
    let fx = Fixture::new();
    let output = fx.path("out.vcf");

    let result = run(fx
        .call()
        .env("FAIL_REGION", "chr2")
        .arg("-i")
        .arg(&fx.bam)
        .arg("-o")
        .arg(&output)
        .arg("--allow-partial"));

    assert!(result.status.success(), "call failed: {}", stderr(&result));
    assert_eq!(read(&output), "##fileformat=VCFv4.1\n#CHROM\tPOS\nchr1\t100\nchr10\t100\n");
}

#[test]
fn test_no_merge_leaves_region_calls() {
    let fx = Fixture::new();
    let work_dir = fx.path("scratch");

    let result =
        run(fx.call().arg("-i").arg(&fx.bam).arg("--no-merge").arg("-w").arg(&work_dir));

    assert!(result.status.success(), "call failed: {}", stderr(&result));
    for region in ["chr1", "chr2", "chr10"] {
        let artifact = work_dir.join("calls").join(format!("{region}_{}.vcf", rank(region)));
        assert!(artifact.is_file(), "missing {}", artifact.display());
    }
}

fn rank(region: &str) -> usize {
    ["chr1", "chr2", "chr10"].iter().position(|r| *r == region).unwrap()
}

#[test]
fn test_keep_all_keeps_intermediates() {
    let fx = Fixture::new();
    let work_dir = fx.path("scratch");
    let output = fx.path("out.vcf");

    let result = run(fx
        .call()
        .arg("-i")
        .arg(&fx.bam)
        .arg("-o")
        .arg(&output)
        .arg("-w")
        .arg(&work_dir)
        .arg("--keep-all"));

    assert!(result.status.success(), "call failed: {}", stderr(&result));
    assert_eq!(read(&output), EXPECTED_VCF);
    let region_dir = work_dir.join("chr10_2");
    assert!(region_dir.join("chr10_2.pileup").is_file());
    assert!(region_dir.join("chr10_2.0.bam").is_file());
}

#[test]
fn test_existing_work_dir_is_a_collision() {
    let fx = Fixture::new();
    let work_dir = fx.path("chromosplit_sample");
    fs::create_dir(&work_dir).unwrap();
    fs::write(work_dir.join("precious.txt"), "keep me").unwrap();
    let output = fx.path("out.vcf");

    let result = run(fx.call().arg("-i").arg(&fx.bam).arg("-o").arg(&output));

    assert!(!result.status.success());
    assert!(stderr(&result).contains("already exists"));
    assert_eq!(read(&work_dir.join("precious.txt")), "keep me");
    assert!(!output.exists());
}

#[test]
fn test_inconsistent_headers_abort_before_dispatch() {
    let fx = Fixture::new();
    let other = write_header_only_bam(&fx.path("other.bam"), &["chr1", "chr2"]);
    let output = fx.path("out.vcf");
    let args_log = fx.path("java.log");

    let result = run(fx
        .call()
        .env("ARGS_LOG", &args_log)
        .arg("-i")
        .arg(&fx.bam)
        .arg(&other)
        .arg("-o")
        .arg(&output));

    assert!(!result.status.success());
    assert!(stderr(&result).contains("chr10"));
    assert!(!args_log.exists(), "no stage may run");
    assert!(!fx.path("chromosplit_sample").exists());
}

#[test]
fn test_missing_caller_jar_is_fatal() {
    let fx = Fixture::new();
    fs::remove_file(&fx.tools.jar).unwrap();

    let result = run(fx.call().arg("-i").arg(&fx.bam).arg("-o").arg(fx.path("out.vcf")));

    assert!(!result.status.success());
    assert!(stderr(&result).contains("Caller jar"));
}

#[test]
fn test_missing_tool_is_fatal() {
    let fx = Fixture::new();
    let mut command = chromosplit(fx.dir.path());
    command
        .args(["call", "--samtools", "/nonexistent/samtools", "--caller-jar"])
        .arg(&fx.tools.jar)
        .arg("-i")
        .arg(&fx.bam)
        .arg("-o")
        .arg(fx.path("out.vcf"));

    let result = run(&mut command);

    assert!(!result.status.success());
    assert!(stderr(&result).contains("--samtools"));
}

#[test]
fn test_caller_tokens_are_appended() {
    let fx = Fixture::new();
    let conf = fx.path("varscan.conf");
    fs::write(&conf, "# thresholds\n--min-coverage\r\n\n8\n").unwrap();
    let args_log = fx.path("java.log");

    let result = run(fx
        .call()
        .env("ARGS_LOG", &args_log)
        .arg("-i")
        .arg(&fx.bam)
        .arg("-o")
        .arg(fx.path("out.vcf"))
        .args(["-t", "1"]));

    assert!(result.status.success(), "call failed: {}", stderr(&result));
    let log = read(&args_log);
    assert_eq!(log.lines().count(), 3);
    for line in log.lines() {
        assert!(line.contains("mpileup2snp"), "{line}");
        assert!(line.ends_with("--min-coverage 8"), "{line}");
    }
}

#[test]
fn test_report_lists_every_region() {
    let fx = Fixture::new();
    let report = fx.path("report.tsv");

    let result = run(fx
        .call()
        .env("FAIL_REGION", "chr10")
        .arg("-i")
        .arg(&fx.bam)
        .arg("--no-merge")
        .arg("--report")
        .arg(&report));

    assert!(result.status.success(), "call failed: {}", stderr(&result));
    let contents = read(&report);
    let lines: Vec<&str> = contents.lines().collect();
    assert_eq!(lines.len(), 4, "{contents}");
    assert!(lines[0].starts_with("region\trank\tstate"));
    assert!(lines[1].starts_with("chr1\t0\tmerged-ready"));
    assert!(lines[2].starts_with("chr2\t1\tmerged-ready"));
    assert!(lines[3].starts_with("chr10\t2\tfailed\textract"));
}

#[test]
fn test_index_missing_indexes_inputs() {
    let fx = Fixture::new();
    let bare = write_unindexed_bam(&fx.path("bare.bam"), &["chr1", "chr2"]);

    let result = run(fx
        .call()
        .arg("-i")
        .arg(&bare)
        .arg("-o")
        .arg(fx.path("out.vcf"))
        .arg("--index-missing"));

    assert!(result.status.success(), "call failed: {}", stderr(&result));
    assert!(fx.path("bare.bam.bai").is_file());
}

#[test]
fn test_unindexed_input_fails_before_any_work() {
    let fx = Fixture::new();
    let bare = write_unindexed_bam(&fx.path("bare.bam"), &["chr1", "chr2"]);

    let result = run(fx.call().arg("-i").arg(&bare).arg("-o").arg(fx.path("out.vcf")));

    assert!(!result.status.success());
    let err = stderr(&result);
    assert!(err.contains("has no index"), "{err}");
    assert!(err.contains("bare.bam"), "{err}");
    assert!(!fx.path("chromosplit_bare").exists());
    assert!(!fx.path("out.vcf").exists());
}

#[test]
fn test_input_dir_and_list() {
    let fx = Fixture::new();
    let list = fx.path("inputs.txt");
    fs::write(&list, format!("{}\n\n", fx.bam.display())).unwrap();

    let from_list = fx.path("list.vcf");
    let result = run(fx.call().arg("--input-list").arg(&list).arg("-o").arg(&from_list));
    assert!(result.status.success(), "call failed: {}", stderr(&result));
    assert_eq!(read(&from_list), EXPECTED_VCF);

    let from_dir = fx.path("dir.vcf");
    let result = run(fx.call().arg("--input-dir").arg(fx.dir.path()).arg("-o").arg(&from_dir));
    assert!(result.status.success(), "call failed: {}", stderr(&result));
    assert_eq!(read(&from_dir), EXPECTED_VCF);
}
