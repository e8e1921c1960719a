//! Stand-in samtools and java executables, and a launcher for the CLI binary.
//!
//! The fake tools follow the data flow of the real ones closely enough for the
//! orchestration to be observable:
//!
//! - `samtools view -b <bam> <region>` prints the region name, or exits 3 when
//!   the region equals `$FAIL_REGION`
//! - `samtools mpileup <files...>` concatenates its file arguments, and
//!   `samtools mpileup - -o -` copies stdin
//! - `samtools index <bam>` touches `<bam>.bai`
//! - `java -jar <jar> <action> [pileup] [tokens...]` writes a two-line VCF
//!   header and one record per pileup line, and appends its arguments to
//!   `$ARGS_LOG` when set

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

const FAKE_SAMTOOLS: &str = r#"#!/bin/sh
cmd="$1"
shift
case "$cmd" in
  view)
    region="$3"
    if [ -n "$FAIL_REGION" ] && [ "$region" = "$FAIL_REGION" ]; then
      echo "fake samtools: cannot extract $region" >&2
      exit 3
    fi
    echo "$region"
    ;;
  mpileup)
    if [ "$1" = "-" ]; then
      cat
    else
      for arg in "$@"; do
        if [ -f "$arg" ]; then cat "$arg"; fi
      done
    fi
    ;;
  index)
    : > "$1.bai"
    ;;
  *)
    echo "fake samtools: unknown command $cmd" >&2
    exit 1
    ;;
esac
"#;

const FAKE_JAVA: &str = r#"#!/bin/sh
if [ -n "$ARGS_LOG" ]; then echo "$*" >> "$ARGS_LOG"; fi
shift 3
printf '##fileformat=VCFv4.1\n#CHROM\tPOS\n'
if [ $# -gt 0 ] && [ -f "$1" ]; then exec < "$1"; fi
while IFS= read -r line; do
  printf '%s\t100\n' "$line"
done
"#;

/// Locations of the installed fake tools.
pub struct FakeTools {
    pub samtools: PathBuf,
    pub java: PathBuf,
    pub jar: PathBuf,
}

fn write_executable(path: &Path, contents: &str) {
    fs::write(path, contents).unwrap();
    let mut permissions = fs::metadata(path).unwrap().permissions();
    permissions.set_mode(0o755);
    fs::set_permissions(path, permissions).unwrap();
}

impl FakeTools {
    /// Installs the fake tools (and an empty caller jar) into `dir/bin`.
    pub fn install(dir: &Path) -> Self {
        let bin = dir.join("bin");
        fs::create_dir_all(&bin).unwrap();
        let samtools = bin.join("samtools");
        let java = bin.join("java");
        let jar = bin.join("VarScan.jar");
        write_executable(&samtools, FAKE_SAMTOOLS);
        write_executable(&java, FAKE_JAVA);
        fs::write(&jar, b"").unwrap();
        Self { samtools, java, jar }
    }

    /// Tool arguments shared by `call` and `batch`.
    pub fn args(&self) -> Vec<String> {
        vec![
            "--samtools".to_string(),
            self.samtools.display().to_string(),
            "--java".to_string(),
            self.java.display().to_string(),
            "--caller-jar".to_string(),
            self.jar.display().to_string(),
        ]
    }
}

/// A command running the chromosplit binary inside `cwd`.
pub fn chromosplit(cwd: &Path) -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_chromosplit"));
    command.current_dir(cwd).env_remove("FAIL_REGION").env_remove("ARGS_LOG");
    command
}

/// Runs `command`, returning its output.
pub fn run(command: &mut Command) -> Output {
    command.output().expect("failed to run chromosplit")
}

/// Stderr of a finished run, for assertion messages.
pub fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}
