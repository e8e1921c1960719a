//! Process many BAMs independently, each with its own regions and merged output.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::slice;

use anyhow::{Context, Result, bail};
use clap::Parser;
use log::{error, info};

use chromosplit_lib::catalog::{AlignmentSource, require_indexes};
use chromosplit_lib::errors::ChromosplitError;
use chromosplit_lib::launcher::ProcessLauncher;
use chromosplit_lib::logging::OperationTimer;
use chromosplit_lib::pipeline::{RegionPipeline, RunSettings, index_missing};
use chromosplit_lib::pool::WorkerPool;
use chromosplit_lib::stage::PipelineSpec;
use chromosplit_lib::validation::validate_concurrency;
use chromosplit_lib::workspace::{ARTIFACT_EXTENSION, create_fresh_dir, remove_dir_or_warn};

use crate::commands::command::Command;
use crate::commands::common::{ExecutionOptions, InputOptions, ToolOptions, input_stem};

/// Default scratch root for a batch run.
const DEFAULT_BATCH_WORK_DIR: &str = "chromosplit_batch";

/// Run the region pipeline on each input BAM independently.
#[derive(Debug, Parser)]
#[command(
    name = "batch",
    about = "\x1b[38;5;173m[CALLING]\x1b[0m        \x1b[36mCall variants on many BAMs independently\x1b[0m",
    long_about = r#"
Call variants on each input BAM on its own.

Every input gets its own region set, its own scratch directory
<work-dir>/<stem> and its own merged output <output-dir>/<stem>.vcf. Inputs are
processed concurrently (--files-in-parallel), and regions within each input
concurrently (--regions-in-parallel), so up to the product of the two regions
can be running at once.

A failing input does not stop the others; the command exits non-zero if any
input failed.

EXAMPLES:

  chromosplit batch -d bams/ -j VarScan.jar -O calls/ -f 2 -t 4
"#
)]
pub struct Batch {
    /// Input selection.
    #[command(flatten)]
    pub inputs: InputOptions,

    /// Directory receiving one merged <stem>.vcf per input.
    #[arg(short = 'O', long = "output-dir")]
    pub output_dir: PathBuf,

    /// Scratch root holding one work directory per input; must not exist.
    #[arg(short = 'w', long = "work-dir", default_value = DEFAULT_BATCH_WORK_DIR)]
    pub work_dir: PathBuf,

    /// Number of input files processed at once.
    #[arg(short = 'f', long = "files-in-parallel", default_value_t = 1)]
    pub files_in_parallel: usize,

    /// Directory receiving one per-region <stem>.tsv report per input.
    #[arg(short = 'r', long = "report-dir")]
    pub report_dir: Option<PathBuf>,

    /// External tools.
    #[command(flatten)]
    pub tools: ToolOptions,

    /// Execution options.
    #[command(flatten)]
    pub execution: ExecutionOptions,
}

/// Fails when two inputs would share a work directory or output.
fn check_unique_stems(inputs: &[PathBuf]) -> Result<()> {
    let mut seen = HashSet::new();
    for input in inputs {
        let stem = input_stem(input);
        if !seen.insert(stem.clone()) {
            return Err(ChromosplitError::configuration(
                "input",
                format!("more than one input is named '{stem}'; outputs would collide"),
            )
            .into());
        }
    }
    Ok(())
}

impl Command for Batch {
    fn execute(&self, command_line: &str) -> Result<()> {
        info!("Starting Batch");
        info!("Command line: {command_line}");

        let inputs = self.inputs.resolve()?;
        check_unique_stems(&inputs)?;
        validate_concurrency(self.files_in_parallel, "--files-in-parallel")?;
        let tools = self.tools.tool_config()?;
        let settings = self.execution.settings()?;

        info!("Output directory: {}", self.output_dir.display());
        info!("Work directory: {}", self.work_dir.display());
        info!("Files in parallel: {}", self.files_in_parallel);

        let timer = OperationTimer::new("Processing inputs");

        if self.execution.index_missing {
            index_missing(&inputs, &tools.samtools, &ProcessLauncher, settings.stderr)?;
        }
        require_indexes(&inputs)?;

        fs::create_dir_all(&self.output_dir).with_context(|| {
            format!("Failed to create output directory: {}", self.output_dir.display())
        })?;
        if let Some(report_dir) = &self.report_dir {
            fs::create_dir_all(report_dir).with_context(|| {
                format!("Failed to create report directory: {}", report_dir.display())
            })?;
        }
        if let Some(parent) = self.work_dir.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }
        create_fresh_dir(&self.work_dir)?;

        let spec = PipelineSpec::samtools_varscan(&tools);
        let pool = WorkerPool::new(self.files_in_parallel)?;
        let total = inputs.len();
        let outcome = pool.run_all(inputs, |input| {
            let result = self.process_file(&spec, &input, settings);
            if let Err(e) = &result {
                error!("{}: {e:#}", input.display());
            }
            result.is_ok()
        });

        remove_dir_or_warn(&self.work_dir);

        let failed = outcome.completed.iter().filter(|ok| !**ok).count();
        timer.log_completion(total as u64, "inputs");
        if failed > 0 {
            bail!("{failed} of {total} input(s) failed");
        }
        Ok(())
    }
}

impl Batch {
    /// Runs the region pipeline for one input.
    fn process_file(&self, spec: &PipelineSpec, input: &Path, settings: RunSettings) -> Result<()> {
        let stem = input_stem(input);
        let sources = AlignmentSource::open_all(slice::from_ref(&input.to_path_buf()))?;
        let output = self.output_dir.join(format!("{stem}.{ARTIFACT_EXTENSION}"));
        let report = self.report_dir.as_ref().map(|dir| dir.join(format!("{stem}.tsv")));

        let result = RegionPipeline::new(spec, sources, self.work_dir.join(&stem))
            .output(Some(output))
            .report(report)
            .settings(settings)
            .execute()?;

        if let Some(output) = result.merged_output() {
            info!("{}: wrote {}", input.display(), output.display());
        }
        Ok(())
    }
}
