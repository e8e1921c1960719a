//! Call variants region by region over one or more BAMs that share a header.
//!
//! Every region declared in the inputs' headers becomes an independent job:
//! extract the region from each input, pile the extracts up, and call variants
//! on the pileup. Per-region call files are merged in canonical region order.

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use log::{info, warn};

use chromosplit_lib::catalog::{AlignmentSource, require_indexes};
use chromosplit_lib::launcher::ProcessLauncher;
use chromosplit_lib::logging::OperationTimer;
use chromosplit_lib::pipeline::{RegionPipeline, index_missing};
use chromosplit_lib::stage::PipelineSpec;

use crate::commands::command::Command;
use crate::commands::common::{ExecutionOptions, InputOptions, ToolOptions, default_work_dir};

/// Call variants per region and merge the per-region calls.
#[derive(Debug, Parser)]
#[command(
    name = "call",
    about = "\x1b[38;5;173m[CALLING]\x1b[0m        \x1b[36mCall variants region by region over BAMs sharing a header\x1b[0m",
    long_about = r#"
Call variants region by region over one or more coordinate-sorted, indexed BAMs.

Regions are the reference sequences declared in the BAM header. When several
inputs are given they must declare exactly the same regions; all inputs are
then piled up together for each region (joint calling).

For every region:

  extract     samtools view -b <bam> <region>            (once per input)
  transform   samtools mpileup <extracts> <transform tokens>
  call        java -jar <caller-jar> <caller-action> <caller tokens>

Regions run concurrently (--regions-in-parallel). A failing region never stops
its siblings, but by default the merge is refused unless every region produced
calls (see --allow-partial).

EXECUTION MODES:

  disk-relay      Each stage writes a scratch file read by the next stage.
  streaming-pipe  Stages are connected by pipes; only extraction of several
                  inputs still touches disk.

TOKEN FILES:

  Extra arguments for the transform and call stages are read one per line from
  --transform-conf and --caller-conf (default ./samtools.conf and
  ./varscan.conf). Blank lines and lines starting with '#' are ignored.

EXAMPLES:

  # One sample, four regions at a time
  chromosplit call -i sample.bam -j VarScan.jar -o sample.vcf -t 4

  # Joint calling of a directory of BAMs with streaming stages
  chromosplit call -d bams/ -j VarScan.jar -o joint.vcf --mode streaming-pipe

  # Keep per-region calls without merging
  chromosplit call -i sample.bam -j VarScan.jar --no-merge -w scratch
"#
)]
pub struct Call {
    /// Input selection.
    #[command(flatten)]
    pub inputs: InputOptions,

    /// Merged output file.
    #[arg(short = 'o', long = "output", required_unless_present = "no_merge")]
    pub output: Option<PathBuf>,

    /// Skip the merge and leave per-region calls in <work-dir>/calls.
    #[arg(long = "no-merge", conflicts_with = "output")]
    pub no_merge: bool,

    /// Run-scoped scratch directory; must not exist [default: chromosplit_<stem>]
    #[arg(short = 'w', long = "work-dir")]
    pub work_dir: Option<PathBuf>,

    /// Per-region TSV report.
    #[arg(short = 'r', long = "report")]
    pub report: Option<PathBuf>,

    /// External tools.
    #[command(flatten)]
    pub tools: ToolOptions,

    /// Execution options.
    #[command(flatten)]
    pub execution: ExecutionOptions,
}

impl Command for Call {
    fn execute(&self, command_line: &str) -> Result<()> {
        info!("Starting Call");
        info!("Command line: {command_line}");

        let inputs = self.inputs.resolve()?;
        let tools = self.tools.tool_config()?;
        let settings = self.execution.settings()?;

        let work_dir = self.work_dir.clone().unwrap_or_else(|| default_work_dir(&inputs[0]));
        info!("Work directory: {}", work_dir.display());
        match &self.output {
            Some(output) => info!("Output: {}", output.display()),
            None => info!("Output: none, calls are left in {}", work_dir.display()),
        }

        let timer = OperationTimer::new("Calling regions");

        if self.execution.index_missing {
            index_missing(&inputs, &tools.samtools, &ProcessLauncher, settings.stderr)?;
        }
        require_indexes(&inputs)?;

        let sources = AlignmentSource::open_all(&inputs)?;
        let spec = PipelineSpec::samtools_varscan(&tools);
        let result = RegionPipeline::new(&spec, sources, work_dir)
            .output(self.output.clone())
            .report(self.report.clone())
            .settings(settings)
            .execute()?;

        let failed = result.failed().count();
        if failed > 0 {
            warn!("{failed} region(s) failed; see the messages above for details");
        }
        if let Some(output) = result.merged_output() {
            info!("Wrote {}", output.display());
        }

        timer.log_completion(result.jobs.len() as u64, "regions");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_or_no_merge_required() {
        assert!(Call::try_parse_from(["call", "-i", "a.bam", "-j", "c.jar"]).is_err());
        assert!(Call::try_parse_from(["call", "-i", "a.bam", "-j", "c.jar", "--no-merge"]).is_ok());
        assert!(Call::try_parse_from(["call", "-i", "a.bam", "-j", "c.jar", "-o", "out.vcf"]).is_ok());
    }

    #[test]
    fn test_output_conflicts_with_no_merge() {
        let parsed = Call::try_parse_from([
            "call", "-i", "a.bam", "-j", "c.jar", "-o", "out.vcf", "--no-merge",
        ]);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_caller_jar_required() {
        assert!(Call::try_parse_from(["call", "-i", "a.bam", "-o", "out.vcf"]).is_err());
    }
}
