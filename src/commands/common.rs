//! Common CLI options shared across commands.
//!
//! This module provides shared argument structures that can be composed into
//! command structs using `#[command(flatten)]`.

use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::Args;
use log::info;

use chromosplit_lib::config::{
    DEFAULT_CALLER_CONF, DEFAULT_TRANSFORM_CONF, ExecutionMode, Retention, ToolStderr,
    load_optional_tokens,
};
use chromosplit_lib::errors::ChromosplitError;
use chromosplit_lib::inputs::InputSource;
use chromosplit_lib::merge::{MergeFormat, MergePolicy};
use chromosplit_lib::pipeline::{DEFAULT_REGIONS_IN_PARALLEL, RunSettings};
use chromosplit_lib::stage::ToolConfig;
use chromosplit_lib::validation::{resolve_tool, validate_concurrency, validate_file_exists};

/// Input selection: exactly one of explicit BAMs, a directory, or a list file.
#[derive(Debug, Clone, Args)]
#[group(required = true, multiple = false)]
pub struct InputOptions {
    /// Input BAM file(s)
    #[arg(short = 'i', long = "input", num_args = 1..)]
    pub input: Vec<PathBuf>,

    /// Directory scanned (non-recursively) for *.bam files
    #[arg(short = 'd', long = "input-dir")]
    pub input_dir: Option<PathBuf>,

    /// Text file listing one BAM path per line
    #[arg(short = 'l', long = "input-list")]
    pub input_list: Option<PathBuf>,
}

impl InputOptions {
    /// Resolves the selected source into existing BAM paths.
    ///
    /// # Errors
    ///
    /// Returns an error if no or several sources are selected, or an input is missing.
    pub fn resolve(&self) -> Result<Vec<PathBuf>> {
        let source = InputSource::from_options(
            &self.input,
            self.input_dir.as_deref(),
            self.input_list.as_deref(),
        )?;
        let paths = source.resolve()?;
        info!("Inputs: {}", paths.len());
        for path in &paths {
            info!("  {}", path.display());
        }
        Ok(paths)
    }
}

/// External tool locations and their extra arguments.
#[derive(Debug, Clone, Args)]
pub struct ToolOptions {
    /// samtools executable (path or name on PATH)
    #[arg(long = "samtools", default_value = "samtools")]
    pub samtools: String,

    /// java executable (path or name on PATH)
    #[arg(long = "java", default_value = "java")]
    pub java: String,

    /// Variant caller jar (e.g. VarScan.jar)
    #[arg(short = 'j', long = "caller-jar")]
    pub caller_jar: PathBuf,

    /// Variant caller action
    #[arg(short = 'a', long = "caller-action", default_value = "mpileup2snp")]
    pub caller_action: String,

    /// Extra `samtools mpileup` arguments, one per line [default: ./samtools.conf]
    #[arg(long = "transform-conf")]
    pub transform_conf: Option<PathBuf>,

    /// Extra variant caller arguments, one per line [default: ./varscan.conf]
    #[arg(long = "caller-conf")]
    pub caller_conf: Option<PathBuf>,
}

impl ToolOptions {
    /// Resolves the tools and loads their token files.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if a tool or the caller jar cannot be found.
    pub fn tool_config(&self) -> Result<ToolConfig> {
        let samtools = resolve_tool(&self.samtools, "--samtools")?;
        let java = resolve_tool(&self.java, "--java")?;
        validate_file_exists(&self.caller_jar, "Caller jar")?;
        if self.caller_action.trim().is_empty() {
            return Err(ChromosplitError::configuration("--caller-action", "must not be empty").into());
        }

        let transform_tokens =
            load_optional_tokens(self.transform_conf.as_deref(), DEFAULT_TRANSFORM_CONF, "transform")?;
        let caller_tokens =
            load_optional_tokens(self.caller_conf.as_deref(), DEFAULT_CALLER_CONF, "calling")?;

        info!("samtools: {}", samtools.display());
        info!("java: {}", java.display());
        info!("Caller: {} {}", self.caller_jar.display(), self.caller_action);

        Ok(ToolConfig {
            samtools,
            java,
            caller_jar: self.caller_jar.clone(),
            caller_action: self.caller_action.clone(),
            transform_tokens,
            caller_tokens,
        })
    }
}

/// How regions are executed and what is kept afterwards.
#[derive(Debug, Clone, Args)]
pub struct ExecutionOptions {
    /// Number of regions processed at once
    #[arg(short = 't', long = "regions-in-parallel", default_value_t = DEFAULT_REGIONS_IN_PARALLEL)]
    pub regions_in_parallel: usize,

    /// How stages pass data to each other
    #[arg(short = 'm', long = "mode", value_enum, default_value_t = ExecutionMode::DiskRelay)]
    pub mode: ExecutionMode,

    /// Keep the per-region extracted BAMs
    #[arg(long = "keep-extracted")]
    pub keep_extracted: bool,

    /// Keep the per-region pileups
    #[arg(long = "keep-pileup")]
    pub keep_pileup: bool,

    /// Keep every intermediate file (implies --keep-extracted and --keep-pileup)
    #[arg(long = "keep-all")]
    pub keep_all: bool,

    /// Keep the per-region call files after merging
    #[arg(long = "keep-region-calls")]
    pub keep_region_calls: bool,

    /// Extra attempts for a region whose stage fails
    #[arg(long = "retries", default_value_t = 0)]
    pub retries: u32,

    /// Stop dispatching regions after the first failure and exit non-zero
    #[arg(long = "fail-fast")]
    pub fail_fast: bool,

    /// Merge the regions that succeeded even when others failed
    #[arg(long = "allow-partial")]
    pub allow_partial: bool,

    /// What to do with the external tools' stderr
    #[arg(long = "tool-stderr", value_enum, default_value_t = ToolStderr::Inherit)]
    pub tool_stderr: ToolStderr,

    /// How per-region call files are merged
    #[arg(long = "merge-format", value_enum, default_value_t = MergeFormat::Vcf)]
    pub merge_format: MergeFormat,

    /// Run `samtools index` on inputs that have no index
    #[arg(long = "index-missing")]
    pub index_missing: bool,
}

impl ExecutionOptions {
    /// Validates the options and converts them into run settings.
    ///
    /// # Errors
    ///
    /// Returns an error if `--regions-in-parallel` is zero.
    pub fn settings(&self) -> Result<RunSettings> {
        validate_concurrency(self.regions_in_parallel, "--regions-in-parallel")?;

        let settings = RunSettings {
            mode: self.mode,
            regions_in_parallel: self.regions_in_parallel,
            retention: Retention::new(
                self.keep_extracted,
                self.keep_pileup,
                self.keep_all,
                self.keep_region_calls,
            ),
            retries: self.retries,
            fail_fast: self.fail_fast,
            merge_policy: if self.allow_partial {
                MergePolicy::AllowPartial
            } else {
                MergePolicy::CompleteOnly
            },
            merge_format: self.merge_format,
            stderr: self.tool_stderr.into(),
        };

        info!("Mode: {}", settings.mode);
        info!("Regions in parallel: {}", settings.regions_in_parallel);
        if settings.retries > 0 {
            info!("Retries per region: {}", settings.retries);
        }
        Ok(settings)
    }
}

/// Filename stem of an input, used to name its work directory and outputs.
pub fn input_stem(path: &Path) -> String {
    path.file_stem().map_or_else(|| "input".to_string(), |s| s.to_string_lossy().into_owned())
}

/// Default run-scoped scratch root for an input: `chromosplit_<stem>`.
pub fn default_work_dir(input: &Path) -> PathBuf {
    PathBuf::from(format!("chromosplit_{}", input_stem(input)))
}
