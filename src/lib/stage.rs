//! Stage definitions and argument-vector construction.
//!
//! A [`PipelineSpec`] holds the three stages every region goes through. Each
//! [`StageSpec`] turns a region plus its input wiring into an [`Invocation`]:
//!
//! ```text
//! [program] + static args + (input files | pipe placeholder) + [region] + extra tokens
//! ```
//!
//! The result depends only on the region, the input and the token snapshot taken
//! at startup, so the same region always yields the same argv.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chromosplit_process::Invocation;

use crate::region::Region;

/// The stages a region passes through, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StageKind {
    /// Subset an alignment source to one region.
    Extract,
    /// Summarize the extracted alignments (pileup).
    Transform,
    /// Call variants from the pileup.
    Call,
}

impl StageKind {
    /// All stages in execution order.
    pub const ALL: [StageKind; 3] = [StageKind::Extract, StageKind::Transform, StageKind::Call];

    /// Lower-case stage name used in logs and reports.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Extract => "extract",
            Self::Transform => "transform",
            Self::Call => "call",
        }
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a stage reads.
#[derive(Debug, Clone, Copy)]
pub enum StageInput<'a> {
    /// Named files passed as positional arguments.
    Files(&'a [PathBuf]),
    /// The previous stage's output arriving on stdin.
    Pipe,
}

/// One stage's command template.
#[derive(Debug, Clone)]
pub struct StageSpec {
    kind: StageKind,
    program: String,
    static_args: Vec<String>,
    pipe_args: Vec<String>,
    region_arg: bool,
    tokens: Arc<[String]>,
}

impl StageSpec {
    /// Creates a stage running `program` with no arguments.
    #[must_use]
    pub fn new(kind: StageKind, program: impl Into<String>) -> Self {
        Self {
            kind,
            program: program.into(),
            static_args: Vec::new(),
            pipe_args: Vec::new(),
            region_arg: false,
            tokens: Arc::from(Vec::new()),
        }
    }

    /// Arguments placed right after the program.
    #[must_use]
    pub fn static_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.static_args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Arguments used in place of the input files when reading from a pipe.
    #[must_use]
    pub fn pipe_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.pipe_args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Appends the region name after the inputs.
    #[must_use]
    pub fn with_region_arg(mut self) -> Self {
        self.region_arg = true;
        self
    }

    /// Extra tokens appended last.
    #[must_use]
    pub fn tokens(mut self, tokens: Arc<[String]>) -> Self {
        self.tokens = tokens;
        self
    }

    /// The stage this spec builds.
    #[must_use]
    pub fn kind(&self) -> StageKind {
        self.kind
    }

    /// Builds the invocation for `region` reading `input`.
    #[must_use]
    pub fn build(&self, region: &Region, input: StageInput<'_>) -> Invocation {
        let mut invocation = Invocation::new(self.program.as_str()).args(self.static_args.iter().cloned());
        invocation = match input {
            StageInput::Files(files) => {
                invocation.args(files.iter().map(|f| f.to_string_lossy().into_owned()))
            }
            StageInput::Pipe => invocation.args(self.pipe_args.iter().cloned()),
        };
        if self.region_arg {
            invocation = invocation.arg(region.name());
        }
        invocation.args(self.tokens.iter().cloned())
    }
}

/// Locations of the external tools and their extra tokens.
#[derive(Debug, Clone)]
pub struct ToolConfig {
    /// The samtools executable.
    pub samtools: PathBuf,
    /// The java executable.
    pub java: PathBuf,
    /// The variant caller jar.
    pub caller_jar: PathBuf,
    /// The caller action (e.g. `mpileup2snp`).
    pub caller_action: String,
    /// Extra tokens for the transform stage.
    pub transform_tokens: Arc<[String]>,
    /// Extra tokens for the calling stage.
    pub caller_tokens: Arc<[String]>,
}

/// The three stage templates shared read-only by every region job.
#[derive(Debug, Clone)]
pub struct PipelineSpec {
    extract: StageSpec,
    transform: StageSpec,
    call: StageSpec,
}

impl PipelineSpec {
    /// Creates a spec from explicit stage templates.
    #[must_use]
    pub fn new(extract: StageSpec, transform: StageSpec, call: StageSpec) -> Self {
        Self { extract, transform, call }
    }

    /// The `samtools view` | `samtools mpileup` | `java -jar <caller>` pipeline.
    ///
    /// ```text
    /// samtools view -b <bam> <region>
    /// samtools mpileup <bam>... | - -o -   <transform tokens>
    /// java -jar <jar> <action> [<pileup>]  <caller tokens>
    /// ```
    #[must_use]
    pub fn samtools_varscan(tools: &ToolConfig) -> Self {
        let samtools = path_arg(&tools.samtools);
        let extract = StageSpec::new(StageKind::Extract, samtools.clone())
            .static_args(["view", "-b"])
            .with_region_arg();
        let transform = StageSpec::new(StageKind::Transform, samtools)
            .static_args(["mpileup"])
            .pipe_args(["-", "-o", "-"])
            .tokens(Arc::clone(&tools.transform_tokens));
        let call = StageSpec::new(StageKind::Call, path_arg(&tools.java))
            .static_args([
                "-jar".to_string(),
                path_arg(&tools.caller_jar),
                tools.caller_action.clone(),
            ])
            .tokens(Arc::clone(&tools.caller_tokens));
        Self { extract, transform, call }
    }

    /// The template for `kind`.
    #[must_use]
    pub fn stage(&self, kind: StageKind) -> &StageSpec {
        match kind {
            StageKind::Extract => &self.extract,
            StageKind::Transform => &self.transform,
            StageKind::Call => &self.call,
        }
    }
}

/// Invocation that builds a BAM index with samtools.
#[must_use]
pub fn index_invocation(samtools: &Path, bam: &Path) -> Invocation {
    Invocation::new(path_arg(samtools)).arg("index").arg(path_arg(bam))
}

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}
