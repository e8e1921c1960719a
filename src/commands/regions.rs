//! Print the canonical region list shared by a set of BAMs.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use log::info;

use chromosplit_lib::catalog::{AlignmentSource, discover};
use chromosplit_lib::region::Region;

use crate::commands::command::Command;
use crate::commands::common::InputOptions;

/// List the regions a `call` run over the same inputs would process.
#[derive(Debug, Parser)]
#[command(
    name = "regions",
    about = "\x1b[38;5;66m[UTILITIES]\x1b[0m      \x1b[36mPrint the canonical region list of BAM inputs\x1b[0m",
    long_about = r#"
Print the regions declared in the inputs' headers, one per line, in the order
their calls are merged (natural order: chr1, chr2, ..., chr10).

Several inputs must declare exactly the same regions. No scratch files are
created.
"#
)]
pub struct Regions {
    /// Input selection.
    #[command(flatten)]
    pub inputs: InputOptions,

    /// Write the list here instead of stdout.
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
}

fn write_regions<W: Write>(mut writer: W, regions: &[Region]) -> io::Result<()> {
    for region in regions {
        writeln!(writer, "{}", region.name())?;
    }
    writer.flush()
}

impl Command for Regions {
    fn execute(&self, _command_line: &str) -> Result<()> {
        let inputs = self.inputs.resolve()?;
        let sources = AlignmentSource::open_all(&inputs)?;
        let regions = discover(&sources)?;
        info!("Found {} regions", regions.len());

        match &self.output {
            Some(path) => {
                let file = File::create(path)
                    .with_context(|| format!("Failed to create {}", path.display()))?;
                write_regions(BufWriter::new(file), &regions)
                    .with_context(|| format!("Failed to write {}", path.display()))?;
            }
            None => write_regions(io::stdout().lock(), &regions)
                .context("Failed to write regions to stdout")?,
        }
        Ok(())
    }
}
