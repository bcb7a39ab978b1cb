//! `ait template` command - write a CSV import template

use console::style;
use miette::{IntoDiagnostic, Result};
use std::fs::File;
use std::io::{self, Write};
use std::path::PathBuf;

use crate::cli::helpers::open_project;
use crate::cli::GlobalOpts;
use crate::import::export::export_template;
use crate::import::{CatalogueRow, ImportRow, PropertyDefinition};
use crate::store::PropertySet;

#[derive(clap::Args, Debug)]
pub struct TemplateArgs {
    /// Output to file instead of stdout
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,

    /// Write the catalogue item template instead of the asset template
    #[arg(long)]
    pub catalogue: bool,
}

fn write_template<W: Write>(
    catalogue: bool,
    properties: &[PropertyDefinition],
    writer: W,
) -> Result<()> {
    if catalogue {
        export_template::<CatalogueRow, _>(properties, writer).into_diagnostic()
    } else {
        export_template::<ImportRow, _>(properties, writer).into_diagnostic()
    }
}

pub fn run(args: TemplateArgs, global: &GlobalOpts) -> Result<()> {
    // Outside a project the template has no property columns
    let properties = match open_project(global) {
        Ok(project) => PropertySet::load(&project).into_diagnostic()?.properties,
        Err(_) => Vec::new(),
    };

    match args.output {
        Some(path) => {
            let file = File::create(&path).into_diagnostic()?;
            write_template(args.catalogue, &properties, file)?;
            if !global.quiet {
                println!(
                    "{} Wrote template to {}",
                    style("✓").green(),
                    style(path.display()).cyan()
                );
            }
        }
        None => write_template(args.catalogue, &properties, io::stdout().lock())?,
    }
    Ok(())
}
