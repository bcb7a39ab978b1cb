//! `ait init` command - Initialize a new AIT project

use console::style;
use miette::{IntoDiagnostic, Result};
use std::path::Path;

use crate::core::identity::RecordKind;
use crate::core::project::{Project, ProjectError};

#[derive(clap::Args, Debug)]
pub struct InitArgs {
    /// Directory to initialize (default: current directory)
    #[arg(default_value = ".")]
    pub path: std::path::PathBuf,

    /// Rewrite the config even if .ait/ already exists
    #[arg(long)]
    pub force: bool,
}

pub fn run(args: InitArgs) -> Result<()> {
    let path = if args.path.as_os_str() == "." {
        std::env::current_dir().into_diagnostic()?
    } else {
        args.path.clone()
    };

    if !path.exists() {
        std::fs::create_dir_all(&path).into_diagnostic()?;
        println!(
            "{} Created directory {}",
            style("✓").green(),
            style(path.display()).cyan()
        );
    }

    let project = if args.force {
        Project::init_force(&path)
    } else {
        Project::init(&path)
    };

    match project {
        Ok(project) => {
            println!(
                "{} Initialized AIT project at {}",
                style("✓").green(),
                style(project.root().display()).cyan()
            );
            println!();
            println!("Created project structure:");
            print_structure(project.root());
            println!();
            println!("Next steps:");
            println!(
                "  {} Register catalogue items",
                style("ait catalogue add --code FR-100 --name Fridge").yellow()
            );
            println!(
                "  {} Write an import template",
                style("ait template -o assets.csv").yellow()
            );
            println!("  {} Import the file", style("ait import assets.csv").yellow());
            Ok(())
        }
        Err(ProjectError::AlreadyExists(path)) => {
            println!(
                "{} AIT project already exists at {}",
                style("!").yellow(),
                style(path.display()).cyan()
            );
            println!();
            println!("Use {} to reinitialize", style("ait init --force").yellow());
            Ok(())
        }
        Err(e) => Err(miette::miette!("{}", e)),
    }
}

fn print_structure(root: &Path) {
    println!("  {}", style(".ait/").dim());
    for file in ["config.yaml", "catalogue.yaml", "properties.yaml", "reference.yaml"] {
        if root.join(".ait").join(file).exists() {
            println!("    {}", file);
        }
    }
    for kind in RecordKind::all() {
        println!("  {}/", style(kind.directory()).dim());
    }
}
