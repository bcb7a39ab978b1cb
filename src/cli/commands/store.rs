//! `ait store` command - manage the stores assets can be placed in

use clap::Subcommand;
use console::style;
use miette::{IntoDiagnostic, Result};
use tabled::{builder::Builder, settings::Style};

use crate::cli::helpers::{open_project, truncate_str};
use crate::cli::GlobalOpts;
use crate::store::{ReferenceSets, StoreEntry};

#[derive(Subcommand, Debug)]
pub enum StoreCommands {
    /// Add a store
    Add(AddArgs),

    /// List stores
    List,
}

#[derive(clap::Args, Debug)]
pub struct AddArgs {
    /// Code referenced by the storeCode column
    #[arg(long, short = 'c')]
    pub code: String,

    /// Display name
    #[arg(long, short = 'n')]
    pub name: String,
}

pub fn run(cmd: StoreCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        StoreCommands::Add(args) => run_add(args, global),
        StoreCommands::List => run_list(global),
    }
}

fn run_add(args: AddArgs, global: &GlobalOpts) -> Result<()> {
    let project = open_project(global)?;
    let code = args.code.trim().to_string();
    if code.is_empty() {
        return Err(miette::miette!("Store code cannot be empty"));
    }

    let mut sets = ReferenceSets::load(&project).into_diagnostic()?;
    sets.add_store(StoreEntry {
        code: code.clone(),
        name: args.name,
    })
    .into_diagnostic()?;
    sets.save(&project).into_diagnostic()?;

    if !global.quiet {
        println!("{} Added store {}", style("✓").green(), style(&code).cyan());
    }
    Ok(())
}

fn run_list(global: &GlobalOpts) -> Result<()> {
    let project = open_project(global)?;
    let sets = ReferenceSets::load(&project).into_diagnostic()?;

    if sets.stores.is_empty() {
        println!("No stores found.");
        return Ok(());
    }

    let mut builder = Builder::default();
    builder.push_record(["CODE", "NAME"]);
    for store in &sets.stores {
        builder.push_record([store.code.clone(), truncate_str(&store.name, 40)]);
    }
    println!("{}", builder.build().with(Style::sharp()));

    if !global.quiet {
        println!();
        println!("{} store(s)", style(sets.stores.len()).cyan());
    }
    Ok(())
}
