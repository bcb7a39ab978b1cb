//! CLI argument definitions using clap derive

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::cli::commands::{
    catalogue::CatalogueCommands, completions::CompletionsArgs, import::ImportArgs,
    init::InitArgs, list::ListArgs, store::StoreCommands, template::TemplateArgs,
};

#[derive(Parser)]
#[command(name = "ait")]
#[command(author, version, about = "Asset Import Toolkit")]
#[command(
    long_about = "Bulk-load asset and catalogue records from CSV files into a project registry, \
                  review rows that fail validation, and export the ones that could not be imported."
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub global: GlobalOpts,
}

#[derive(clap::Args, Clone, Debug)]
pub struct GlobalOpts {
    /// Suppress non-essential output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Enable verbose output (also raises log level to debug)
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    /// Project root (default: auto-detect by finding .ait/)
    #[arg(long, global = true)]
    pub project: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new AIT project
    Init(InitArgs),

    /// Import assets from a CSV file
    Import(ImportArgs),

    /// Write a CSV template for imports
    Template(TemplateArgs),

    /// Catalogue item management
    #[command(subcommand)]
    Catalogue(CatalogueCommands),

    /// Store management
    #[command(subcommand)]
    Store(StoreCommands),

    /// List stored assets
    List(ListArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}
