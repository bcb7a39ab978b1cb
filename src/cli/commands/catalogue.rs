//! `ait catalogue` command - manage the catalogue items assets reference

use clap::Subcommand;
use console::style;
use miette::{IntoDiagnostic, Result};
use tabled::{builder::Builder, settings::Style};

use std::sync::Arc;

use crate::cli::commands::import::{drive_import, ImportArgs};
use crate::cli::helpers::{open_project, or_dash, truncate_str};
use crate::cli::GlobalOpts;
use crate::core::Config;
use crate::import::{
    BatchSubmitter, CatalogueNormalizer, CatalogueReference, CatalogueRow, CatalogueWriter,
    ImportError, ReferenceSource, RemoteError, CATALOGUE_WAVE_SIZE,
};
use crate::store::{Catalogue, CatalogueItem, CatalogueStore, LocalRegistry, PropertySet};

#[derive(Subcommand, Debug)]
pub enum CatalogueCommands {
    /// Add a catalogue item
    Add(AddArgs),

    /// List catalogue items
    List,

    /// Import catalogue items from a CSV file
    Import(ImportArgs),
}

#[derive(clap::Args, Debug)]
pub struct AddArgs {
    /// Code referenced by the catalogueItemCode column
    #[arg(long, short = 'c')]
    pub code: String,

    /// Display name
    #[arg(long, short = 'n')]
    pub name: String,

    /// Optional description
    #[arg(long, short = 'd')]
    pub description: Option<String>,
}

pub fn run(cmd: CatalogueCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        CatalogueCommands::Add(args) => run_add(args, global),
        CatalogueCommands::List => run_list(global),
        CatalogueCommands::Import(args) => run_import(args, global),
    }
}

fn run_import(args: ImportArgs, global: &GlobalOpts) -> Result<()> {
    let project = open_project(global)?;
    let config = Config::load_for(Some(&project));
    let registry = LocalRegistry::open(&project, config.author()).into_diagnostic()?;
    let properties = PropertySet::load(&project).into_diagnostic()?.properties;

    let runtime = tokio::runtime::Runtime::new().into_diagnostic()?;
    runtime.block_on(async {
        // Classification names are fetched once per upload
        let lookup = |e: RemoteError| ImportError::ReferenceData(e.to_string());
        let reference = CatalogueReference::new(
            registry.asset_classes().await.map_err(lookup)?,
            registry.asset_categories().await.map_err(lookup)?,
            registry.asset_types().await.map_err(lookup)?,
        );
        let normalizer = CatalogueNormalizer::new(&reference, &properties)
            .with_mapping(args.mapping(&config));

        let writer = CatalogueWriter::new(Arc::new(CatalogueStore::new(&project)));
        let wave_size = args.wave_size.unwrap_or(CATALOGUE_WAVE_SIZE).max(1);
        let submitter = BatchSubmitter::<CatalogueRow>::new(Arc::new(writer))
            .with_wave_size(wave_size);

        let chunk_size = config.chunk_size();
        drive_import(&args, global, chunk_size, &normalizer, &properties, &submitter).await
    })
}

fn run_add(args: AddArgs, global: &GlobalOpts) -> Result<()> {
    let project = open_project(global)?;
    let code = args.code.trim().to_string();
    if code.is_empty() {
        return Err(miette::miette!("Catalogue item code cannot be empty"));
    }

    let mut catalogue = Catalogue::load(&project).into_diagnostic()?;
    catalogue
        .add(CatalogueItem {
            code: code.clone(),
            name: args.name,
            description: args.description,
            ..Default::default()
        })
        .into_diagnostic()?;
    catalogue.save(&project).into_diagnostic()?;

    if !global.quiet {
        println!(
            "{} Added catalogue item {}",
            style("✓").green(),
            style(&code).cyan()
        );
    }
    Ok(())
}

fn run_list(global: &GlobalOpts) -> Result<()> {
    let project = open_project(global)?;
    let catalogue = Catalogue::load(&project).into_diagnostic()?;

    if catalogue.items.is_empty() {
        println!("No catalogue items found.");
        return Ok(());
    }

    let mut builder = Builder::default();
    builder.push_record(["CODE", "NAME", "TYPE", "DESCRIPTION"]);
    for item in &catalogue.items {
        builder.push_record([
            item.code.clone(),
            truncate_str(&item.name, 30),
            or_dash(item.asset_type.as_deref()).to_string(),
            truncate_str(or_dash(item.description.as_deref()), 40),
        ]);
    }
    println!("{}", builder.build().with(Style::sharp()));

    if !global.quiet {
        println!();
        println!("{} catalogue item(s)", style(catalogue.items.len()).cyan());
    }
    Ok(())
}
