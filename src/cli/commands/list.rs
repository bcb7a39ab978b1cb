//! `ait list` command - show stored assets

use console::style;
use miette::{IntoDiagnostic, Result};
use tabled::{builder::Builder, settings::Style};

use crate::cli::helpers::{format_short_id_str, open_project, or_dash, truncate_str};
use crate::cli::GlobalOpts;
use crate::core::Config;
use crate::store::LocalRegistry;

#[derive(clap::Args, Debug)]
pub struct ListArgs {
    /// Only show assets with this catalogue item code
    #[arg(long, short = 'c')]
    pub catalogue: Option<String>,

    /// Only show assets placed in this store
    #[arg(long, short = 's')]
    pub store: Option<String>,

    /// Show full ids
    #[arg(long)]
    pub full_ids: bool,

    /// Only print the number of matching assets
    #[arg(long)]
    pub count: bool,

    /// Print matching assets as JSON
    #[arg(long, conflicts_with = "count")]
    pub json: bool,
}

pub fn run(args: ListArgs, global: &GlobalOpts) -> Result<()> {
    let project = open_project(global)?;
    let config = Config::load_for(Some(&project));
    let registry = LocalRegistry::open(&project, config.author()).into_diagnostic()?;

    let listing = registry.list_assets();
    let assets: Vec<_> = listing
        .iter()
        .filter(|a| match &args.catalogue {
            Some(code) => a.catalogue_item_code.as_deref() == Some(code.as_str()),
            None => true,
        })
        .filter(|a| match &args.store {
            Some(code) => a.store_code.as_deref() == Some(code.as_str()),
            None => true,
        })
        .collect();

    if args.count {
        println!("{}", assets.len());
        return Ok(());
    }

    if args.json {
        let json = serde_json::to_string_pretty(&assets).into_diagnostic()?;
        println!("{}", json);
        return Ok(());
    }

    if assets.is_empty() {
        println!("No assets found.");
        return Ok(());
    }

    let mut builder = Builder::default();
    builder.push_record([
        "ID",
        "ASSET NUMBER",
        "CATALOGUE",
        "SERIAL",
        "INSTALLED",
        "STORE",
        "NOTES",
    ]);
    for asset in &assets {
        let id = if args.full_ids {
            asset.id.clone()
        } else {
            format_short_id_str(&asset.id)
        };
        builder.push_record([
            id,
            asset.asset_number.clone(),
            or_dash(asset.catalogue_item_code.as_deref()).to_string(),
            or_dash(asset.serial_number.as_deref()).to_string(),
            or_dash(asset.installation_date.as_deref()).to_string(),
            or_dash(asset.store_code.as_deref()).to_string(),
            truncate_str(or_dash(Some(&asset.notes)), 30),
        ]);
    }
    println!("{}", builder.build().with(Style::sharp()));

    if !global.quiet {
        println!();
        println!("{} asset(s)", style(assets.len()).cyan());
    }
    Ok(())
}
