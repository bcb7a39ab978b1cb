//! `ait import` command - bulk-load assets from a CSV file

use console::{style, Term};
use dialoguer::{theme::ColorfulTheme, Confirm};
use miette::{IntoDiagnostic, Result};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tabled::{builder::Builder, settings::Style};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::cli::helpers::{format_short_id_str, open_project, or_dash, truncate_str};
use crate::cli::GlobalOpts;
use crate::core::{Config, Project};
use crate::import::{
    export_with_errors, AssetWriter, BatchSubmitter, CatalogueRow, ColumnMapping, CsvRecord,
    ImportError, ImportRow, ImportSession, Normalizer, ProgressSnapshot, ProgressTracker,
    PropertyDefinition, ReferenceData, ReferenceSource, RouteOutcome, RowNormalizer, RowParser,
    SessionError, StagedRow,
};
use crate::store::{LocalRegistry, PropertySet};

/// Rows shown in the review table unless --verbose
const REVIEW_TABLE_LIMIT: usize = 50;

#[derive(clap::Args, Debug)]
pub struct ImportArgs {
    /// CSV file to import
    pub file: PathBuf,

    /// Import without asking for confirmation
    #[arg(long, short = 'y')]
    pub yes: bool,

    /// Parse and validate only
    #[arg(long)]
    pub dry_run: bool,

    /// Set rows with validation errors aside and import the rest
    #[arg(long)]
    pub skip_invalid: bool,

    /// Where to write rows that were not imported (default: <file-stem>-failed.csv)
    #[arg(long)]
    pub errors_out: Option<PathBuf>,

    /// Rows submitted concurrently per wave (default: from config)
    #[arg(long)]
    pub wave_size: Option<usize>,

    /// Map columns by header name instead of position
    #[arg(long)]
    pub by_header: bool,

    /// Retry rows that failed submission up to this many times
    #[arg(long, default_value = "0")]
    pub retries: u32,
}

impl ImportArgs {
    pub(crate) fn mapping(&self, config: &Config) -> ColumnMapping {
        if self.by_header {
            ColumnMapping::Header
        } else {
            config.column_mapping()
        }
    }
}

/// How a kind of staged row appears in the review table
pub(crate) trait ReviewRow: StagedRow + CsvRecord {
    /// Plural noun for the final summary
    const NOUN: &'static str;

    /// Headers of the columns between ID and STATUS
    fn review_headers() -> &'static [&'static str];

    fn review_cells(&self) -> Vec<String>;
}

impl ReviewRow for ImportRow {
    const NOUN: &'static str = "asset(s)";

    fn review_headers() -> &'static [&'static str] {
        &["ASSET NUMBER", "CATALOGUE", "SERIAL", "INSTALLED", "STORE"]
    }

    fn review_cells(&self) -> Vec<String> {
        vec![
            truncate_str(or_dash(Some(&self.asset_number)), 20),
            or_dash(self.catalogue_item_code.as_deref()).to_string(),
            or_dash(self.serial_number.as_deref()).to_string(),
            or_dash(self.installation_date.as_deref()).to_string(),
            or_dash(self.store_code.as_deref()).to_string(),
        ]
    }
}

impl ReviewRow for CatalogueRow {
    const NOUN: &'static str = "catalogue item(s)";

    fn review_headers() -> &'static [&'static str] {
        &["CODE", "TYPE", "MANUFACTURER", "MODEL"]
    }

    fn review_cells(&self) -> Vec<String> {
        vec![
            truncate_str(or_dash(Some(&self.code)), 20),
            truncate_str(or_dash(Some(&self.asset_type)), 20),
            or_dash(self.manufacturer.as_deref()).to_string(),
            truncate_str(or_dash(Some(&self.model)), 20),
        ]
    }
}

pub fn run(args: ImportArgs, global: &GlobalOpts) -> Result<()> {
    let project = open_project(global)?;
    let config = Config::load_for(Some(&project));

    let runtime = tokio::runtime::Runtime::new().into_diagnostic()?;
    runtime.block_on(run_import(args, global, project, config))
}

async fn run_import(
    args: ImportArgs,
    global: &GlobalOpts,
    project: Project,
    config: Config,
) -> Result<()> {
    let registry = Arc::new(LocalRegistry::open(&project, config.author()).into_diagnostic()?);
    let properties = PropertySet::load(&project).into_diagnostic()?.properties;

    // Reference data is fetched once per upload
    let codes = registry
        .catalogue_codes()
        .await
        .map_err(|e| ImportError::ReferenceData(e.to_string()))?;
    let stores = registry
        .store_codes()
        .await
        .map_err(|e| ImportError::ReferenceData(e.to_string()))?;
    let reference = ReferenceData::new(codes).with_stores(stores);
    let normalizer = Normalizer::new(&reference, &properties).with_mapping(args.mapping(&config));

    let wave_size = args.wave_size.unwrap_or_else(|| config.wave_size()).max(1);
    let writer = AssetWriter::new(registry.clone()).with_log_defaults(config.log_defaults());
    let submitter = BatchSubmitter::<ImportRow>::new(Arc::new(writer))
        .with_wave_size(wave_size)
        .with_invalidator(registry.clone());

    drive_import(&args, global, config.chunk_size(), &normalizer, &properties, &submitter).await
}

/// Parse, review, submit and route one upload of any row kind
pub(crate) async fn drive_import<N>(
    args: &ImportArgs,
    global: &GlobalOpts,
    chunk_size: usize,
    normalizer: &N,
    properties: &[PropertyDefinition],
    submitter: &BatchSubmitter<N::Row>,
) -> Result<()>
where
    N: RowNormalizer,
    N::Row: ReviewRow,
{
    let chunks = RowParser::new(chunk_size).open(&args.file)?;
    let rows = normalizer.normalize_chunks(chunks)?;

    let mut session = ImportSession::new();
    session.load(rows)?;

    if !global.quiet {
        println!(
            "{} Read {} row(s) from {}",
            style("→").blue(),
            style(session.rows().len()).cyan(),
            style(args.file.display()).yellow()
        );
        print_review(session.rows(), global.verbose);
    }

    let errors_out = args
        .errors_out
        .clone()
        .unwrap_or_else(|| default_errors_path(&args.file));

    let invalid = session.validation_summary().len();
    if invalid > 0 {
        print_validation_summary(&session);

        if !args.skip_invalid {
            write_errors(session.rows(), properties, &errors_out, global)?;
            return Err(SessionError::ValidationErrors { count: invalid }.into());
        }

        let set_aside = session.take_invalid()?;
        write_errors(&set_aside, properties, &errors_out, global)?;
        if !global.quiet {
            println!(
                "{} Set aside {} invalid row(s)",
                style("!").yellow(),
                style(set_aside.len()).yellow()
            );
        }
        if session.rows().is_empty() {
            return Err(SessionError::NothingToImport.into());
        }
    }

    if args.dry_run {
        println!();
        println!(
            "{}",
            style(format!(
                "Dry run complete. {} row(s) ready to import.",
                session.rows().len()
            ))
            .yellow()
        );
        return Ok(());
    }

    if !args.yes && !confirm(session.rows().len())? {
        session.restart()?;
        println!("Aborted.");
        return Ok(());
    }

    let cancel = CancellationToken::new();
    let ctrl_c = {
        let token = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                token.cancel();
            }
        })
    };

    let mut attempt = 0;
    let mut total_imported = 0;
    loop {
        let outcome = drain_once(&mut session, submitter, &cancel, global.quiet).await?;
        total_imported += outcome.imported();
        print_outcome(&outcome, global.quiet);

        let cancelled = matches!(outcome, RouteOutcome::Cancelled { .. });
        if outcome.is_success() || cancelled || attempt >= args.retries {
            break;
        }

        // Server messages are cleared; local checks decide whether a retry is allowed
        if session.revalidate(|row| normalizer.revalidate(row))? > 0 {
            break;
        }
        attempt += 1;
        if !global.quiet {
            println!(
                "{} Retrying {} row(s) (attempt {} of {})",
                style("→").blue(),
                style(session.rows().len()).cyan(),
                attempt,
                args.retries
            );
        }
    }
    ctrl_c.abort();

    if session.rows().is_empty() {
        if !global.quiet {
            println!(
                "{} Imported {} {}",
                style("✓").green(),
                style(total_imported).green(),
                N::Row::NOUN
            );
        }
        return Ok(());
    }

    if let Some(message) = session.message() {
        println!("{} {}", style("!").yellow(), message);
    }
    print_review(session.rows(), global.verbose);
    write_errors(session.rows(), properties, &errors_out, global)?;

    Err(miette::miette!(
        "{} row(s) were not imported; see {}",
        session.rows().len(),
        errors_out.display()
    ))
}

/// Submit the buffer once and route the result back into the session
async fn drain_once<R: StagedRow>(
    session: &mut ImportSession<R>,
    submitter: &BatchSubmitter<R>,
    cancel: &CancellationToken,
    quiet: bool,
) -> Result<RouteOutcome> {
    let batch = session.begin_import()?;
    let mut tracker = ProgressTracker::new(batch.len());
    let renderer = (!quiet).then(|| render_progress(tracker.subscribe()));

    let report = submitter.drain(batch, &mut tracker, cancel).await;

    // Dropping the tracker closes the channel so the renderer finishes
    drop(tracker);
    if let Some(handle) = renderer {
        let _ = handle.await;
    }

    Ok(session.complete(report)?)
}

fn render_progress(mut rx: watch::Receiver<ProgressSnapshot>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let term = Term::stdout();
        while rx.changed().await.is_ok() {
            let snapshot = *rx.borrow_and_update();
            let _ = term.clear_line();
            let _ = term.write_str(&format!(
                "  {} {:>3}%  {} remaining, {} failed",
                style("Importing").cyan(),
                snapshot.display_percent(),
                snapshot.remaining,
                snapshot.failed
            ));
        }
        let _ = term.write_line("");
    })
}

fn confirm(count: usize) -> Result<bool> {
    Confirm::with_theme(&ColorfulTheme::default())
        .with_prompt(format!("Import {} row(s)?", count))
        .default(false)
        .interact()
        .into_diagnostic()
}

fn default_errors_path(file: &Path) -> PathBuf {
    let stem = file
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "import".to_string());
    file.with_file_name(format!("{}-failed.csv", stem))
}

fn write_errors<R: StagedRow + CsvRecord>(
    rows: &[R],
    properties: &[PropertyDefinition],
    path: &Path,
    global: &GlobalOpts,
) -> Result<()> {
    let file = File::create(path).into_diagnostic()?;
    export_with_errors(rows, properties, file).into_diagnostic()?;
    tracing::info!(rows = rows.len(), path = %path.display(), "exported rows with errors");
    if !global.quiet {
        println!(
            "{} Wrote {} row(s) to {}",
            style("→").blue(),
            style(rows.len()).cyan(),
            style(path.display()).yellow()
        );
    }
    Ok(())
}

fn print_review<R: ReviewRow>(rows: &[R], verbose: bool) {
    let shown: Vec<&R> = if verbose {
        rows.iter().collect()
    } else {
        rows.iter().take(REVIEW_TABLE_LIMIT).collect()
    };
    if shown.is_empty() {
        return;
    }

    let mut builder = Builder::default();
    let mut header = vec!["LINE", "ID"];
    header.extend_from_slice(R::review_headers());
    header.push("STATUS");
    builder.push_record(header);

    for row in &shown {
        let status = if row.has_error() {
            style(truncate_str(row.error_message(), 50)).red().to_string()
        } else if row.has_warning() {
            style(truncate_str(row.warning_message(), 50)).yellow().to_string()
        } else if row.is_update() {
            "update".to_string()
        } else {
            "new".to_string()
        };
        let mut record = vec![row.line_number().to_string(), format_short_id_str(row.id())];
        record.extend(row.review_cells());
        record.push(status);
        builder.push_record(record);
    }
    println!("{}", builder.build().with(Style::sharp()));

    if shown.len() < rows.len() {
        println!(
            "{}",
            style(format!(
                "... and {} more (use -v to show all)",
                rows.len() - shown.len()
            ))
            .dim()
        );
    }
}

fn print_validation_summary<R: StagedRow>(session: &ImportSession<R>) {
    let summary = session.validation_summary();
    println!();
    println!(
        "{} {} row(s) have errors:",
        style("✗").red(),
        style(summary.len()).red()
    );
    for (line, message) in summary {
        println!("  line {}: {}", style(line).yellow(), message);
    }
}

fn print_outcome(outcome: &RouteOutcome, quiet: bool) {
    if quiet {
        return;
    }
    match outcome {
        RouteOutcome::Imported { count } => {
            println!("{} {} row(s) imported", style("✓").green(), style(count).green());
        }
        RouteOutcome::PartiallyFailed { imported, failed } => {
            println!(
                "{} {} row(s) imported, {} failed",
                style("!").yellow(),
                style(imported).green(),
                style(failed).red()
            );
        }
        RouteOutcome::Cancelled {
            imported,
            failed,
            unsubmitted,
        } => {
            println!(
                "{} Cancelled: {} imported, {} failed, {} not submitted",
                style("!").yellow(),
                style(imported).green(),
                style(failed).red(),
                style(unsubmitted).yellow()
            );
        }
    }
}
