use clap::Parser;
use miette::Result;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use ait::cli::{Cli, Commands};

/// Environment variable holding the log filter
const LOG_ENV: &str = "AIT_LOG";

fn main() -> Result<()> {
    // Reset SIGPIPE so piping to `head` terminates quietly instead of panicking
    #[cfg(unix)]
    {
        unsafe {
            libc::signal(libc::SIGPIPE, libc::SIG_DFL);
        }
    }
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(2)
                .tab_width(4)
                .build(),
        )
    }))?;

    let cli = Cli::parse();
    let global = cli.global;
    init_tracing(global.verbose);

    match cli.command {
        Commands::Init(args) => ait::cli::commands::init::run(args),
        Commands::Import(args) => ait::cli::commands::import::run(args, &global),
        Commands::Template(args) => ait::cli::commands::template::run(args, &global),
        Commands::Catalogue(cmd) => ait::cli::commands::catalogue::run(cmd, &global),
        Commands::Store(cmd) => ait::cli::commands::store::run(cmd, &global),
        Commands::List(args) => ait::cli::commands::list::run(args, &global),
        Commands::Completions(args) => ait::cli::commands::completions::run(args),
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "ait=debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_env(LOG_ENV)
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default)),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
