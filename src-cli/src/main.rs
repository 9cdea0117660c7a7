//! Stockroom command line.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{error, info};

mod ingest;

#[derive(Debug, Parser)]
#[command(name = "stockroom", version, about = "Enrich local stock photos and publish them to a gallery")]
struct Cli {
    /// Config file (defaults to the platform config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Process every new asset in a directory
    Ingest(IngestArgs),
}

#[derive(Debug, clap::Args)]
struct IngestArgs {
    /// Directory holding the downloaded assets
    dir: PathBuf,

    /// Run the browser without a window
    #[arg(long)]
    headless: bool,
}

/// Initialize tracing subscriber for logging
fn init_tracing() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,stockroom=debug"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true))
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() {
    // A missing .env is normal; variables may come from the shell.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cli = Cli::parse();
    info!("Starting Stockroom v{}", env!("CARGO_PKG_VERSION"));

    let result = match cli.command {
        Commands::Ingest(args) => ingest::run(cli.config.as_deref(), &args.dir, args.headless).await,
    };

    if let Err(e) = result {
        error!("{:#}", e);
        std::process::exit(1);
    }
}
