#![forbid(unsafe_code)]

mod cmd;
mod output;

use std::env;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use output::{resolve_output_mode, OutputMode};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Command-line front end for the timeline ingestion pipeline.
#[derive(Parser)]
#[command(name = "ftl", version, about = "Forensic timeline ingestion pipeline")]
struct Cli {
    /// Output mode: pretty (default for a TTY), text, or json.
    #[arg(long, global = true, value_enum)]
    format: Option<OutputMode>,

    /// Shorthand for `--format json`.
    #[arg(long, global = true, hide = true)]
    json: bool,

    /// Path to the SQLite database file. Falls back to `FTL_DB_PATH`, then
    /// `ftl.db` in the current directory.
    #[arg(long, global = true)]
    db_path: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Walk a staging directory and extract raw records into a new upload.
    Extract(cmd::extract::ExtractArgs),
    /// Map an upload's raw records into normalized events and entities.
    Map(cmd::map::MapArgs),
    /// Search events across uploads.
    Search(cmd::search::SearchArgs),
}

pub(crate) fn resolve_db_path(flag: Option<PathBuf>) -> PathBuf {
    flag.or_else(|| env::var("FTL_DB_PATH").ok().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("ftl.db"))
}

pub(crate) fn resolve_manifest_path(flag: Option<PathBuf>) -> PathBuf {
    flag.or_else(|| env::var("FTL_MANIFEST_PATH").ok().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("manifest.yaml"))
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("FTL_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if env::var("DEBUG").is_ok() {
            "ftl=debug,info"
        } else {
            "ftl=info,warn"
        })
    });

    let format = env::var("FTL_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    let registry = tracing_subscriber::registry().with(filter);

    match format.as_str() {
        "json" => {
            registry.with(fmt::layer().json().with_ansi(false)).init();
        }
        _ => {
            registry.with(fmt::layer().compact()).init();
        }
    }
}

fn main() -> anyhow::Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let mode = resolve_output_mode(cli.format, cli.json);
    let db_path = resolve_db_path(cli.db_path);

    let result = match cli.command {
        Commands::Extract(args) => cmd::extract::run(&args, &db_path, mode),
        Commands::Map(args) => cmd::map::run(&args, &db_path, mode),
        Commands::Search(args) => cmd::search::run(&args, &db_path, mode),
    };

    if let Err(err) = result {
        output::render_error(mode, &output::CliError::new(err.to_string()))?;
        std::process::exit(1);
    }

    Ok(())
}
