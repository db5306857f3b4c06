#![deny(rust_2018_idioms)]
#![warn(clippy::all)]

//! # docmap
//!
//! Command-line interface for docmap.
//!
//! `docmap validate` checks a mapping document; `docmap map` runs it against
//! source files and writes the targets.

mod commands;
mod config;

use anyhow::Context;
use clap::{Parser, Subcommand};
use commands::MapOptions;
use config::CliConfig;
use std::path::PathBuf;
use std::process::ExitCode;
use tokio::runtime::Builder;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "docmap")]
#[command(about = "Map fields between XML, JSON, and CSV documents")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a mapping document
    Validate {
        /// Mapping document (YAML, or JSON by extension)
        #[arg(short, long)]
        mapping: PathBuf,
    },

    /// Execute a mapping document
    Map {
        /// Mapping document (YAML, or JSON by extension)
        #[arg(short, long)]
        mapping: PathBuf,

        /// Source document as <id>=<file>
        #[arg(short, long = "source", value_parser = commands::parse_binding)]
        sources: Vec<(String, String)>,

        /// Target output as <id>=<file>
        #[arg(short, long = "target", value_parser = commands::parse_binding)]
        targets: Vec<(String, String)>,

        /// Runtime property as <name>=<value>
        #[arg(short, long = "property", value_parser = commands::parse_binding)]
        properties: Vec<(String, String)>,

        /// Abandon the run after this many seconds
        #[arg(long)]
        timeout_secs: Option<u64>,
    },
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let runtime = Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("starting the async runtime")?;
    let outcome = runtime.block_on(run(cli));
    // A timed-out mapping still occupies a blocking thread; leave it behind.
    runtime.shutdown_background();
    outcome
}

async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let mut config = match &cli.config {
        Some(path) => CliConfig::load(path)?,
        None => CliConfig::default(),
    };

    match cli.command {
        Commands::Validate { mapping } => commands::validate(&mapping, &config),
        Commands::Map {
            mapping,
            sources,
            targets,
            properties,
            timeout_secs,
        } => {
            if timeout_secs.is_some() {
                config.timeout_secs = timeout_secs;
            }
            let options = MapOptions {
                mapping,
                sources: into_paths(sources),
                targets: into_paths(targets),
                properties,
            };
            commands::map(options, &config).await
        }
    }
}

fn into_paths(bindings: Vec<(String, String)>) -> Vec<(String, PathBuf)> {
    bindings
        .into_iter()
        .map(|(id, file)| (id, PathBuf::from(file)))
        .collect()
}
