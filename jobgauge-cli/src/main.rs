//! Jobgauge CLI
//!
//! Command-line interface for benchmarking remote batch-processing
//! backends: submits a job definition, monitors it to a terminal state,
//! and persists a run record for the reporting tooling downstream.

mod commands;
mod types;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, handle_command};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "jobgauge")]
#[command(about = "Batch-backend benchmarking CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    handle_command(cli.command).await
}
