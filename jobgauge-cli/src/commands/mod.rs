//! Command handlers

mod run;
mod suite;

use anyhow::Result;
use clap::Subcommand;

/// Top-level commands
#[derive(Subcommand)]
pub enum Commands {
    /// Run one scenario against a backend and persist the run record
    Run(run::RunArgs),
    /// Run a scenario against every backend in a backends file
    Suite(suite::SuiteArgs),
}

/// Route commands to their handlers
pub async fn handle_command(command: Commands) -> Result<()> {
    match command {
        Commands::Run(args) => run::handle(args).await,
        Commands::Suite(args) => suite::handle(args).await,
    }
}
