//! Suite command handler
//!
//! Runs one scenario against every backend in a backends file. Each
//! backend gets its own independent monitor on its own task, bounded by a
//! semaphore so slow backends cannot starve the rest while still
//! respecting rate limits. Monitors share nothing; isolation is by output
//! directory.

use anyhow::{Context, Result};
use chrono::Local;
use clap::Args;
use colored::*;
use jobgauge_client::HttpBackendClient;
use jobgauge_core::domain::run::{FinalOutcome, RunRecord};
use jobgauge_monitor::{JobLifecycleMonitor, MonitorConfig};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{error, info, warn};

use crate::commands::run::{load_definition, print_outcome};
use crate::types::BackendSpec;

/// Arguments for the suite command
#[derive(Args)]
pub struct SuiteArgs {
    /// Path to the backends JSON file
    #[arg(long, default_value = "backends.json")]
    pub backends: PathBuf,

    /// Path to the job definition JSON file
    #[arg(long, short = 'i')]
    pub scenario: PathBuf,

    /// Root directory for per-backend output
    #[arg(long, default_value = "output")]
    pub output_root: PathBuf,

    /// Maximum number of monitors running at once
    #[arg(long, default_value_t = 4)]
    pub max_parallel: usize,
}

/// Handle the suite command
pub async fn handle(args: SuiteArgs) -> Result<()> {
    let definition = load_definition(&args.scenario)?;

    let backends: Vec<BackendSpec> = serde_json::from_slice(
        &std::fs::read(&args.backends)
            .with_context(|| format!("cannot read backends file {}", args.backends.display()))?,
    )
    .with_context(|| format!("backends file {} is not valid JSON", args.backends.display()))?;

    if backends.is_empty() {
        anyhow::bail!("no backends defined in {}", args.backends.display());
    }

    let config = MonitorConfig::from_env();
    config.validate()?;

    let suite_root = args
        .output_root
        .join(Local::now().format("%Y%m%d%H%M%S").to_string());
    let semaphore = Arc::new(Semaphore::new(args.max_parallel.max(1)));

    info!(
        backends = backends.len(),
        scenario = %definition.name,
        max_parallel = args.max_parallel,
        "starting suite"
    );

    let mut handles = Vec::new();
    for backend in backends {
        let definition = definition.clone();
        let config = config.clone();
        let semaphore = Arc::clone(&semaphore);
        let output_dir = suite_root.join(format!(
            "{}_{}",
            dir_component(&backend.name),
            definition.name
        ));

        handles.push(tokio::spawn(async move {
            let _permit = semaphore.acquire_owned().await.ok()?;

            let mut client = HttpBackendClient::new(&backend.url);
            if let Some(token) = backend.token {
                client = client.with_token(token);
            }

            let monitor = JobLifecycleMonitor::new(Arc::new(client), config);
            match monitor.run(&definition, output_dir).await {
                Ok(record) => Some(record),
                Err(e) => {
                    error!(
                        backend = %backend.name,
                        error = %e,
                        "failed to acquire the output directory"
                    );
                    None
                }
            }
        }));
    }

    let mut records: Vec<RunRecord> = Vec::new();
    for handle in handles {
        match handle.await {
            Ok(Some(record)) => records.push(record),
            Ok(None) => {}
            Err(e) => warn!("monitor task panicked: {}", e),
        }
    }

    write_aggregate(&suite_root, &records);
    print_suite_summary(&records);

    Ok(())
}

/// Write the aggregate record list; per-run records are already durable,
/// so failure here is logged, not escalated
fn write_aggregate(suite_root: &PathBuf, records: &[RunRecord]) {
    let path = suite_root.join("scenario_results.json");
    let result = serde_json::to_vec_pretty(records)
        .map_err(anyhow::Error::from)
        .and_then(|body| std::fs::write(&path, body).map_err(anyhow::Error::from));

    match result {
        Ok(()) => info!(path = %path.display(), "suite aggregate written"),
        Err(e) => warn!(error = %e, "failed to write suite aggregate"),
    }
}

fn print_suite_summary(records: &[RunRecord]) {
    println!();
    for record in records {
        print_outcome(record);
    }

    let successful = records
        .iter()
        .filter(|r| r.outcome == FinalOutcome::Success)
        .count();
    let failed = records.len() - successful;

    println!();
    println!(
        "{}",
        format!(
            "Suite finished: {} succeeded, {} failed",
            successful, failed
        )
        .bold()
    );
}

/// Make a backend name safe to use as a directory component
fn dir_component(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dir_component_sanitizes() {
        assert_eq!(dir_component("openeo.example.eu"), "openeo_example_eu");
        assert_eq!(dir_component("CDSE west/1"), "CDSE_west_1");
        assert_eq!(dir_component("plain-name_2"), "plain-name_2");
    }
}
