//! Run command handler
//!
//! Monitors one job on one backend. The process exits 0 whenever a run
//! completed, even when the run record says `failed` - failure is
//! reported through the record, not the exit code. Non-zero exits are
//! reserved for not being able to start at all (unreadable scenario
//! file, unwritable output directory).

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use clap::Args;
use colored::*;
use jobgauge_client::{HttpBackendClient, backend_name};
use jobgauge_core::domain::job::JobDefinition;
use jobgauge_core::domain::run::{FinalOutcome, RunRecord};
use jobgauge_monitor::{JobLifecycleMonitor, MonitorConfig, RESULTS_FILE};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Arguments for the run command
#[derive(Args)]
pub struct RunArgs {
    /// Backend API URL
    #[arg(long, env = "JOBGAUGE_API_URL")]
    pub api_url: String,

    /// Path to the job definition JSON file
    #[arg(long, short = 'i')]
    pub scenario: PathBuf,

    /// Output directory (defaults to output/<host>_<scenario>_<timestamp>)
    #[arg(long, short = 'o')]
    pub output_directory: Option<PathBuf>,

    /// Bearer token for backend authentication
    #[arg(long, env = "JOBGAUGE_API_TOKEN")]
    pub token: Option<String>,
}

/// Handle the run command
pub async fn handle(args: RunArgs) -> Result<()> {
    let definition = load_definition(&args.scenario)?;

    let output_dir = args
        .output_directory
        .unwrap_or_else(|| default_output_dir(&args.api_url, &definition.name, Local::now()));

    let config = MonitorConfig::from_env();
    config.validate()?;

    let mut client = HttpBackendClient::new(&args.api_url);
    if let Some(token) = args.token {
        client = client.with_token(token);
    }

    let monitor = JobLifecycleMonitor::new(Arc::new(client), config);
    let record = monitor
        .run(&definition, output_dir)
        .await
        .context("failed to acquire the output directory")?;

    print_outcome(&record);

    Ok(())
}

/// Load a job definition from disk
///
/// This is the one place a missing or malformed scenario file surfaces
/// as a process error.
pub fn load_definition(path: &Path) -> Result<JobDefinition> {
    let raw = std::fs::read(path)
        .with_context(|| format!("cannot read scenario file {}", path.display()))?;

    let name = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("scenario")
        .to_string();

    JobDefinition::new(name, raw)
        .with_context(|| format!("scenario file {} is not valid JSON", path.display()))
}

/// Default output directory: backend host, scenario name, start instant
pub fn default_output_dir(api_url: &str, scenario: &str, at: DateTime<Local>) -> PathBuf {
    let host = backend_name(api_url).replace('.', "_");
    PathBuf::from("output").join(format!(
        "{}_{}_{}",
        host,
        scenario,
        at.format("%Y%m%d%H%M%S")
    ))
}

/// Print a colored one-run summary, always pointing at the record
pub fn print_outcome(record: &RunRecord) {
    let results_path = record.output_directory.join(RESULTS_FILE);

    match record.outcome {
        FinalOutcome::Success => {
            println!(
                "{} {}",
                "✓".green(),
                format!(
                    "{} on {} finished in {:.1}s",
                    record.job_name, record.backend_name, record.total_time
                )
                .bold()
            );
        }
        FinalOutcome::Failed => {
            println!(
                "{} {}",
                "✗".red(),
                format!("{} on {} failed", record.job_name, record.backend_name).bold()
            );
            if let Some(error) = &record.error {
                println!("  {}", error.red());
            }
        }
    }

    println!(
        "  Record: {}",
        results_path.display().to_string().dimmed()
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_default_output_dir_shape() {
        let at = Local.with_ymd_and_hms(2025, 6, 26, 14, 30, 5).unwrap();
        let dir = default_output_dir(
            "https://openeo.dataspace.example.eu/openeo/1.2",
            "ndvi_10km",
            at,
        );
        assert_eq!(
            dir,
            PathBuf::from("output/openeo_dataspace_example_eu_ndvi_10km_20250626143005")
        );
    }

    #[test]
    fn test_load_definition_missing_file_is_an_error() {
        assert!(load_definition(Path::new("does/not/exist.json")).is_err());
    }
}
