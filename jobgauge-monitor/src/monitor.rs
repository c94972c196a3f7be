//! Job lifecycle monitor
//!
//! Orchestrates one run: submit, start, poll to a terminal state, download
//! results, and always persist the run record. Failure is expressed as
//! data in the record, not as control flow - the caller only ever sees an
//! error when the output directory cannot be acquired before a record
//! exists.

use jobgauge_client::{BackendConnection, backend_name};
use jobgauge_core::domain::job::{JobDefinition, JobStatus};
use jobgauge_core::domain::run::RunRecord;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::clock::PhaseClock;
use crate::config::MonitorConfig;
use crate::persister::{PersistGuard, PersistenceError, ResultPersister};
use crate::poller::StatusPoller;

/// Monitors exactly one remote job from submission to persisted record
///
/// Instances are independent: each owns its record and clock and writes
/// to its own output directory, so monitoring N jobs is N instances on N
/// tasks with no shared state.
pub struct JobLifecycleMonitor {
    connection: Arc<dyn BackendConnection>,
    config: MonitorConfig,
}

impl JobLifecycleMonitor {
    pub fn new(connection: Arc<dyn BackendConnection>, config: MonitorConfig) -> Self {
        Self { connection, config }
    }

    /// Run one job to completion and persist its record
    ///
    /// Every path - success, remote failure, timeout, download failure -
    /// converges on the same persist step; the returned record describes
    /// however far execution progressed.
    pub async fn run(
        &self,
        definition: &JobDefinition,
        output_dir: PathBuf,
    ) -> Result<RunRecord, PersistenceError> {
        let persister = ResultPersister::new(&output_dir);
        let definition_path = persister.prepare(definition)?;

        let mut clock = PhaseClock::new();
        let record = RunRecord::new(
            self.connection.backend_url(),
            backend_name(self.connection.backend_url()),
            definition.name.clone(),
            clock.started_at(),
            output_dir,
            definition_path,
        );
        let mut guard = PersistGuard::new(persister, record);

        self.execute(definition, &mut clock, &mut guard).await;

        guard.status_history = clock.history();
        guard.total_time = clock.elapsed().as_secs_f64();
        Ok(guard.finish())
    }

    /// The fallible middle of the lifecycle; failures land in the record
    async fn execute(
        &self,
        definition: &JobDefinition,
        clock: &mut PhaseClock,
        record: &mut PersistGuard,
    ) {
        let backend = self.connection.backend_url();
        info!(backend, job = %definition.name, "submitting job");

        let job_id = match self.connection.submit(definition).await {
            Ok(id) => {
                record.job_id = Some(id.clone());
                record.submit_time = Some(clock.elapsed().as_secs_f64());
                info!(job_id = %id, "job submitted");
                id
            }
            Err(e) => {
                error!(backend, error = %e, "job submission failed");
                record.mark_failed(format!("submission failed: {e}"));
                return;
            }
        };

        if let Err(e) = self.connection.start(&job_id).await {
            error!(job_id, error = %e, "failed to start job");
            record.mark_failed(format!("start failed: {e}"));
            return;
        }
        record.job_start_time = Some(clock.elapsed().as_secs_f64());
        let execution_started = clock.elapsed();
        info!(job_id, "job started");

        let poller = StatusPoller::new(self.connection.as_ref(), &self.config);
        let outcome = poller.poll_until_terminal(&job_id, clock).await;

        record.execution_time = Some(phase_secs(clock.elapsed(), execution_started));
        record.queue_time = clock
            .between(JobStatus::Queued, JobStatus::Running)
            .map(|d| d.as_secs_f64());
        record.processing_time = clock
            .between(JobStatus::Running, JobStatus::Finished)
            .map(|d| d.as_secs_f64());

        match outcome {
            Ok(JobStatus::Finished) => {
                record.status = Some(JobStatus::Finished);
                let download_started = clock.elapsed();
                match self
                    .connection
                    .fetch_and_download(&job_id, &record.output_directory)
                    .await
                {
                    Ok(files) => {
                        record.download_time = Some(phase_secs(clock.elapsed(), download_started));
                        record.mark_success();
                        info!(job_id, files, "results downloaded");
                    }
                    Err(e) => {
                        // Timing collected so far is retained
                        error!(job_id, error = %e, "result download failed");
                        record.mark_failed(format!("download failed: {e}"));
                    }
                }
            }
            Ok(terminal) => {
                record.status = Some(terminal);
                record.mark_failed(format!("job ended with status {terminal}"));
                self.collect_diagnostics(&job_id, record).await;
            }
            Err(timeout) => {
                record.status = timeout.last_status;
                record.mark_failed(timeout.to_string());
                self.collect_diagnostics(&job_id, record).await;
            }
        }
    }

    /// Best-effort fetch of remote diagnostics for a failed run
    async fn collect_diagnostics(&self, job_id: &str, record: &PersistGuard) {
        match self.connection.fetch_diagnostics(job_id).await {
            Ok(diagnostics) => match record.persister().persist_diagnostics(&diagnostics) {
                Ok(path) => info!(job_id, path = %path.display(), "job diagnostics saved"),
                Err(e) => warn!(job_id, error = %e, "failed to save job diagnostics"),
            },
            Err(e) => warn!(job_id, error = %e, "failed to fetch job diagnostics"),
        }
    }
}

/// Seconds between two monotonic offsets of the same clock
fn phase_secs(now: Duration, since: Duration) -> f64 {
    now.saturating_sub(since).as_secs_f64()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persister::{DEFINITION_FILE, RESULTS_FILE};
    use crate::testutil::ScriptedBackend;
    use jobgauge_client::BackendError;
    use jobgauge_core::domain::run::FinalOutcome;
    use std::fs;
    use std::path::Path;

    fn temp_dir() -> PathBuf {
        std::env::temp_dir().join(format!("jobgauge-test-{}", uuid::Uuid::new_v4()))
    }

    fn definition() -> JobDefinition {
        JobDefinition::new("ndvi_10km", br#"{"process_graph": {"load": {}}}"#.to_vec()).unwrap()
    }

    fn config() -> MonitorConfig {
        MonitorConfig {
            timeout: Duration::from_secs(300),
            ..MonitorConfig::default()
        }
    }

    fn read_results(dir: &Path) -> RunRecord {
        serde_json::from_slice(&fs::read(dir.join(RESULTS_FILE)).unwrap()).unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_successful_run_collects_all_phases() {
        let backend = Arc::new(
            ScriptedBackend::new(&[(0, "queued"), (10, "running"), (40, "finished")])
                .with_download(5, 3),
        );
        let monitor = JobLifecycleMonitor::new(backend, config());
        let dir = temp_dir();

        let record = monitor.run(&definition(), dir.clone()).await.unwrap();

        assert_eq!(record.outcome, FinalOutcome::Success);
        assert_eq!(record.job_id.as_deref(), Some("job-0001"));
        assert_eq!(record.status, Some(JobStatus::Finished));

        // Polling granularity means observed transitions lag the backend;
        // the derived phases stay in the right neighborhood
        let queue = record.queue_time.unwrap();
        let processing = record.processing_time.unwrap();
        let download = record.download_time.unwrap();
        assert!(queue >= 5.0 && queue <= 25.0, "queue_time = {queue}");
        assert!(
            processing >= 20.0 && processing <= 45.0,
            "processing_time = {processing}"
        );
        assert!((download - 5.0).abs() < 0.5, "download_time = {download}");

        // total dominates every recorded phase
        for phase in [
            record.submit_time,
            record.execution_time,
            record.download_time,
        ]
        .into_iter()
        .flatten()
        {
            assert!(record.total_time >= phase);
        }

        let persisted = read_results(&dir);
        assert_eq!(persisted.outcome, FinalOutcome::Success);
        assert!(dir.join(DEFINITION_FILE).exists());
        fs::remove_dir_all(&dir).unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_immediate_error_leaves_phase_timings_absent() {
        let backend = Arc::new(ScriptedBackend::new(&[(0, "error")]));
        let monitor = JobLifecycleMonitor::new(backend, config());
        let dir = temp_dir();

        let record = monitor.run(&definition(), dir.clone()).await.unwrap();

        assert_eq!(record.outcome, FinalOutcome::Failed);
        assert_eq!(record.status, Some(JobStatus::Error));
        assert!(record.queue_time.is_none());
        assert!(record.processing_time.is_none());
        assert!(record.error.unwrap().contains("error"));

        // The record and the diagnostics dump were still written
        assert!(dir.join(RESULTS_FILE).exists());
        assert!(dir.join("job_logs.json").exists());
        fs::remove_dir_all(&dir).unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_auth_failure_at_submit_skips_polling() {
        let backend = Arc::new(
            ScriptedBackend::new(&[(0, "queued")])
                .with_submit_error(BackendError::auth(401, "token expired")),
        );
        let monitor = JobLifecycleMonitor::new(backend.clone(), config());
        let dir = temp_dir();

        let record = monitor.run(&definition(), dir.clone()).await.unwrap();

        assert_eq!(record.outcome, FinalOutcome::Failed);
        assert!(record.job_id.is_none());
        assert_eq!(backend.poll_count(), 0);
        assert!(record.error.unwrap().contains("token expired"));
        assert!(dir.join(RESULTS_FILE).exists());
        fs::remove_dir_all(&dir).unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_failure_short_circuits() {
        let backend = Arc::new(
            ScriptedBackend::new(&[(0, "queued")])
                .with_start_error(BackendError::remote_state(409, "already queued")),
        );
        let monitor = JobLifecycleMonitor::new(backend.clone(), config());
        let dir = temp_dir();

        let record = monitor.run(&definition(), dir.clone()).await.unwrap();

        assert_eq!(record.outcome, FinalOutcome::Failed);
        assert_eq!(record.job_id.as_deref(), Some("job-0001"));
        assert!(record.submit_time.is_some());
        assert!(record.execution_time.is_none());
        assert_eq!(backend.poll_count(), 0);
        fs::remove_dir_all(&dir).unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_download_failure_retains_collected_timing() {
        let backend = Arc::new(
            ScriptedBackend::new(&[(0, "queued"), (10, "running"), (40, "finished")])
                .with_download_error(BackendError::Download("connection reset".to_string())),
        );
        let monitor = JobLifecycleMonitor::new(backend, config());
        let dir = temp_dir();

        let record = monitor.run(&definition(), dir.clone()).await.unwrap();

        assert_eq!(record.outcome, FinalOutcome::Failed);
        assert!(record.submit_time.is_some());
        assert!(record.execution_time.is_some());
        assert!(record.queue_time.is_some());
        assert!(record.download_time.is_none());

        let persisted = read_results(&dir);
        assert!(persisted.execution_time.is_some());
        assert_eq!(persisted.outcome, FinalOutcome::Failed);
        fs::remove_dir_all(&dir).unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_persists_failed_record() {
        let backend = Arc::new(ScriptedBackend::new(&[(0, "queued")]));
        let monitor = JobLifecycleMonitor::new(
            backend,
            MonitorConfig {
                timeout: Duration::from_secs(60),
                ..MonitorConfig::default()
            },
        );
        let dir = temp_dir();

        let record = monitor.run(&definition(), dir.clone()).await.unwrap();

        assert_eq!(record.outcome, FinalOutcome::Failed);
        assert_eq!(record.status, Some(JobStatus::Queued));
        assert!(record.error.unwrap().contains("terminal"));
        assert!(record.total_time >= 60.0);
        assert!(dir.join(RESULTS_FILE).exists());
        fs::remove_dir_all(&dir).unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_fresh_directories_never_touch_prior_runs() {
        let dir_a = temp_dir();
        let dir_b = temp_dir();

        let backend = Arc::new(ScriptedBackend::new(&[(0, "finished")]));
        let monitor = JobLifecycleMonitor::new(backend, config());
        monitor.run(&definition(), dir_a.clone()).await.unwrap();
        let first = fs::read(dir_a.join(RESULTS_FILE)).unwrap();

        let backend = Arc::new(ScriptedBackend::new(&[(0, "finished")]));
        let monitor = JobLifecycleMonitor::new(backend, config());
        monitor.run(&definition(), dir_b.clone()).await.unwrap();

        assert_eq!(fs::read(dir_a.join(RESULTS_FILE)).unwrap(), first);
        fs::remove_dir_all(&dir_a).unwrap();
        fs::remove_dir_all(&dir_b).unwrap();
    }
}
