//! Scripted backend for lifecycle tests
//!
//! Replays a time-indexed status schedule under paused tokio time, so the
//! timing scenarios run instantly and deterministically.

use async_trait::async_trait;
use jobgauge_client::{BackendConnection, BackendError, Result};
use jobgauge_core::domain::job::JobDefinition;
use serde_json::json;
use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::time::{self, Instant};

pub(crate) struct ScriptedBackend {
    url: String,
    /// Status visible from each offset since construction
    schedule: Vec<(Duration, String)>,
    origin: Instant,
    polls: AtomicUsize,
    flaky_polls: AtomicUsize,
    submit_error: Mutex<Option<BackendError>>,
    start_error: Mutex<Option<BackendError>>,
    download_error: Mutex<Option<BackendError>>,
    download_delay: Duration,
    file_count: usize,
}

impl ScriptedBackend {
    pub fn new(schedule: &[(u64, &str)]) -> Self {
        Self {
            url: "https://backend.test.invalid/v1".to_string(),
            schedule: schedule
                .iter()
                .map(|(secs, status)| (Duration::from_secs(*secs), status.to_string()))
                .collect(),
            origin: Instant::now(),
            polls: AtomicUsize::new(0),
            flaky_polls: AtomicUsize::new(0),
            submit_error: Mutex::new(None),
            start_error: Mutex::new(None),
            download_error: Mutex::new(None),
            download_delay: Duration::ZERO,
            file_count: 1,
        }
    }

    /// Fail the first `n` status polls with a transient error
    pub fn with_flaky_polls(self, n: usize) -> Self {
        self.flaky_polls.store(n, Ordering::SeqCst);
        self
    }

    pub fn with_submit_error(self, error: BackendError) -> Self {
        *self.submit_error.lock().unwrap() = Some(error);
        self
    }

    pub fn with_start_error(self, error: BackendError) -> Self {
        *self.start_error.lock().unwrap() = Some(error);
        self
    }

    pub fn with_download_error(self, error: BackendError) -> Self {
        *self.download_error.lock().unwrap() = Some(error);
        self
    }

    /// Make downloads take `delay_secs` and yield `file_count` files
    pub fn with_download(mut self, delay_secs: u64, file_count: usize) -> Self {
        self.download_delay = Duration::from_secs(delay_secs);
        self.file_count = file_count;
        self
    }

    pub fn poll_count(&self) -> usize {
        self.polls.load(Ordering::SeqCst)
    }

    fn current_status(&self) -> String {
        let elapsed = self.origin.elapsed();
        self.schedule
            .iter()
            .rev()
            .find(|(offset, _)| *offset <= elapsed)
            .map(|(_, status)| status.clone())
            .unwrap_or_else(|| "submitted".to_string())
    }
}

#[async_trait]
impl BackendConnection for ScriptedBackend {
    fn backend_url(&self) -> &str {
        &self.url
    }

    async fn submit(&self, _definition: &JobDefinition) -> Result<String> {
        if let Some(error) = self.submit_error.lock().unwrap().take() {
            return Err(error);
        }
        Ok("job-0001".to_string())
    }

    async fn start(&self, _job_id: &str) -> Result<()> {
        if let Some(error) = self.start_error.lock().unwrap().take() {
            return Err(error);
        }
        Ok(())
    }

    async fn poll_status(&self, _job_id: &str) -> Result<String> {
        self.polls.fetch_add(1, Ordering::SeqCst);
        if self.flaky_polls.load(Ordering::SeqCst) > 0 {
            self.flaky_polls.fetch_sub(1, Ordering::SeqCst);
            return Err(BackendError::Protocol("simulated network blip".to_string()));
        }
        Ok(self.current_status())
    }

    async fn fetch_and_download(&self, _job_id: &str, _destination: &Path) -> Result<usize> {
        if !self.download_delay.is_zero() {
            time::sleep(self.download_delay).await;
        }
        if let Some(error) = self.download_error.lock().unwrap().take() {
            return Err(error);
        }
        Ok(self.file_count)
    }

    async fn fetch_diagnostics(&self, job_id: &str) -> Result<serde_json::Value> {
        Ok(json!({
            "logs": [{ "id": job_id, "level": "error", "message": "scripted diagnostics" }]
        }))
    }
}
