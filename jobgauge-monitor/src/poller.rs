//! Status poller
//!
//! Drives the poll loop for one submitted job: reads the remote status,
//! normalizes and timestamps each transition, and exits on a terminal
//! state or on the hard timeout. Poll intervals grow by a fixed factor up
//! to a ceiling, trading early responsiveness for reduced load on
//! long-running jobs.

use jobgauge_client::BackendConnection;
use jobgauge_core::domain::job::JobStatus;
use std::time::Duration;
use thiserror::Error;
use tokio::time::{self, Instant};
use tracing::{info, warn};

use crate::clock::PhaseClock;
use crate::config::MonitorConfig;

/// The polling loop exceeded its deadline without a terminal status
#[derive(Debug, Error)]
#[error("job did not reach a terminal status within {}s", .timeout.as_secs())]
pub struct PollTimeout {
    /// The deadline that was exceeded
    pub timeout: Duration,
    /// Last normalized status observed before giving up, if any
    pub last_status: Option<JobStatus>,
}

/// Polls one job to a terminal state
pub struct StatusPoller<'a> {
    connection: &'a dyn BackendConnection,
    config: &'a MonitorConfig,
}

impl<'a> StatusPoller<'a> {
    pub fn new(connection: &'a dyn BackendConnection, config: &'a MonitorConfig) -> Self {
        Self { connection, config }
    }

    /// Run the poll loop until a terminal status or the timeout
    ///
    /// Individual poll failures are transient blips: they are logged and
    /// retried on the next tick, still subject to the overall deadline.
    /// Unknown status spellings are logged and never recorded, so the
    /// history only contains canonical states.
    pub async fn poll_until_terminal(
        &self,
        job_id: &str,
        clock: &mut PhaseClock,
    ) -> Result<JobStatus, PollTimeout> {
        clock.record(JobStatus::Submitted);

        let loop_started = Instant::now();
        let mut interval = self.config.initial_poll_interval;
        let mut last_status: Option<JobStatus> = None;
        let mut ticks: u32 = 0;

        loop {
            if loop_started.elapsed() > self.config.timeout {
                warn!(
                    job_id,
                    elapsed_secs = loop_started.elapsed().as_secs(),
                    "polling deadline exceeded"
                );
                return Err(PollTimeout {
                    timeout: self.config.timeout,
                    last_status,
                });
            }

            match self.connection.poll_status(job_id).await {
                Ok(raw) => match JobStatus::normalize(&raw) {
                    Some(status) => {
                        if clock.record(status) {
                            info!(
                                job_id,
                                status = %status,
                                elapsed_secs = clock.elapsed().as_secs_f64(),
                                "job status changed"
                            );
                        }
                        last_status = Some(status);
                        if status.is_terminal() {
                            return Ok(status);
                        }
                    }
                    None => {
                        warn!(job_id, status = %raw, "backend reported unknown status");
                    }
                },
                Err(e) => {
                    warn!(job_id, error = %e, "status poll failed, retrying on next tick");
                }
            }

            ticks += 1;
            if ticks % self.config.liveness_every == 0 {
                info!(
                    job_id,
                    status = ?last_status,
                    elapsed_secs = loop_started.elapsed().as_secs(),
                    "job not yet terminal"
                );
            }

            time::sleep(interval).await;
            interval = interval
                .mul_f64(self.config.backoff_factor)
                .min(self.config.max_poll_interval);
        }
    }
}
