//! Phase clock
//!
//! Timestamps the lifecycle of one monitored job: a monotonic start
//! instant plus the wall-clock time each status was first observed.
//! Durations are always derived from the monotonic clock, so recorded
//! offsets never go backwards even if the wall clock does.

use chrono::{DateTime, Utc};
use jobgauge_core::domain::job::JobStatus;
use jobgauge_core::domain::run::StatusHistory;
use std::time::Duration;
use tokio::time::Instant;

/// Clock for one run, created when the monitor starts
#[derive(Debug)]
pub struct PhaseClock {
    started: Instant,
    started_at: DateTime<Utc>,
    entries: Vec<(JobStatus, DateTime<Utc>, Duration)>,
}

impl PhaseClock {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            started_at: Utc::now(),
            entries: Vec::new(),
        }
    }

    /// Wall-clock instant the run started
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Monotonic time since the run started
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Record the first observation of `status`
    ///
    /// Idempotent: re-observations of an already-recorded status are
    /// ignored, so slow polling never double-counts a phase. Returns
    /// `true` when the status was newly recorded.
    pub fn record(&mut self, status: JobStatus) -> bool {
        if self.offset_of(status).is_some() {
            return false;
        }
        self.entries.push((status, Utc::now(), self.elapsed()));
        true
    }

    /// Monotonic offset at which `status` was first observed
    pub fn offset_of(&self, status: JobStatus) -> Option<Duration> {
        self.entries
            .iter()
            .find(|(s, _, _)| *s == status)
            .map(|(_, _, offset)| *offset)
    }

    /// Duration between the first observations of two statuses
    ///
    /// Absent unless both statuses were observed, `from` no later than
    /// `to`.
    pub fn between(&self, from: JobStatus, to: JobStatus) -> Option<Duration> {
        let from_offset = self.offset_of(from)?;
        let to_offset = self.offset_of(to)?;
        to_offset.checked_sub(from_offset)
    }

    /// Serializable snapshot of the observation history
    pub fn history(&self) -> StatusHistory {
        let mut history = StatusHistory::new();
        for (status, at, _) in &self.entries {
            history.record(*status, *at);
        }
        history
    }
}

impl Default for PhaseClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::{self, Duration};

    #[tokio::test(start_paused = true)]
    async fn test_record_is_idempotent() {
        let mut clock = PhaseClock::new();
        assert!(clock.record(JobStatus::Queued));

        time::advance(Duration::from_secs(30)).await;
        assert!(!clock.record(JobStatus::Queued));

        assert_eq!(clock.offset_of(JobStatus::Queued), Some(Duration::ZERO));
    }

    #[tokio::test(start_paused = true)]
    async fn test_offsets_are_monotonic() {
        let mut clock = PhaseClock::new();
        clock.record(JobStatus::Submitted);
        time::advance(Duration::from_secs(10)).await;
        clock.record(JobStatus::Queued);
        time::advance(Duration::from_secs(20)).await;
        clock.record(JobStatus::Running);

        let offsets: Vec<Duration> = [JobStatus::Submitted, JobStatus::Queued, JobStatus::Running]
            .iter()
            .map(|s| clock.offset_of(*s).unwrap())
            .collect();
        assert!(offsets.windows(2).all(|w| w[0] <= w[1]));
    }

    #[tokio::test(start_paused = true)]
    async fn test_between_derives_phase_durations() {
        let mut clock = PhaseClock::new();
        clock.record(JobStatus::Queued);
        time::advance(Duration::from_secs(10)).await;
        clock.record(JobStatus::Running);
        time::advance(Duration::from_secs(30)).await;
        clock.record(JobStatus::Finished);

        assert_eq!(
            clock.between(JobStatus::Queued, JobStatus::Running),
            Some(Duration::from_secs(10))
        );
        assert_eq!(
            clock.between(JobStatus::Running, JobStatus::Finished),
            Some(Duration::from_secs(30))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_between_absent_when_phase_never_observed() {
        let mut clock = PhaseClock::new();
        clock.record(JobStatus::Submitted);
        clock.record(JobStatus::Error);

        // Never queued, never running: durations are absent, not zero
        assert_eq!(clock.between(JobStatus::Queued, JobStatus::Running), None);
        assert_eq!(clock.between(JobStatus::Running, JobStatus::Finished), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_history_snapshot_preserves_order() {
        let mut clock = PhaseClock::new();
        clock.record(JobStatus::Submitted);
        time::advance(Duration::from_secs(1)).await;
        clock.record(JobStatus::Queued);

        let history = clock.history();
        let order: Vec<JobStatus> = history.iter().map(|(s, _)| *s).collect();
        assert_eq!(order, vec![JobStatus::Submitted, JobStatus::Queued]);
    }
}
