//! Jobgauge Monitor
//!
//! The remote job lifecycle monitor: submits one unit of work to a batch
//! backend, polls its status to a terminal state, timestamps every
//! observed transition, derives phase durations, and always persists a
//! complete run record - success, failure, or timeout.
//!
//! Architecture:
//! - Configuration: timeout and polling policy, from env or defaults
//! - PhaseClock: monotonic elapsed time + first-observation timestamps
//! - StatusPoller: the submit->poll loop with backoff and a hard deadline
//! - ResultPersister: crash-safe `results.json` / `processgraph.json` I/O
//! - JobLifecycleMonitor: orchestrates one run end to end
//!
//! One monitor instance manages exactly one remote job; monitoring many
//! jobs means many independent instances, each with its own output
//! directory.

mod clock;
mod config;
mod monitor;
mod persister;
mod poller;

#[cfg(test)]
pub(crate) mod testutil;

pub use clock::PhaseClock;
pub use config::MonitorConfig;
pub use monitor::JobLifecycleMonitor;
pub use persister::{
    DEFINITION_FILE, DIAGNOSTICS_FILE, PersistGuard, PersistenceError, RESULTS_FILE,
    ResultPersister,
};
pub use poller::{PollTimeout, StatusPoller};
