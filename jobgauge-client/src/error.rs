//! Error taxonomy for backend operations

use thiserror::Error;

/// Result type alias for backend operations
pub type Result<T> = std::result::Result<T, BackendError>;

/// Errors raised by a backend connection
///
/// The monitor's retry policy keys off these: `Connection` is transient
/// and retried during polling; everything else short-circuits the step
/// that raised it.
#[derive(Debug, Error)]
pub enum BackendError {
    /// Network-level failure; retried during polling, fatal elsewhere
    #[error("connection failed: {0}")]
    Connection(#[from] reqwest::Error),

    /// Credentials rejected; never retried
    #[error("authentication rejected (status {status}): {message}")]
    Auth {
        /// HTTP status code
        status: u16,
        /// Error message from the backend
        message: String,
    },

    /// Backend rejected the job definition
    #[error("job submission rejected (status {status}): {message}")]
    Submission { status: u16, message: String },

    /// Backend refused a state transition (e.g. starting a started job)
    #[error("backend refused state transition (status {status}): {message}")]
    RemoteState { status: u16, message: String },

    /// Status read or results listing succeeded at the HTTP level but the
    /// artifact transfer failed
    #[error("result download failed: {0}")]
    Download(String),

    /// Response did not match the expected wire shape
    #[error("unexpected backend response: {0}")]
    Protocol(String),
}

impl BackendError {
    /// Create an authentication error from status code and message
    pub fn auth(status: u16, message: impl Into<String>) -> Self {
        Self::Auth {
            status,
            message: message.into(),
        }
    }

    /// Create a submission error from status code and message
    pub fn submission(status: u16, message: impl Into<String>) -> Self {
        Self::Submission {
            status,
            message: message.into(),
        }
    }

    /// Create a remote-state error from status code and message
    pub fn remote_state(status: u16, message: impl Into<String>) -> Self {
        Self::RemoteState {
            status,
            message: message.into(),
        }
    }

    /// Whether retrying the same call later could succeed
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Connection(_))
    }

    /// Whether this is a credential failure
    pub fn is_auth(&self) -> bool {
        matches!(self, Self::Auth { .. })
    }
}
