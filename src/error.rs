//! Error types for the Octro client

use thiserror::Error;

/// Client-wide result type
pub type Result<T> = std::result::Result<T, ClientError>;

/// Client error type
#[derive(Error, Debug)]
pub enum ClientError {
    /// Rejected before any network call (e.g. no file selected).
    #[error("{0}")]
    Validation(String),

    /// The backend answered with a non-success status. `message` carries the
    /// backend's structured `detail`/`message` field verbatim when present,
    /// else a generic fallback supplied by the call site.
    #[error("{message}")]
    Backend { status: u16, message: String },

    /// The session cookie is missing or expired (HTTP 401).
    #[error("not signed in")]
    Unauthenticated,

    /// Request failed below the HTTP layer (DNS, connect, read, timeout).
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The promo validation call exceeded its dedicated deadline.
    #[error("promo code validation timed out, please try again")]
    PromoTimeout,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The requested operation is not valid in the workflow's current state.
    #[error("invalid workflow state: expected {0}")]
    InvalidState(&'static str),

    /// No JSON content is cached for the table, so it cannot be queried.
    #[error("table {0} has no JSON content to query")]
    NoTableData(usize),
}

impl ClientError {
    /// Message suitable for inline display next to the triggering control.
    pub fn user_message(&self) -> String {
        self.to_string()
    }

    /// Whether this error was produced without touching the network.
    pub fn is_validation(&self) -> bool {
        matches!(self, ClientError::Validation(_))
    }
}
