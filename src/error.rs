//! Error types for the liveboard pipeline.

/// A failure that abandons a whole poll cycle.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// Transport failure: DNS, connect, timeout, body read.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The feed answered with a non-success status.
    #[error("API error {status}: {body}")]
    Status { status: u16, body: String },

    /// The response body was not valid JSON.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid feed URL: {0}")]
    InvalidUrl(String),
}

/// A problem with a single board record. Never fatal.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseWarning {
    #[error("record {index}: missing time, skipped")]
    MissingTime { index: usize },

    #[error("record {index}: unparseable time {raw:?}, skipped")]
    InvalidTime { index: usize, raw: String },

    #[error("record {index}: unparseable delay {raw:?}, treated as 0")]
    InvalidDelay { index: usize, raw: String },
}
