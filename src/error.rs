//! Error types for linkfeed
//!
//! This module provides the error hierarchy using `thiserror`. Errors are
//! split by how the pipeline reacts to them: [`HarvestError`] aborts a
//! harvest batch, [`ResolveError`] and [`SummaryError`] only drop or replace
//! a single item, and [`ApiError`] is what a timeline API call reports before
//! the requester classifies it.

use thiserror::Error;

/// The main error type for linkfeed operations
#[derive(Error, Debug)]
pub enum Error {
    /// Fatal harvest errors
    #[error("Harvest error: {0}")]
    Harvest(#[from] HarvestError),

    /// Sink errors
    #[error("Sink error: {0}")]
    Sink(#[from] SinkError),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Failure reported by a single timeline API call
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// The API answered with a non-success HTTP status
    #[error("HTTP status {0}")]
    Status(u16),

    /// The request never produced a usable status line
    #[error("Transport error: {0}")]
    Transport(String),

    /// The response body could not be decoded
    #[error("Malformed response: {0}")]
    Decode(String),
}

/// Conditions that abort a harvest batch
#[derive(Error, Debug)]
pub enum HarvestError {
    /// Transient server errors kept coming until the backoff cap was hit
    #[error("Too many retries: next wait of {next_wait_secs:.1}s exceeds the {cap_secs}s cap")]
    BackoffExhausted {
        /// Wait that would have been slept next
        next_wait_secs: f64,
        /// Configured cap
        cap_secs: u64,
    },

    /// More consecutive transport errors than the budget allows
    #[error("Too many consecutive transport errors ({count}): {last}")]
    TransportBudgetExhausted {
        /// Consecutive transport errors observed
        count: u32,
        /// Last transport error message
        last: String,
    },

    /// Status the requester has no policy for
    #[error("Unhandled API status {0}")]
    Api(u16),

    /// The API payload could not be decoded
    #[error("Malformed API response: {0}")]
    Decode(String),

    /// The authenticated account could not be determined
    #[error("Could not determine the authenticated account")]
    NoAccount,
}

/// Reasons a link task produced no resolved page
#[derive(Error, Debug)]
pub enum ResolveError {
    /// Declared content type is not textual
    #[error("Skipping content type {0:?}")]
    NotText(Option<String>),

    /// Terminal response was 404
    #[error("Not found")]
    NotFound,

    /// Terminal response had some other non-success status
    #[error("HTTP status {0}")]
    Status(u16),

    /// The task exceeded its timeout
    #[error("Timed out after {0}ms")]
    Timeout(u64),

    /// Connection, TLS or redirect failure
    #[error("Transport error: {0}")]
    Transport(String),

    /// The body could not be read
    #[error("Body read failed: {0}")]
    Body(String),
}

/// Summarization failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SummaryError {
    /// No readable text after extraction
    #[error("No readable content")]
    EmptyContent,

    /// Text contained no sentences
    #[error("No sentences found")]
    NoSentences,

    /// No sentence contained a significant word
    #[error("No sentence contains a significant word")]
    NoSignificantWords,
}

/// Errors from a feature sink
#[derive(Error, Debug)]
pub enum SinkError {
    /// Writing to the underlying target failed
    #[error("Write failed: {0}")]
    Write(#[from] std::io::Error),

    /// A record could not be serialized
    #[error("Serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),

    /// The sink lock was poisoned by a panicking writer
    #[error("Sink unavailable: {0}")]
    Unavailable(String),
}

/// Result type alias for linkfeed operations
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a configuration error from a string
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Error::Config(msg.into())
    }
}

impl ResolveError {
    /// Whether this skip is worth an error-level log line
    pub fn is_unexpected(&self) -> bool {
        matches!(
            self,
            ResolveError::Status(_) | ResolveError::Transport(_) | ResolveError::Body(_)
        )
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => ApiError::Status(status.as_u16()),
            None if err.is_decode() => ApiError::Decode(err.to_string()),
            None => ApiError::Transport(err.to_string()),
        }
    }
}

impl From<reqwest::Error> for ResolveError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_body() || err.is_decode() {
            ResolveError::Body(err.to_string())
        } else {
            ResolveError::Transport(err.to_string())
        }
    }
}
