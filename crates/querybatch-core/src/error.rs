//! Error types for the query pipeline.
//!
//! Every error here is fatal to a run: the runner never retries and never
//! skips a query.

use thiserror::Error;

/// Errors raised by a [`QueryTransport`](crate::transport::QueryTransport).
#[derive(Debug, Error)]
pub enum TransportError {
    /// HTTP request failed (connection refused, DNS failure, broken body).
    #[error("HTTP error: {0}")]
    Http(String),

    /// Request timed out after the configured duration.
    #[error("Request timed out after {ms}ms")]
    Timeout { ms: u64 },

    /// An unexpected error.
    #[error("{0}")]
    Other(String),
}

/// Errors that abort a batch run.
#[derive(Debug, Error)]
pub enum BatchError {
    /// Invalid run configuration, detected before any query is sent.
    #[error("configuration error: {0}")]
    Config(String),

    /// The query source could not be read.
    #[error("error reading the file of queries: {0}")]
    Input(#[source] std::io::Error),

    /// The request payload could not be serialised.
    #[error("error encoding request: {0}")]
    Encode(#[source] serde_json::Error),

    /// The service could not be reached.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The service answered with a non-2xx status.
    #[error("Bad status code: {}\nError Message: {message}", status_line(.status, .reason))]
    Status {
        status: u16,
        reason: String,
        message: String,
    },

    /// A success response body was malformed.
    #[error("error decoding response: {0}")]
    Decode(String),

    /// The results file could not be created or written.
    #[error("error writing results: {0}")]
    Output(String),
}

impl BatchError {
    /// Short taxonomy name used as a structured log field.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Config(_) => "config",
            Self::Input(_) => "input",
            Self::Encode(_) => "encode",
            Self::Transport(_) => "transport",
            Self::Status { .. } => "protocol",
            Self::Decode(_) => "decode",
            Self::Output(_) => "output",
        }
    }
}

/// `500 Internal Server Error`, or just `599` when there is no reason phrase.
fn status_line(status: &u16, reason: &str) -> String {
    if reason.is_empty() {
        status.to_string()
    } else {
        format!("{status} {reason}")
    }
}

impl From<csv::Error> for BatchError {
    fn from(e: csv::Error) -> Self {
        Self::Output(e.to_string())
    }
}
