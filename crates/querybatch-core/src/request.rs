//! Wire types and the request builder.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::BatchError;

/// Content type declared on every outgoing request.
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// What a run asks the service for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Total occurrence count per query, printed to the console.
    Count,
    /// Matching documents per query, merged into one results CSV.
    Csv,
}

impl Mode {
    /// Path segment of the service endpoint for this mode.
    pub fn endpoint(&self) -> &'static str {
        match self {
            Self::Count => "count",
            Self::Csv => "csv",
        }
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.endpoint())
    }
}

impl FromStr for Mode {
    type Err = BatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "count" => Ok(Self::Count),
            "csv" => Ok(Self::Csv),
            other => Err(BatchError::Config(format!("invalid action: {other}"))),
        }
    }
}

/// Request body sent to both endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct QueryRequest {
    pub dataset: String,
    /// Byte length of the query line as read. Passed through; the service decides what it means.
    pub length: u64,
    pub query: String,
}

impl QueryRequest {
    /// `length` is the byte length of the query line as read, which differs
    /// from `query.len()` when the line was not valid UTF-8.
    pub fn new(dataset: impl Into<String>, query: impl Into<String>, length: u64) -> Self {
        Self {
            dataset: dataset.into(),
            length,
            query: query.into(),
        }
    }
}

/// Success body of `POST /count`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CountResponse {
    pub occurrences: i64,
}

/// One `docID,document` row of a `POST /csv` success body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentRow {
    pub doc_id: String,
    pub document: String,
}

/// A fully built outgoing request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpQuery {
    pub url: String,
    pub content_type: &'static str,
    pub body: Vec<u8>,
}

/// Whatever the service answered, before any interpretation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    /// Canonical reason phrase, e.g. `"Internal Server Error"`.
    pub reason: String,
    pub body: Vec<u8>,
}

impl RawResponse {
    pub fn new(status: u16, reason: impl Into<String>, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            reason: reason.into(),
            body: body.into(),
        }
    }

    /// `true` for any 2xx status.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Join a base address and an endpoint with exactly one `/` between them.
pub fn endpoint_url(base_url: &str, mode: Mode) -> String {
    format!("{}/{}", base_url.trim_end_matches('/'), mode.endpoint())
}

/// Build the request for one query line.
pub fn build_request(
    base_url: &str,
    dataset: &str,
    mode: Mode,
    query: &str,
    length: u64,
) -> Result<HttpQuery, BatchError> {
    let payload = QueryRequest::new(dataset, query, length);
    let body = serde_json::to_vec(&payload).map_err(BatchError::Encode)?;
    Ok(HttpQuery {
        url: endpoint_url(base_url, mode),
        content_type: JSON_CONTENT_TYPE,
        body,
    })
}
