//! HTTP query client backed by `reqwest`.
//!
//! One `POST` per query, no retries. Every status code is handed back to the
//! runner as a [`RawResponse`]; only failures to reach the service or read
//! the body are transport errors.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;

use querybatch_core::error::TransportError;
use querybatch_core::request::{HttpQuery, RawResponse};
use querybatch_core::transport::QueryTransport;

/// Address of a locally running query service.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8080/";

/// Configuration for `HttpQueryClient`.
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    pub base_url: String,
    /// `None` waits for the service indefinitely.
    pub request_timeout: Option<Duration>,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.into(),
            request_timeout: None,
        }
    }
}

/// Plain HTTP client for the query service.
pub struct HttpQueryClient {
    base_url: String,
    http: reqwest::Client,
    request_timeout: Option<Duration>,
}

impl HttpQueryClient {
    pub fn new(config: HttpClientConfig) -> Result<Self, TransportError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder
            .build()
            .map_err(|e| TransportError::Other(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            base_url: config.base_url,
            http,
            request_timeout: config.request_timeout,
        })
    }

    /// Create with default configuration for the given base address.
    pub fn default_for(base_url: impl Into<String>) -> Result<Self, TransportError> {
        Self::new(HttpClientConfig {
            base_url: base_url.into(),
            ..HttpClientConfig::default()
        })
    }

    fn classify(&self, e: reqwest::Error) -> TransportError {
        match self.request_timeout {
            Some(timeout) if e.is_timeout() => TransportError::Timeout {
                ms: timeout.as_millis() as u64,
            },
            _ => TransportError::Http(e.to_string()),
        }
    }
}

#[async_trait]
impl QueryTransport for HttpQueryClient {
    async fn send(&self, req: HttpQuery) -> Result<RawResponse, TransportError> {
        let resp = self
            .http
            .post(&req.url)
            .header(CONTENT_TYPE, req.content_type)
            .body(req.body)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = resp.status();
        let body = resp.bytes().await.map_err(|e| self.classify(e))?;

        tracing::debug!(
            url = %req.url,
            status = status.as_u16(),
            bytes = body.len(),
            "query response received"
        );

        Ok(RawResponse {
            status: status.as_u16(),
            reason: status.canonical_reason().unwrap_or_default().to_string(),
            body: body.to_vec(),
        })
    }

    fn base_url(&self) -> &str {
        &self.base_url
    }
}
