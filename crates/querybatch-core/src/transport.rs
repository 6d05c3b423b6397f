//! The `QueryTransport` trait — how the runner reaches the service.

use async_trait::async_trait;

use crate::error::TransportError;
use crate::request::{HttpQuery, RawResponse};

/// Sends one request and returns the raw response.
///
/// Implementations return a [`RawResponse`] for every status code; deciding
/// what a non-2xx status means is the runner's job. No retries are expected.
#[async_trait]
pub trait QueryTransport: Send + Sync + 'static {
    /// Send a single request and return whatever came back.
    async fn send(&self, req: HttpQuery) -> Result<RawResponse, TransportError>;

    /// Base address of the service (without endpoint path).
    fn base_url(&self) -> &str;
}
