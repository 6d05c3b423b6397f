//! querybatch-http — HTTP transport for QueryBatch.
//!
//! ```rust,no_run
//! use querybatch_http::HttpQueryClient;
//!
//! let client = HttpQueryClient::default_for("http://localhost:8080/").unwrap();
//! ```

pub mod client;

pub use client::{HttpClientConfig, HttpQueryClient, DEFAULT_BASE_URL};
