//! querybatch-core — request/response pipeline for running a file of
//! queries against a corpus-query service.
//!
//! # Overview
//!
//! The core crate defines everything except the HTTP client itself:
//!
//! - [`Mode`] — `count` or `csv`, chosen once per run
//! - [`build_request`] / [`QueryRequest`] / [`RawResponse`] — wire types
//! - [`QueryTransport`] — the async trait a transport implements
//! - [`decode`] module — count and CSV response decoders
//! - [`aggregate`] module — console printer and CSV merger
//! - [`BatchRunner`] — the sequential, fail-fast orchestrator
//! - [`BatchError`] / [`TransportError`] — structured error types

pub mod aggregate;
pub mod decode;
pub mod error;
pub mod request;
pub mod runner;
pub mod transport;

pub use aggregate::{results_path, Aggregator, CountPrinter, CsvMerger};
pub use error::{BatchError, TransportError};
pub use request::{
    build_request, CountResponse, DocumentRow, HttpQuery, Mode, QueryRequest, RawResponse,
};
pub use runner::{BatchRunner, RunConfig, RunState, RunSummary};
pub use transport::QueryTransport;
