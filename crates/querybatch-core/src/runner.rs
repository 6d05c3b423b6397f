//! The batch runner — sends each query line in file order and aggregates the
//! responses, stopping at the first error.
//!
//! # States
//! `Idle → Running → Completed | Failed`. A runner is single-use: once it
//! has left `Idle` it refuses another `run`.
//!
//! # Per query
//! echo `<query>: ` → build request → send → check status → decode →
//! aggregate. Any error closes the echoed line, marks the runner `Failed`
//! and is returned unchanged. Nothing already written is rolled back.

use std::io::{BufRead, Write};
use std::time::{Duration, Instant};

use tracing::{debug, error, info};

use crate::aggregate::Aggregator;
use crate::decode::{decode_count, decode_csv, status_message};
use crate::error::BatchError;
use crate::request::{build_request, Mode};
use crate::transport::QueryTransport;

/// Dataset used when none is given.
pub const DEFAULT_DATASET: &str = "./data/wiki40b.test";

/// Fixed for the lifetime of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    /// Identifier of the remote corpus to query.
    pub dataset: String,
    pub mode: Mode,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            dataset: DEFAULT_DATASET.into(),
            mode: Mode::Count,
        }
    }
}

/// Lifecycle of a [`BatchRunner`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Running,
    Completed,
    Failed,
}

impl std::fmt::Display for RunState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Running => write!(f, "running"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Outcome of a completed run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    /// Queries answered successfully.
    pub queries: u64,
    /// CSV rows written (always 0 in count mode).
    pub rows: u64,
    pub elapsed: Duration,
}

/// Sequential, fail-fast query runner.
pub struct BatchRunner<T: QueryTransport> {
    config: RunConfig,
    transport: T,
    state: RunState,
    /// Index of the next query to succeed; also the count of successes.
    next_index: u64,
}

impl<T: QueryTransport> BatchRunner<T> {
    pub fn new(config: RunConfig, transport: T) -> Self {
        Self {
            config,
            transport,
            state: RunState::Idle,
            next_index: 0,
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    /// Number of queries that completed successfully so far.
    pub fn queries_completed(&self) -> u64 {
        self.next_index
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Run every line of `queries` through the pipeline.
    ///
    /// Progress goes to `console`; in CSV mode rows go to the aggregator's
    /// writer. Prints `Time Taken: <seconds>` on success.
    pub async fn run<R, C, W>(
        &mut self,
        queries: R,
        console: &mut C,
        aggregator: Aggregator<W>,
    ) -> Result<RunSummary, BatchError>
    where
        R: BufRead,
        C: Write,
        W: Write,
    {
        if self.state != RunState::Idle {
            return Err(BatchError::Config(format!(
                "runner cannot start from state '{}'",
                self.state
            )));
        }
        if aggregator.mode() != self.config.mode {
            return Err(BatchError::Config(format!(
                "aggregator mode '{}' does not match run mode '{}'",
                aggregator.mode(),
                self.config.mode
            )));
        }

        self.state = RunState::Running;
        info!(
            mode = %self.config.mode,
            dataset = %self.config.dataset,
            url = %self.transport.base_url(),
            "batch run started"
        );

        match self.drive(queries, console, aggregator).await {
            Ok(summary) => {
                self.state = RunState::Completed;
                info!(
                    queries = summary.queries,
                    rows = summary.rows,
                    elapsed_ms = summary.elapsed.as_millis() as u64,
                    "batch run completed"
                );
                Ok(summary)
            }
            Err(e) => {
                self.state = RunState::Failed;
                Err(e)
            }
        }
    }

    async fn drive<R, C, W>(
        &mut self,
        queries: R,
        console: &mut C,
        mut aggregator: Aggregator<W>,
    ) -> Result<RunSummary, BatchError>
    where
        R: BufRead,
        C: Write,
        W: Write,
    {
        let started = Instant::now();
        let mut queries = queries;
        let mut line = Vec::new();

        while let Some((query, length)) = next_query(&mut queries, &mut line)? {
            write_console(console, format_args!("{query}: "))?;

            if let Err(e) = self.run_one(&query, length, console, &mut aggregator).await {
                // The query error wins; a console failure here is only logged.
                if let Err(io) = writeln!(console).and_then(|_| console.flush()) {
                    debug!(error = %io, "could not close echoed query line");
                }
                error!(
                    query_index = self.next_index,
                    query = %query,
                    kind = e.kind(),
                    error = %e,
                    "query failed, aborting run"
                );
                return Err(e);
            }
            self.next_index += 1;
        }

        let rows = match &aggregator {
            Aggregator::Count(_) => 0,
            Aggregator::Csv(merger) => merger.rows_written(),
        };
        aggregator.finish()?;
        let elapsed = started.elapsed();
        write_console(console, format_args!("Time Taken: {}\n", elapsed.as_secs_f64()))?;

        Ok(RunSummary {
            queries: self.next_index,
            rows,
            elapsed,
        })
    }

    /// One query through build → send → decode → aggregate.
    async fn run_one<C, W>(
        &self,
        query: &str,
        length: u64,
        console: &mut C,
        aggregator: &mut Aggregator<W>,
    ) -> Result<(), BatchError>
    where
        C: Write,
        W: Write,
    {
        let req = build_request(
            self.transport.base_url(),
            &self.config.dataset,
            self.config.mode,
            query,
            length,
        )?;
        debug!(query_index = self.next_index, url = %req.url, "sending query");

        let resp = self.transport.send(req).await?;
        if !resp.is_success() {
            return Err(BatchError::Status {
                status: resp.status,
                reason: resp.reason,
                message: status_message(&resp.body),
            });
        }

        match aggregator {
            Aggregator::Count(printer) => {
                let occurrences = decode_count(&resp.body)?;
                printer.print(console, occurrences)
            }
            Aggregator::Csv(merger) => {
                let rows = decode_csv(&resp.body)?;
                let written = merger.write_rows(self.next_index, query, &rows)?;
                debug!(query_index = self.next_index, rows = written, "csv rows merged");
                write_console(console, format_args!("Successfully downloaded CSV\n"))
            }
        }
    }
}

/// Next line of the query source, without its `\n` / `\r\n` terminator.
///
/// Returns the text (invalid UTF-8 replaced) and the raw byte length of the
/// line, or `None` at end of input.
fn next_query<R: BufRead>(
    source: &mut R,
    line: &mut Vec<u8>,
) -> Result<Option<(String, u64)>, BatchError> {
    line.clear();
    if source.read_until(b'\n', line).map_err(BatchError::Input)? == 0 {
        return Ok(None);
    }
    if line.last() == Some(&b'\n') {
        line.pop();
    }
    if line.last() == Some(&b'\r') {
        line.pop();
    }
    Ok(Some((String::from_utf8_lossy(line).into_owned(), line.len() as u64)))
}

fn write_console<C: Write>(console: &mut C, args: std::fmt::Arguments<'_>) -> Result<(), BatchError> {
    console
        .write_fmt(args)
        .and_then(|_| console.flush())
        .map_err(|e| BatchError::Output(format!("error writing to console: {e}")))
}
