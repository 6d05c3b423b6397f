//! Aggregators: where decoded results go.
//!
//! Count mode prints one number per query to the console. CSV mode merges
//! every query's rows into a single results file, tagging each row with the
//! query index and text it came from.

use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::BatchError;
use crate::request::{DocumentRow, Mode};

/// Header row of the merged results file.
pub const RESULTS_HEADER: [&str; 4] = ["queryID", "query", "docID", "document"];

/// Suffix replacing the input file's extension to name the results file.
pub const RESULTS_SUFFIX: &str = "-results.csv";

/// Results file for a query list: same directory, extension replaced.
///
/// `queries/top.txt` → `queries/top-results.csv`
pub fn results_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    input.with_file_name(format!("{stem}{RESULTS_SUFFIX}"))
}

/// Prints count-mode results after the runner has echoed `<query>: `.
#[derive(Debug, Default, Clone, Copy)]
pub struct CountPrinter;

impl CountPrinter {
    pub fn print<C: Write>(&self, console: &mut C, occurrences: i64) -> Result<(), BatchError> {
        writeln!(console, "{occurrences}")
            .map_err(|e| BatchError::Output(format!("error writing to console: {e}")))
    }
}

/// Merges per-query CSV rows into one output stream.
pub struct CsvMerger<W: Write> {
    writer: csv::Writer<W>,
    rows_written: u64,
}

impl<W: Write> CsvMerger<W> {
    /// Wrap `inner` and write the header row.
    pub fn new(inner: W) -> Result<Self, BatchError> {
        let mut writer = csv::WriterBuilder::new()
            .terminator(csv::Terminator::Any(b'\n'))
            .from_writer(inner);
        writer.write_record(RESULTS_HEADER)?;
        writer
            .flush()
            .map_err(|e| BatchError::Output(format!("error writing csv header: {e}")))?;
        Ok(Self {
            writer,
            rows_written: 0,
        })
    }

    /// Write every row of one query, then flush so completed queries survive
    /// a later failure.
    pub fn write_rows(
        &mut self,
        query_index: u64,
        query: &str,
        rows: &[DocumentRow],
    ) -> Result<usize, BatchError> {
        let index = query_index.to_string();
        for row in rows {
            self.writer.write_record([
                index.as_str(),
                query,
                row.doc_id.as_str(),
                row.document.as_str(),
            ])?;
        }
        self.writer
            .flush()
            .map_err(|e| BatchError::Output(format!("error flushing csv: {e}")))?;
        self.rows_written += rows.len() as u64;
        Ok(rows.len())
    }

    /// Rows written so far, header excluded.
    pub fn rows_written(&self) -> u64 {
        self.rows_written
    }

    /// Flush and hand back the underlying writer.
    pub fn finish(self) -> Result<W, BatchError> {
        self.writer
            .into_inner()
            .map_err(|e| BatchError::Output(format!("error flushing csv: {}", e.error())))
    }
}

/// Mode-tagged sink the runner feeds decoded results into.
pub enum Aggregator<W: Write> {
    Count(CountPrinter),
    Csv(CsvMerger<W>),
}

impl<W: Write> Aggregator<W> {
    pub fn count() -> Self {
        Self::Count(CountPrinter)
    }

    /// CSV aggregator over `inner`; writes the header immediately.
    pub fn csv(inner: W) -> Result<Self, BatchError> {
        CsvMerger::new(inner).map(Self::Csv)
    }

    pub fn mode(&self) -> Mode {
        match self {
            Self::Count(_) => Mode::Count,
            Self::Csv(_) => Mode::Csv,
        }
    }

    /// Flush any output; returns the CSV writer in CSV mode.
    pub fn finish(self) -> Result<Option<W>, BatchError> {
        match self {
            Self::Count(_) => Ok(None),
            Self::Csv(merger) => merger.finish().map(Some),
        }
    }
}
