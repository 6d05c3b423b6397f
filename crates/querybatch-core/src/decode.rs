//! Response decoders for the two modes.

use crate::error::BatchError;
use crate::request::{CountResponse, DocumentRow};

/// Number of fields in every row of a CSV response.
const CSV_FIELDS: usize = 2;

/// Decode a `POST /count` success body into its occurrence count.
pub fn decode_count(body: &[u8]) -> Result<i64, BatchError> {
    serde_json::from_slice::<CountResponse>(body)
        .map(|resp| resp.occurrences)
        .map_err(|e| BatchError::Decode(format!("malformed count response: {e}")))
}

/// Decode a headerless `docID,document` CSV body. An empty body is zero rows.
pub fn decode_csv(body: &[u8]) -> Result<Vec<DocumentRow>, BatchError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(false)
        .from_reader(body);

    let mut rows = Vec::new();
    for record in reader.records() {
        let record =
            record.map_err(|e| BatchError::Decode(format!("error reading csv: {e}")))?;
        if record.len() != CSV_FIELDS {
            return Err(BatchError::Decode(format!(
                "expected {CSV_FIELDS} fields per csv row, got {} at row {}",
                record.len(),
                rows.len() + 1
            )));
        }
        rows.push(DocumentRow {
            doc_id: record[0].to_string(),
            document: record[1].to_string(),
        });
    }
    Ok(rows)
}

/// Text of a non-2xx body, shown to the user as-is.
pub fn status_message(body: &[u8]) -> String {
    String::from_utf8_lossy(body).into_owned()
}
