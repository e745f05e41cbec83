//! Built-in sample dataset.
//!
//! Four short documents, one of which is below the default length threshold.
//! Handy for smoke-testing a location before pointing the pipeline at real data.

use serde_json::{Map, Value};
use thiserror::Error;
use tracing::info;

use crate::record::{Record, RecordError, RecordKeys, RecordOrigin};
use crate::storage::{Compression, Location};
use crate::writer::{JsonlWriter, WriteSummary, WriterError};

/// Default object name for the sample dataset.
pub const SAMPLE_FILENAME: &str = "sample.jsonl";

pub const SAMPLE_JSONL: &str = r#"{"id": "1", "title": "Test Document", "text": "This is a test document."}
{"id": "2", "title": "Another Document", "text": "This document is also a test but has more text than the first one."}
{"id": "3", "title": "Excluded Document", "text": "Short."}
{"id": "4", "title": "Long Document", "text": "This document has enough text to be included in the output."}
"#;

#[derive(Debug, Error)]
pub enum SampleError {
    #[error("Sample line {line} is not a JSON object: {message}")]
    Parse { line: usize, message: String },

    #[error("Sample line {line}: {source}")]
    Record {
        line: usize,
        #[source]
        source: RecordError,
    },

    #[error(transparent)]
    Writer(#[from] WriterError),
}

/// Parses the sample dataset with the default field names.
pub fn sample_records() -> Result<Vec<Record>, SampleError> {
    let keys = RecordKeys::default();

    SAMPLE_JSONL
        .lines()
        .enumerate()
        .map(|(index, line)| {
            let line_no = index + 1;
            let fields: Map<String, Value> =
                serde_json::from_str(line).map_err(|e| SampleError::Parse {
                    line: line_no,
                    message: e.to_string(),
                })?;
            Record::from_fields(fields, &keys, RecordOrigin::new(SAMPLE_FILENAME, line_no))
                .map_err(|source| SampleError::Record {
                    line: line_no,
                    source,
                })
        })
        .collect()
}

/// Writes the sample dataset to `<location>/<filename>`.
pub async fn write_sample(location: &Location, filename: &str) -> Result<WriteSummary, SampleError> {
    let records = sample_records()?;
    let mut writer = JsonlWriter::create(location, filename, Compression::None).await?;

    for record in &records {
        if let Err(e) = writer.write(record).await {
            writer.abort().await;
            return Err(e.into());
        }
    }

    let summary = writer.close().await?;
    info!(output = %summary.uri, records = summary.records, "Wrote sample dataset");
    Ok(summary)
}
