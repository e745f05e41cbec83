//! Streaming JSONL reader over local or S3 locations.

use std::pin::Pin;

use async_stream::try_stream;
use futures::{Stream, StreamExt};
use glob::Pattern;
use object_store::path::Path as ObjectPath;
use serde_json::Value;
use tokio::io::AsyncBufReadExt;
use tokio_util::io::StreamReader;
use tracing::{debug, info};

use super::{ReaderConfig, ReaderError};
use crate::record::{Record, RecordOrigin};
use crate::storage::{Compression, Location, Storage};

/// A lazy, single-pass sequence of records.
pub type RecordStream = Pin<Box<dyn Stream<Item = Result<Record, ReaderError>> + Send>>;

/// Reads JSONL records from every matching file below a location.
///
/// Files are visited in key order and lines in file order. Only one line is
/// held in memory at a time; nothing is read until the stream is polled.
#[derive(Debug, Clone)]
pub struct JsonlReader {
    location: Location,
    config: ReaderConfig,
    pattern: Option<Pattern>,
}

impl JsonlReader {
    pub fn new(location: Location, config: ReaderConfig) -> Result<Self, ReaderError> {
        let pattern = config
            .glob
            .as_deref()
            .map(|p| {
                Pattern::new(p).map_err(|e| ReaderError::InvalidPattern {
                    pattern: p.to_string(),
                    message: e.to_string(),
                })
            })
            .transpose()?;

        Ok(Self {
            location,
            config,
            pattern,
        })
    }

    pub fn location(&self) -> &Location {
        &self.location
    }

    pub fn config(&self) -> &ReaderConfig {
        &self.config
    }

    /// Resolves the files this reader will visit, in read order.
    ///
    /// A location naming an existing object yields just that object. Anything
    /// else is listed as a prefix and filtered by the glob pattern.
    pub async fn discover(&self) -> Result<(Storage, Vec<ObjectPath>), ReaderError> {
        let storage = self.location.connect()?;
        let files = discover_files(&storage, &self.config, self.pattern.as_ref()).await?;
        Ok((storage, files))
    }

    /// Opens the record stream.
    pub fn records(&self) -> RecordStream {
        Box::pin(read_records(self.clone()))
    }
}

async fn discover_files(
    storage: &Storage,
    config: &ReaderConfig,
    pattern: Option<&Pattern>,
) -> Result<Vec<ObjectPath>, ReaderError> {
    if storage.root_is_object().await? {
        return Ok(vec![storage.root().clone()]);
    }

    let files: Vec<ObjectPath> = storage
        .list_files(config.recursive)
        .await?
        .into_iter()
        .filter(|path| match pattern {
            Some(pattern) => path.filename().is_some_and(|name| pattern.matches(name)),
            None => true,
        })
        .collect();

    if files.is_empty() {
        return Err(ReaderError::NoInputFiles {
            location: storage.location().to_string(),
        });
    }
    Ok(files)
}

fn read_records(reader: JsonlReader) -> impl Stream<Item = Result<Record, ReaderError>> + Send {
    try_stream! {
        let (storage, files) = reader.discover().await?;
        let config = reader.config;
        info!(
            location = %reader.location,
            files = files.len(),
            "Reading JSONL input"
        );

        let mut emitted = 0usize;
        for path in files {
            if config.limit.is_some_and(|limit| emitted >= limit) {
                break;
            }

            let uri = storage.uri(&path);
            let compression = config
                .compression
                .unwrap_or_else(|| Compression::from_path(path.as_ref()));
            debug!(file = %uri, ?compression, "Opening input file");

            let body = storage
                .store()
                .get(&path)
                .await
                .map_err(|source| ReaderError::Open { file: uri.clone(), source })?
                .into_stream()
                .map(|chunk| chunk.map_err(std::io::Error::other));
            // Raw bytes per line, so bad UTF-8 surfaces as a parse error with
            // its line number rather than as an I/O error.
            let mut lines = compression.decode(StreamReader::new(body)).split(b'\n');

            let mut line_no = 0usize;
            let mut file_records = 0usize;
            while let Some(mut line) = lines
                .next_segment()
                .await
                .map_err(|source| ReaderError::Io { file: uri.clone(), source })?
            {
                line_no += 1;
                if line.last() == Some(&b'\r') {
                    line.pop();
                }
                if line.iter().all(u8::is_ascii_whitespace) {
                    continue;
                }
                if config.limit.is_some_and(|limit| emitted >= limit) {
                    break;
                }

                let record = parse_line(&line, &uri, line_no, &config)?;
                emitted += 1;
                file_records += 1;
                yield record;
            }
            debug!(file = %uri, records = file_records, "Finished input file");
        }
    }
}

fn parse_line(
    line: &[u8],
    file: &str,
    line_no: usize,
    config: &ReaderConfig,
) -> Result<Record, ReaderError> {
    let parse_error = |message: String| ReaderError::Parse {
        file: file.to_string(),
        line: line_no,
        message,
    };

    let fields = match serde_json::from_slice::<Value>(line) {
        Ok(Value::Object(fields)) => fields,
        Ok(_) => return Err(parse_error("expected a JSON object".to_string())),
        Err(e) => return Err(parse_error(e.to_string())),
    };

    Record::from_fields(fields, &config.keys, RecordOrigin::new(file, line_no)).map_err(|source| {
        ReaderError::InvalidRecord {
            file: file.to_string(),
            line: line_no,
            source,
        }
    })
}
