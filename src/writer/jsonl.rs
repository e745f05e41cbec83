//! JSONL writer backed by a buffered object-store upload.

use async_compression::tokio::write::{GzipEncoder, ZstdEncoder};
use object_store::buffered::BufWriter;
use sha2::{Digest, Sha256};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use super::{WriteSummary, WriterError};
use crate::record::Record;
use crate::storage::{Compression, Location, Storage};

enum Sink {
    Plain(BufWriter),
    Gzip(GzipEncoder<BufWriter>),
    Zstd(ZstdEncoder<BufWriter>),
}

impl Sink {
    fn new(upload: BufWriter, compression: Compression) -> Self {
        match compression {
            Compression::None => Sink::Plain(upload),
            Compression::Gzip => Sink::Gzip(GzipEncoder::new(upload)),
            Compression::Zstd => Sink::Zstd(ZstdEncoder::new(upload)),
        }
    }

    async fn write_all(&mut self, buf: &[u8]) -> std::io::Result<()> {
        match self {
            Sink::Plain(w) => w.write_all(buf).await,
            Sink::Gzip(w) => w.write_all(buf).await,
            Sink::Zstd(w) => w.write_all(buf).await,
        }
    }

    /// Finishes the codec stream and completes the upload.
    async fn finish(&mut self) -> std::io::Result<()> {
        match self {
            Sink::Plain(w) => w.shutdown().await,
            Sink::Gzip(w) => w.shutdown().await,
            Sink::Zstd(w) => w.shutdown().await,
        }
    }

    fn upload(&mut self) -> &mut BufWriter {
        match self {
            Sink::Plain(w) => w,
            Sink::Gzip(w) => w.get_mut(),
            Sink::Zstd(w) => w.get_mut(),
        }
    }
}

/// Append-only JSONL output.
///
/// Records are serialized one per line, in the order given. Nothing is
/// visible at the destination until [`close`](Self::close) succeeds;
/// [`abort`](Self::abort) discards everything written so far.
pub struct JsonlWriter {
    storage: Storage,
    uri: String,
    filename: String,
    compression: Compression,
    sink: Sink,
    hasher: Sha256,
    records: u64,
    bytes: u64,
}

impl JsonlWriter {
    /// Opens `<location>/<filename>` for writing.
    pub async fn create(
        location: &Location,
        filename: &str,
        compression: Compression,
    ) -> Result<Self, WriterError> {
        if filename.trim_matches('/').is_empty() {
            return Err(WriterError::InvalidFilename(filename.to_string()));
        }

        let storage = location.connect()?;
        let path = storage.child(filename);
        let uri = storage.uri(&path);
        let upload = BufWriter::new(std::sync::Arc::clone(storage.store()), path);
        debug!(output = %uri, ?compression, "Opened JSONL output");

        Ok(Self {
            storage,
            uri,
            filename: filename.to_string(),
            compression,
            sink: Sink::new(upload, compression),
            hasher: Sha256::new(),
            records: 0,
            bytes: 0,
        })
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn records_written(&self) -> u64 {
        self.records
    }

    /// Appends one record as a line of JSON.
    pub async fn write(&mut self, record: &Record) -> Result<(), WriterError> {
        let mut line = record.to_json_line()?;
        line.push('\n');

        self.sink
            .write_all(line.as_bytes())
            .await
            .map_err(|source| WriterError::Io {
                output: self.uri.clone(),
                source,
            })?;

        self.hasher.update(line.as_bytes());
        self.records += 1;
        self.bytes += line.len() as u64;
        Ok(())
    }

    /// Flushes and commits the output.
    pub async fn close(mut self) -> Result<WriteSummary, WriterError> {
        self.sink.finish().await.map_err(|source| WriterError::Io {
            output: self.uri.clone(),
            source,
        })?;

        let summary = WriteSummary {
            location: self.storage.location().clone(),
            filename: self.filename,
            uri: self.uri,
            compression: self.compression,
            records: self.records,
            bytes: self.bytes,
            sha256: hex::encode(self.hasher.finalize()),
        };
        info!(
            output = %summary.uri,
            records = summary.records,
            bytes = summary.bytes,
            "Committed JSONL output"
        );
        Ok(summary)
    }

    /// Discards the output. Failures are logged, not returned.
    pub async fn abort(mut self) {
        if let Err(e) = self.sink.upload().abort().await {
            warn!(output = %self.uri, error = %e, "Failed to abort JSONL output");
        } else {
            debug!(output = %self.uri, records = self.records, "Aborted JSONL output");
        }
    }
}

impl std::fmt::Debug for JsonlWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonlWriter")
            .field("uri", &self.uri)
            .field("compression", &self.compression)
            .field("records", &self.records)
            .finish()
    }
}

/// Deletes a previously committed output.
pub async fn remove_output(summary: &WriteSummary) -> Result<(), WriterError> {
    let storage = summary.location.connect()?;
    storage.delete(&storage.child(&summary.filename)).await?;
    warn!(output = %summary.uri, "Removed committed JSONL output");
    Ok(())
}
