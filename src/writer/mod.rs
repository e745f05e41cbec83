//! Record writers.
//!
//! [`JsonlWriter`] serializes records one per line to a location. Outputs are
//! staged and only become visible when the writer is closed, which is what
//! lets a failed run leave no output behind.

pub mod jsonl;

use serde::Serialize;
use thiserror::Error;

use crate::storage::{Compression, Location, StorageError};

pub use jsonl::{remove_output, JsonlWriter};

/// Errors that can occur while writing records.
#[derive(Debug, Error)]
pub enum WriterError {
    #[error("Invalid output filename '{0}'")]
    InvalidFilename(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Failed to write '{output}': {source}")]
    Io {
        output: String,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// What a closed writer committed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WriteSummary {
    /// Directory-level location the output was written under.
    pub location: Location,
    pub filename: String,
    /// Full URI of the committed object.
    pub uri: String,
    pub compression: Compression,
    pub records: u64,
    /// Uncompressed bytes written.
    pub bytes: u64,
    /// Hex SHA-256 of the uncompressed bytes.
    pub sha256: String,
}
