//! Record readers.
//!
//! The only input format is newline-delimited JSON. [`JsonlReader`] lists a
//! location, then streams one [`Record`](crate::record::Record) per non-blank
//! line, in file-then-line order.
//!
//! # Example
//!
//! ```rust,ignore
//! use futures::TryStreamExt;
//! use textsieve::reader::{JsonlReader, ReaderConfig};
//! use textsieve::storage::Location;
//!
//! let reader = JsonlReader::new(Location::parse("s3://bucket/raw")?, ReaderConfig::default())?;
//! let mut records = reader.records();
//! while let Some(record) = records.try_next().await? {
//!     println!("{} -> {:?}", record.id(), record.text());
//! }
//! ```

pub mod jsonl;

use thiserror::Error;

use crate::record::{RecordError, RecordKeys};
use crate::storage::{Compression, StorageError};

pub use jsonl::{JsonlReader, RecordStream};

/// Errors that can occur while reading records.
#[derive(Debug, Error)]
pub enum ReaderError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("No input files found at '{location}'")]
    NoInputFiles { location: String },

    #[error("Invalid file pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },

    #[error("Failed to open '{file}': {source}")]
    Open {
        file: String,
        #[source]
        source: object_store::Error,
    },

    #[error("Failed to read '{file}': {source}")]
    Io {
        file: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed JSON in '{file}' at line {line}: {message}")]
    Parse {
        file: String,
        line: usize,
        message: String,
    },

    #[error("Invalid record in '{file}' at line {line}: {source}")]
    InvalidRecord {
        file: String,
        line: usize,
        #[source]
        source: RecordError,
    },
}

/// Options for [`JsonlReader`].
#[derive(Debug, Clone)]
pub struct ReaderConfig {
    /// Text and id field names.
    pub keys: RecordKeys,
    /// Glob matched against file names when listing a prefix.
    pub glob: Option<String>,
    /// Descend into nested prefixes.
    pub recursive: bool,
    /// Stop after this many records across all files.
    pub limit: Option<usize>,
    /// Forced codec. `None` infers it from each file extension.
    pub compression: Option<Compression>,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            keys: RecordKeys::default(),
            glob: None,
            recursive: true,
            limit: None,
            compression: None,
        }
    }
}

impl ReaderConfig {
    pub fn with_keys(mut self, keys: RecordKeys) -> Self {
        self.keys = keys;
        self
    }

    pub fn with_glob(mut self, glob: impl Into<String>) -> Self {
        self.glob = Some(glob.into());
        self
    }

    pub fn with_recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_compression(mut self, compression: Compression) -> Self {
        self.compression = Some(compression);
        self
    }
}
