//! Top-level error type for pipeline runs.
//!
//! Each stage has its own error enum:
//! - Storage location parsing and object-store access
//! - Reading and parsing JSONL input
//! - Predicate evaluation
//! - Writing and committing JSONL output
//! - Configuration loading and validation
//!
//! [`PipelineError`] wraps them all. Every variant is fatal for the run.

use thiserror::Error;

use crate::filter::FilterError;
use crate::pipeline::ConfigError;
use crate::reader::ReaderError;
use crate::storage::StorageError;
use crate::writer::WriterError;

/// Errors that abort a pipeline run.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Reader error: {0}")]
    Reader(#[from] ReaderError),

    #[error("Filter error: {0}")]
    Filter(#[from] FilterError),

    #[error("Writer error: {0}")]
    Writer(#[from] WriterError),
}

impl PipelineError {
    /// True when the input itself is bad, as opposed to an I/O failure.
    pub fn is_data_error(&self) -> bool {
        matches!(
            self,
            PipelineError::Reader(ReaderError::Parse { .. })
                | PipelineError::Reader(ReaderError::InvalidRecord { .. })
                | PipelineError::Filter(_)
        )
    }
}
