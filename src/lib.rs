//! textsieve: streaming length filter for JSONL text datasets.
//!
//! Records are read from a local path or an S3 prefix, split by a predicate
//! into accepted and excluded records, and written back as JSONL to either
//! kind of location. See [`pipeline::LocalPipelineExecutor`] for the entry
//! point.

pub mod cli;
pub mod error;
pub mod filter;
pub mod pipeline;
pub mod reader;
pub mod record;
pub mod sample;
pub mod storage;
pub mod writer;

// Re-export commonly used types
pub use error::PipelineError;
pub use filter::{FilterError, LambdaFilter, MinTextLength, MissingTextPolicy, RecordPredicate};
pub use pipeline::{ConfigError, LocalPipelineExecutor, PipelineConfig, RunSummary};
pub use reader::{JsonlReader, ReaderConfig, ReaderError};
pub use record::{Record, RecordKeys, RecordOrigin};
pub use storage::{Compression, Location, StorageError};
pub use writer::{JsonlWriter, WriteSummary, WriterError};
