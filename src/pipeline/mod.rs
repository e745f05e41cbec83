//! Pipeline configuration and execution.
//!
//! A run wires three stages together:
//!
//! 1. **Read**: [`JsonlReader`](crate::reader::JsonlReader) streams records from
//!    every matching JSONL file under the input location
//! 2. **Filter**: [`LambdaFilter`](crate::filter::LambdaFilter) applies the
//!    predicate and diverts rejected records to the exclusion output
//! 3. **Write**: accepted records go to the accepted output
//!
//! Both outputs are committed only after the whole input has been consumed.
//!
//! # Example
//!
//! ```rust,ignore
//! use textsieve::pipeline::{LocalPipelineExecutor, PipelineConfig};
//!
//! let config = PipelineConfig::new()
//!     .with_input("s3://my-bucket/data/sample.jsonl")
//!     .with_output("s3://my-bucket/data/")
//!     .with_min_chars(10);
//!
//! let summary = LocalPipelineExecutor::new(config)?.run().await?;
//! println!("{summary}");
//! ```

pub mod config;
pub mod executor;

pub use config::{ConfigError, PipelineConfig};
pub use executor::{LocalPipelineExecutor, RunSummary};
