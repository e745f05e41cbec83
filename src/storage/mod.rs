//! Storage backends for pipeline input and output.
//!
//! Locations are plain strings. The scheme picks the backend:
//!
//! - `s3://bucket/prefix` - Amazon S3, credentials from the `AWS_*` environment
//! - `file:///abs/path` or a bare path - the local filesystem
//!
//! # Usage
//!
//! ```rust,ignore
//! use textsieve::storage::Location;
//!
//! let location = Location::parse("s3://datasets/raw")?;
//! let storage = location.connect()?;
//! for key in storage.list_files(true).await? {
//!     println!("{}", storage.uri(&key));
//! }
//! ```

pub mod compression;
pub mod location;

pub use compression::Compression;
pub use location::{Location, Storage, StorageError};
