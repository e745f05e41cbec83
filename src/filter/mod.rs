//! Record filtering.
//!
//! A [`LambdaFilter`] wraps a [`RecordPredicate`] and splits a record stream
//! into accepted records (forwarded) and excluded records (written to an
//! optional exclusion writer). [`MinTextLength`] is the stock predicate.

pub mod lambda;
pub mod predicate;

use serde::Serialize;
use thiserror::Error;

pub use lambda::LambdaFilter;
pub use predicate::{MinTextLength, MissingTextPolicy, RecordPredicate};

/// Errors raised by predicates.
#[derive(Debug, Error)]
pub enum FilterError {
    #[error("Record '{id}' at {origin} has no '{key}' field")]
    MissingText {
        id: String,
        key: String,
        origin: String,
    },

    #[error("Predicate failed on record '{id}': {message}")]
    Predicate { id: String, message: String },
}

/// Per-run counters kept by a [`LambdaFilter`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FilterStats {
    pub seen: u64,
    pub accepted: u64,
    pub excluded: u64,
}
