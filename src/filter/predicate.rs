//! Record predicates.

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::FilterError;
use crate::record::Record;

/// A pure accept/reject decision over one record.
///
/// Any `Fn(&Record) -> bool` closure is a predicate, so ad-hoc filters can be
/// passed as values. Implement the trait directly when evaluation can fail.
pub trait RecordPredicate: Send + Sync {
    fn evaluate(&self, record: &Record) -> Result<bool, FilterError>;

    /// Short name used in logs.
    fn name(&self) -> &str {
        "lambda"
    }
}

impl<F> RecordPredicate for F
where
    F: Fn(&Record) -> bool + Send + Sync,
{
    fn evaluate(&self, record: &Record) -> Result<bool, FilterError> {
        Ok(self(record))
    }
}

/// What to do with a record that has no text field.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum MissingTextPolicy {
    /// Treat the record as having empty text.
    #[default]
    Empty,
    /// Fail the run.
    Fail,
}

/// Accepts records whose text has at least `min_chars` characters.
///
/// Length is counted in Unicode scalar values, not bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MinTextLength {
    pub min_chars: usize,
    pub missing: MissingTextPolicy,
}

impl MinTextLength {
    pub const DEFAULT_MIN_CHARS: usize = 10;

    pub fn new(min_chars: usize) -> Self {
        Self {
            min_chars,
            missing: MissingTextPolicy::default(),
        }
    }

    pub fn with_missing_text(mut self, missing: MissingTextPolicy) -> Self {
        self.missing = missing;
        self
    }
}

impl Default for MinTextLength {
    fn default() -> Self {
        Self::new(Self::DEFAULT_MIN_CHARS)
    }
}

impl RecordPredicate for MinTextLength {
    fn evaluate(&self, record: &Record) -> Result<bool, FilterError> {
        let chars = match record.text() {
            Some(text) => text.chars().count(),
            None => match self.missing {
                MissingTextPolicy::Empty => {
                    warn!(
                        id = %record.id(),
                        origin = %record.origin(),
                        key = %record.text_key(),
                        "Record has no text field, treating as empty"
                    );
                    0
                }
                MissingTextPolicy::Fail => {
                    return Err(FilterError::MissingText {
                        id: record.id().to_string(),
                        key: record.text_key().to_string(),
                        origin: record.origin().to_string(),
                    })
                }
            },
        };
        Ok(chars >= self.min_chars)
    }

    fn name(&self) -> &str {
        "min_text_length"
    }
}
