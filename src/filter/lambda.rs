//! Predicate-driven filter stage with an optional exclusion writer.

use std::sync::Arc;

use async_stream::try_stream;
use futures::{Stream, StreamExt};
use tracing::debug;

use super::{FilterStats, RecordPredicate};
use crate::error::PipelineError;
use crate::reader::RecordStream;
use crate::record::Record;
use crate::writer::JsonlWriter;

/// Splits a record stream by predicate.
///
/// Accepted records are forwarded downstream. Each rejected record is written
/// to the exclusion writer before the next input record is pulled, so the
/// two outputs always partition the input.
#[derive(Clone)]
pub struct LambdaFilter {
    predicate: Arc<dyn RecordPredicate>,
    stats: FilterStats,
}

impl LambdaFilter {
    pub fn new(predicate: Arc<dyn RecordPredicate>) -> Self {
        Self {
            predicate,
            stats: FilterStats::default(),
        }
    }

    pub fn from_predicate(predicate: impl RecordPredicate + 'static) -> Self {
        Self::new(Arc::new(predicate))
    }

    pub fn stats(&self) -> FilterStats {
        self.stats
    }

    pub fn predicate_name(&self) -> &str {
        self.predicate.name()
    }

    /// Lazily filters `input`, diverting rejected records to `exclusion`.
    ///
    /// Without an exclusion writer, rejected records are counted and dropped.
    pub fn apply<'a>(
        &'a mut self,
        input: RecordStream,
        mut exclusion: Option<&'a mut JsonlWriter>,
    ) -> impl Stream<Item = Result<Record, PipelineError>> + 'a {
        let predicate = &self.predicate;
        let stats = &mut self.stats;

        try_stream! {
            let mut input = input;
            while let Some(record) = input.next().await {
                let record = record?;
                stats.seen += 1;

                if predicate.evaluate(&record)? {
                    stats.accepted += 1;
                    yield record;
                } else {
                    stats.excluded += 1;
                    debug!(id = %record.id(), origin = %record.origin(), "Record excluded");
                    if let Some(writer) = exclusion.as_deref_mut() {
                        writer.write(&record).await?;
                    }
                }
            }
        }
    }
}

impl std::fmt::Debug for LambdaFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LambdaFilter")
            .field("predicate", &self.predicate.name())
            .field("stats", &self.stats)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{MinTextLength, MissingTextPolicy};
    use crate::reader::ReaderError;
    use crate::record::{RecordKeys, RecordOrigin};
    use crate::storage::{Compression, Location};
    use futures::TryStreamExt;
    use serde_json::{json, Value};
    use tempfile::TempDir;

    fn records(values: Vec<Value>) -> RecordStream {
        let items: Vec<Result<Record, ReaderError>> = values
            .into_iter()
            .enumerate()
            .map(|(i, value)| {
                let Value::Object(fields) = value else {
                    panic!("expected object");
                };
                Ok(Record::from_fields(
                    fields,
                    &RecordKeys::default(),
                    RecordOrigin::new("mem.jsonl", i + 1),
                )
                .unwrap())
            })
            .collect();
        Box::pin(futures::stream::iter(items))
    }

    fn sample() -> Vec<Value> {
        vec![
            json!({"id": "1", "text": "This is a test document."}),
            json!({"id": "2", "text": "tiny"}),
            json!({"id": "3", "text": "Long enough text"}),
        ]
    }

    #[tokio::test]
    async fn test_forwards_accepted_and_counts() {
        let mut filter = LambdaFilter::from_predicate(MinTextLength::default());
        let kept: Vec<Record> = filter
            .apply(records(sample()), None)
            .try_collect()
            .await
            .unwrap();

        let ids: Vec<_> = kept.iter().map(|r| r.id()).collect();
        assert_eq!(ids, vec!["1", "3"]);
        let stats = filter.stats();
        assert_eq!(stats.seen, 3);
        assert_eq!(stats.accepted, 2);
        assert_eq!(stats.excluded, 1);
        assert_eq!(filter.predicate_name(), "min_text_length");
    }

    #[tokio::test]
    async fn test_rejected_records_reach_exclusion_writer() {
        let dir = TempDir::new().unwrap();
        let location = Location::Local(dir.path().to_path_buf());
        let mut excluded = JsonlWriter::create(&location, "excluded.jsonl", Compression::None)
            .await
            .unwrap();

        let mut filter = LambdaFilter::from_predicate(MinTextLength::default());
        let kept: Vec<Record> = filter
            .apply(records(sample()), Some(&mut excluded))
            .try_collect()
            .await
            .unwrap();
        assert_eq!(kept.len(), 2);

        let summary = excluded.close().await.unwrap();
        assert_eq!(summary.records, 1);
        let body = std::fs::read_to_string(dir.path().join("excluded.jsonl")).unwrap();
        assert_eq!(body, "{\"id\":\"2\",\"text\":\"tiny\"}\n");
    }

    #[tokio::test]
    async fn test_closure_predicate() {
        let mut filter = LambdaFilter::from_predicate(|r: &Record| r.id() == "2");
        let kept: Vec<Record> = filter
            .apply(records(sample()), None)
            .try_collect()
            .await
            .unwrap();
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].id(), "2");
    }

    #[tokio::test]
    async fn test_upstream_error_propagates() {
        let items: Vec<Result<Record, ReaderError>> = vec![Err(ReaderError::Parse {
            file: "bad.jsonl".to_string(),
            line: 7,
            message: "EOF while parsing".to_string(),
        })];
        let mut filter = LambdaFilter::from_predicate(MinTextLength::default());
        let result: Result<Vec<Record>, PipelineError> = filter
            .apply(Box::pin(futures::stream::iter(items)), None)
            .try_collect()
            .await;

        let err = result.unwrap_err();
        assert!(err.to_string().contains("bad.jsonl"));
        assert_eq!(filter.stats().seen, 0);
    }

    #[tokio::test]
    async fn test_predicate_error_propagates() {
        let predicate = MinTextLength::default().with_missing_text(MissingTextPolicy::Fail);
        let mut filter = LambdaFilter::from_predicate(predicate);
        let result: Result<Vec<Record>, PipelineError> = filter
            .apply(records(vec![json!({"id": "no-text"})]), None)
            .try_collect()
            .await;
        assert!(matches!(result, Err(PipelineError::Filter(_))));
    }
}
