//! Local, single-process pipeline execution.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use serde::{Serialize, Serializer};
use tracing::{error, info, warn};
use uuid::Uuid;

use super::config::{ConfigError, PipelineConfig};
use crate::error::PipelineError;
use crate::filter::{LambdaFilter, RecordPredicate};
use crate::reader::{JsonlReader, RecordStream};
use crate::storage::Location;
use crate::writer::{remove_output, JsonlWriter, WriteSummary};

/// Outcome of a successful run.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    #[serde(rename = "duration_secs", serialize_with = "serialize_secs")]
    pub duration: Duration,
    pub input: Location,
    pub predicate: String,
    /// Records pulled from the input.
    pub read: u64,
    pub accepted: u64,
    pub excluded: u64,
    pub accepted_output: WriteSummary,
    /// `None` when the exclusion output is disabled.
    pub excluded_output: Option<WriteSummary>,
}

fn serialize_secs<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(duration.as_secs_f64())
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Run {} finished in {:.3}s ({})",
            self.run_id,
            self.duration.as_secs_f64(),
            self.predicate
        )?;
        writeln!(f, "  input:    {}", self.input)?;
        writeln!(f, "  read:     {}", self.read)?;
        writeln!(
            f,
            "  accepted: {} -> {}",
            self.accepted, self.accepted_output.uri
        )?;
        match &self.excluded_output {
            Some(output) => write!(f, "  excluded: {} -> {}", self.excluded, output.uri),
            None => write!(f, "  excluded: {} (not written)", self.excluded),
        }
    }
}

/// Runs reader, filter and writers in the current task.
///
/// One record is in flight at a time. A failed run commits nothing: both
/// writers are aborted, and if the accepted output fails to commit after the
/// exclusion output did, the exclusion output is deleted again.
pub struct LocalPipelineExecutor {
    config: PipelineConfig,
    predicate: Arc<dyn RecordPredicate>,
}

impl LocalPipelineExecutor {
    /// Validates `config` and builds its length predicate.
    pub fn new(config: PipelineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let predicate = Arc::new(config.predicate());
        Ok(Self { config, predicate })
    }

    /// Replaces the configured length predicate.
    pub fn with_predicate(mut self, predicate: impl RecordPredicate + 'static) -> Self {
        self.predicate = Arc::new(predicate);
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub async fn run(&self) -> Result<RunSummary, PipelineError> {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let start = Instant::now();

        let input = self.config.input_location()?;
        let output = self.config.output_location()?;
        info!(
            %run_id,
            input = %input,
            output = %output,
            predicate = self.predicate.name(),
            "Starting pipeline run"
        );

        let reader = JsonlReader::new(input.clone(), self.config.reader_config())?;
        let compression = self.config.compression;

        let mut accepted =
            JsonlWriter::create(&output, &self.config.accepted_filename, compression).await?;
        let mut excluded = if self.config.write_exclusions {
            match JsonlWriter::create(&output, &self.config.excluded_filename, compression).await {
                Ok(writer) => Some(writer),
                Err(e) => {
                    accepted.abort().await;
                    return Err(e.into());
                }
            }
        } else {
            None
        };

        let mut filter = LambdaFilter::new(Arc::clone(&self.predicate));
        if let Err(e) = drive(reader.records(), &mut filter, &mut accepted, excluded.as_mut()).await
        {
            error!(%run_id, error = %e, "Pipeline run failed, discarding outputs");
            accepted.abort().await;
            if let Some(writer) = excluded {
                writer.abort().await;
            }
            return Err(e);
        }

        let excluded_output = match excluded {
            Some(writer) => match writer.close().await {
                Ok(summary) => Some(summary),
                Err(e) => {
                    accepted.abort().await;
                    return Err(e.into());
                }
            },
            None => None,
        };

        let accepted_output = match accepted.close().await {
            Ok(summary) => summary,
            Err(e) => {
                if let Some(summary) = &excluded_output {
                    if let Err(cleanup) = remove_output(summary).await {
                        warn!(
                            output = %summary.uri,
                            error = %cleanup,
                            "Failed to remove exclusion output after commit failure"
                        );
                    }
                }
                return Err(e.into());
            }
        };

        let stats = filter.stats();
        let summary = RunSummary {
            run_id,
            started_at,
            duration: start.elapsed(),
            input,
            predicate: self.predicate.name().to_string(),
            read: stats.seen,
            accepted: stats.accepted,
            excluded: stats.excluded,
            accepted_output,
            excluded_output,
        };

        info!(
            %run_id,
            read = summary.read,
            accepted = summary.accepted,
            excluded = summary.excluded,
            duration_secs = summary.duration.as_secs_f64(),
            "Pipeline run completed"
        );
        Ok(summary)
    }
}

impl fmt::Debug for LocalPipelineExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalPipelineExecutor")
            .field("config", &self.config)
            .field("predicate", &self.predicate.name())
            .finish()
    }
}

async fn drive(
    records: RecordStream,
    filter: &mut LambdaFilter,
    accepted: &mut JsonlWriter,
    excluded: Option<&mut JsonlWriter>,
) -> Result<(), PipelineError> {
    let stream = filter.apply(records, excluded);
    futures::pin_mut!(stream);

    while let Some(record) = stream.try_next().await? {
        accepted.write(&record).await?;
    }
    Ok(())
}
