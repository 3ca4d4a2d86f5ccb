//! Payloads exchanged with the external dispatcher, and the batch
//! completion record written by workers.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::params::JobParameters;

// ---------------------------------------------------------------------------
// Worker input
// ---------------------------------------------------------------------------

/// Invocation payload for one worker batch.
///
/// The tile range is half-open: `[start_index, end_index)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkerEvent {
    pub tasks_table_name: String,
    pub job_id: String,
    pub batch_id: u64,
    pub start_index: u32,
    pub end_index: u32,
    pub job_parameters: JobParameters,
}

impl WorkerEvent {
    /// Validate the job parameters and the assigned tile range.
    pub fn validate(&self) -> Result<(), CoreError> {
        self.job_parameters.validate()?;
        if self.start_index > self.end_index {
            return Err(CoreError::Validation(format!(
                "startIndex {} is past endIndex {}",
                self.start_index, self.end_index
            )));
        }
        if self.end_index > self.job_parameters.num_tiles {
            return Err(CoreError::Validation(format!(
                "endIndex {} exceeds numTiles {}",
                self.end_index, self.job_parameters.num_tiles
            )));
        }
        Ok(())
    }

    /// Number of tiles in the batch.
    pub fn tile_count(&self) -> u32 {
        self.end_index.saturating_sub(self.start_index)
    }
}

// ---------------------------------------------------------------------------
// Combiner input
// ---------------------------------------------------------------------------

/// Job outcome reported by the dispatcher once all batches have finished
/// (or it has decided to proceed regardless).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobOutcome {
    pub job_id: String,
    #[serde(default)]
    pub timed_out: bool,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub with_errors: bool,
    #[serde(default)]
    pub fatal_errors: Vec<String>,
    #[serde(default)]
    pub elapsed_secs: f64,
    pub job_parameters: JobParameters,
}

impl JobOutcome {
    pub fn has_fatal_errors(&self) -> bool {
        !self.fatal_errors.is_empty()
    }

    /// True when the dispatcher reported anything short of a clean finish.
    pub fn is_degraded(&self) -> bool {
        self.timed_out || self.with_errors || !self.completed
    }
}

// ---------------------------------------------------------------------------
// Batch completion record
// ---------------------------------------------------------------------------

/// One row per `(job_id, batch_id)`, written after every tile in the batch
/// has been uploaded. Rows past `expiry_time` are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchCompletionRecord {
    pub job_id: String,
    pub batch_id: u64,
    pub expiry_time: DateTime<Utc>,
    pub result_attributes: serde_json::Map<String, serde_json::Value>,
}

impl BatchCompletionRecord {
    /// Build a record that expires `ttl` after `now`, saturating at the
    /// latest representable time.
    pub fn new(
        job_id: impl Into<String>,
        batch_id: u64,
        now: DateTime<Utc>,
        ttl: Duration,
        result_attributes: serde_json::Map<String, serde_json::Value>,
    ) -> Self {
        Self {
            job_id: job_id.into(),
            batch_id,
            expiry_time: now
                .checked_add_signed(ttl)
                .unwrap_or(DateTime::<Utc>::MAX_UTC),
            result_attributes,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expiry_time
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    fn event(start: u32, end: u32) -> WorkerEvent {
        WorkerEvent {
            tasks_table_name: "burst_tasks".into(),
            job_id: "job-1".into(),
            batch_id: 0,
            start_index: start,
            end_index: end,
            job_parameters: JobParameters::with_geometry(400, 400, 200, 200),
        }
    }

    #[test]
    fn worker_event_parses_wire_shape() {
        let json = serde_json::json!({
            "tasksTableName": "tasks",
            "jobId": "abc",
            "batchId": 3,
            "startIndex": 0,
            "endIndex": 4,
            "jobParameters": {
                "imageWidth": 400, "imageHeight": 400,
                "tileWidth": 200, "tileHeight": 200, "numTiles": 4,
                "colorScheme": "pickColorGrayscale"
            }
        });
        let event: WorkerEvent = serde_json::from_value(json).unwrap();
        assert_eq!(event.batch_id, 3);
        assert_eq!(event.tile_count(), 4);
        assert!(event.validate().is_ok());
    }

    #[test]
    fn worker_event_rejects_range_past_num_tiles() {
        assert_matches!(event(2, 5).validate(), Err(CoreError::Validation(msg)) if msg.contains("numTiles"));
    }

    #[test]
    fn worker_event_rejects_inverted_range() {
        assert!(event(3, 1).validate().is_err());
    }

    #[test]
    fn worker_event_allows_empty_range() {
        assert!(event(4, 4).validate().is_ok());
        assert_eq!(event(4, 4).tile_count(), 0);
    }

    #[test]
    fn job_outcome_defaults_and_flags() {
        let json = serde_json::json!({
            "jobId": "abc",
            "completed": true,
            "jobParameters": {
                "imageWidth": 400, "imageHeight": 400,
                "tileWidth": 200, "tileHeight": 200, "numTiles": 4
            }
        });
        let outcome: JobOutcome = serde_json::from_value(json).unwrap();
        assert!(!outcome.has_fatal_errors());
        assert!(!outcome.is_degraded());

        let timed_out = JobOutcome { timed_out: true, ..outcome.clone() };
        assert!(timed_out.is_degraded());

        let fatal = JobOutcome { fatal_errors: vec!["x".into()], ..outcome };
        assert!(fatal.has_fatal_errors());
    }

    #[test]
    fn record_expiry() {
        let now = Utc::now();
        let record = BatchCompletionRecord::new(
            "job",
            1,
            now,
            Duration::seconds(60),
            serde_json::Map::new(),
        );
        assert_eq!(record.expiry_time, now + Duration::seconds(60));
        assert!(!record.is_expired(now));
        assert!(record.is_expired(now + Duration::seconds(60)));
    }

    #[test]
    fn huge_ttl_saturates() {
        let record =
            BatchCompletionRecord::new("job", 1, Utc::now(), Duration::MAX, serde_json::Map::new());
        assert_eq!(record.expiry_time, DateTime::<Utc>::MAX_UTC);
    }
}
