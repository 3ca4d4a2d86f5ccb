//! Batch worker: render a contiguous tile range, upload every tile, then
//! record batch completion.

use std::sync::Arc;
use std::time::Instant;

use burst_core::error::CoreError;
use burst_core::job::{BatchCompletionRecord, WorkerEvent};
use burst_core::naming::{tile_key, PNG_CONTENT_TYPE};
use burst_core::params::JobParameters;
use burst_db::{BatchRecordStore, DbError, TableName};
use burst_render::{encode_png, render_tile, RenderError};
use burst_storage::{with_retry, ObjectStore, StorageError};
use chrono::Utc;
use futures::stream::{self, StreamExt, TryStreamExt};
use serde::Serialize;

use crate::context::PipelineContext;

#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    #[error("Invalid worker event: {0}")]
    Invalid(#[from] CoreError),

    #[error("Render task for tile {tile_index} failed: {message}")]
    RenderTask { tile_index: u32, message: String },

    #[error("Failed to encode tile {tile_index}: {source}")]
    Encode {
        tile_index: u32,
        #[source]
        source: RenderError,
    },

    #[error("Failed to upload tile {tile_index}: {source}")]
    Upload {
        tile_index: u32,
        #[source]
        source: StorageError,
    },

    #[error("Failed to write batch record: {0}")]
    Metadata(#[from] DbError),
}

/// Summary of a finished batch, printed as the worker's result.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchReport {
    pub job_id: String,
    pub batch_id: u64,
    pub tiles_written: u32,
    pub start_index: u32,
    pub end_index: u32,
}

/// Render and upload tiles `[start_index, end_index)` of `event`, then
/// write the batch completion record.
///
/// The first render or upload failure aborts the batch and no record is
/// written. Tiles already uploaded stay in storage; a retried batch
/// overwrites them.
pub async fn run_batch<S, M>(
    ctx: &PipelineContext<S, M>,
    event: &WorkerEvent,
) -> Result<BatchReport, WorkerError>
where
    S: ObjectStore,
    M: BatchRecordStore,
{
    tracing::info!(
        job_id = %event.job_id,
        batch_id = event.batch_id,
        start_index = event.start_index,
        end_index = event.end_index,
        "Worker batch started"
    );

    event.validate()?;
    let table = TableName::parse(&event.tasks_table_name)
        .map_err(|e| CoreError::Validation(e.to_string()))?;

    let started = Instant::now();
    let params = Arc::new(event.job_parameters.clone());
    let written: Vec<u32> = stream::iter(event.start_index..event.end_index)
        .map(|tile_index| render_and_upload(ctx, Arc::clone(&params), tile_index))
        .buffer_unordered(ctx.config.tile_concurrency.max(1))
        .try_collect()
        .await?;
    let tiles_written = written.len() as u32;
    let elapsed_ms = started.elapsed().as_millis() as u64;

    let mut attributes = serde_json::Map::new();
    attributes.insert("tilesWritten".into(), tiles_written.into());
    attributes.insert("startIndex".into(), event.start_index.into());
    attributes.insert("endIndex".into(), event.end_index.into());
    attributes.insert("elapsedMs".into(), elapsed_ms.into());

    let record = BatchCompletionRecord::new(
        event.job_id.clone(),
        event.batch_id,
        Utc::now(),
        ctx.config.batch_record_ttl(),
        attributes,
    );
    let record_key = format!("{}/{}/{}", table, event.job_id, event.batch_id);
    with_retry(&ctx.metadata_retry, "put_record", &record_key, || {
        ctx.metadata.put_record(&table, &record)
    })
    .await?;

    tracing::info!(
        job_id = %event.job_id,
        batch_id = event.batch_id,
        tiles_written,
        elapsed_ms,
        "Worker batch completed"
    );

    Ok(BatchReport {
        job_id: event.job_id.clone(),
        batch_id: event.batch_id,
        tiles_written,
        start_index: event.start_index,
        end_index: event.end_index,
    })
}

async fn render_and_upload<S, M>(
    ctx: &PipelineContext<S, M>,
    params: Arc<JobParameters>,
    tile_index: u32,
) -> Result<u32, WorkerError>
where
    S: ObjectStore,
{
    let started = Instant::now();
    let png = tokio::task::spawn_blocking(move || {
        let rgba = render_tile(&params, tile_index);
        encode_png(params.tile_width, params.tile_height, rgba)
    })
    .await
    .map_err(|e| WorkerError::RenderTask {
        tile_index,
        message: e.to_string(),
    })?
    .map_err(|source| WorkerError::Encode { tile_index, source })?;

    let render_ms = started.elapsed().as_millis() as u64;
    tracing::debug!(tile_index, render_ms, bytes = png.len(), "Rendered tile");

    let key = tile_key(&ctx.config.output_prefix, tile_index);
    ctx.store
        .upload(&key, png, PNG_CONTENT_TYPE)
        .await
        .map_err(|source| WorkerError::Upload { tile_index, source })?;

    tracing::debug!(tile_index, key = %key, "Uploaded tile");
    Ok(tile_index)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_serializes_camel_case() {
        let report = BatchReport {
            job_id: "job".into(),
            batch_id: 2,
            tiles_written: 10,
            start_index: 20,
            end_index: 30,
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["jobId"], "job");
        assert_eq!(json["tilesWritten"], 10);
        assert_eq!(json["endIndex"], 30);
    }

    #[test]
    fn upload_error_names_tile() {
        let err = WorkerError::Upload {
            tile_index: 4,
            source: StorageError::backend("put", "t/4.png", "denied"),
        };
        assert_eq!(
            err.to_string(),
            "Failed to upload tile 4: put failed for t/4.png: denied"
        );
    }
}
