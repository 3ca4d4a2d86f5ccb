mod common;

use assert_matches::assert_matches;
use burst_core::error::CoreError;
use burst_core::job::WorkerEvent;
use burst_core::naming::tile_key;
use burst_core::params::JobParameters;
use burst_db::{BatchRecordStore, TableName};
use burst_render::{decode_png, render_tile};
use burst_worker::{run_batch, WorkerError};
use chrono::Utc;

use common::{config, context, MemoryMetadata};

fn event(start: u32, end: u32) -> WorkerEvent {
    WorkerEvent {
        tasks_table_name: "burst_tasks".into(),
        job_id: "job-7".into(),
        batch_id: 1,
        start_index: start,
        end_index: end,
        job_parameters: JobParameters::with_geometry(64, 48, 16, 16),
    }
}

#[tokio::test]
async fn batch_uploads_every_tile_then_records_completion() {
    let ctx = context(config("renders/job-7", false), MemoryMetadata::default());

    let report = run_batch(&ctx, &event(2, 6)).await.unwrap();
    assert_eq!(report.tiles_written, 4);
    assert_eq!((report.start_index, report.end_index), (2, 6));
    assert_eq!(report.job_id, "job-7");

    let keys = ctx.store.inner().keys();
    assert_eq!(
        keys,
        vec![
            "renders/job-7/tiles/2.png",
            "renders/job-7/tiles/3.png",
            "renders/job-7/tiles/4.png",
            "renders/job-7/tiles/5.png",
        ]
    );

    let records = ctx.metadata.records();
    assert_eq!(records.len(), 1);
    let (table, record) = &records[0];
    assert_eq!(table, "burst_tasks");
    assert_eq!(record.job_id, "job-7");
    assert_eq!(record.batch_id, 1);
    assert_eq!(record.result_attributes["tilesWritten"], 4);
    assert!(!record.is_expired(Utc::now()));

    let table = TableName::parse("burst_tasks").unwrap();
    let live = ctx.metadata.find_live(&table, "job-7", Utc::now()).await.unwrap();
    assert_eq!(live.len(), 1);
}

#[tokio::test]
async fn uploaded_tile_holds_rendered_pixels() {
    let ctx = context(config("", false), MemoryMetadata::default());
    let event = event(0, 3);
    run_batch(&ctx, &event).await.unwrap();

    let png = ctx.store.inner().object(&tile_key("", 2)).unwrap();
    let tile = decode_png(&png).unwrap();
    assert_eq!(tile.dimensions(), (16, 16));
    assert_eq!(tile.into_raw(), render_tile(&event.job_parameters, 2));
}

#[tokio::test]
async fn upload_failure_aborts_without_record() {
    let ctx = context(config("out", false), MemoryMetadata::default());
    ctx.store.inner().fail_put(&tile_key("out", 3));

    let result = run_batch(&ctx, &event(0, 6)).await;
    assert_matches!(result, Err(WorkerError::Upload { tile_index: 3, .. }));
    assert!(ctx.metadata.records().is_empty());
    assert_eq!(ctx.metadata.attempts(), 0);
}

#[tokio::test]
async fn range_past_num_tiles_is_rejected_before_any_upload() {
    let ctx = context(config("out", false), MemoryMetadata::default());

    let result = run_batch(&ctx, &event(10, 13)).await;
    assert_matches!(result, Err(WorkerError::Invalid(CoreError::Validation(_))));
    assert_eq!(ctx.store.inner().op_count(), 0);
}

#[tokio::test]
async fn unsafe_table_name_is_rejected_before_any_upload() {
    let ctx = context(config("out", false), MemoryMetadata::default());
    let mut event = event(0, 2);
    event.tasks_table_name = "tasks; DROP TABLE tasks".into();

    assert_matches!(run_batch(&ctx, &event).await, Err(WorkerError::Invalid(_)));
    assert_eq!(ctx.store.inner().op_count(), 0);
}

#[tokio::test]
async fn record_write_is_retried() {
    let ctx = context(config("out", false), MemoryMetadata::failing(2));

    run_batch(&ctx, &event(0, 1)).await.unwrap();
    assert_eq!(ctx.metadata.attempts(), 3);
    assert_eq!(ctx.metadata.records().len(), 1);
}

#[tokio::test]
async fn record_write_gives_up_after_three_attempts() {
    let ctx = context(config("out", false), MemoryMetadata::failing(5));

    assert_matches!(run_batch(&ctx, &event(0, 1)).await, Err(WorkerError::Metadata(_)));
    assert_eq!(ctx.metadata.attempts(), 3);
    assert!(ctx.metadata.records().is_empty());
}

#[tokio::test]
async fn empty_range_still_records_completion() {
    let ctx = context(config("out", false), MemoryMetadata::default());

    let report = run_batch(&ctx, &event(4, 4)).await.unwrap();
    assert_eq!(report.tiles_written, 0);
    assert!(ctx.store.inner().keys().is_empty());
    assert_eq!(ctx.metadata.records().len(), 1);
}
