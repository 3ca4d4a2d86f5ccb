//! Launch, fan out batches, combine: the whole pipeline in one process.

mod common;

use burst_core::batch::plan_batches;
use burst_core::job::{JobOutcome, WorkerEvent};
use burst_core::naming::final_image_key;
use burst_core::params::JobParameters;
use burst_render::{decode_png, render_tile};
use burst_worker::launcher::build_dispatch_request;
use burst_worker::{combine, run_batch, LaunchRequest};

use common::{config, context, MemoryMetadata};

#[tokio::test]
async fn four_tile_job_end_to_end() {
    let config = config("jobs/e2e", true);
    let request: LaunchRequest = serde_json::from_value(serde_json::json!({
        "imageWidth": 400,
        "imageHeight": 400,
        "tileWidth": 200,
        "tileHeight": 200,
        "batchSize": 3,
        "colorScheme": "pickColorHSV2"
    }))
    .unwrap();
    let dispatch = build_dispatch_request(&request, &config).unwrap();
    assert_eq!(dispatch.end_index, 4);

    let ctx = context(config, MemoryMetadata::default());
    let batches = plan_batches(
        dispatch.start_index,
        dispatch.end_index,
        dispatch.batch_size,
        dispatch.max_parallelism,
    )
    .unwrap();
    assert_eq!(batches, vec![0..3, 3..4]);

    for (batch_id, range) in batches.into_iter().enumerate() {
        let event = WorkerEvent {
            tasks_table_name: "burst_tasks".into(),
            job_id: "e2e".into(),
            batch_id: batch_id as u64,
            start_index: range.start,
            end_index: range.end,
            job_parameters: dispatch.job_parameters.clone(),
        };
        run_batch(&ctx, &event).await.unwrap();
    }
    assert_eq!(ctx.metadata.records().len(), 2);

    let outcome = JobOutcome {
        job_id: "e2e".into(),
        timed_out: false,
        completed: true,
        with_errors: false,
        fatal_errors: Vec::new(),
        elapsed_secs: 1.0,
        job_parameters: dispatch.job_parameters.clone(),
    };
    let report = combine(&ctx, &outcome).await.unwrap();
    assert_eq!(report.tiles_composited, 4);
    assert_eq!(report.tiles_deleted, 4);
    assert_eq!(ctx.store.inner().keys(), vec![final_image_key("jobs/e2e")]);

    // Tiles 0..3 land at (0,0), (200,0), (0,200), (200,200).
    let image = decode_png(&ctx.store.inner().object(&final_image_key("jobs/e2e")).unwrap()).unwrap();
    assert_eq!(image.dimensions(), (400, 400));
    for (tile_index, (ox, oy)) in [(0, 0), (200, 0), (0, 200), (200, 200)].into_iter().enumerate() {
        let tile = render_tile(&dispatch.job_parameters, tile_index as u32);
        for (tx, ty) in [(0u32, 0u32), (199, 0), (57, 123), (199, 199)] {
            let i = ((ty * 200 + tx) * 4) as usize;
            assert_eq!(
                image.get_pixel(ox + tx, oy + ty).0,
                [tile[i], tile[i + 1], tile[i + 2], tile[i + 3]],
                "tile {tile_index} pixel ({tx}, {ty})"
            );
        }
    }

    let whole = JobParameters {
        tile_width: 400,
        tile_height: 400,
        num_tiles: 1,
        ..dispatch.job_parameters.clone()
    };
    assert_eq!(image.into_raw(), render_tile(&whole, 0));
}
