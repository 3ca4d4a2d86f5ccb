//! Combiner: fetch every tile, composite the full image, upload it, and
//! optionally delete the tiles.
//!
//! Missing or unusable tiles do not fail the job. They are left black on
//! the canvas and listed in [`CombineReport::missing_tiles`].

use burst_core::error::CoreError;
use burst_core::geometry::tile_origin;
use burst_core::job::JobOutcome;
use burst_core::naming::{final_image_key, tile_key, PNG_CONTENT_TYPE};
use burst_core::params::JobParameters;
use burst_render::{decode_png, encode_png, RenderError};
use burst_storage::{FetchOutcome, ObjectStore, StorageError};
use futures::stream::{self, StreamExt};
use image::{imageops, Rgba, RgbaImage};
use serde::Serialize;

use crate::context::PipelineContext;

/// Canvas colour where no tile was placed.
const BACKGROUND: Rgba<u8> = Rgba([0, 0, 0, 255]);

#[derive(Debug, thiserror::Error)]
pub enum CombineError {
    #[error("Job {job_id} reported fatal errors, not combining: {errors:?}")]
    FatalUpstream { job_id: String, errors: Vec<String> },

    #[error("Invalid job parameters: {0}")]
    Invalid(#[from] CoreError),

    #[error("Compositing task failed: {0}")]
    Task(String),

    #[error("Failed to encode final image: {0}")]
    Encode(#[from] RenderError),

    #[error("Failed to upload final image: {0}")]
    Storage(#[from] StorageError),
}

/// Summary of a combine run, printed as the combiner's result.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CombineReport {
    pub job_id: String,
    pub location: String,
    pub tiles_composited: u32,
    /// Tile indices left black, ascending.
    pub missing_tiles: Vec<u32>,
    pub tiles_deleted: u32,
    pub status: String,
}

/// Result of placing fetched tiles on the canvas.
#[derive(Debug)]
pub struct Composite {
    pub image: RgbaImage,
    pub placed: Vec<u32>,
    pub rejected: Vec<u32>,
}

/// Place `tiles` (index, PNG bytes) on an opaque black canvas.
///
/// Tiles that fail to decode or whose dimensions differ from the job's
/// tile size are rejected and leave their rectangle black.
pub fn composite_tiles(params: &JobParameters, tiles: Vec<(u32, Vec<u8>)>) -> Composite {
    let mut image = RgbaImage::from_pixel(params.image_width, params.image_height, BACKGROUND);
    let mut placed = Vec::with_capacity(tiles.len());
    let mut rejected = Vec::new();

    for (tile_index, bytes) in tiles {
        let tile = match decode_png(&bytes) {
            Ok(tile) => tile,
            Err(e) => {
                tracing::warn!(tile_index, error = %e, "Skipping undecodable tile");
                rejected.push(tile_index);
                continue;
            }
        };
        if tile.dimensions() != (params.tile_width, params.tile_height) {
            tracing::warn!(
                tile_index,
                width = tile.width(),
                height = tile.height(),
                "Skipping tile with unexpected dimensions"
            );
            rejected.push(tile_index);
            continue;
        }

        let (x, y) = tile_origin(
            tile_index,
            params.tile_width,
            params.tile_height,
            params.image_width,
        );
        tracing::trace!(tile_index, x, y, "Placing tile");
        imageops::replace(&mut image, &tile, i64::from(x), i64::from(y));
        placed.push(tile_index);
    }

    Composite {
        image,
        placed,
        rejected,
    }
}

/// Combine the tiles of `outcome`'s job into the final image.
///
/// A job with fatal errors is refused before any storage access.
pub async fn combine<S, M>(
    ctx: &PipelineContext<S, M>,
    outcome: &JobOutcome,
) -> Result<CombineReport, CombineError>
where
    S: ObjectStore,
{
    let job_id = outcome.job_id.as_str();
    tracing::info!(job_id, elapsed_secs = outcome.elapsed_secs, "Job finished upstream");

    if outcome.has_fatal_errors() {
        tracing::error!(
            job_id,
            fatal_errors = ?outcome.fatal_errors,
            "Job had fatal errors, combiner will not run"
        );
        return Err(CombineError::FatalUpstream {
            job_id: outcome.job_id.clone(),
            errors: outcome.fatal_errors.clone(),
        });
    }
    if outcome.timed_out {
        tracing::warn!(job_id, "Job timed out, attempting to continue");
    }
    if outcome.with_errors {
        tracing::warn!(job_id, "Some batches had errors, attempting to continue");
    }
    if !outcome.completed {
        tracing::warn!(job_id, "Job did not complete, attempting to continue");
    }

    let params = outcome.job_parameters.clone();
    params.validate()?;
    let prefix = ctx.config.output_prefix.as_str();
    tracing::debug!(
        job_id,
        num_tiles = params.num_tiles,
        image_width = params.image_width,
        image_height = params.image_height,
        "Combining tiles"
    );

    // Fetch
    let fetched: Vec<(u32, String, FetchOutcome)> = stream::iter(0..params.num_tiles)
        .map(|tile_index| async move {
            let key = tile_key(prefix, tile_index);
            let result = ctx.store.fetch(&key).await;
            (tile_index, key, result)
        })
        .buffer_unordered(ctx.config.fetch_concurrency.max(1))
        .collect()
        .await;

    let mut missing_tiles = Vec::new();
    let mut found_keys = Vec::new();
    let mut tiles = Vec::with_capacity(fetched.len());
    for (tile_index, key, result) in fetched {
        match result {
            FetchOutcome::Found(bytes) => {
                found_keys.push(key);
                tiles.push((tile_index, bytes));
            }
            FetchOutcome::NotFound => {
                tracing::warn!(job_id, tile_index, key = %key, "Tile not found, leaving it black");
                missing_tiles.push(tile_index);
            }
            FetchOutcome::TransientError(e) => {
                tracing::warn!(
                    job_id,
                    tile_index,
                    key = %key,
                    error = %e,
                    "Tile unreadable after retries, leaving it black"
                );
                missing_tiles.push(tile_index);
            }
        }
    }

    // Composite and encode
    let (png, placed, rejected) = tokio::task::spawn_blocking(move || {
        let Composite {
            image,
            placed,
            rejected,
        } = composite_tiles(&params, tiles);
        let (width, height) = image.dimensions();
        encode_png(width, height, image.into_raw()).map(|png| (png, placed, rejected))
    })
    .await
    .map_err(|e| CombineError::Task(e.to_string()))??;

    missing_tiles.extend(rejected);
    missing_tiles.sort_unstable();
    let tiles_composited = placed.len() as u32;

    // Upload
    let key = final_image_key(prefix);
    ctx.store.upload(&key, png, PNG_CONTENT_TYPE).await?;
    let location = ctx.store.location(&key);
    let status = format!("Wrote final image to {location}");
    tracing::info!(
        job_id,
        location = %location,
        tiles_composited,
        missing = missing_tiles.len(),
        "{status}"
    );

    // Cleanup
    let mut tiles_deleted = 0u32;
    if ctx.config.delete_tiles {
        let attempted = found_keys.len();
        tiles_deleted = stream::iter(found_keys)
            .map(|key| async move { ctx.store.remove_best_effort(&key).await })
            .buffer_unordered(ctx.config.fetch_concurrency.max(1))
            .filter(|deleted| futures::future::ready(*deleted))
            .count()
            .await as u32;
        tracing::debug!(job_id, tiles_deleted, attempted, "Deleted tiles");
    }

    Ok(CombineReport {
        job_id: outcome.job_id.clone(),
        location,
        tiles_composited,
        missing_tiles,
        tiles_deleted,
        status,
    })
}
