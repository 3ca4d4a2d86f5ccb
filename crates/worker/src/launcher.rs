//! Launcher: turn a job request into a dispatch request and hand it to
//! the external dispatcher.

use burst_core::batch::plan_batches;
use burst_core::error::CoreError;
use burst_core::geometry::tile_count;
use burst_core::params::JobParameters;
use serde::{Deserialize, Serialize};

use crate::config::PipelineConfig;

pub const DEFAULT_IMAGE_WIDTH: u32 = 1600;
pub const DEFAULT_IMAGE_HEIGHT: u32 = 1200;
pub const DEFAULT_TILE_SIZE: u32 = 200;
pub const DEFAULT_BATCH_SIZE: u32 = 10;
pub const DEFAULT_NUM_LEVELS: u32 = 1;
/// How long the dispatcher waits for batch records before giving up.
pub const SEARCH_TIMEOUT_SECS: u64 = 100;

#[derive(Debug, thiserror::Error)]
pub enum LaunchError {
    #[error("Invalid job request: {0}")]
    Invalid(#[from] CoreError),

    #[error("Invalid renderer parameters: {0}")]
    Parameters(#[from] serde_json::Error),

    #[error("Dispatch request failed: {0}")]
    Dispatch(#[from] reqwest::Error),

    #[error("Dispatcher rejected request with status {status}: {body}")]
    DispatchRejected { status: u16, body: String },
}

/// Job request as submitted by a user. Zero or missing geometry falls back
/// to the defaults; every other field is passed through to the renderer.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LaunchRequest {
    pub image_width: Option<u32>,
    pub image_height: Option<u32>,
    pub tile_width: Option<u32>,
    pub tile_height: Option<u32>,
    pub batch_size: Option<u32>,
    pub num_levels: Option<u32>,
    #[serde(flatten)]
    pub renderer: serde_json::Map<String, serde_json::Value>,
}

/// Payload for the external dispatcher.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchRequest {
    pub worker_function_name: String,
    pub combiner_function_name: String,
    pub start_index: u32,
    pub end_index: u32,
    pub batch_size: u32,
    pub num_levels: u32,
    pub max_parallelism: u32,
    pub search_timeout_secs: u64,
    pub job_parameters: JobParameters,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LaunchReport {
    pub message: String,
    pub num_tiles: u32,
    pub planned_batches: usize,
    /// False when no dispatcher URL is configured and the request was only
    /// built.
    pub dispatched: bool,
    pub dispatch_request: DispatchRequest,
}

fn or_default(value: Option<u32>, default: u32) -> u32 {
    value.filter(|v| *v != 0).unwrap_or(default)
}

/// Build [`JobParameters`] from pass-through renderer fields plus the
/// resolved geometry.
pub(crate) fn job_parameters_from(
    renderer: &serde_json::Map<String, serde_json::Value>,
    image_width: u32,
    image_height: u32,
    tile_width: u32,
    tile_height: u32,
    num_tiles: u32,
) -> Result<JobParameters, serde_json::Error> {
    let mut fields = renderer.clone();
    fields.insert("imageWidth".into(), image_width.into());
    fields.insert("imageHeight".into(), image_height.into());
    fields.insert("tileWidth".into(), tile_width.into());
    fields.insert("tileHeight".into(), tile_height.into());
    fields.insert("numTiles".into(), num_tiles.into());
    serde_json::from_value(serde_json::Value::Object(fields))
}

/// Resolve defaults and build the dispatcher payload for `request`.
pub fn build_dispatch_request(
    request: &LaunchRequest,
    config: &PipelineConfig,
) -> Result<DispatchRequest, LaunchError> {
    let image_width = or_default(request.image_width, DEFAULT_IMAGE_WIDTH);
    let image_height = or_default(request.image_height, DEFAULT_IMAGE_HEIGHT);
    let tile_width = or_default(request.tile_width, DEFAULT_TILE_SIZE);
    let tile_height = or_default(request.tile_height, DEFAULT_TILE_SIZE);
    let num_tiles = tile_count(image_width, image_height, tile_width, tile_height)?;

    let job_parameters = job_parameters_from(
        &request.renderer,
        image_width,
        image_height,
        tile_width,
        tile_height,
        num_tiles,
    )?;
    job_parameters.validate()?;

    Ok(DispatchRequest {
        worker_function_name: config.worker_function_name.clone(),
        combiner_function_name: config.combiner_function_name.clone(),
        start_index: 0,
        end_index: num_tiles,
        batch_size: or_default(request.batch_size, DEFAULT_BATCH_SIZE),
        num_levels: or_default(request.num_levels, DEFAULT_NUM_LEVELS),
        max_parallelism: config.max_parallelism,
        search_timeout_secs: SEARCH_TIMEOUT_SECS,
        job_parameters,
    })
}

/// Build the dispatch request and, when `DISPATCH_URL` is configured,
/// POST it to the dispatcher.
pub async fn launch(
    request: &LaunchRequest,
    config: &PipelineConfig,
) -> Result<LaunchReport, LaunchError> {
    let dispatch_request = build_dispatch_request(request, config)?;
    let num_tiles = dispatch_request.end_index;
    let planned_batches = plan_batches(
        dispatch_request.start_index,
        dispatch_request.end_index,
        dispatch_request.batch_size,
        dispatch_request.max_parallelism,
    )?
    .len();

    let dispatched = match &config.dispatch_url {
        Some(url) => {
            tracing::debug!(url = %url, num_tiles, "Posting dispatch request");
            let response = reqwest::Client::new()
                .post(url)
                .json(&dispatch_request)
                .send()
                .await?;
            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(LaunchError::DispatchRejected {
                    status: status.as_u16(),
                    body,
                });
            }
            true
        }
        None => {
            tracing::info!("DISPATCH_URL not set, dispatch request not sent");
            false
        }
    };

    let message = format!("Launched generation of {num_tiles} tiles");
    tracing::info!(num_tiles, planned_batches, dispatched, "{message}");

    Ok(LaunchReport {
        message,
        num_tiles,
        planned_batches,
        dispatched,
        dispatch_request,
    })
}
