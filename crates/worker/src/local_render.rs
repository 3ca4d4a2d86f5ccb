//! Render one tile straight to a PNG file, or upload it under the output
//! prefix, without a database or dispatcher.

use std::path::{Path, PathBuf};

use burst_core::error::CoreError;
use burst_core::geometry::tile_count;
use burst_core::naming::{render_image_key, PNG_CONTENT_TYPE};
use burst_render::{encode_png, render_tile, RenderError};
use burst_storage::{ObjectStore, StorageError};
use serde::{Deserialize, Serialize};

use crate::context::PipelineContext;
use crate::launcher::job_parameters_from;

pub const DEFAULT_IMAGE_WIDTH: u32 = 1024;
pub const DEFAULT_IMAGE_HEIGHT: u32 = 786;

#[derive(Debug, thiserror::Error)]
pub enum LocalRenderError {
    #[error("Invalid render request: {0}")]
    Invalid(#[from] CoreError),

    #[error("Invalid renderer parameters: {0}")]
    Parameters(#[from] serde_json::Error),

    #[error("Render failed: {0}")]
    Render(#[from] RenderError),

    #[error("Render task failed: {0}")]
    Task(String),

    #[error("Failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to upload render: {0}")]
    Upload(#[from] StorageError),
}

/// Render request. Tile size defaults to the whole image, so an empty
/// request renders the full picture.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalRenderRequest {
    pub image_width: Option<u32>,
    pub image_height: Option<u32>,
    pub tile_width: Option<u32>,
    pub tile_height: Option<u32>,
    pub tile_index: Option<u32>,
    #[serde(flatten)]
    pub renderer: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalRenderReport {
    /// File path or object store location of the PNG.
    pub location: String,
    pub tile_index: u32,
    pub width: u32,
    pub height: u32,
    pub bytes: usize,
}

struct RenderedPng {
    png: Vec<u8>,
    tile_index: u32,
    width: u32,
    height: u32,
}

async fn render_png(request: &LocalRenderRequest) -> Result<RenderedPng, LocalRenderError> {
    let image_width = request.image_width.filter(|v| *v != 0).unwrap_or(DEFAULT_IMAGE_WIDTH);
    let image_height = request.image_height.filter(|v| *v != 0).unwrap_or(DEFAULT_IMAGE_HEIGHT);
    let tile_width = request.tile_width.filter(|v| *v != 0).unwrap_or(image_width);
    let tile_height = request.tile_height.filter(|v| *v != 0).unwrap_or(image_height);
    let tile_index = request.tile_index.unwrap_or(0);

    let num_tiles = tile_count(image_width, image_height, tile_width, tile_height)?;
    if tile_index >= num_tiles {
        return Err(CoreError::Validation(format!(
            "tileIndex {tile_index} is out of range for {num_tiles} tiles"
        ))
        .into());
    }
    let params = job_parameters_from(
        &request.renderer,
        image_width,
        image_height,
        tile_width,
        tile_height,
        num_tiles,
    )?;
    params.validate()?;

    tracing::debug!(
        image_width,
        image_height,
        tile_width,
        tile_height,
        tile_index,
        color_scheme = %params.color_scheme,
        super_samples = params.super_samples,
        "Rendering locally"
    );

    let png = tokio::task::spawn_blocking(move || {
        let rgba = render_tile(&params, tile_index);
        encode_png(params.tile_width, params.tile_height, rgba)
    })
    .await
    .map_err(|e| LocalRenderError::Task(e.to_string()))??;

    Ok(RenderedPng {
        png,
        tile_index,
        width: tile_width,
        height: tile_height,
    })
}

/// Render `request` and write the PNG to `out`, creating parent directories.
pub async fn render_local(
    request: &LocalRenderRequest,
    out: &Path,
) -> Result<LocalRenderReport, LocalRenderError> {
    let rendered = render_png(request).await?;

    let io_error = |source| LocalRenderError::Io {
        path: out.to_path_buf(),
        source,
    };
    if let Some(parent) = out.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(io_error)?;
    }
    let bytes = rendered.png.len();
    tokio::fs::write(out, rendered.png).await.map_err(io_error)?;
    tracing::info!(path = %out.display(), bytes, "Wrote local render");

    Ok(LocalRenderReport {
        location: out.display().to_string(),
        tile_index: rendered.tile_index,
        width: rendered.width,
        height: rendered.height,
        bytes,
    })
}

/// Render `request` and upload the PNG to `{prefix}/fractal.png`. Not
/// retried; a failed upload is returned to the caller.
pub async fn render_to_store<S: ObjectStore, M>(
    ctx: &PipelineContext<S, M>,
    request: &LocalRenderRequest,
) -> Result<LocalRenderReport, LocalRenderError> {
    let rendered = render_png(request).await?;
    let key = render_image_key(&ctx.config.output_prefix);
    let bytes = rendered.png.len();
    ctx.store.upload(&key, rendered.png, PNG_CONTENT_TYPE).await?;
    let location = ctx.store.location(&key);
    tracing::info!(location = %location, bytes, "Uploaded render");

    Ok(LocalRenderReport {
        location,
        tile_index: rendered.tile_index,
        width: rendered.width,
        height: rendered.height,
        bytes,
    })
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use burst_storage::LocalObjectStore;

    use super::*;
    use crate::config::PipelineConfig;

    #[tokio::test]
    async fn renders_whole_image_by_default_size() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("nested/fractal.png");
        let request = LocalRenderRequest {
            image_width: Some(40),
            image_height: Some(30),
            ..Default::default()
        };

        let report = render_local(&request, &out).await.unwrap();
        assert_eq!((report.width, report.height), (40, 30));

        let decoded = burst_render::decode_png(&std::fs::read(&out).unwrap()).unwrap();
        assert_eq!(decoded.dimensions(), (40, 30));
    }

    #[tokio::test]
    async fn rejects_tile_index_past_grid() {
        let dir = tempfile::tempdir().unwrap();
        let request = LocalRenderRequest {
            image_width: Some(40),
            image_height: Some(40),
            tile_width: Some(20),
            tile_height: Some(20),
            tile_index: Some(4),
            ..Default::default()
        };
        assert_matches!(
            render_local(&request, &dir.path().join("x.png")).await,
            Err(LocalRenderError::Invalid(_))
        );
    }

    #[tokio::test]
    async fn uploads_render_under_prefix() {
        let dir = tempfile::tempdir().unwrap();
        let config = PipelineConfig::from_lookup(|k| match k {
            "STORAGE_BACKEND" => Some("local".into()),
            "OUTPUT_PREFIX" => Some("renders/one".into()),
            _ => None,
        })
        .unwrap();
        let store = LocalObjectStore::new(dir.path().to_path_buf());
        let ctx = PipelineContext::new(config, store);
        let request = LocalRenderRequest {
            image_width: Some(32),
            image_height: Some(24),
            ..Default::default()
        };

        let report = render_to_store(&ctx, &request).await.unwrap();

        let path = dir.path().join("renders/one/fractal.png");
        assert_eq!(report.location, path.display().to_string());
        let decoded = burst_render::decode_png(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(decoded.dimensions(), (32, 24));
        assert_eq!(report.bytes, std::fs::metadata(&path).unwrap().len() as usize);
    }
}
