//! Tile index to pixel geometry.
//!
//! Tiles are numbered row-major across the grid: index increases left to
//! right, then top to bottom. With image and tile sizes that divide evenly,
//! the tile rectangles partition the image with no gaps and no overlaps.

use crate::error::CoreError;
use crate::params::JobParameters;

/// Pixel rectangle covered by one tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl TileRect {
    /// Exclusive right edge.
    pub fn right(&self) -> u32 {
        self.x + self.width
    }

    /// Exclusive bottom edge.
    pub fn bottom(&self) -> u32 {
        self.y + self.height
    }
}

/// Pixel origin `(x, y)` of `tile_index` within the full image.
pub fn tile_origin(tile_index: u32, tile_width: u32, tile_height: u32, image_width: u32) -> (u32, u32) {
    let tiles_per_row = image_width / tile_width;
    let column = tile_index % tiles_per_row;
    let row = tile_index / tiles_per_row;
    (column * tile_width, row * tile_height)
}

/// Full rectangle of `tile_index` under `params`.
pub fn tile_rect(params: &JobParameters, tile_index: u32) -> TileRect {
    let (x, y) = tile_origin(
        tile_index,
        params.tile_width,
        params.tile_height,
        params.image_width,
    );
    TileRect {
        x,
        y,
        width: params.tile_width,
        height: params.tile_height,
    }
}

/// Number of tiles in the grid, or a validation error when the tile size
/// is zero or does not divide the image size.
pub fn tile_count(
    image_width: u32,
    image_height: u32,
    tile_width: u32,
    tile_height: u32,
) -> Result<u32, CoreError> {
    if image_width == 0 || image_height == 0 || tile_width == 0 || tile_height == 0 {
        return Err(CoreError::Validation(format!(
            "Image ({image_width}x{image_height}) and tile ({tile_width}x{tile_height}) \
             dimensions must be non-zero"
        )));
    }
    if image_width % tile_width != 0 || image_height % tile_height != 0 {
        return Err(CoreError::Validation(format!(
            "Image {image_width}x{image_height} is not divisible into {tile_width}x{tile_height} tiles"
        )));
    }
    (image_width / tile_width)
        .checked_mul(image_height / tile_height)
        .ok_or_else(|| CoreError::Validation("Tile count overflows u32".to_string()))
}
