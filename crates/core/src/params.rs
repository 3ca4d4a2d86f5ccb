//! Job parameters shared by every worker and the combiner.

use serde::{Deserialize, Serialize};

use crate::color_scheme::ColorScheme;
use crate::error::CoreError;
use crate::geometry;

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

/// Default iteration cap when `autoIterations` is off.
pub const DEFAULT_ITERATIONS: u32 = 100;

/// Default escape radius (the bailout test compares against its square).
pub const DEFAULT_ESCAPE_RADIUS: f64 = 10.0;

/// Default plane extents `[x, y]` of the viewing window.
pub const DEFAULT_ZOOM: [f64; 2] = [2.654_983_695_963_082_4, 1.447_598_253_275_109];

/// Default window centre `[re, im]`.
pub const DEFAULT_LOOK_AT: [f64; 2] = [-0.6, 0.0];

fn default_iterations() -> u32 {
    DEFAULT_ITERATIONS
}

fn default_true() -> bool {
    true
}

fn default_escape_radius() -> f64 {
    DEFAULT_ESCAPE_RADIUS
}

fn default_super_samples() -> u32 {
    1
}

fn default_zoom() -> [f64; 2] {
    DEFAULT_ZOOM
}

fn default_look_at() -> [f64; 2] {
    DEFAULT_LOOK_AT
}

// ---------------------------------------------------------------------------
// JobParameters
// ---------------------------------------------------------------------------

/// Immutable description of one image-generation job.
///
/// Created once by the launcher and passed by value to every worker and
/// to the combiner. Geometry must satisfy [`JobParameters::validate`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobParameters {
    pub image_width: u32,
    pub image_height: u32,
    pub tile_width: u32,
    pub tile_height: u32,
    pub num_tiles: u32,
    #[serde(default = "default_iterations")]
    pub iterations: u32,
    #[serde(default = "default_true")]
    pub auto_iterations: bool,
    #[serde(default = "default_escape_radius")]
    pub escape_radius: f64,
    #[serde(default = "default_super_samples")]
    pub super_samples: u32,
    #[serde(default)]
    pub color_scheme: ColorScheme,
    #[serde(default = "default_zoom")]
    pub zoom: [f64; 2],
    #[serde(default = "default_look_at")]
    pub look_at: [f64; 2],
}

impl JobParameters {
    /// Build parameters for the given geometry with renderer defaults and
    /// `num_tiles` derived from the grid.
    pub fn with_geometry(
        image_width: u32,
        image_height: u32,
        tile_width: u32,
        tile_height: u32,
    ) -> Self {
        let num_tiles =
            geometry::tile_count(image_width, image_height, tile_width, tile_height).unwrap_or(0);
        Self {
            image_width,
            image_height,
            tile_width,
            tile_height,
            num_tiles,
            iterations: DEFAULT_ITERATIONS,
            auto_iterations: true,
            escape_radius: DEFAULT_ESCAPE_RADIUS,
            super_samples: 1,
            color_scheme: ColorScheme::DEFAULT,
            zoom: DEFAULT_ZOOM,
            look_at: DEFAULT_LOOK_AT,
        }
    }

    /// Number of tiles per grid row.
    pub fn tiles_per_row(&self) -> u32 {
        self.image_width / self.tile_width
    }

    /// Size in bytes of one rendered RGBA tile.
    pub fn tile_byte_len(&self) -> usize {
        self.tile_width as usize * self.tile_height as usize * 4
    }

    /// Check the geometry invariants.
    ///
    /// - All dimensions non-zero.
    /// - Image dimensions are exact multiples of the tile dimensions.
    /// - `num_tiles` equals the number of grid cells.
    /// - `super_samples` is at least 1.
    pub fn validate(&self) -> Result<(), CoreError> {
        let expected = geometry::tile_count(
            self.image_width,
            self.image_height,
            self.tile_width,
            self.tile_height,
        )?;
        if self.num_tiles != expected {
            return Err(CoreError::Validation(format!(
                "numTiles is {} but a {}x{} image in {}x{} tiles has {expected}",
                self.num_tiles,
                self.image_width,
                self.image_height,
                self.tile_width,
                self.tile_height,
            )));
        }
        if self.super_samples == 0 {
            return Err(CoreError::Validation(
                "superSamples must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
