//! Tile rendering.

use burst_core::geometry::tile_rect;
use burst_core::params::JobParameters;
use rand::Rng;

use crate::color::{pack, pick_color};
use crate::escape::iterate;
use crate::window::{iteration_cap, PlaneWindow};

/// Render tile `tile_index` of `params` as row-major RGBA bytes.
///
/// Supersampling offsets come from the thread-local RNG.
pub fn render_tile(params: &JobParameters, tile_index: u32) -> Vec<u8> {
    render_tile_with_rng(params, tile_index, &mut rand::rng())
}

/// Render tile `tile_index` drawing supersampling offsets from `rng`.
///
/// The RNG is not touched when `super_samples <= 1`.
pub fn render_tile_with_rng<R: Rng + ?Sized>(
    params: &JobParameters,
    tile_index: u32,
    rng: &mut R,
) -> Vec<u8> {
    let window = PlaneWindow::new(params);
    let steps = iteration_cap(params, &window);
    let escape_radius_sq = params.escape_radius * params.escape_radius;
    let rect = tile_rect(params, tile_index);
    let samples = params.super_samples.max(1);

    tracing::trace!(
        tile_index,
        x = rect.x,
        y = rect.y,
        steps,
        samples,
        "Rendering tile"
    );

    let mut out = Vec::with_capacity(params.tile_byte_len());
    for py in rect.y..rect.bottom() {
        for px in rect.x..rect.right() {
            let (cr, ci) = window.point(px, py);
            let color = if samples == 1 {
                pick_color(params.color_scheme, steps, &iterate(cr, ci, escape_radius_sq, steps))
            } else {
                let mut sum = [0.0_f64; 3];
                for _ in 0..samples {
                    let rx = rng.random::<f64>() * window.x_step;
                    let ry = rng.random::<f64>() * window.y_step;
                    let result = iterate(cr - rx / 2.0, ci - ry / 2.0, escape_radius_sq, steps);
                    let [r, g, b, _] = pick_color(params.color_scheme, steps, &result);
                    sum[0] += r;
                    sum[1] += g;
                    sum[2] += b;
                }
                let n = f64::from(samples);
                [sum[0] / n, sum[1] / n, sum[2] / n, 255.0]
            };
            out.extend_from_slice(&pack(color));
        }
    }
    out
}
