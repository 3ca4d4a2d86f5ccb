//! Escape-time renderer for Mandelbrot tiles.
//!
//! Pure CPU work with no I/O. Callers in async code run [`render_tile`] on
//! the blocking pool.

pub mod color;
pub mod error;
pub mod escape;
pub mod png;
pub mod tile;
pub mod window;

pub use error::RenderError;
pub use png::{decode_png, encode_png};
pub use tile::{render_tile, render_tile_with_rng};
