//! Shared domain types for the tiled burst-compute pipeline.
//!
//! Pure data and pure functions only: job parameters, tile geometry,
//! object keys, batch planning, and dispatcher payloads.

pub mod batch;
pub mod color_scheme;
pub mod error;
pub mod geometry;
pub mod job;
pub mod naming;
pub mod params;
