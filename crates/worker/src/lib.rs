//! Entry points for the tiled fractal pipeline: launcher, batch worker,
//! combiner and local render.

pub mod combiner;
pub mod config;
pub mod context;
pub mod launcher;
pub mod local_render;
pub mod worker;

pub use combiner::{combine, CombineError, CombineReport};
pub use config::{ConfigError, PipelineConfig, StorageBackend, StorageKind};
pub use context::PipelineContext;
pub use launcher::{launch, LaunchError, LaunchReport, LaunchRequest};
pub use local_render::{render_local, render_to_store, LocalRenderError, LocalRenderReport, LocalRenderRequest};
pub use worker::{run_batch, BatchReport, WorkerError};
