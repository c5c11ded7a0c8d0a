//! The tile generation pipeline.
//!
//! - `config`: the immutable [`PipelineConfig`] of a run
//! - `coordinator`: [`Pipeline`], which starts, feeds and joins all threads
//! - `worker`: render threads, one engine each
//! - `writer`: the single thread that stores tiles through a [`TileStore`]
//! - `cancel`: [`CancelToken`] for interrupts and fatal errors

mod cancel;
mod config;
mod coordinator;
mod messages;
mod worker;
mod writer;

pub use cancel::CancelToken;
pub use config::{MAX_RENDER_SIZE, MAX_TILE_SIZE, PipelineConfig, clamped_bbox};
pub use coordinator::{Pipeline, RunSummary};
pub use messages::RenderedTile;
pub use writer::TileStore;
