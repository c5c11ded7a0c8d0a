//! Renders a map stylesheet into a raster tile pyramid stored in a single MBTiles file.
//!
//! The work is split over a fixed pool of render threads, each owning its own engine, and a
//! single writer thread that owns the container:
//!
//! ```text
//! TilePyramid ─▶ job queue ─▶ render workers ─▶ result queue ─▶ writer ─▶ MBTiles
//! ```
//!
//! ```no_run
//! use std::sync::Arc;
//! use tilesmith::{Pipeline, PipelineConfig};
//! use tilesmith_core::{GeoBBox, ZoomRange};
//! use tilesmith_image::engine::StyleEngineFactory;
//!
//! let factory = StyleEngineFactory::from_path("style.yaml".as_ref()).unwrap();
//! let mut config = PipelineConfig::new("world.mbtiles".into(), GeoBBox::world(), ZoomRange::new(0, 4).unwrap());
//! config.threads = 4;
//! let summary = Pipeline::new(config, Arc::new(factory)).unwrap().run().unwrap();
//! println!("{summary}");
//! ```

pub mod pipeline;

pub use pipeline::*;
