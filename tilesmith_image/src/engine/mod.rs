//! The rendering engine seam.
//!
//! A worker thread asks the shared [`EngineFactory`] for its own [`RenderEngine`] once, then uses
//! it for every job it processes. Engines are never shared between threads, so they may keep
//! caches or other state without synchronisation.

mod draw;
pub mod mock;
pub mod style;

use anyhow::Result;
use image::DynamicImage;
use std::fmt::Debug;
use tilesmith_core::GeoBBox;

pub use mock::MockEngineFactory;
pub use style::{StyleEngineFactory, Stylesheet};

/// What to draw: a geographic extent onto an image of `width`×`height` pixels.
#[derive(Clone, Debug, PartialEq)]
pub struct RenderRequest {
	pub extent: GeoBBox,
	pub width: u32,
	pub height: u32,
}

pub trait RenderEngine {
	/// Renders the extent of `request`. The result must be exactly `width`×`height` pixels.
	fn render(&mut self, request: &RenderRequest) -> Result<DynamicImage>;
}

/// Creates one engine per worker thread from shared, read-only configuration.
pub trait EngineFactory: Debug + Send + Sync {
	fn create_engine(&self) -> Result<Box<dyn RenderEngine>>;
}
