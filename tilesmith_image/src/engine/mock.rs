//! A test engine that paints solid colours and fails on request.

use super::{EngineFactory, RenderEngine, RenderRequest};
use anyhow::{Result, bail};
use image::{DynamicImage, Rgba, RgbaImage};
use std::{
	sync::{
		Arc,
		atomic::{AtomicUsize, Ordering},
	},
	thread,
	time::Duration,
};
use tilesmith_core::{GeoBBox, TileBBox};

#[derive(Clone, Debug, Default)]
pub struct MockEngineFactory {
	color: [u8; 4],
	failing_extents: Vec<GeoBBox>,
	panicking_extents: Vec<GeoBBox>,
	fail_init: bool,
	wrong_size: bool,
	delay: Option<Duration>,
	engines_created: Arc<AtomicUsize>,
	renders: Arc<AtomicUsize>,
}

impl MockEngineFactory {
	/// Engines that paint every request in `color`.
	#[must_use]
	pub fn new(color: [u8; 4]) -> Self {
		MockEngineFactory {
			color,
			..Default::default()
		}
	}

	/// Rendering the extent of `block` returns an error.
	#[must_use]
	pub fn fail_on(mut self, block: TileBBox) -> Self {
		self.failing_extents.push(block.to_geo_bbox());
		self
	}

	/// Rendering the extent of `block` panics.
	#[must_use]
	pub fn panic_on(mut self, block: TileBBox) -> Self {
		self.panicking_extents.push(block.to_geo_bbox());
		self
	}

	/// Every `create_engine` call fails.
	#[must_use]
	pub fn fail_init(mut self) -> Self {
		self.fail_init = true;
		self
	}

	/// Engines return images one pixel too narrow.
	#[must_use]
	pub fn wrong_size(mut self) -> Self {
		self.wrong_size = true;
		self
	}

	/// Every render takes at least `delay`.
	#[must_use]
	pub fn delay(mut self, delay: Duration) -> Self {
		self.delay = Some(delay);
		self
	}

	pub fn engines_created(&self) -> usize {
		self.engines_created.load(Ordering::SeqCst)
	}

	pub fn renders(&self) -> usize {
		self.renders.load(Ordering::SeqCst)
	}
}

impl EngineFactory for MockEngineFactory {
	fn create_engine(&self) -> Result<Box<dyn RenderEngine>> {
		if self.fail_init {
			bail!("mock engine refused to start");
		}
		self.engines_created.fetch_add(1, Ordering::SeqCst);
		Ok(Box::new(MockEngine { factory: self.clone() }))
	}
}

struct MockEngine {
	factory: MockEngineFactory,
}

impl RenderEngine for MockEngine {
	fn render(&mut self, request: &RenderRequest) -> Result<DynamicImage> {
		let factory = &self.factory;
		factory.renders.fetch_add(1, Ordering::SeqCst);
		if let Some(delay) = factory.delay {
			thread::sleep(delay);
		}
		if factory.failing_extents.contains(&request.extent) {
			bail!("mock failure for {:?}", request.extent);
		}
		assert!(
			!factory.panicking_extents.contains(&request.extent),
			"mock panic for {:?}",
			request.extent
		);
		let width = if factory.wrong_size { request.width.saturating_sub(1) } else { request.width };
		Ok(DynamicImage::ImageRgba8(RgbaImage::from_pixel(
			width,
			request.height,
			Rgba(factory.color),
		)))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn request(block: TileBBox) -> RenderRequest {
		RenderRequest {
			extent: block.to_geo_bbox(),
			width: block.width() * 8,
			height: block.height() * 8,
		}
	}

	#[test]
	fn paints_solid_color() {
		let factory = MockEngineFactory::new([1, 2, 3, 255]);
		let mut engine = factory.create_engine().unwrap();
		let image = engine.render(&request(TileBBox::new(1, 0, 0, 1, 0).unwrap())).unwrap();
		assert_eq!((image.width(), image.height()), (16, 8));
		assert!(image.to_rgba8().pixels().all(|p| p.0 == [1, 2, 3, 255]));
		assert_eq!(factory.engines_created(), 1);
		assert_eq!(factory.renders(), 1);
	}

	#[test]
	fn fails_only_on_selected_blocks() {
		let bad = TileBBox::new(2, 1, 1, 1, 1).unwrap();
		let factory = MockEngineFactory::new([0; 4]).fail_on(bad);
		let mut engine = factory.create_engine().unwrap();
		assert!(engine.render(&request(bad)).is_err());
		assert!(engine.render(&request(TileBBox::new(2, 2, 1, 2, 1).unwrap())).is_ok());
	}

	#[test]
	#[should_panic(expected = "mock panic")]
	fn panics_on_selected_blocks() {
		let bad = TileBBox::new(2, 1, 1, 1, 1).unwrap();
		let factory = MockEngineFactory::new([0; 4]).panic_on(bad);
		let _ = factory.create_engine().unwrap().render(&request(bad));
	}

	#[test]
	fn slow_renders() {
		let factory = MockEngineFactory::new([0; 4]).delay(Duration::from_millis(20));
		let mut engine = factory.create_engine().unwrap();
		let start = std::time::Instant::now();
		engine.render(&request(TileBBox::new(0, 0, 0, 0, 0).unwrap())).unwrap();
		assert!(start.elapsed() >= Duration::from_millis(20));
	}

	#[test]
	fn init_failure() {
		let factory = MockEngineFactory::new([0; 4]).fail_init();
		assert!(factory.create_engine().is_err());
		assert_eq!(factory.engines_created(), 0);
	}
}
