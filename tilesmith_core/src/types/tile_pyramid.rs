//! Enumeration of the render jobs covering a bounding box over a range of zoom levels.
//!
//! ```
//! use tilesmith_core::{GeoBBox, TileFormat, TilePyramid, ZoomRange};
//!
//! let bbox = GeoBBox::new(-10.0, -10.0, 10.0, 10.0).unwrap();
//! let zoom = ZoomRange::new(4, 4).unwrap();
//! let pyramid = TilePyramid::new(bbox, zoom, 256, 2, TileFormat::PNG).unwrap();
//!
//! assert_eq!(pyramid.count_tiles(), 4);
//! let jobs: Vec<_> = pyramid.iter_jobs().collect();
//! assert_eq!(jobs.len(), 4);
//! assert_eq!((jobs[0].width, jobs[0].height), (256, 256));
//! ```

use super::{GeoBBox, TileBBox, TileFormat, ZoomRange};
use anyhow::{Result, ensure};
use std::fmt;

/// One unit of rendering work: a block of tiles rendered as a single image.
#[derive(Clone, PartialEq)]
pub struct RenderJob {
	/// The tiles covered by this job, at most `metatile × metatile`.
	pub block: TileBBox,
	/// Geographic extent of `block`, the area the renderer has to draw.
	pub extent: GeoBBox,
	/// Image width in pixels, `block.width() * tile_size`.
	pub width: u32,
	/// Image height in pixels, `block.height() * tile_size`.
	pub height: u32,
	pub tile_size: u32,
	pub format: TileFormat,
}

impl RenderJob {
	#[must_use]
	pub fn new(block: TileBBox, tile_size: u32, format: TileFormat) -> RenderJob {
		RenderJob {
			extent: block.to_geo_bbox(),
			width: block.width() * tile_size,
			height: block.height() * tile_size,
			block,
			tile_size,
			format,
		}
	}

	pub fn count_tiles(&self) -> u64 {
		self.block.count_tiles()
	}
}

impl fmt::Debug for RenderJob {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(
			f,
			"RenderJob({:?}, {}x{} px, {})",
			self.block, self.width, self.height, self.format
		)
	}
}

/// The tile pyramid of a bounding box: one [`TileBBox`] per zoom level.
#[derive(Clone, Debug)]
pub struct TilePyramid {
	levels: Vec<TileBBox>,
	tile_size: u32,
	metatile: u32,
	format: TileFormat,
}

impl TilePyramid {
	/// # Errors
	/// Fails if `tile_size` or `metatile` is zero.
	pub fn new(bbox: GeoBBox, zoom: ZoomRange, tile_size: u32, metatile: u32, format: TileFormat) -> Result<TilePyramid> {
		ensure!(tile_size > 0, "tile size must be positive");
		ensure!(metatile > 0, "metatile must be positive");
		let levels = zoom
			.iter()
			.map(|level| TileBBox::from_geo(level, &bbox))
			.collect::<Result<Vec<_>>>()?;
		for bbox in &levels {
			log::debug!("pyramid level {bbox:?}");
		}
		Ok(TilePyramid {
			levels,
			tile_size,
			metatile,
			format,
		})
	}

	/// The tile range of every zoom level, lowest zoom first.
	pub fn levels(&self) -> &[TileBBox] {
		&self.levels
	}

	/// Total number of tiles over all levels.
	pub fn count_tiles(&self) -> u64 {
		self.levels.iter().map(TileBBox::count_tiles).sum()
	}

	/// Total number of jobs [`iter_jobs`](Self::iter_jobs) will yield.
	pub fn count_jobs(&self) -> u64 {
		self.levels.iter().map(|bbox| bbox.iter_grid(self.metatile).count() as u64).sum()
	}

	/// Lazily yields the render jobs, zoom by zoom and row-major within a zoom.
	pub fn iter_jobs(&self) -> impl Iterator<Item = RenderJob> + use<> {
		let TilePyramid {
			levels,
			tile_size,
			metatile,
			format,
		} = self.clone();
		levels
			.into_iter()
			.flat_map(move |bbox| bbox.iter_grid(metatile))
			.map(move |block| RenderJob::new(block, tile_size, format))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::TileCoord;
	use pretty_assertions::assert_eq;
	use std::collections::HashSet;

	fn pyramid(bbox: [f64; 4], min: u8, max: u8, metatile: u32) -> TilePyramid {
		TilePyramid::new(
			GeoBBox::try_from(bbox).unwrap(),
			ZoomRange::new(min, max).unwrap(),
			256,
			metatile,
			TileFormat::PNG,
		)
		.unwrap()
	}

	#[test]
	fn whole_world() {
		let world = [-180.0, -85.0511287798, 180.0, 85.0511287798];
		assert_eq!(pyramid(world, 0, 0, 1).iter_jobs().count(), 1);
		assert_eq!(pyramid(world, 1, 1, 1).iter_jobs().count(), 4);
		assert_eq!(pyramid(world, 0, 3, 1).count_tiles(), 1 + 4 + 16 + 64);
		assert_eq!(pyramid(world, 0, 3, 4).count_jobs(), 1 + 1 + 1 + 4);
	}

	#[test]
	fn jobs_cover_every_tile_exactly_once() {
		let pyramid = pyramid([-30.0, -20.0, 45.0, 60.0], 0, 7, 3);
		let mut seen = HashSet::new();
		for job in pyramid.iter_jobs() {
			assert!(job.block.width() <= 3 && job.block.height() <= 3);
			for coord in job.block.iter_coords() {
				assert!(seen.insert(coord), "{coord:?} emitted twice");
			}
		}
		assert_eq!(seen.len() as u64, pyramid.count_tiles());
		assert_eq!(pyramid.iter_jobs().count() as u64, pyramid.count_jobs());

		for level in pyramid.levels() {
			assert!(level.iter_coords().all(|coord| seen.contains(&coord)));
		}
	}

	#[test]
	fn jobs_are_ordered_by_zoom_then_rows() {
		let jobs: Vec<TileBBox> = pyramid([-10.0, -10.0, 10.0, 10.0], 1, 2, 1)
			.iter_jobs()
			.map(|job| job.block)
			.collect();
		let firsts: Vec<TileCoord> = jobs.iter().map(|b| TileCoord::new(b.level, b.x_min, b.y_min).unwrap()).collect();
		let mut sorted = firsts.clone();
		sorted.sort();
		assert_eq!(firsts, sorted);
		assert_eq!(jobs.first().unwrap().level, 1);
		assert_eq!(jobs.last().unwrap().level, 2);
	}

	#[test]
	fn job_geometry() {
		let jobs: Vec<RenderJob> = pyramid([-10.0, -10.0, 10.0, 10.0], 4, 4, 4).iter_jobs().collect();
		assert_eq!(jobs.len(), 1);
		assert_eq!(jobs[0].block, TileBBox::new(4, 7, 7, 8, 8).unwrap());
		assert_eq!((jobs[0].width, jobs[0].height), (512, 512));

		let job = pyramid([1.0, 1.0, 40.0, 40.0], 4, 4, 4).iter_jobs().next().unwrap();
		assert_eq!(job.block, TileBBox::new(4, 8, 6, 9, 7).unwrap());
		assert_eq!((job.width, job.height), (512, 512));
		assert_eq!(job.extent.x_min, 0.0);
		assert_eq!(job.extent.x_max, 45.0);
		assert_eq!(format!("{job:?}"), "RenderJob(4: [8,6,9,7] (4), 512x512 px, png)");
	}

	#[test]
	fn rejects_zero_sizes() {
		let bbox = GeoBBox::world();
		let zoom = ZoomRange::new(0, 1).unwrap();
		assert!(TilePyramid::new(bbox, zoom, 0, 1, TileFormat::PNG).is_err());
		assert!(TilePyramid::new(bbox, zoom, 256, 0, TileFormat::PNG).is_err());
	}
}
