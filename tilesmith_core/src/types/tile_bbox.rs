//! A rectangular, never-empty range of tiles at one zoom level.
//!
//! [`TileBBox::from_geo`] answers the central tile math question of the pipeline: which tiles
//! does a geographic bounding box touch at a given zoom level. [`TileBBox::iter_grid`] splits
//! such a range into the metatile blocks that get rendered as one image.

use super::{GeoBBox, TileCoord};
use anyhow::{Result, ensure};
use itertools::Itertools;
use std::fmt;
use tilesmith_derive::context;

/// Tiles `x_min..=x_max` × `y_min..=y_max` at zoom `level`, in XYZ orientation.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileBBox {
	/// The zoom level of the bounding box.
	pub level: u8,
	/// The westernmost column.
	pub x_min: u32,
	/// The northernmost row.
	pub y_min: u32,
	/// The easternmost column (inclusive).
	pub x_max: u32,
	/// The southernmost row (inclusive).
	pub y_max: u32,
}

impl TileBBox {
	/// Creates a new `TileBBox`.
	///
	/// # Errors
	/// Fails if `level > 31`, if a maximum exceeds `2^level - 1` or if a minimum exceeds its maximum.
	pub fn new(level: u8, x_min: u32, y_min: u32, x_max: u32, y_max: u32) -> Result<TileBBox> {
		ensure!(level <= 31, "level ({level}) must be <= 31");
		let max = max_coord(level);
		ensure!(x_max <= max, "x_max ({x_max}) must be <= {max}");
		ensure!(y_max <= max, "y_max ({y_max}) must be <= {max}");
		ensure!(x_min <= x_max, "x_min ({x_min}) must be <= x_max ({x_max})");
		ensure!(y_min <= y_max, "y_min ({y_min}) must be <= y_max ({y_max})");
		Ok(TileBBox {
			level,
			x_min,
			y_min,
			x_max,
			y_max,
		})
	}

	/// All tiles of a zoom level.
	pub fn new_full(level: u8) -> Result<TileBBox> {
		ensure!(level <= 31, "level ({level}) must be <= 31");
		let max = max_coord(level);
		TileBBox::new(level, 0, 0, max, max)
	}

	/// Returns every tile at `level` whose extent intersects `bbox`.
	///
	/// Both corners are converted with [`TileCoord::from_geo`] rules (floored, then clamped to the
	/// grid) and the inclusive span between them is returned. An edge lying exactly on a tile
	/// boundary touches the neighbouring tile, so that tile is part of the span. A box narrower
	/// than one tile still yields the tile it lies in, so the result is never empty.
	///
	/// ```
	/// use tilesmith_core::{GeoBBox, TileBBox};
	///
	/// let geo = GeoBBox::new(-10.0, -10.0, 10.0, 10.0).unwrap();
	/// let bbox = TileBBox::from_geo(4, &geo).unwrap();
	/// assert_eq!(bbox, TileBBox::new(4, 7, 7, 8, 8).unwrap());
	/// ```
	#[context("computing tile range of {bbox:?} at level {level}")]
	pub fn from_geo(level: u8, bbox: &GeoBBox) -> Result<TileBBox> {
		ensure!(level <= 31, "level ({level}) must be <= 31");
		let max = f64::from(max_coord(level));

		let [west, north] = TileCoord::geo_to_fractional(bbox.x_min, bbox.y_max, level).map(snap_to_grid);
		let [east, south] = TileCoord::geo_to_fractional(bbox.x_max, bbox.y_min, level).map(snap_to_grid);

		let x_min = west.floor().clamp(0.0, max);
		let y_min = north.floor().clamp(0.0, max);
		let x_max = east.floor().clamp(x_min, max);
		let y_max = south.floor().clamp(y_min, max);

		TileBBox::new(level, x_min as u32, y_min as u32, x_max as u32, y_max as u32)
	}

	/// Number of columns.
	pub fn width(&self) -> u32 {
		self.x_max - self.x_min + 1
	}

	/// Number of rows.
	pub fn height(&self) -> u32 {
		self.y_max - self.y_min + 1
	}

	pub fn count_tiles(&self) -> u64 {
		u64::from(self.width()) * u64::from(self.height())
	}

	pub fn contains(&self, coord: &TileCoord) -> bool {
		coord.level == self.level
			&& (self.x_min..=self.x_max).contains(&coord.x)
			&& (self.y_min..=self.y_max).contains(&coord.y)
	}

	/// Iterates all tiles row by row, north to south and west to east.
	pub fn iter_coords(&self) -> impl Iterator<Item = TileCoord> + use<> {
		let level = self.level;
		(self.y_min..=self.y_max)
			.cartesian_product(self.x_min..=self.x_max)
			.map(move |(y, x)| TileCoord { level, x, y })
	}

	/// Splits the range into blocks of at most `size`×`size` tiles, in row-major block order.
	///
	/// Blocks start at the north-west corner of the range, so only the blocks along the east and
	/// south edges can be smaller than `size`.
	///
	/// ```
	/// use tilesmith_core::TileBBox;
	///
	/// let bbox = TileBBox::new(4, 3, 1, 8, 2).unwrap();
	/// let blocks: Vec<TileBBox> = bbox.iter_grid(4).collect();
	/// assert_eq!(
	/// 	blocks,
	/// 	vec![TileBBox::new(4, 3, 1, 6, 2).unwrap(), TileBBox::new(4, 7, 1, 8, 2).unwrap()]
	/// );
	/// ```
	pub fn iter_grid(&self, size: u32) -> impl Iterator<Item = TileBBox> + use<> {
		let size = u64::from(size.max(1));
		let bbox = *self;
		let cols = u64::from(bbox.width()).div_ceil(size);
		let rows = u64::from(bbox.height()).div_ceil(size);

		(0..rows).cartesian_product(0..cols).map(move |(row, col)| {
			// block corners in u64 so `size` near u32::MAX cannot overflow
			let x0 = u64::from(bbox.x_min) + col * size;
			let y0 = u64::from(bbox.y_min) + row * size;
			TileBBox {
				level: bbox.level,
				x_min: x0 as u32,
				y_min: y0 as u32,
				x_max: (x0 + size - 1).min(u64::from(bbox.x_max)) as u32,
				y_max: (y0 + size - 1).min(u64::from(bbox.y_max)) as u32,
			}
		})
	}

	/// The geographic extent covered by all tiles of the range.
	pub fn to_geo_bbox(&self) -> GeoBBox {
		let [x_min, y_max] = TileCoord::coord_to_geo(self.level, self.x_min, self.y_min);
		let [x_max, y_min] = TileCoord::coord_to_geo(self.level, self.x_max + 1, self.y_max + 1);
		GeoBBox {
			x_min,
			y_min,
			x_max,
			y_max,
		}
	}
}

/// Rounds values within float noise of a grid line onto it, so that an edge computed from a
/// tile boundary stays on that boundary.
fn snap_to_grid(value: f64) -> f64 {
	let rounded = value.round();
	if (value - rounded).abs() < 1e-9 { rounded } else { value }
}

fn max_coord(level: u8) -> u32 {
	((1u64 << level) - 1) as u32
}

impl fmt::Debug for TileBBox {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(
			f,
			"{}: [{},{},{},{}] ({})",
			self.level,
			self.x_min,
			self.y_min,
			self.x_max,
			self.y_max,
			self.count_tiles()
		)
	}
}
