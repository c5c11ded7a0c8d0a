//! Tile coordinates in the web mercator pyramid.
//!
//! A [`TileCoord`] is always oriented XYZ style: `y = 0` is the northernmost row. The TMS
//! orientation only exists at the container boundary, see [`TileScheme`](crate::TileScheme).
//!
//! ```
//! use tilesmith_core::TileCoord;
//!
//! let coord = TileCoord::from_geo(13.404954, 52.520008, 10).unwrap();
//! assert_eq!((coord.level, coord.x, coord.y), (10, 550, 335));
//!
//! let bbox = coord.to_geo_bbox();
//! assert!(bbox.contains(13.404954, 52.520008));
//! ```

use super::{GeoBBox, MAX_LON, geo_to_world, world_to_geo};
use anyhow::{Result, ensure};
use std::fmt::{self, Debug};
use tilesmith_derive::context;

/// A tile address: zoom `level`, column `x` and row `y`.
#[derive(Eq, PartialEq, Clone, Hash, Copy)]
pub struct TileCoord {
	/// The zoom level of the tile.
	pub level: u8,
	/// The column, growing eastward.
	pub x: u32,
	/// The row, growing southward.
	pub y: u32,
}

impl TileCoord {
	/// Creates a new `TileCoord`.
	///
	/// # Errors
	/// Returns an error if `level > 31` or if `x`/`y` are not below `2^level`.
	pub fn new(level: u8, x: u32, y: u32) -> Result<TileCoord> {
		ensure!(level <= 31, "level ({level}) must be <= 31");
		let size = 1u64 << level;
		ensure!(u64::from(x) < size, "x ({x}) out of bounds for level {level}");
		ensure!(u64::from(y) < size, "y ({y}) out of bounds for level {level}");
		Ok(TileCoord { level, x, y })
	}

	/// Returns the tile containing the geographic point at the given level.
	///
	/// Latitudes beyond ±85.0511° are clamped to the mercator limit, and points on the
	/// east/south edge of the world land in the last column/row.
	///
	/// # Errors
	/// Fails for `level > 31` or a longitude/latitude outside the valid range.
	#[context("converting ({lon}, {lat}) to a tile at level {level}")]
	pub fn from_geo(lon: f64, lat: f64, level: u8) -> Result<TileCoord> {
		ensure!(level <= 31, "level ({level}) must be <= 31");
		ensure!((-MAX_LON..=MAX_LON).contains(&lon), "longitude ({lon}) must be within [-180, 180]");
		ensure!((-90.0..=90.0).contains(&lat), "latitude ({lat}) must be within [-90, 90]");

		let [x, y] = Self::geo_to_fractional(lon, lat, level);
		let max = ((1u64 << level) - 1) as f64;
		TileCoord::new(level, x.floor().clamp(0.0, max) as u32, y.floor().clamp(0.0, max) as u32)
	}

	/// Position of a geographic point on the tile grid of `level`, before flooring.
	#[must_use]
	pub fn geo_to_fractional(lon: f64, lat: f64, level: u8) -> [f64; 2] {
		let size = (1u64 << level) as f64;
		let [x, y] = geo_to_world(lon, lat);
		[x * size, y * size]
	}

	/// Returns the north-west corner of the tile grid cell `(x, y)` as `[lon, lat]`.
	///
	/// `x` and `y` may equal `2^level` to address the east/south edge of the world.
	#[must_use]
	pub fn coord_to_geo(level: u8, x: u32, y: u32) -> [f64; 2] {
		let size = (1u64 << level) as f64;
		world_to_geo(f64::from(x) / size, f64::from(y) / size)
	}

	/// The geographic extent covered by this tile.
	#[must_use]
	pub fn to_geo_bbox(&self) -> GeoBBox {
		let [x_min, y_max] = Self::coord_to_geo(self.level, self.x, self.y);
		let [x_max, y_min] = Self::coord_to_geo(self.level, self.x + 1, self.y + 1);
		GeoBBox {
			x_min,
			y_min,
			x_max,
			y_max,
		}
	}

	/// Largest valid `x` or `y` at this level: `2^level - 1`.
	#[must_use]
	pub fn max_value(&self) -> u32 {
		((1u64 << self.level) - 1) as u32
	}

	/// Returns a copy with `y` mirrored vertically (`2^level - 1 - y`).
	#[must_use]
	pub fn flipped_y(&self) -> TileCoord {
		TileCoord {
			level: self.level,
			x: self.x,
			y: self.max_value() - self.y,
		}
	}
}

/// Formats as `TileCoord(z, [x, y])`.
impl Debug for TileCoord {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "TileCoord({}, [{}, {}])", self.level, self.x, self.y)
	}
}

impl fmt::Display for TileCoord {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}/{}/{}", self.level, self.x, self.y)
	}
}

/// Ordering: by zoom `level`, then `y`, then `x` (row-major).
impl Ord for TileCoord {
	fn cmp(&self, other: &Self) -> std::cmp::Ordering {
		(self.level, self.y, self.x).cmp(&(other.level, other.y, other.x))
	}
}

impl PartialOrd for TileCoord {
	fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
		Some(self.cmp(other))
	}
}
