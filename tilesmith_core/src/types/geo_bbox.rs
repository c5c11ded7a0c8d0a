use super::{MAX_LAT, MAX_LON, geo_to_mercator};
use anyhow::{Result, ensure};
use std::fmt::Debug;
use tilesmith_derive::context;

/// A geographic bounding box in degrees: west, south, east, north.
///
/// A valid box always has `west < east` and `south < north`. Boxes that would wrap around the
/// antimeridian (`west > east`) are rejected instead of being reinterpreted.
///
/// # Examples
///
/// ```
/// use tilesmith_core::GeoBBox;
///
/// let bbox = GeoBBox::new(-10.0, -5.0, 10.0, 5.0).unwrap();
/// assert_eq!(bbox.as_array(), [-10.0, -5.0, 10.0, 5.0]);
/// assert_eq!(bbox.as_string_list(), "-10,-5,10,5");
///
/// assert!(GeoBBox::new(170.0, -5.0, -170.0, 5.0).is_err());
/// ```
#[derive(Clone, Copy, PartialEq)]
pub struct GeoBBox {
	/// west
	pub x_min: f64,
	/// south
	pub y_min: f64,
	/// east
	pub x_max: f64,
	/// north
	pub y_max: f64,
}

impl GeoBBox {
	/// Creates a new `GeoBBox` from `west, south, east, north`.
	///
	/// # Errors
	/// Fails if a value is not finite, lies outside `[-180, 180]` / `[-90, 90]`, if the box is
	/// empty or inverted, or if it spans the antimeridian.
	#[context("invalid bounding box [{}, {}, {}, {}]", x_min, y_min, x_max, y_max)]
	pub fn new(x_min: f64, y_min: f64, x_max: f64, y_max: f64) -> Result<GeoBBox> {
		GeoBBox {
			x_min,
			y_min,
			x_max,
			y_max,
		}
		.checked()
	}

	/// The whole world as far as web mercator can show it.
	#[must_use]
	pub fn world() -> GeoBBox {
		GeoBBox {
			x_min: -MAX_LON,
			y_min: -MAX_LAT,
			x_max: MAX_LON,
			y_max: MAX_LAT,
		}
	}

	/// Returns `[west, south, east, north]`.
	#[must_use]
	pub fn as_array(&self) -> [f64; 4] {
		[self.x_min, self.y_min, self.x_max, self.y_max]
	}

	/// Returns `"west,south,east,north"`, the format of the MBTiles `bounds` metadata entry.
	#[must_use]
	pub fn as_string_list(&self) -> String {
		format!("{},{},{},{}", self.x_min, self.y_min, self.x_max, self.y_max)
	}

	/// Center of the box as `[lon, lat]`.
	#[must_use]
	pub fn center(&self) -> [f64; 2] {
		[(self.x_min + self.x_max) / 2.0, (self.y_min + self.y_max) / 2.0]
	}

	/// Whether the point lies inside the box, edges included.
	#[must_use]
	pub fn contains(&self, lon: f64, lat: f64) -> bool {
		(self.x_min..=self.x_max).contains(&lon) && (self.y_min..=self.y_max).contains(&lat)
	}

	/// Converts the box to web mercator meters `[x_min, y_min, x_max, y_max]`.
	///
	/// Latitudes are clamped to the mercator domain first.
	#[must_use]
	pub fn to_mercator(&self) -> [f64; 4] {
		let [x_min, y_min] = geo_to_mercator(self.x_min, self.y_min);
		let [x_max, y_max] = geo_to_mercator(self.x_max, self.y_max);
		[x_min, y_min, x_max, y_max]
	}

	fn checked(self) -> Result<Self> {
		for value in self.as_array() {
			ensure!(value.is_finite(), "coordinates must be finite numbers");
		}
		ensure!(self.x_min >= -MAX_LON, "west ({}) must be >= -180", self.x_min);
		ensure!(self.x_max <= MAX_LON, "east ({}) must be <= 180", self.x_max);
		ensure!(self.y_min >= -90., "south ({}) must be >= -90", self.y_min);
		ensure!(self.y_max <= 90., "north ({}) must be <= 90", self.y_max);
		ensure!(
			self.x_min != self.x_max,
			"west ({}) and east ({}) must differ",
			self.x_min,
			self.x_max
		);
		ensure!(
			self.x_min < self.x_max,
			"west ({}) is east of east ({}): boxes crossing the antimeridian are not supported",
			self.x_min,
			self.x_max
		);
		ensure!(
			self.y_min < self.y_max,
			"south ({}) must be < north ({})",
			self.y_min,
			self.y_max
		);
		Ok(self)
	}
}

impl Debug for GeoBBox {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "GeoBBox({}, {}, {}, {})", self.x_min, self.y_min, self.x_max, self.y_max)
	}
}

impl TryFrom<Vec<f64>> for GeoBBox {
	type Error = anyhow::Error;

	/// Builds a `GeoBBox` from exactly four values `[west, south, east, north]`.
	#[context("converting {input:?} to a bounding box")]
	fn try_from(input: Vec<f64>) -> Result<Self> {
		ensure!(input.len() == 4, "a bounding box needs 4 values (west, south, east, north)");
		GeoBBox::new(input[0], input[1], input[2], input[3])
	}
}

impl TryFrom<[f64; 4]> for GeoBBox {
	type Error = anyhow::Error;

	fn try_from(input: [f64; 4]) -> Result<Self> {
		GeoBBox::new(input[0], input[1], input[2], input[3])
	}
}
