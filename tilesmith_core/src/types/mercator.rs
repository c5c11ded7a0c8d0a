//! Spherical mercator (EPSG:3857) projection helpers.
//!
//! Tile math works in normalized coordinates (`0..1` across the world, y growing southward);
//! renderers work in projected meters. Both are derived from the same two formulas here.

use super::{EARTH_RADIUS, MAX_LAT};
use std::f64::consts::PI;

/// Projects longitude/latitude (degrees) to normalized world coordinates.
///
/// `x` runs from 0 (180°W) to 1 (180°E), `y` from 0 (north edge) to 1 (south edge).
/// Latitude is clamped to [`MAX_LAT`] first, since mercator is undefined at the poles.
#[must_use]
pub fn geo_to_world(lon: f64, lat: f64) -> [f64; 2] {
	let lat = lat.clamp(-MAX_LAT, MAX_LAT);
	let x = lon / 360.0 + 0.5;
	let y = 0.5 - (lat * PI / 360.0 + PI / 4.0).tan().ln() / (2.0 * PI);
	[x, y]
}

/// Inverse of [`geo_to_world`].
#[must_use]
pub fn world_to_geo(x: f64, y: f64) -> [f64; 2] {
	let lon = (x - 0.5) * 360.0;
	let lat = ((PI * (1.0 - 2.0 * y)).exp().atan() / PI - 0.25) * 360.0;
	[lon, lat]
}

/// Projects longitude/latitude (degrees) to web mercator meters.
#[must_use]
pub fn geo_to_mercator(lon: f64, lat: f64) -> [f64; 2] {
	let lat = lat.clamp(-MAX_LAT, MAX_LAT);
	[
		EARTH_RADIUS * lon.to_radians(),
		EARTH_RADIUS * (PI / 4.0 + lat.to_radians() / 2.0).tan().ln(),
	]
}

/// Inverse of [`geo_to_mercator`].
#[must_use]
pub fn mercator_to_geo(x: f64, y: f64) -> [f64; 2] {
	[
		(x / EARTH_RADIUS).to_degrees(),
		(2.0 * (y / EARTH_RADIUS).exp().atan() - PI / 2.0).to_degrees(),
	]
}
