//! Geographic and Web Mercator constants used across tilesmith.

use std::f64::consts::PI;

/// WGS84 semi-major axis (equatorial radius) in meters.
pub const EARTH_RADIUS: f64 = 6_378_137.0;

/// Earth circumference in meters at the equator (2 * PI * EARTH_RADIUS).
pub const WORLD_SIZE: f64 = 2.0 * PI * EARTH_RADIUS;

/// Maximum latitude in degrees for the Web Mercator projection (EPSG:3857).
///
/// Equals `atan(sinh(PI))` in degrees. Latitudes beyond this are clamped before projecting.
pub const MAX_LAT: f64 = 85.051_128_779_806_59;

/// Maximum longitude in degrees.
pub const MAX_LON: f64 = 180.0;

/// Highest zoom level tilesmith renders.
pub const MAX_ZOOM: u8 = 22;
