use super::MAX_ZOOM;
use anyhow::{Result, ensure};
use std::{fmt, ops::RangeInclusive};

/// An inclusive range of zoom levels, `min..=max`, bounded by [`MAX_ZOOM`].
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct ZoomRange {
	pub min: u8,
	pub max: u8,
}

impl ZoomRange {
	/// # Errors
	/// Fails if `min > max` or `max > MAX_ZOOM`.
	pub fn new(min: u8, max: u8) -> Result<ZoomRange> {
		ensure!(max <= MAX_ZOOM, "max zoom ({max}) must be <= {MAX_ZOOM}");
		ensure!(min <= max, "min zoom ({min}) must be <= max zoom ({max})");
		Ok(ZoomRange { min, max })
	}

	pub fn iter(&self) -> RangeInclusive<u8> {
		self.min..=self.max
	}
}

impl fmt::Debug for ZoomRange {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "ZoomRange({}..={})", self.min, self.max)
	}
}
