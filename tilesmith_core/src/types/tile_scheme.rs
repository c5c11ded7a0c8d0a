//! Row numbering conventions of a tile container.

#[cfg(feature = "cli")]
use clap::ValueEnum;
use std::fmt::{Display, Formatter};

/// How rows are numbered when tiles are addressed in a container.
///
/// Internally every [`TileCoord`](crate::TileCoord) is XYZ. TMS flips the rows so that `y = 0`
/// is the southernmost row, which is what the MBTiles 1.3 format stores.
#[cfg_attr(feature = "cli", derive(ValueEnum))]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum TileScheme {
	/// Row 0 at the north (slippy map / Google style).
	#[default]
	Xyz,
	/// Row 0 at the south.
	Tms,
}

impl TileScheme {
	/// Converts an XYZ row into this scheme's row, or back: the transform is its own inverse.
	///
	/// ```
	/// use tilesmith_core::TileScheme;
	///
	/// assert_eq!(TileScheme::Tms.transform_y(3, 1), 6);
	/// assert_eq!(TileScheme::Tms.transform_y(3, 6), 1);
	/// assert_eq!(TileScheme::Xyz.transform_y(3, 6), 6);
	/// ```
	#[must_use]
	pub fn transform_y(&self, level: u8, y: u32) -> u32 {
		match self {
			TileScheme::Xyz => y,
			TileScheme::Tms => ((1u64 << level) - 1 - u64::from(y)) as u32,
		}
	}

	pub fn as_str(&self) -> &'static str {
		match self {
			TileScheme::Xyz => "xyz",
			TileScheme::Tms => "tms",
		}
	}
}

impl Display for TileScheme {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		f.write_str(self.as_str())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	#[case(TileScheme::Xyz, 0, 0, 0)]
	#[case(TileScheme::Tms, 0, 0, 0)]
	#[case(TileScheme::Xyz, 4, 7, 7)]
	#[case(TileScheme::Tms, 4, 7, 8)]
	#[case(TileScheme::Tms, 4, 0, 15)]
	#[case(TileScheme::Tms, 22, 0, 4_194_303)]
	fn transform(#[case] scheme: TileScheme, #[case] level: u8, #[case] y: u32, #[case] expected: u32) {
		assert_eq!(scheme.transform_y(level, y), expected);
	}

	#[rstest]
	fn transform_is_self_inverse(#[values(TileScheme::Xyz, TileScheme::Tms)] scheme: TileScheme) {
		for level in 0..=12u8 {
			let size = 1u32 << level;
			for y in (0..size).step_by((size as usize / 16).max(1)) {
				assert_eq!(scheme.transform_y(level, scheme.transform_y(level, y)), y);
			}
		}
	}

	#[test]
	fn display() {
		assert_eq!(TileScheme::default().to_string(), "xyz");
		assert_eq!(TileScheme::Tms.to_string(), "tms");
	}
}
