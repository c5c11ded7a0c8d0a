//! Raster encodings a tile can be written in.
//!
//! The PNG variants differ only in the pixel layout handed to the encoder: `png` and `png32`
//! keep the alpha channel, `png24` drops it, `png8` and `png256` reduce the tile to a palette of
//! at most 256 colours.
//!
//! ```
//! use tilesmith_core::TileFormat;
//!
//! let format = TileFormat::parse_str("JPEG").unwrap();
//! assert_eq!(format, TileFormat::JPG);
//! assert_eq!(format.extension(), "jpg");
//! assert_eq!(TileFormat::PNG24.extension(), "png");
//! ```

use anyhow::{Result, bail};
#[cfg(feature = "cli")]
use clap::ValueEnum;
use std::fmt::{Display, Formatter};

#[allow(clippy::upper_case_acronyms)]
#[cfg_attr(feature = "cli", derive(ValueEnum))]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum TileFormat {
	/// PNG with alpha channel
	#[default]
	#[cfg_attr(feature = "cli", value(name = "png"))]
	PNG,
	/// PNG without alpha channel
	#[cfg_attr(feature = "cli", value(name = "png24"))]
	PNG24,
	/// PNG with alpha channel, always 8 bits per channel
	#[cfg_attr(feature = "cli", value(name = "png32"))]
	PNG32,
	/// indexed PNG with a palette of at most 256 colours
	#[cfg_attr(feature = "cli", value(name = "png8"))]
	PNG8,
	/// indexed PNG with a palette of at most 256 colours, the same encoding as `png8`
	#[cfg_attr(feature = "cli", value(name = "png256"))]
	PNG256,
	/// JPEG at maximum quality
	#[cfg_attr(feature = "cli", value(name = "jpg", alias = "jpeg"))]
	JPG,
	/// lossless WebP
	#[cfg_attr(feature = "cli", value(name = "webp"))]
	WEBP,
}

impl TileFormat {
	/// The name as used on the command line.
	pub fn as_str(&self) -> &'static str {
		match self {
			TileFormat::PNG => "png",
			TileFormat::PNG24 => "png24",
			TileFormat::PNG32 => "png32",
			TileFormat::PNG8 => "png8",
			TileFormat::PNG256 => "png256",
			TileFormat::JPG => "jpg",
			TileFormat::WEBP => "webp",
		}
	}

	/// File type of the encoded tile, as stored in the MBTiles `format` metadata entry.
	pub fn extension(&self) -> &'static str {
		match self {
			TileFormat::PNG | TileFormat::PNG24 | TileFormat::PNG32 | TileFormat::PNG8 | TileFormat::PNG256 => "png",
			TileFormat::JPG => "jpg",
			TileFormat::WEBP => "webp",
		}
	}

	/// Whether tiles are stored as a colour palette.
	pub fn is_indexed(&self) -> bool {
		matches!(self, TileFormat::PNG8 | TileFormat::PNG256)
	}

	/// Whether encoded tiles keep transparency.
	pub fn has_alpha(&self) -> bool {
		matches!(
			self,
			TileFormat::PNG | TileFormat::PNG32 | TileFormat::PNG8 | TileFormat::PNG256 | TileFormat::WEBP
		)
	}

	/// Parses a format name, case-insensitive, accepting `jpeg` for `jpg`.
	pub fn parse_str(value: &str) -> Result<TileFormat> {
		Ok(match value.trim().to_lowercase().as_str() {
			"png" => TileFormat::PNG,
			"png24" => TileFormat::PNG24,
			"png32" => TileFormat::PNG32,
			"png8" => TileFormat::PNG8,
			"png256" => TileFormat::PNG256,
			"jpg" | "jpeg" => TileFormat::JPG,
			"webp" => TileFormat::WEBP,
			_ => bail!("unknown tile format '{value}', expected one of: png, png24, png32, png8, png256, jpg, webp"),
		})
	}
}

impl Display for TileFormat {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		f.write_str(self.as_str())
	}
}
