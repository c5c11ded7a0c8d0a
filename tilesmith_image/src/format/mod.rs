//! Encoding of rendered tiles into the bytes stored in the container.
//!
//! ```
//! use image::{DynamicImage, RgbaImage};
//! use tilesmith_core::TileFormat;
//! use tilesmith_image::{decode, encode};
//!
//! let image = DynamicImage::ImageRgba8(RgbaImage::new(16, 16));
//! let blob = encode(&image, TileFormat::PNG).unwrap();
//! assert_eq!(&blob.as_slice()[1..4], b"PNG");
//! assert_eq!(decode(&blob, TileFormat::PNG).unwrap().width(), 16);
//! ```

pub mod jpeg;
pub mod png;
pub mod webp;

use anyhow::{Result, ensure};
use image::DynamicImage;
use tilesmith_core::{Blob, TileFormat};
use tilesmith_derive::context;

/// Encodes `image` as `format`, converting the pixel layout where the format requires it.
#[context("encoding {}x{} image as {}", image.width(), image.height(), format)]
pub fn encode(image: &DynamicImage, format: TileFormat) -> Result<Blob> {
	ensure!(image.width() > 0 && image.height() > 0, "image is empty");
	let blob = match format {
		TileFormat::PNG | TileFormat::PNG32 => png::encode(&DynamicImage::ImageRgba8(image.to_rgba8()))?,
		TileFormat::PNG24 => png::encode(&DynamicImage::ImageRgb8(image.to_rgb8()))?,
		TileFormat::PNG8 | TileFormat::PNG256 => png::encode_indexed(image)?,
		TileFormat::JPG => jpeg::encode(&DynamicImage::ImageRgb8(image.to_rgb8()))?,
		TileFormat::WEBP => webp::encode(&DynamicImage::ImageRgba8(image.to_rgba8()))?,
	};
	ensure!(!blob.is_empty(), "encoder produced no data");
	Ok(blob)
}

/// Decodes a tile previously written by [`encode`].
pub fn decode(blob: &Blob, format: TileFormat) -> Result<DynamicImage> {
	match format {
		TileFormat::PNG | TileFormat::PNG24 | TileFormat::PNG32 | TileFormat::PNG8 | TileFormat::PNG256 => {
			png::decode(blob)
		}
		TileFormat::JPG => jpeg::decode(blob),
		TileFormat::WEBP => webp::decode(blob),
	}
}
