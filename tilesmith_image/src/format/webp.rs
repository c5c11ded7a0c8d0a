use anyhow::{Result, bail};
use image::{DynamicImage, ImageFormat, codecs::webp::WebPEncoder, load_from_memory_with_format};
use tilesmith_core::Blob;
use tilesmith_derive::context;

/// Encodes lossless WebP, keeping transparency.
pub fn encode(image: &DynamicImage) -> Result<Blob> {
	if !matches!(image, DynamicImage::ImageRgb8(_) | DynamicImage::ImageRgba8(_)) {
		bail!("webp lossless only supports RGB or RGBA images with 8 bits per channel");
	}

	let mut buffer: Vec<u8> = Vec::new();
	WebPEncoder::new_lossless(&mut buffer).encode(
		image.as_bytes(),
		image.width(),
		image.height(),
		image.color().into(),
	)?;

	Ok(Blob::from(buffer))
}

#[context("decoding WebP image ({} bytes)", blob.len())]
pub fn decode(blob: &Blob) -> Result<DynamicImage> {
	Ok(load_from_memory_with_format(blob.as_slice(), ImageFormat::WebP)?)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::test_images::new_test_rgba;

	#[test]
	fn lossless_rgba() -> Result<()> {
		let image = new_test_rgba();
		let blob = encode(&image)?;
		assert_eq!(&blob.as_slice()[8..12], b"WEBP");
		assert_eq!(decode(&blob)?.to_rgba8(), image.to_rgba8());
		Ok(())
	}
}
