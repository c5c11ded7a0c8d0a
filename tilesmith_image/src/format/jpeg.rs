use anyhow::{Result, bail};
use image::{DynamicImage, ImageEncoder, ImageFormat, codecs::jpeg::JpegEncoder, load_from_memory_with_format};
use tilesmith_core::Blob;
use tilesmith_derive::context;

/// Highest quality the encoder offers; tiles are encoded once and served many times.
const QUALITY: u8 = 100;

/// Encodes an 8-bit RGB image. JPEG has no alpha channel, so RGBA input is rejected.
pub fn encode(image: &DynamicImage) -> Result<Blob> {
	let DynamicImage::ImageRgb8(rgb) = image else {
		bail!("JPEG only supports RGB images without alpha channel");
	};

	let mut buffer: Vec<u8> = Vec::new();
	JpegEncoder::new_with_quality(&mut buffer, QUALITY).write_image(
		rgb.as_raw(),
		rgb.width(),
		rgb.height(),
		image.color().into(),
	)?;

	Ok(Blob::from(buffer))
}

#[context("decoding JPEG image ({} bytes)", blob.len())]
pub fn decode(blob: &Blob) -> Result<DynamicImage> {
	Ok(load_from_memory_with_format(blob.as_slice(), ImageFormat::Jpeg)?)
}
