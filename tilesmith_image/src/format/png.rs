use anyhow::{Result, bail};
use color_quant::NeuQuant;
use image::{
	DynamicImage, ImageEncoder, ImageFormat,
	codecs::png::{CompressionType, FilterType, PngEncoder},
	load_from_memory_with_format,
};
use std::collections::HashMap;
use tilesmith_core::Blob;
use tilesmith_derive::context;

const PALETTE_SIZE: usize = 256;

/// NeuQuant sampling factor: 1 looks at every pixel, 30 is the fastest.
const NEUQUANT_SAMPLE_FACTOR: i32 = 10;

/// Encodes an 8-bit image with the strongest compression, the equivalent of zlib level 9.
pub fn encode(image: &DynamicImage) -> Result<Blob> {
	if !matches!(image, DynamicImage::ImageRgb8(_) | DynamicImage::ImageRgba8(_)) {
		bail!("png encoding expects an RGB or RGBA image with 8 bits per channel");
	}

	let mut buffer: Vec<u8> = Vec::new();
	PngEncoder::new_with_quality(&mut buffer, CompressionType::Best, FilterType::Adaptive).write_image(
		image.as_bytes(),
		image.width(),
		image.height(),
		image.color().into(),
	)?;

	Ok(Blob::from(buffer))
}

/// Encodes an image as 8-bit indexed PNG.
///
/// Images with at most 256 distinct RGBA values keep their exact colours. Others are reduced
/// to 256 colours with NeuQuant. A `tRNS` chunk is written only if some colour is translucent.
#[context("encoding {}x{} image as indexed PNG", image.width(), image.height())]
pub fn encode_indexed(image: &DynamicImage) -> Result<Blob> {
	let rgba = image.to_rgba8();
	let (palette, indices) = quantize(rgba.as_raw());

	let rgb: Vec<u8> = palette.iter().flat_map(|color| [color[0], color[1], color[2]]).collect();
	let alpha: Vec<u8> = palette.iter().map(|color| color[3]).collect();

	let mut buffer: Vec<u8> = Vec::new();
	let mut encoder = ::png::Encoder::new(&mut buffer, rgba.width(), rgba.height());
	encoder.set_color(::png::ColorType::Indexed);
	encoder.set_depth(::png::BitDepth::Eight);
	encoder.set_palette(rgb);
	if alpha.iter().any(|&a| a < u8::MAX) {
		encoder.set_trns(alpha);
	}
	let mut writer = encoder.write_header()?;
	writer.write_image_data(&indices)?;
	writer.finish()?;

	Ok(Blob::from(buffer))
}

/// Returns the palette and one palette index per RGBA pixel.
fn quantize(pixels: &[u8]) -> (Vec<[u8; 4]>, Vec<u8>) {
	let mut palette: Vec<[u8; 4]> = Vec::new();
	let mut lookup: HashMap<[u8; 4], u8> = HashMap::new();
	let mut indices = Vec::with_capacity(pixels.len() / 4);

	for pixel in pixels.chunks_exact(4) {
		let color = [pixel[0], pixel[1], pixel[2], pixel[3]];
		let index = if let Some(index) = lookup.get(&color) {
			*index
		} else {
			if palette.len() == PALETTE_SIZE {
				return neuquant(pixels);
			}
			let index = palette.len() as u8;
			palette.push(color);
			lookup.insert(color, index);
			index
		};
		indices.push(index);
	}
	(palette, indices)
}

fn neuquant(pixels: &[u8]) -> (Vec<[u8; 4]>, Vec<u8>) {
	let quant = NeuQuant::new(NEUQUANT_SAMPLE_FACTOR, PALETTE_SIZE, pixels);
	let palette = quant
		.color_map_rgba()
		.chunks_exact(4)
		.map(|color| [color[0], color[1], color[2], color[3]])
		.collect();
	let indices = pixels.chunks_exact(4).map(|pixel| quant.index_of(pixel) as u8).collect();
	(palette, indices)
}

#[context("decoding PNG image ({} bytes)", blob.len())]
pub fn decode(blob: &Blob) -> Result<DynamicImage> {
	Ok(load_from_memory_with_format(blob.as_slice(), ImageFormat::Png)?)
}
