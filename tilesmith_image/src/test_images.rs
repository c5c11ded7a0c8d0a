use image::{DynamicImage, Rgb, RgbImage, Rgba, RgbaImage};

/// A 256x256 translucent RGBA image where every pixel is different from its neighbours.
pub fn new_test_rgba() -> DynamicImage {
	DynamicImage::ImageRgba8(RgbaImage::from_fn(256, 256, |x, y| {
		Rgba([x as u8, (255 - x) as u8, y as u8, (255 - y / 2) as u8])
	}))
}

pub fn new_test_rgb() -> DynamicImage {
	DynamicImage::ImageRgb8(RgbImage::from_fn(256, 256, |x, y| {
		Rgb([x as u8, (255 - x) as u8, y as u8])
	}))
}

/// An opaque image of `width`×`height` pixels where each pixel encodes its own position.
pub fn new_position_image(width: u32, height: u32) -> DynamicImage {
	DynamicImage::ImageRgba8(RgbaImage::from_fn(width, height, |x, y| {
		Rgba([(x % 256) as u8, (y % 256) as u8, ((x / 256) * 16 + y / 256) as u8, 255])
	}))
}
