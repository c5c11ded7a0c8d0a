//! Rasterization of stylesheet geometry onto an RGBA canvas.
//!
//! Geometry arrives in degrees, is projected to web mercator and then to pixels. Everything is
//! clipped in floating point against a rectangle slightly larger than the image before it is
//! handed to `imageproc`, which keeps pixel coordinates small even at the highest zoom levels.

use super::style::{AspectFix, Color};
use super::RenderRequest;
use image::{DynamicImage, Pixel, Rgba, RgbaImage, imageops};
use imageproc::{
	drawing::{self, draw_filled_circle_mut, draw_line_segment_mut, draw_polygon_mut},
	point::Point,
};
use tilesmith_core::{MAX_LAT, MAX_LON, geo_to_mercator, mercator_to_geo};

/// Pixels around the image inside which geometry survives clipping.
const CLIP_MARGIN: f64 = 64.0;

/// Graticules denser than this are skipped instead of painting the tile solid.
const MAX_GRID_LINES: f64 = 4096.0;

pub struct Canvas {
	image: RgbaImage,
	buffer: u32,
	width: u32,
	height: u32,
	/// mercator coordinates of the image's top left corner
	origin: [f64; 2],
	/// pixels per mercator meter
	scale: [f64; 2],
}

impl Canvas {
	pub fn new(request: &RenderRequest, buffer: u32, aspect_fix: AspectFix, background: Color) -> Canvas {
		let [mut x0, mut y0, mut x1, mut y1] = request.extent.to_mercator();
		let (w, h) = (f64::from(request.width), f64::from(request.height));

		if aspect_fix == AspectFix::GrowBbox {
			let (ew, eh) = (x1 - x0, (y1 - y0).max(f64::EPSILON));
			if ew / eh < w / h {
				let grow = (eh * w / h - ew) / 2.0;
				x0 -= grow;
				x1 += grow;
			} else {
				let grow = (ew * h / w - eh) / 2.0;
				y0 -= grow;
				y1 += grow;
			}
		}

		Canvas {
			image: RgbaImage::from_pixel(
				request.width + 2 * buffer,
				request.height + 2 * buffer,
				background.to_rgba(),
			),
			buffer,
			width: request.width,
			height: request.height,
			origin: [x0, y1],
			scale: [w / (x1 - x0).max(f64::EPSILON), h / (y1 - y0).max(f64::EPSILON)],
		}
	}

	/// Degrees to canvas pixels.
	fn project(&self, point: [f64; 2]) -> [f64; 2] {
		let [mx, my] = geo_to_mercator(point[0], point[1]);
		let buffer = f64::from(self.buffer);
		[
			(mx - self.origin[0]) * self.scale[0] + buffer,
			(self.origin[1] - my) * self.scale[1] + buffer,
		]
	}

	/// Canvas pixels to degrees.
	fn unproject(&self, x: f64, y: f64) -> [f64; 2] {
		let buffer = f64::from(self.buffer);
		mercator_to_geo(
			(x - buffer) / self.scale[0] + self.origin[0],
			self.origin[1] - (y - buffer) / self.scale[1],
		)
	}

	fn clip_rect(&self, extra: f64) -> [f64; 4] {
		let (w, h) = self.image.dimensions();
		let margin = CLIP_MARGIN + extra;
		[-margin, -margin, f64::from(w) + margin, f64::from(h) + margin]
	}

	fn painter(&mut self, color: Color) -> Painter<'_> {
		let (w, h) = self.image.dimensions();
		Painter {
			image: &mut self.image,
			blended: (color.0[3] < 255).then(|| vec![false; w as usize * h as usize]),
		}
	}

	pub fn fill_ring(&mut self, ring: &[[f64; 2]], color: Color) {
		if color.is_transparent() {
			return;
		}
		let points: Vec<[f64; 2]> = ring.iter().map(|p| self.project(*p)).collect();
		let clipped = clip_polygon(&points, self.clip_rect(0.0));
		self.fill_pixels(&clipped, color);
	}

	pub fn draw_line(&mut self, points: &[[f64; 2]], color: Color, width: f32) {
		if color.is_transparent() || points.len() < 2 {
			return;
		}
		let half = f64::from(width) / 2.0;
		let rect = self.clip_rect(half);
		let pixels: Vec<[f64; 2]> = points.iter().map(|p| self.project(*p)).collect();

		for pair in pixels.windows(2) {
			if let Some((a, b)) = clip_segment(pair[0], pair[1], rect) {
				self.stroke_segment(a, b, color, half);
			}
		}

		// round joins
		if width > 1.0 {
			let radius = half.round() as i32;
			for joint in &pixels[1..pixels.len() - 1] {
				if inside(*joint, rect) {
					let center = (joint[0].round() as i32, joint[1].round() as i32);
					draw_filled_circle_mut(&mut self.painter(color), center, radius, color.to_rgba());
				}
			}
		}
	}

	fn stroke_segment(&mut self, a: [f64; 2], b: [f64; 2], color: Color, half: f64) {
		if half <= 0.5 {
			let start = (a[0] as f32, a[1] as f32);
			let end = (b[0] as f32, b[1] as f32);
			draw_line_segment_mut(&mut self.painter(color), start, end, color.to_rgba());
			return;
		}

		let (dx, dy) = (b[0] - a[0], b[1] - a[1]);
		let length = dx.hypot(dy);
		if length < 1e-9 {
			return;
		}
		let (nx, ny) = (-dy / length * half, dx / length * half);
		self.fill_pixels(
			&[
				[a[0] + nx, a[1] + ny],
				[b[0] + nx, b[1] + ny],
				[b[0] - nx, b[1] - ny],
				[a[0] - nx, a[1] - ny],
			],
			color,
		);
	}

	pub fn draw_marker(&mut self, point: [f64; 2], radius: u32, color: Color) {
		if color.is_transparent() {
			return;
		}
		let center = self.project(point);
		if !inside(center, self.clip_rect(f64::from(radius))) {
			return;
		}
		let center = (center[0].round() as i32, center[1].round() as i32);
		let radius = i32::try_from(radius).unwrap_or(i32::MAX);
		draw_filled_circle_mut(&mut self.painter(color), center, radius, color.to_rgba());
	}

	/// Meridians and parallels at multiples of `spacing` degrees.
	pub fn draw_graticule(&mut self, spacing: f64, color: Color, width: f32) {
		let (w, h) = self.image.dimensions();
		let [lon_min, lat_max] = self.unproject(0.0, 0.0);
		let [lon_max, lat_min] = self.unproject(f64::from(w), f64::from(h));

		let lon_range = (lon_min.max(-MAX_LON) / spacing).ceil()..=(lon_max.min(MAX_LON) / spacing).floor();
		let lat_range = (lat_min.max(-MAX_LAT) / spacing).ceil()..=(lat_max.min(MAX_LAT) / spacing).floor();
		if lon_range.end() - lon_range.start() > MAX_GRID_LINES || lat_range.end() - lat_range.start() > MAX_GRID_LINES {
			log::debug!("skipping graticule with {spacing}° spacing, too many lines");
			return;
		}

		let mut n = *lon_range.start();
		while n <= *lon_range.end() {
			let lon = n * spacing;
			self.draw_line(&[[lon, -MAX_LAT], [lon, MAX_LAT]], color, width);
			n += 1.0;
		}
		let mut n = *lat_range.start();
		while n <= *lat_range.end() {
			let lat = n * spacing;
			self.draw_line(&[[-MAX_LON, lat], [MAX_LON, lat]], color, width);
			n += 1.0;
		}
	}

	fn fill_pixels(&mut self, points: &[[f64; 2]], color: Color) {
		let mut polygon: Vec<Point<i32>> = Vec::with_capacity(points.len());
		for p in points {
			let point = Point::new(p[0].round() as i32, p[1].round() as i32);
			if polygon.last() != Some(&point) {
				polygon.push(point);
			}
		}
		while polygon.len() > 1 && polygon.first() == polygon.last() {
			polygon.pop();
		}
		if polygon.len() < 3 {
			return;
		}
		draw_polygon_mut(&mut self.painter(color), &polygon, color.to_rgba());
	}

	/// The finished image without the buffer.
	pub fn into_image(self) -> DynamicImage {
		let image = if self.buffer == 0 {
			self.image
		} else {
			imageops::crop_imm(&self.image, self.buffer, self.buffer, self.width, self.height).to_image()
		};
		DynamicImage::ImageRgba8(image)
	}
}

/// Draws opaque colours directly and blends translucent ones over what is already there.
///
/// `imageproc` may visit a pixel more than once per shape; a translucent shape still blends
/// each pixel only once.
struct Painter<'a> {
	image: &'a mut RgbaImage,
	blended: Option<Vec<bool>>,
}

impl drawing::Canvas for Painter<'_> {
	type Pixel = Rgba<u8>;

	fn dimensions(&self) -> (u32, u32) {
		self.image.dimensions()
	}

	fn get_pixel(&self, x: u32, y: u32) -> Rgba<u8> {
		*self.image.get_pixel(x, y)
	}

	fn draw_pixel(&mut self, x: u32, y: u32, color: Rgba<u8>) {
		let width = self.image.width() as usize;
		match &mut self.blended {
			None => self.image.put_pixel(x, y, color),
			Some(mask) => {
				let index = y as usize * width + x as usize;
				if !mask[index] {
					mask[index] = true;
					self.image.get_pixel_mut(x, y).blend(&color);
				}
			}
		}
	}
}

fn inside(point: [f64; 2], rect: [f64; 4]) -> bool {
	point[0] >= rect[0] && point[1] >= rect[1] && point[0] <= rect[2] && point[1] <= rect[3]
}

/// Sutherland–Hodgman clipping of a polygon against `[x_min, y_min, x_max, y_max]`.
fn clip_polygon(points: &[[f64; 2]], rect: [f64; 4]) -> Vec<[f64; 2]> {
	let mut output = points.to_vec();
	for edge in 0..4 {
		let Some(&last) = output.last() else {
			break;
		};
		let (axis, limit) = match edge {
			0 => (0, rect[0]),
			1 => (1, rect[1]),
			2 => (0, rect[2]),
			_ => (1, rect[3]),
		};
		let is_inside = |p: [f64; 2]| if edge < 2 { p[axis] >= limit } else { p[axis] <= limit };
		let intersect = |a: [f64; 2], b: [f64; 2]| {
			let t = (limit - a[axis]) / (b[axis] - a[axis]);
			let mut p = [a[0] + t * (b[0] - a[0]), a[1] + t * (b[1] - a[1])];
			p[axis] = limit;
			p
		};

		let input = std::mem::take(&mut output);
		let mut prev = last;
		for current in input {
			match (is_inside(prev), is_inside(current)) {
				(true, true) => output.push(current),
				(false, true) => {
					output.push(intersect(prev, current));
					output.push(current);
				}
				(true, false) => output.push(intersect(prev, current)),
				(false, false) => {}
			}
			prev = current;
		}
	}
	output
}

/// Liang–Barsky clipping of the segment `a`–`b` against `[x_min, y_min, x_max, y_max]`.
fn clip_segment(a: [f64; 2], b: [f64; 2], rect: [f64; 4]) -> Option<([f64; 2], [f64; 2])> {
	let d = [b[0] - a[0], b[1] - a[1]];
	let (mut t0, mut t1) = (0.0_f64, 1.0_f64);
	for (p, q) in [
		(-d[0], a[0] - rect[0]),
		(d[0], rect[2] - a[0]),
		(-d[1], a[1] - rect[1]),
		(d[1], rect[3] - a[1]),
	] {
		if p == 0.0 {
			if q < 0.0 {
				return None;
			}
			continue;
		}
		let t = q / p;
		if p < 0.0 {
			if t > t1 {
				return None;
			}
			t0 = t0.max(t);
		} else {
			if t < t0 {
				return None;
			}
			t1 = t1.min(t);
		}
	}
	Some(([a[0] + t0 * d[0], a[1] + t0 * d[1]], [a[0] + t1 * d[0], a[1] + t1 * d[1]]))
}
