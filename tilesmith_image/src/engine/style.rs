//! YAML stylesheets and the engine that draws them.
//!
//! A stylesheet is a background colour plus an ordered list of layers, drawn bottom to top:
//!
//! ```yaml
//! background: "#aad3df"
//! buffer: 16
//! aspect_fix: respect
//! layers:
//!   - type: polygon
//!     fill: "#f2efe9"
//!     rings:
//!       - [[-10, -10], [10, -10], [10, 10], [-10, 10]]
//!   - type: graticule
//!     spacing: 10
//!     color: "#ffffff80"
//!     width: 1
//!   - type: line
//!     color: "#d22"
//!     width: 3
//!     points: [[-8, -5], [0, 2], [8, -5]]
//!   - type: marker
//!     point: [13.4, 52.5]
//!     radius: 4
//!     color: "#000000"
//! ```
//!
//! Coordinates are `[lon, lat]` in degrees.

use super::{EngineFactory, RenderEngine, RenderRequest, draw::Canvas};
use anyhow::{Context, Result, bail, ensure};
use image::{DynamicImage, Rgba};
use serde::Deserialize;
use std::{
	fmt,
	fs::File,
	io::{BufReader, Read},
	path::Path,
	sync::Arc,
};
use tilesmith_derive::context;

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Stylesheet {
	/// Colour every tile starts with. Defaults to fully transparent.
	#[serde(default)]
	pub background: Color,

	/// Extra pixels drawn around the requested area and cut away afterwards, so that symbols
	/// crossing a tile edge are drawn identically on both tiles.
	#[serde(default)]
	pub buffer: u32,

	#[serde(default)]
	pub aspect_fix: AspectFix,

	#[serde(default)]
	pub layers: Vec<Layer>,
}

/// How to map an extent onto an image whose aspect ratio differs from the extent's.
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AspectFix {
	/// Stretch the extent to the image, scaling x and y independently.
	#[default]
	Respect,
	/// Grow the extent around its center until it has the image's aspect ratio.
	GrowBbox,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Layer {
	Graticule(GraticuleLayer),
	Polygon(PolygonLayer),
	Line(LineLayer),
	Marker(MarkerLayer),
}

/// Meridians and parallels every `spacing` degrees.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct GraticuleLayer {
	pub spacing: f64,
	pub color: Color,
	#[serde(default = "default_width")]
	pub width: f32,
}

/// Filled rings. Each ring is filled on its own, there are no holes.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct PolygonLayer {
	pub rings: Vec<Vec<[f64; 2]>>,
	pub fill: Color,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct LineLayer {
	pub points: Vec<[f64; 2]>,
	pub color: Color,
	#[serde(default = "default_width")]
	pub width: f32,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct MarkerLayer {
	pub point: [f64; 2],
	pub radius: u32,
	pub color: Color,
}

fn default_width() -> f32 {
	1.0
}

/// An RGBA colour written as `#rgb`, `#rrggbb` or `#rrggbbaa`.
#[derive(Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(try_from = "String")]
pub struct Color(pub [u8; 4]);

impl Color {
	pub fn to_rgba(self) -> Rgba<u8> {
		Rgba(self.0)
	}

	pub fn is_transparent(self) -> bool {
		self.0[3] == 0
	}
}

impl TryFrom<String> for Color {
	type Error = anyhow::Error;

	fn try_from(text: String) -> Result<Self> {
		Color::try_from(text.as_str())
	}
}

impl TryFrom<&str> for Color {
	type Error = anyhow::Error;

	#[context("parsing colour '{text}'")]
	fn try_from(text: &str) -> Result<Self> {
		let Some(hex) = text.strip_prefix('#') else {
			bail!("colours must start with '#'");
		};
		ensure!(hex.is_ascii(), "colours must be hexadecimal");
		let digits: Vec<u8> = match hex.len() {
			3 => hex
				.chars()
				.map(|c| u8::from_str_radix(&format!("{c}{c}"), 16))
				.collect::<Result<_, _>>()?,
			6 | 8 => (0..hex.len())
				.step_by(2)
				.map(|i| u8::from_str_radix(&hex[i..i + 2], 16))
				.collect::<Result<_, _>>()?,
			_ => bail!("expected 3, 6 or 8 hexadecimal digits"),
		};
		let alpha = digits.get(3).copied().unwrap_or(255);
		Ok(Color([digits[0], digits[1], digits[2], alpha]))
	}
}

impl fmt::Debug for Color {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let [r, g, b, a] = self.0;
		write!(f, "#{r:02x}{g:02x}{b:02x}{a:02x}")
	}
}

impl Stylesheet {
	pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
		let style: Stylesheet = serde_yaml_ng::from_reader(reader)?;
		style.validate()?;
		Ok(style)
	}

	pub fn from_string(text: &str) -> Result<Self> {
		let style: Stylesheet = serde_yaml_ng::from_str(text)?;
		style.validate()?;
		Ok(style)
	}

	#[context("reading stylesheet {path:?}")]
	pub fn from_path(path: &Path) -> Result<Self> {
		let file = File::open(path)?;
		Stylesheet::from_reader(BufReader::new(file))
	}

	fn validate(&self) -> Result<()> {
		ensure!(self.buffer <= 1024, "buffer ({}) must be <= 1024", self.buffer);
		for (index, layer) in self.layers.iter().enumerate() {
			validate_layer(layer).with_context(|| format!("invalid layer #{index}"))?;
		}
		Ok(())
	}
}

fn validate_layer(layer: &Layer) -> Result<()> {
	match layer {
		Layer::Graticule(g) => {
			ensure!(g.spacing > 0.0 && g.spacing.is_finite(), "spacing must be positive");
			check_width(g.width)?;
		}
		Layer::Polygon(p) => {
			for ring in &p.rings {
				ensure!(ring.len() >= 3, "a ring needs at least 3 points");
				ring.iter().try_for_each(check_point)?;
			}
		}
		Layer::Line(l) => {
			ensure!(l.points.len() >= 2, "a line needs at least 2 points");
			check_width(l.width)?;
			l.points.iter().try_for_each(check_point)?;
		}
		Layer::Marker(m) => {
			ensure!(m.radius <= 1024, "radius ({}) must be <= 1024", m.radius);
			check_point(&m.point)?;
		}
	}
	Ok(())
}

fn check_width(width: f32) -> Result<()> {
	ensure!(width > 0.0 && width <= 1024.0, "width ({width}) must be within (0, 1024]");
	Ok(())
}

fn check_point(point: &[f64; 2]) -> Result<()> {
	let [lon, lat] = *point;
	ensure!(
		(-180.0..=180.0).contains(&lon) && (-90.0..=90.0).contains(&lat),
		"point [{lon}, {lat}] is outside of [-180..180, -90..90]"
	);
	Ok(())
}

/// Hands out [`StyleEngine`]s that all draw the same stylesheet.
#[derive(Clone, Debug)]
pub struct StyleEngineFactory {
	style: Arc<Stylesheet>,
}

impl StyleEngineFactory {
	#[must_use]
	pub fn new(style: Stylesheet) -> Self {
		StyleEngineFactory { style: Arc::new(style) }
	}

	pub fn from_path(path: &Path) -> Result<Self> {
		Ok(Self::new(Stylesheet::from_path(path)?))
	}
}

impl EngineFactory for StyleEngineFactory {
	fn create_engine(&self) -> Result<Box<dyn RenderEngine>> {
		Ok(Box::new(StyleEngine {
			style: Arc::clone(&self.style),
		}))
	}
}

pub struct StyleEngine {
	style: Arc<Stylesheet>,
}

impl RenderEngine for StyleEngine {
	#[context("rendering {:?} at {}x{} px", request.extent, request.width, request.height)]
	fn render(&mut self, request: &RenderRequest) -> Result<DynamicImage> {
		ensure!(request.width > 0 && request.height > 0, "image size must be positive");
		let style = &*self.style;
		let buffer = style.buffer;

		let mut canvas = Canvas::new(request, buffer, style.aspect_fix, style.background);
		for layer in &style.layers {
			match layer {
				Layer::Graticule(g) => canvas.draw_graticule(g.spacing, g.color, g.width),
				Layer::Polygon(p) => {
					for ring in &p.rings {
						canvas.fill_ring(ring, p.fill);
					}
				}
				Layer::Line(l) => canvas.draw_line(&l.points, l.color, l.width),
				Layer::Marker(m) => canvas.draw_marker(m.point, m.radius, m.color),
			}
		}
		Ok(canvas.into_image())
	}
}
