use anyhow::{Result, ensure};
use std::{path::PathBuf, time::Duration};
use tilesmith_container::{MBTilesLayout, MBTilesMetadata};
use tilesmith_core::{GeoBBox, MAX_LAT, MAX_LON, PipelineError, TileFormat, TileScheme, ZoomRange};
use tilesmith_derive::context;

/// Largest tile edge in pixels.
pub const MAX_TILE_SIZE: u32 = 4096;
/// Largest edge of a rendered metatile image in pixels.
pub const MAX_RENDER_SIZE: u32 = 16384;

/// Everything a pipeline run needs to know. Built once, then shared read-only by all threads.
#[derive(Clone, Debug)]
pub struct PipelineConfig {
	pub output: PathBuf,
	pub bbox: GeoBBox,
	pub zoom: ZoomRange,
	/// number of render workers
	pub threads: usize,
	/// tile edge in pixels
	pub tile_size: u32,
	/// tiles per metatile edge
	pub metatile: u32,
	pub format: TileFormat,
	pub scheme: TileScheme,
	pub layout: MBTilesLayout,
	pub name: String,
	pub description: Option<String>,
	pub attribution: Option<String>,
	/// tiles committed per transaction
	pub batch_size: usize,
	/// retries of a failed batch before the run is aborted
	pub max_retries: u32,
	/// back-off before the first retry, growing linearly
	pub retry_delay: Duration,
	/// run ANALYZE and VACUUM when finalizing
	pub optimize: bool,
	/// draw a progress bar on stderr
	pub progress: bool,
}

impl PipelineConfig {
	/// A configuration with defaults for everything but the output, area and zoom levels.
	pub fn new(output: PathBuf, bbox: GeoBBox, zoom: ZoomRange) -> PipelineConfig {
		let name = output
			.file_stem()
			.map_or_else(|| String::from("tiles"), |stem| stem.to_string_lossy().into_owned());
		PipelineConfig {
			output,
			bbox,
			zoom,
			threads: num_cpus::get(),
			tile_size: 256,
			metatile: 1,
			format: TileFormat::default(),
			scheme: TileScheme::default(),
			layout: MBTilesLayout::Deduplicated,
			name,
			description: None,
			attribution: None,
			batch_size: 512,
			max_retries: 3,
			retry_delay: Duration::from_millis(200),
			optimize: true,
			progress: false,
		}
	}

	/// Checks the values that the types alone cannot guarantee.
	///
	/// # Errors
	/// Fails with [`PipelineError::Configuration`].
	pub fn validate(&self) -> Result<(), PipelineError> {
		self.check().map_err(|err| PipelineError::configuration(&err))
	}

	#[context("invalid configuration")]
	fn check(&self) -> Result<()> {
		ensure!(self.threads >= 1, "thread count must be at least 1");
		ensure!(
			(1..=MAX_TILE_SIZE).contains(&self.tile_size),
			"tile size must be between 1 and {MAX_TILE_SIZE} pixels, got {}",
			self.tile_size
		);
		ensure!(self.metatile >= 1, "metatile must be at least 1");
		ensure!(
			u64::from(self.metatile) * u64::from(self.tile_size) <= u64::from(MAX_RENDER_SIZE),
			"metatile ({}) × tile size ({}) must not exceed {MAX_RENDER_SIZE} pixels",
			self.metatile,
			self.tile_size
		);
		ensure!(self.batch_size >= 1, "batch size must be at least 1");
		ensure!(!self.name.is_empty(), "name must not be empty");
		Ok(())
	}

	/// What the `metadata` table of the output will contain.
	pub fn metadata(&self) -> MBTilesMetadata {
		MBTilesMetadata {
			name: self.name.clone(),
			format: self.format,
			bounds: self.bbox,
			min_zoom: self.zoom.min,
			max_zoom: self.zoom.max,
			scheme: self.scheme,
			description: self.description.clone(),
			attribution: self.attribution.clone(),
		}
	}
}

/// Builds a bounding box from user input, clamping every value into the range web mercator can show.
///
/// ```
/// use tilesmith::clamped_bbox;
/// use tilesmith_core::MAX_LAT;
///
/// let bbox = clamped_bbox([-200.0, -90.0, 10.0, 10.0]).unwrap();
/// assert_eq!(bbox.as_array(), [-180.0, -MAX_LAT, 10.0, 10.0]);
/// assert!(clamped_bbox([10.0, 0.0, -10.0, 5.0]).is_err());
/// ```
pub fn clamped_bbox([west, south, east, north]: [f64; 4]) -> Result<GeoBBox> {
	let lon = |v: f64| v.clamp(-MAX_LON, MAX_LON);
	let lat = |v: f64| v.clamp(-MAX_LAT, MAX_LAT);
	GeoBBox::new(lon(west), lat(south), lon(east), lat(north))
}
