use anyhow::{Context, Result};
use clap::Parser;
use std::{
	path::{Path, PathBuf},
	process::ExitCode,
	sync::Arc,
};
use tilesmith::{Pipeline, PipelineConfig, RunSummary, clamped_bbox};
use tilesmith_container::MBTilesLayout;
use tilesmith_core::{PipelineError, TileFormat, TileScheme, ZoomRange};
use tilesmith_image::engine::StyleEngineFactory;

/// Renders a map stylesheet into a raster tile pyramid stored in a single MBTiles file.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
	/// YAML stylesheet to render
	input: PathBuf,

	/// MBTiles file to create, or to update if it exists
	output: PathBuf,

	/// lowest zoom level to render
	min_zoom: u8,

	/// highest zoom level to render
	max_zoom: u8,

	/// area to render in degrees, values are clamped to what web mercator can show
	#[arg(
		long,
		num_args = 4,
		value_names = ["W", "S", "E", "N"],
		allow_negative_numbers = true,
		default_values_t = [-180.0, -85.0511, 180.0, 85.0511]
	)]
	bbox: Vec<f64>,

	/// number of render threads [default: number of logical CPUs]
	#[arg(long)]
	threads: Option<usize>,

	/// name stored in the metadata [default: file name of the stylesheet]
	#[arg(long)]
	name: Option<String>,

	/// tile edge in pixels
	#[arg(long, default_value_t = 256)]
	size: u32,

	/// tile image format
	#[arg(long, value_enum, default_value_t = TileFormat::PNG)]
	format: TileFormat,

	/// row numbering inside the MBTiles file
	#[arg(long, value_enum, default_value_t = TileScheme::Xyz)]
	scheme: TileScheme,

	/// store every tile on its own instead of storing identical tiles once
	#[arg(long = "no_compression", alias = "no-compression")]
	no_compression: bool,

	/// tiles per metatile edge, larger values render fewer and bigger images
	#[arg(long, default_value_t = 1)]
	metatile: u32,

	/// description stored in the metadata
	#[arg(long)]
	description: Option<String>,

	/// attribution stored in the metadata
	#[arg(long)]
	attribution: Option<String>,

	/// log progress details
	#[arg(long, short)]
	verbose: bool,
}

fn main() -> ExitCode {
	let cli = Cli::parse();

	env_logger::Builder::new()
		.filter_level(if cli.verbose {
			log::LevelFilter::Debug
		} else {
			log::LevelFilter::Warn
		})
		.format_timestamp(None)
		.init();

	match run(&cli) {
		Ok(summary) => {
			eprintln!("finished: {summary}");
			ExitCode::SUCCESS
		}
		Err(err) => {
			eprintln!("Error: {err:#}");
			ExitCode::from(exit_code(&err))
		}
	}
}

fn run(cli: &Cli) -> Result<RunSummary> {
	let config = build_config(cli).map_err(|err| PipelineError::configuration(&err))?;
	let factory = StyleEngineFactory::from_path(&cli.input).map_err(|err| PipelineError::configuration(&err))?;

	let pipeline = Pipeline::new(config, Arc::new(factory))?;
	let cancel = pipeline.cancel_token();
	ctrlc::set_handler(move || {
		if !cancel.is_interrupted() {
			eprintln!("\ninterrupted, storing tiles already rendered");
		}
		cancel.interrupt();
	})
	.context("installing Ctrl-C handler")?;

	eprintln!("rendering {:?} into {:?}", cli.input, cli.output);
	pipeline.run()
}

fn build_config(cli: &Cli) -> Result<PipelineConfig> {
	let bbox: [f64; 4] = cli
		.bbox
		.as_slice()
		.try_into()
		.context("--bbox needs exactly four values: W S E N")?;
	let bbox = clamped_bbox(bbox)?;
	let zoom = ZoomRange::new(cli.min_zoom, cli.max_zoom)?;

	let mut config = PipelineConfig::new(cli.output.clone(), bbox, zoom);
	config.name = cli.name.clone().unwrap_or_else(|| file_stem(&cli.input));
	if let Some(threads) = cli.threads {
		config.threads = threads;
	}
	config.tile_size = cli.size;
	config.metatile = cli.metatile;
	config.format = cli.format;
	config.scheme = cli.scheme;
	config.layout = if cli.no_compression {
		MBTilesLayout::Plain
	} else {
		MBTilesLayout::Deduplicated
	};
	config.description.clone_from(&cli.description);
	config.attribution.clone_from(&cli.attribution);
	config.progress = !cli.verbose;
	Ok(config)
}

fn file_stem(path: &Path) -> String {
	path.file_stem()
		.map_or_else(|| String::from("tiles"), |stem| stem.to_string_lossy().into_owned())
}

fn exit_code(err: &anyhow::Error) -> u8 {
	err.downcast_ref::<PipelineError>()
		.map_or(1, |error| u8::try_from(error.exit_code()).unwrap_or(1))
}
