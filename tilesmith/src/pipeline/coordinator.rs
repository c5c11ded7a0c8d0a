//! Wires enumerator, workers and writer together and runs them to completion.

use super::{
	CancelToken, PipelineConfig, TileStore,
	messages::{JobMessage, WriterMessage, send_until_cancelled},
	worker::{WorkerChannels, WorkerStats, spawn_worker},
	writer::spawn_writer,
};
use anyhow::{Result, anyhow};
use std::{fmt, sync::Arc};
use tilesmith_container::MBTilesWriter;
use tilesmith_core::{PipelineError, TilePyramid, progress::ProgressBar};
use tilesmith_image::engine::EngineFactory;

/// Counters of a finished run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RunSummary {
	/// render jobs handed to the workers
	pub jobs: u64,
	pub tiles_rendered: u64,
	pub tiles_written: u64,
	/// tiles of blocks that failed to render or encode
	pub failed_tiles: u64,
}

impl fmt::Display for RunSummary {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(
			f,
			"{} jobs, {} tiles rendered, {} tiles written, {} tiles failed",
			self.jobs, self.tiles_rendered, self.tiles_written, self.failed_tiles
		)
	}
}

/// One run of the tile generation pipeline.
#[derive(Debug)]
pub struct Pipeline {
	config: Arc<PipelineConfig>,
	factory: Arc<dyn EngineFactory>,
	cancel: CancelToken,
}

impl Pipeline {
	/// # Errors
	/// Fails with [`PipelineError::Configuration`] if `config` is invalid.
	pub fn new(config: PipelineConfig, factory: Arc<dyn EngineFactory>) -> Result<Pipeline> {
		config.validate()?;
		Ok(Pipeline {
			config: Arc::new(config),
			factory,
			cancel: CancelToken::new(),
		})
	}

	/// A handle to interrupt the run from another thread, e.g. a Ctrl-C handler.
	pub fn cancel_token(&self) -> CancelToken {
		self.cancel.clone()
	}

	pub fn config(&self) -> &PipelineConfig {
		&self.config
	}

	/// Renders everything into the configured MBTiles file.
	pub fn run(&self) -> Result<RunSummary> {
		let store = MBTilesWriter::open(&self.config.output, self.config.layout)
			.map_err(|err| PipelineError::configuration(&err))?;
		self.run_into(Box::new(store))
	}

	/// Renders everything into `store`.
	///
	/// Workers are started and must all report a working engine before the first job is
	/// queued. The run ends when every job has been rendered and stored, when the cancel
	/// token is interrupted, or when a fatal error occurs.
	pub fn run_into(&self, store: Box<dyn TileStore>) -> Result<RunSummary> {
		let config = &self.config;
		let cancel = &self.cancel;
		let workers = config.threads;

		let pyramid = TilePyramid::new(config.bbox, config.zoom, config.tile_size, config.metatile, config.format)
			.map_err(|err| PipelineError::configuration(&err))?;
		let total_tiles = pyramid.count_tiles();
		log::info!(
			"rendering {total_tiles} tiles in {} jobs with {workers} threads",
			pyramid.count_jobs()
		);

		let progress = if config.progress {
			ProgressBar::new("rendering tiles", total_tiles)
		} else {
			ProgressBar::hidden("rendering tiles", total_tiles)
		};

		let (job_tx, job_rx) = flume::bounded::<JobMessage>(2 * workers);
		// one message carries a whole block, i.e. up to metatile² tiles
		let (result_tx, result_rx) = flume::bounded::<WriterMessage>(4 * workers);
		let (ready_tx, ready_rx) = flume::unbounded();

		let writer = spawn_writer(
			store,
			Arc::clone(config),
			result_rx,
			cancel.clone(),
			progress.clone(),
		)?;

		let mut handles = Vec::with_capacity(workers);
		for id in 0..workers {
			let channels = WorkerChannels {
				jobs: job_rx.clone(),
				results: result_tx.clone(),
				ready: ready_tx.clone(),
			};
			handles.push(spawn_worker(id, Arc::clone(&self.factory), channels, cancel.clone())?);
		}
		drop(job_rx);
		drop(ready_tx);

		let mut init_error = None;
		for _ in 0..workers {
			match ready_rx.recv() {
				Ok(Ok(())) => {}
				Ok(Err(message)) => {
					init_error.get_or_insert(message);
				}
				Err(_) => break,
			}
		}

		let mut jobs = 0;
		if let Some(message) = &init_error {
			log::error!("rendering engine could not be created: {message}");
			cancel.abort();
		} else {
			for job in pyramid.iter_jobs() {
				if cancel.is_cancelled() || !send_until_cancelled(&job_tx, JobMessage::Render(job), cancel) {
					break;
				}
				jobs += 1;
			}
			if !cancel.is_cancelled() {
				for _ in 0..workers {
					send_until_cancelled(&job_tx, JobMessage::Shutdown, cancel);
				}
			}
		}
		// workers that missed their sentinel stop once the queue is drained
		drop(job_tx);

		let mut stats = WorkerStats::default();
		for handle in handles {
			match handle.join() {
				Ok(worker) => {
					stats.jobs += worker.jobs;
					stats.tiles += worker.tiles;
					stats.failed_tiles += worker.failed_tiles;
				}
				Err(_) => log::error!("a render worker panicked"),
			}
		}

		let _ = result_tx.send(WriterMessage::Shutdown);
		drop(result_tx);
		let written = writer.join().map_err(|_| anyhow!("the writer thread panicked"))?;

		if cancel.is_cancelled() {
			progress.remove();
		} else {
			progress.finish();
		}

		if let Some(message) = init_error {
			return Err(PipelineError::EngineInit(message).into());
		}
		let written = written?;

		let summary = RunSummary {
			jobs,
			tiles_rendered: stats.tiles,
			tiles_written: written.tiles,
			failed_tiles: stats.failed_tiles,
		};
		log::info!("{summary}");

		if cancel.is_interrupted() {
			return Err(PipelineError::Interrupted.into());
		}
		if stats.failed_tiles > 0 {
			log::warn!("{} tiles could not be rendered", stats.failed_tiles);
		}
		Ok(summary)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::pipeline::writer::tests::RecordingStore;
	use assert_fs::NamedTempFile;
	use pretty_assertions::assert_eq;
	use std::{
		collections::HashSet,
		thread,
		time::{Duration, Instant},
	};
	use tilesmith_container::{MBTilesLayout, MBTilesReader};
	use tilesmith_core::{GeoBBox, TileBBox, TileCoord, TileScheme, ZoomRange};
	use tilesmith_image::engine::MockEngineFactory;

	fn config(output: &std::path::Path, bbox: [f64; 4], min: u8, max: u8) -> PipelineConfig {
		let mut config = PipelineConfig::new(
			output.to_path_buf(),
			GeoBBox::try_from(bbox).unwrap(),
			ZoomRange::new(min, max).unwrap(),
		);
		config.threads = 2;
		config.tile_size = 32;
		config
	}

	fn coords(xs: std::ops::RangeInclusive<u32>, ys: std::ops::RangeInclusive<u32>, level: u8) -> Vec<TileCoord> {
		let mut coords = Vec::new();
		for y in ys {
			for x in xs.clone() {
				coords.push(TileCoord::new(level, x, y).unwrap());
			}
		}
		coords
	}

	#[test]
	fn renders_the_scenario() -> Result<()> {
		let file = NamedTempFile::new("out.mbtiles")?;
		let factory = MockEngineFactory::new([200, 0, 0, 255]);
		let pipeline = Pipeline::new(config(&file, [-10.0, -10.0, 10.0, 10.0], 4, 4), Arc::new(factory.clone()))?;
		let summary = pipeline.run()?;

		assert_eq!(
			summary,
			RunSummary {
				jobs: 4,
				tiles_rendered: 4,
				tiles_written: 4,
				failed_tiles: 0
			}
		);
		assert_eq!(factory.engines_created(), 2);

		let reader = MBTilesReader::open_path(&file)?;
		assert_eq!(reader.list_coords()?, coords(7..=8, 7..=8, 4));
		let metadata = reader.metadata();
		assert_eq!(metadata["minzoom"], "4");
		assert_eq!(metadata["maxzoom"], "4");
		assert_eq!(metadata["bounds"], "-10,-10,10,10");
		assert_eq!(metadata["format"], "png");
		assert_eq!(metadata["name"], "out");
		Ok(())
	}

	#[test]
	fn world_pyramid_with_metatiles() -> Result<()> {
		let file = NamedTempFile::new("world.mbtiles")?;
		let mut config = config(&file, [-180.0, -85.0, 180.0, 85.0], 0, 3);
		config.metatile = 4;
		config.scheme = TileScheme::Tms;
		config.layout = MBTilesLayout::Plain;
		let summary = Pipeline::new(config, Arc::new(MockEngineFactory::new([0, 0, 255, 255])))?.run()?;

		// levels 0..=2 fit into one block each, level 3 needs 2×2 blocks
		assert_eq!(summary.jobs, 7);
		assert_eq!(summary.tiles_written, 1 + 4 + 16 + 64);

		let reader = MBTilesReader::open_path(&file)?;
		assert_eq!(reader.scheme(), TileScheme::Tms);
		let stored: HashSet<_> = reader.list_coords()?.into_iter().collect();
		assert_eq!(stored.len(), 85);
		for level in 0..=3 {
			for coord in TileBBox::new_full(level)?.iter_coords() {
				assert!(stored.contains(&coord), "missing {coord}");
			}
		}
		Ok(())
	}

	#[test]
	fn failed_block_is_skipped() -> Result<()> {
		let file = NamedTempFile::new("out.mbtiles")?;
		let bad = TileBBox::new(4, 8, 7, 8, 7)?;
		let factory = MockEngineFactory::new([1, 2, 3, 255]).fail_on(bad);
		let summary = Pipeline::new(config(&file, [-10.0, -10.0, 10.0, 10.0], 4, 4), Arc::new(factory))?.run()?;

		assert_eq!(summary.tiles_written, 3);
		assert_eq!(summary.failed_tiles, 1);
		let reader = MBTilesReader::open_path(&file)?;
		assert_eq!(reader.get_tile(&TileCoord::new(4, 8, 7)?)?, None);
		assert!(reader.get_tile(&TileCoord::new(4, 7, 7)?)?.is_some());
		Ok(())
	}

	#[test]
	fn panicking_engine_is_skipped() -> Result<()> {
		let file = NamedTempFile::new("out.mbtiles")?;
		let bad = TileBBox::new(4, 7, 8, 7, 8)?;
		let factory = MockEngineFactory::new([1, 2, 3, 255]).panic_on(bad);
		let summary = Pipeline::new(config(&file, [-10.0, -10.0, 10.0, 10.0], 4, 4), Arc::new(factory))?.run()?;
		assert_eq!(summary.tiles_written, 3);
		assert_eq!(summary.failed_tiles, 1);
		Ok(())
	}

	#[test]
	fn engine_init_failure_is_fatal() {
		let store = RecordingStore::default();
		let factory = MockEngineFactory::new([0; 4]).fail_init();
		let pipeline = Pipeline::new(
			config("unused.mbtiles".as_ref(), [-10.0, -10.0, 10.0, 10.0], 0, 6),
			Arc::new(factory.clone()),
		)
		.unwrap();
		let err = pipeline.run_into(Box::new(store.clone())).unwrap_err();

		let error = err.downcast_ref::<PipelineError>().unwrap();
		assert_eq!(error.exit_code(), 3);
		assert_eq!(
			error.to_string(),
			"failed to initialize rendering engine: mock engine refused to start"
		);
		assert_eq!(factory.renders(), 0);
		assert!(store.state.lock().unwrap().batches.is_empty());
	}

	#[test]
	fn write_failure_is_fatal() {
		let store = RecordingStore {
			failures: u32::MAX,
			..Default::default()
		};
		let mut config = config("unused.mbtiles".as_ref(), [-10.0, -10.0, 10.0, 10.0], 0, 8);
		config.batch_size = 2;
		config.max_retries = 1;
		config.retry_delay = std::time::Duration::from_millis(1);
		let pipeline = Pipeline::new(config, Arc::new(MockEngineFactory::new([0; 4]))).unwrap();
		let err = pipeline.run_into(Box::new(store)).unwrap_err();
		let error = err.downcast_ref::<PipelineError>().unwrap();
		assert_eq!(error.exit_code(), 4);
		assert!(pipeline.cancel_token().is_aborted());
	}

	#[test]
	fn interrupt_before_start() {
		let store = RecordingStore::default();
		let pipeline = Pipeline::new(
			config("unused.mbtiles".as_ref(), [-10.0, -10.0, 10.0, 10.0], 0, 4),
			Arc::new(MockEngineFactory::new([0; 4])),
		)
		.unwrap();
		pipeline.cancel_token().interrupt();
		let err = pipeline.run_into(Box::new(store.clone())).unwrap_err();

		assert_eq!(err.downcast_ref::<PipelineError>().unwrap().exit_code(), 130);
		// metadata is still written, without optimizing
		assert_eq!(store.state.lock().unwrap().finalized, Some(false));
	}

	#[test]
	fn interrupt_while_rendering() {
		let store = RecordingStore::default();
		let mut config = config("unused.mbtiles".as_ref(), [-180.0, -85.0, 180.0, 85.0], 0, 8);
		config.batch_size = 16;
		let total = TilePyramid::new(config.bbox, config.zoom, config.tile_size, 1, config.format)
			.unwrap()
			.count_tiles();
		let factory = MockEngineFactory::new([0, 80, 0, 255]).delay(Duration::from_millis(5));
		let pipeline = Pipeline::new(config, Arc::new(factory)).unwrap();

		let cancel = pipeline.cancel_token();
		let interrupter = thread::spawn(move || {
			thread::sleep(Duration::from_millis(200));
			cancel.interrupt();
		});
		let start = Instant::now();
		let err = pipeline.run_into(Box::new(store.clone())).unwrap_err();
		interrupter.join().unwrap();

		assert_eq!(err.downcast_ref::<PipelineError>().unwrap().exit_code(), 130);
		assert!(start.elapsed() < Duration::from_secs(10), "shutdown took {:?}", start.elapsed());

		let state = store.state.lock().unwrap();
		assert_eq!(state.finalized, Some(false));
		let stored: u64 = state.batches.iter().map(|batch| batch.len() as u64).sum();
		assert!(stored > 0 && stored < total, "stored {stored} of {total} tiles");
		let unique: HashSet<TileCoord> = state.batches.iter().flatten().copied().collect();
		assert_eq!(unique.len() as u64, stored);
	}

	#[test]
	fn rerun_replaces_tiles() -> Result<()> {
		let file = NamedTempFile::new("out.mbtiles")?;
		for color in [[1, 1, 1, 255], [2, 2, 2, 255]] {
			Pipeline::new(config(&file, [-10.0, -10.0, 10.0, 10.0], 3, 4), Arc::new(MockEngineFactory::new(color)))?
				.run()?;
		}
		let reader = MBTilesReader::open_path(&file)?;
		assert_eq!(reader.count_tiles()?, 4 + 4);
		// every tile is the same solid colour
		assert_eq!(reader.count_payloads()?, 1);
		Ok(())
	}

	#[test]
	fn invalid_config_is_rejected() {
		let mut config = config("unused.mbtiles".as_ref(), [-10.0, -10.0, 10.0, 10.0], 0, 4);
		config.threads = 0;
		let err = Pipeline::new(config, Arc::new(MockEngineFactory::new([0; 4]))).unwrap_err();
		assert_eq!(err.downcast_ref::<PipelineError>().unwrap().exit_code(), 2);
	}
}
