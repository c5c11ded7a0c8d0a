//! The single writer: the only thread that touches the container.

use super::{
	CancelToken, PipelineConfig,
	messages::{RenderedTile, WriterMessage},
};
use anyhow::Result;
use flume::Receiver;
use std::{
	sync::Arc,
	thread::{self, JoinHandle},
};
use tilesmith_container::{MBTilesMetadata, MBTilesWriter};
use tilesmith_core::{Blob, PipelineError, TileCoord, TileScheme, progress::ProgressBar};

/// Where the writer stores tiles. [`MBTilesWriter`] is the implementation used by real runs.
pub trait TileStore: Send {
	/// Stores a batch atomically: either every tile is stored or none.
	fn write_tiles(&mut self, tiles: &[(TileCoord, Blob)], scheme: TileScheme) -> Result<()>;

	/// Writes metadata and closes the store.
	fn finalize(self: Box<Self>, metadata: &MBTilesMetadata, optimize: bool) -> Result<()>;
}

impl TileStore for MBTilesWriter {
	fn write_tiles(&mut self, tiles: &[(TileCoord, Blob)], scheme: TileScheme) -> Result<()> {
		MBTilesWriter::write_tiles(self, tiles, scheme)
	}

	fn finalize(self: Box<Self>, metadata: &MBTilesMetadata, optimize: bool) -> Result<()> {
		MBTilesWriter::finalize(*self, metadata, optimize)
	}
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct WriterStats {
	pub tiles: u64,
	pub batches: u64,
}

pub(crate) fn spawn_writer(
	store: Box<dyn TileStore>,
	config: Arc<PipelineConfig>,
	results: Receiver<WriterMessage>,
	cancel: CancelToken,
	progress: ProgressBar,
) -> Result<JoinHandle<Result<WriterStats>>> {
	let writer = ResultWriter {
		store,
		config,
		batch: Vec::new(),
		stats: WriterStats::default(),
		progress,
	};
	Ok(thread::Builder::new()
		.name(String::from("writer"))
		.spawn(move || {
			let result = writer.run(&results, &cancel);
			if result.is_err() {
				cancel.abort();
			}
			result
		})?)
}

struct ResultWriter {
	store: Box<dyn TileStore>,
	config: Arc<PipelineConfig>,
	batch: Vec<(TileCoord, Blob)>,
	stats: WriterStats,
	progress: ProgressBar,
}

impl ResultWriter {
	fn run(mut self, results: &Receiver<WriterMessage>, cancel: &CancelToken) -> Result<WriterStats> {
		while let Ok(WriterMessage::Tiles(tiles)) = results.recv() {
			self.push(tiles)?;
			if cancel.is_aborted() {
				break;
			}
		}

		if cancel.is_aborted() {
			log::warn!("run aborted, leaving the container without metadata");
			return Ok(self.stats);
		}

		self.flush()?;
		let optimize = self.config.optimize && !cancel.is_interrupted();
		let metadata = self.config.metadata();
		log::debug!("finalizing container, optimize: {optimize}");
		self.store.finalize(&metadata, optimize).map_err(|err| PipelineError::Write {
			tiles: 0,
			attempts: 1,
			message: format!("{err:#}"),
		})?;
		Ok(self.stats)
	}

	fn push(&mut self, tiles: Vec<RenderedTile>) -> Result<()> {
		self.batch.extend(tiles.into_iter().map(|tile| (tile.coord, tile.blob)));
		if self.batch.len() >= self.config.batch_size {
			self.flush()?;
		}
		Ok(())
	}

	/// Commits the buffered tiles, retrying with a linearly growing pause.
	fn flush(&mut self) -> Result<()> {
		if self.batch.is_empty() {
			return Ok(());
		}
		let mut attempt: u32 = 1;
		loop {
			match self.store.write_tiles(&self.batch, self.config.scheme) {
				Ok(()) => break,
				Err(err) if attempt <= self.config.max_retries => {
					log::warn!(
						"writing {} tiles failed (attempt {attempt}), retrying: {err:#}",
						self.batch.len()
					);
					thread::sleep(self.config.retry_delay * attempt);
					attempt += 1;
				}
				Err(err) => {
					return Err(PipelineError::Write {
						tiles: self.batch.len(),
						attempts: attempt,
						message: format!("{err:#}"),
					}
					.into());
				}
			}
		}
		let count = self.batch.len() as u64;
		log::trace!("stored batch of {count} tiles");
		self.stats.tiles += count;
		self.stats.batches += 1;
		self.progress.inc(count);
		self.batch.clear();
		Ok(())
	}
}

#[cfg(test)]
pub(crate) mod tests {
	use super::*;
	use anyhow::bail;
	use std::{
		sync::{Arc, Mutex},
		time::Duration,
	};
	use tilesmith_core::{GeoBBox, ZoomRange};

	/// Records everything it is asked to do. Fails the first `failures` writes.
	#[derive(Clone, Default)]
	pub(crate) struct RecordingStore {
		pub state: Arc<Mutex<Recorded>>,
		pub failures: u32,
	}

	#[derive(Default)]
	pub(crate) struct Recorded {
		pub batches: Vec<Vec<TileCoord>>,
		pub attempts: u32,
		pub finalized: Option<bool>,
	}

	impl TileStore for RecordingStore {
		fn write_tiles(&mut self, tiles: &[(TileCoord, Blob)], _scheme: TileScheme) -> Result<()> {
			let mut state = self.state.lock().unwrap();
			state.attempts += 1;
			if state.attempts <= self.failures {
				bail!("disk full");
			}
			state.batches.push(tiles.iter().map(|(coord, _)| *coord).collect());
			Ok(())
		}

		fn finalize(self: Box<Self>, _metadata: &MBTilesMetadata, optimize: bool) -> Result<()> {
			self.state.lock().unwrap().finalized = Some(optimize);
			Ok(())
		}
	}

	fn config(batch_size: usize, max_retries: u32) -> Arc<PipelineConfig> {
		let mut config = PipelineConfig::new(
			"test.mbtiles".into(),
			GeoBBox::world(),
			ZoomRange::new(0, 3).unwrap(),
		);
		config.batch_size = batch_size;
		config.max_retries = max_retries;
		config.retry_delay = Duration::from_millis(1);
		Arc::new(config)
	}

	fn tiles(level: u8, count: u32) -> WriterMessage {
		WriterMessage::Tiles(
			(0..count)
				.map(|x| RenderedTile {
					coord: TileCoord::new(level, x, 0).unwrap(),
					blob: Blob::from(vec![1]),
				})
				.collect(),
		)
	}

	fn run(store: &RecordingStore, config: Arc<PipelineConfig>, messages: Vec<WriterMessage>, cancel: &CancelToken) -> Result<WriterStats> {
		let (tx, rx) = flume::unbounded();
		for message in messages {
			tx.send(message).unwrap();
		}
		let progress = ProgressBar::hidden("test", 100);
		let handle = spawn_writer(Box::new(store.clone()), config, rx, cancel.clone(), progress)?;
		handle.join().unwrap()
	}

	#[test]
	fn batches_and_finalizes() -> Result<()> {
		let store = RecordingStore::default();
		let stats = run(
			&store,
			config(4, 0),
			vec![tiles(3, 3), tiles(3, 3), tiles(2, 1), WriterMessage::Shutdown],
			&CancelToken::new(),
		)?;
		assert_eq!(stats, WriterStats { tiles: 7, batches: 2 });

		let state = store.state.lock().unwrap();
		assert_eq!(state.batches.iter().map(Vec::len).collect::<Vec<_>>(), vec![6, 1]);
		assert_eq!(state.finalized, Some(true));
		Ok(())
	}

	#[test]
	fn retries_failed_batches() -> Result<()> {
		let store = RecordingStore {
			failures: 2,
			..Default::default()
		};
		let stats = run(&store, config(10, 2), vec![tiles(3, 2), WriterMessage::Shutdown], &CancelToken::new())?;
		assert_eq!(stats.tiles, 2);
		assert_eq!(store.state.lock().unwrap().attempts, 3);
		Ok(())
	}

	#[test]
	fn gives_up_after_max_retries() {
		let store = RecordingStore {
			failures: 10,
			..Default::default()
		};
		let cancel = CancelToken::new();
		let err = run(&store, config(10, 2), vec![tiles(3, 2), WriterMessage::Shutdown], &cancel).unwrap_err();
		let error = err.downcast_ref::<PipelineError>().unwrap();
		assert_eq!(error.to_string(), "failed to write 2 tiles after 3 attempts: disk full");
		assert_eq!(error.exit_code(), 4);
		assert!(cancel.is_aborted());
		assert_eq!(store.state.lock().unwrap().finalized, None);
	}

	#[test]
	fn interrupted_runs_skip_optimizing() -> Result<()> {
		let store = RecordingStore::default();
		let cancel = CancelToken::new();
		cancel.interrupt();
		let stats = run(&store, config(10, 0), vec![tiles(3, 2), WriterMessage::Shutdown], &cancel)?;
		assert_eq!(stats.tiles, 2);
		assert_eq!(store.state.lock().unwrap().finalized, Some(false));
		Ok(())
	}

	#[test]
	fn aborted_runs_are_not_finalized() -> Result<()> {
		let store = RecordingStore::default();
		let cancel = CancelToken::new();
		cancel.abort();
		let stats = run(&store, config(10, 0), vec![tiles(3, 2), WriterMessage::Shutdown], &cancel)?;
		assert_eq!(stats.tiles, 0);
		assert_eq!(store.state.lock().unwrap().finalized, None);
		Ok(())
	}
}
