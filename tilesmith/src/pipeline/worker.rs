//! Render workers: each owns one engine and turns jobs into encoded tiles.

use super::{
	CancelToken,
	messages::{JobMessage, RenderedTile, WriterMessage},
};
use anyhow::{Result, anyhow, ensure};
use flume::{Receiver, Sender};
use std::{
	any::Any,
	panic::{AssertUnwindSafe, catch_unwind},
	sync::Arc,
	thread::{self, JoinHandle},
};
use tilesmith_core::{PipelineError, RenderJob};
use tilesmith_image::{
	encode,
	engine::{EngineFactory, RenderEngine, RenderRequest},
	slice_metatile,
};

/// Counters of one worker, summed up by the coordinator.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct WorkerStats {
	pub jobs: u64,
	pub tiles: u64,
	pub failed_tiles: u64,
}

/// The queues a worker is connected to.
pub(crate) struct WorkerChannels {
	pub jobs: Receiver<JobMessage>,
	pub results: Sender<WriterMessage>,
	/// Receives exactly one message once the engine exists, or the reason it could not be created.
	pub ready: Sender<Result<(), String>>,
}

pub(crate) fn spawn_worker(
	id: usize,
	factory: Arc<dyn EngineFactory>,
	channels: WorkerChannels,
	cancel: CancelToken,
) -> Result<JoinHandle<WorkerStats>> {
	Ok(thread::Builder::new()
		.name(format!("render-{id}"))
		.spawn(move || run_worker(id, factory.as_ref(), channels, cancel))?)
}

fn run_worker(id: usize, factory: &dyn EngineFactory, channels: WorkerChannels, cancel: CancelToken) -> WorkerStats {
	let WorkerChannels { jobs, results, ready } = channels;
	let mut stats = WorkerStats::default();

	let mut engine = match factory.create_engine() {
		Ok(engine) => {
			let _ = ready.send(Ok(()));
			engine
		}
		Err(err) => {
			let _ = ready.send(Err(format!("{err:#}")));
			return stats;
		}
	};
	drop(ready);
	log::debug!("worker {id} ready");

	while let Ok(JobMessage::Render(job)) = jobs.recv() {
		if cancel.is_cancelled() {
			break;
		}
		stats.jobs += 1;
		match render_job(engine.as_mut(), &job) {
			Ok(tiles) => {
				let count = tiles.len() as u64;
				if results.send(WriterMessage::Tiles(tiles)).is_err() {
					// the writer is gone, nobody will store anything anymore
					break;
				}
				stats.tiles += count;
			}
			Err(err) => {
				let error = PipelineError::Render {
					block: job.block,
					message: format!("{err:#}"),
				};
				log::warn!("{error}");
				stats.failed_tiles += job.count_tiles();
			}
		}
	}

	log::debug!("worker {id} finished: {stats:?}");
	stats
}

/// Renders one block, slices it into tiles and encodes them. Nothing is returned unless every
/// tile of the block is valid. A panic anywhere on the way fails only this block.
pub(crate) fn render_job(engine: &mut dyn RenderEngine, job: &RenderJob) -> Result<Vec<RenderedTile>> {
	without_panics(|| render_block(engine, job))
}

fn render_block(engine: &mut dyn RenderEngine, job: &RenderJob) -> Result<Vec<RenderedTile>> {
	let request = RenderRequest {
		extent: job.extent,
		width: job.width,
		height: job.height,
	};
	let image = engine.render(&request)?;

	ensure!(
		image.width() == job.width && image.height() == job.height,
		"engine returned {}x{} px instead of {}x{} px",
		image.width(),
		image.height(),
		job.width,
		job.height
	);

	let images = slice_metatile(image, job.block.width(), job.block.height(), job.tile_size)?;
	job.block
		.iter_coords()
		.zip(images)
		.map(|(coord, image)| {
			let blob = encode(&image, job.format)?;
			ensure!(!blob.is_empty(), "encoded tile {coord} is empty");
			Ok(RenderedTile { coord, blob })
		})
		.collect()
}

/// Runs `f`, turning a panic into an error.
fn without_panics<T>(f: impl FnOnce() -> Result<T>) -> Result<T> {
	catch_unwind(AssertUnwindSafe(f))
		.map_err(|payload| anyhow!("rendering panicked: {}", panic_message(payload.as_ref())))?
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
	if let Some(message) = payload.downcast_ref::<&str>() {
		message
	} else if let Some(message) = payload.downcast_ref::<String>() {
		message
	} else {
		"unknown panic"
	}
}
