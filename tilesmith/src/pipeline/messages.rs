//! What travels over the two queues of a run.

use super::CancelToken;
use flume::{SendTimeoutError, Sender};
use std::time::Duration;
use tilesmith_core::{Blob, RenderJob, TileCoord};

/// How long a blocking send waits before it looks at the cancel token again.
const SEND_POLL: Duration = Duration::from_millis(100);

/// Job queue: coordinator → render workers.
#[derive(Debug)]
pub(crate) enum JobMessage {
	Render(RenderJob),
	/// Tells one worker to stop after the jobs queued before it.
	Shutdown,
}

/// One encoded tile, ready to be stored.
#[derive(Clone, Debug, PartialEq)]
pub struct RenderedTile {
	pub coord: TileCoord,
	pub blob: Blob,
}

/// Result queue: render workers → writer.
#[derive(Debug)]
pub(crate) enum WriterMessage {
	/// All tiles of one rendered block.
	Tiles(Vec<RenderedTile>),
	/// Flush, finalize and stop.
	Shutdown,
}

/// Sends `message`, blocking while the queue is full. Gives up when `cancel` fires or every
/// receiver is gone. Returns whether the message was queued.
pub(crate) fn send_until_cancelled<T>(sender: &Sender<T>, mut message: T, cancel: &CancelToken) -> bool {
	loop {
		match sender.send_timeout(message, SEND_POLL) {
			Ok(()) => return true,
			Err(SendTimeoutError::Timeout(returned)) => {
				if cancel.is_cancelled() {
					return false;
				}
				message = returned;
			}
			Err(SendTimeoutError::Disconnected(_)) => return false,
		}
	}
}
