//! A small terminal progress bar for long running renders.
//!
//! The bar is drawn on stderr, throttled to a few redraws per second, and can be cloned and
//! shared between threads. A hidden bar keeps counting but never writes to the terminal, which
//! is what tests and `--verbose` runs use.
//!
//! ```
//! use tilesmith_core::progress::ProgressBar;
//!
//! let progress = ProgressBar::hidden("rendering", 100);
//! progress.inc(10);
//! progress.inc(40);
//! assert_eq!(progress.position(), 50);
//! progress.finish();
//! assert_eq!(progress.position(), 100);
//! ```

mod format;

use format::{format_eta, format_rate, make_bar};
use std::{
	io::{self, Write},
	sync::{Arc, Mutex, MutexGuard, PoisonError},
	time::{Duration, Instant},
};

const REDRAW_INTERVAL: Duration = Duration::from_millis(100);

struct Inner {
	message: String,
	len: u64,
	pos: u64,
	start: Instant,
	last_draw: Option<Instant>,
	visible: bool,
	finished: bool,
}

impl Inner {
	fn redraw(&mut self, force: bool) {
		if !self.visible {
			return;
		}
		if !force && self.last_draw.is_some_and(|t| t.elapsed() < REDRAW_INTERVAL) {
			return;
		}
		self.last_draw = Some(Instant::now());
		self.write(&format!("\r\x1b[2K{}", self.line(terminal_width())));
	}

	fn line(&self, width: usize) -> String {
		let len = self.len.max(1);
		let pos = self.pos.min(len);
		let elapsed = self.start.elapsed().as_secs_f64();
		let per_sec = if elapsed > 0.0 { pos as f64 / elapsed } else { 0.0 };
		let eta_secs = if per_sec > 0.0 {
			((len - pos) as f64 / per_sec).max(0.0)
		} else {
			0.0
		};

		let percent = pos * 100 / len;
		let rate = format_rate(per_sec);
		let eta = format_eta(Duration::from_secs_f64(eta_secs));
		let msg = &self.message;

		let get_line = |bar: &str| format!("{msg}▕{bar}▏{pos}/{len} ({percent:>3}%) {rate:>7} {eta:>6}");
		let bar_width = width.saturating_sub(get_line("").chars().count()).max(1);
		get_line(&make_bar(pos, len, bar_width))
	}

	fn write(&self, text: &str) {
		let mut stderr = io::stderr();
		let _ = write!(stderr, "{text}");
		let _ = stderr.flush();
	}
}

/// A cloneable, thread-safe progress bar handle.
#[derive(Clone)]
pub struct ProgressBar {
	inner: Arc<Mutex<Inner>>,
}

impl ProgressBar {
	/// Creates a bar drawn on stderr.
	#[must_use]
	pub fn new(message: &str, max_value: u64) -> ProgressBar {
		let progress = Self::build(message, max_value, true);
		progress.lock().redraw(true);
		progress
	}

	/// Creates a bar that only counts.
	#[must_use]
	pub fn hidden(message: &str, max_value: u64) -> ProgressBar {
		Self::build(message, max_value, false)
	}

	fn build(message: &str, max_value: u64, visible: bool) -> ProgressBar {
		ProgressBar {
			inner: Arc::new(Mutex::new(Inner {
				message: message.to_string(),
				len: max_value,
				pos: 0,
				start: Instant::now(),
				last_draw: None,
				visible,
				finished: false,
			})),
		}
	}

	fn lock(&self) -> MutexGuard<'_, Inner> {
		// a panic while drawing leaves only counters behind, which are still usable
		self.inner.lock().unwrap_or_else(PoisonError::into_inner)
	}

	pub fn inc(&self, value: u64) {
		let mut inner = self.lock();
		inner.pos = inner.pos.saturating_add(value).min(inner.len);
		inner.redraw(false);
	}

	pub fn position(&self) -> u64 {
		self.lock().pos
	}

	/// Fills the bar, draws it one last time and moves to the next line.
	pub fn finish(&self) {
		let mut inner = self.lock();
		if inner.finished {
			return;
		}
		inner.finished = true;
		inner.pos = inner.len;
		inner.redraw(true);
		if inner.visible {
			inner.write("\n");
		}
	}

	/// Clears the bar from the terminal without filling it.
	pub fn remove(&self) {
		let mut inner = self.lock();
		if inner.finished {
			return;
		}
		inner.finished = true;
		if inner.visible {
			inner.write("\r\x1b[2K");
		}
	}
}

fn terminal_width() -> usize {
	terminal_size::terminal_size().map_or(80, |(width, _)| usize::from(width.0.max(20)))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn counts_are_clamped() {
		let progress = ProgressBar::hidden("test", 5);
		progress.inc(3);
		assert_eq!(progress.position(), 3);
		progress.inc(10);
		assert_eq!(progress.position(), 5);
		progress.inc(u64::MAX);
		assert_eq!(progress.position(), 5);
	}

	#[test]
	fn clones_share_state() {
		let progress = ProgressBar::hidden("shared", 100);
		let clone = progress.clone();
		std::thread::spawn(move || clone.inc(40)).join().unwrap();
		assert_eq!(progress.position(), 40);
	}

	#[test]
	fn finish_and_remove_are_idempotent() {
		let progress = ProgressBar::hidden("done", 7);
		progress.finish();
		progress.finish();
		progress.remove();
		assert_eq!(progress.position(), 7);
	}

	#[test]
	fn line_layout() {
		let progress = ProgressBar::hidden("tiles", 200);
		progress.inc(50);
		let line = progress.lock().line(60);
		assert!(line.starts_with("tiles▕"), "{line}");
		assert!(line.contains("▏50/200 ( 25%)"), "{line}");
		assert_eq!(line.chars().count(), 60, "{line}");
	}

	#[test]
	fn empty_bar_does_not_divide_by_zero() {
		let progress = ProgressBar::hidden("nothing", 0);
		progress.inc(1);
		let line = progress.lock().line(40);
		assert!(line.contains("0/1"), "{line}");
	}
}
