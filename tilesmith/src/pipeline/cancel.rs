use std::sync::{
	Arc,
	atomic::{AtomicBool, Ordering},
};

/// Shared cancellation state of one pipeline run.
///
/// An *interrupt* (Ctrl-C) stops feeding new jobs but lets the writer store what is already
/// queued and write metadata. An *abort* (a fatal error in one component) stops everything as
/// soon as possible and leaves the container without metadata.
#[derive(Clone, Debug, Default)]
pub struct CancelToken {
	flags: Arc<Flags>,
}

#[derive(Debug, Default)]
struct Flags {
	interrupted: AtomicBool,
	aborted: AtomicBool,
}

impl CancelToken {
	#[must_use]
	pub fn new() -> CancelToken {
		CancelToken::default()
	}

	pub fn interrupt(&self) {
		self.flags.interrupted.store(true, Ordering::SeqCst);
	}

	pub fn abort(&self) {
		self.flags.aborted.store(true, Ordering::SeqCst);
	}

	pub fn is_interrupted(&self) -> bool {
		self.flags.interrupted.load(Ordering::SeqCst)
	}

	pub fn is_aborted(&self) -> bool {
		self.flags.aborted.load(Ordering::SeqCst)
	}

	/// Whether either an interrupt or an abort happened.
	pub fn is_cancelled(&self) -> bool {
		self.is_interrupted() || self.is_aborted()
	}
}
