//! The error taxonomy of a pipeline run.
//!
//! Functions throughout the workspace return `anyhow::Result`. Wherever the kind of failure
//! matters to the caller, the root error is a [`PipelineError`], so the binary can recover it
//! with `downcast_ref` and choose an exit code:
//!
//! ```
//! use tilesmith_core::PipelineError;
//!
//! let err = anyhow::Error::from(PipelineError::Interrupted).context("rendering tiles");
//! let kind = err.downcast_ref::<PipelineError>().unwrap();
//! assert_eq!(kind.exit_code(), 130);
//! ```

use crate::TileBBox;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
	/// Invalid input detected before any work started.
	#[error("configuration error: {0}")]
	Configuration(String),

	/// A rendering engine could not be created.
	#[error("failed to initialize rendering engine: {0}")]
	EngineInit(String),

	/// Rendering, slicing or encoding of one block failed. Recoverable: the block is skipped.
	#[error("failed to render block {block:?}: {message}")]
	Render { block: TileBBox, message: String },

	/// A batch could not be committed to the container, even after retrying.
	#[error("failed to write {tiles} tiles after {attempts} attempts: {message}")]
	Write { tiles: usize, attempts: u32, message: String },

	#[error("interrupted")]
	Interrupted,
}

impl PipelineError {
	/// Process exit code for a run that ended with this error.
	#[must_use]
	pub fn exit_code(&self) -> i32 {
		match self {
			PipelineError::Configuration(_) => 2,
			PipelineError::EngineInit(_) => 3,
			PipelineError::Render { .. } => 1,
			PipelineError::Write { .. } => 4,
			PipelineError::Interrupted => 130,
		}
	}

	/// Wraps any error's full context chain as a configuration error.
	pub fn configuration(error: &anyhow::Error) -> PipelineError {
		PipelineError::Configuration(format!("{error:#}"))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	#[case(PipelineError::Configuration("bad bbox".into()), 2, "configuration error: bad bbox")]
	#[case(PipelineError::EngineInit("no style".into()), 3, "failed to initialize rendering engine: no style")]
	#[case(
		PipelineError::Render { block: TileBBox::new(2, 1, 1, 2, 2).unwrap(), message: "boom".into() },
		1,
		"failed to render block 2: [1,1,2,2] (4): boom"
	)]
	#[case(
		PipelineError::Write { tiles: 12, attempts: 3, message: "disk full".into() },
		4,
		"failed to write 12 tiles after 3 attempts: disk full"
	)]
	#[case(PipelineError::Interrupted, 130, "interrupted")]
	fn exit_codes_and_messages(#[case] error: PipelineError, #[case] code: i32, #[case] message: &str) {
		assert_eq!(error.exit_code(), code);
		assert_eq!(error.to_string(), message);
	}

	#[test]
	fn configuration_keeps_context_chain() {
		let inner = anyhow::anyhow!("north (91) must be <= 90").context("invalid bounding box");
		assert_eq!(
			PipelineError::configuration(&inner).to_string(),
			"configuration error: invalid bounding box: north (91) must be <= 90"
		);
	}
}
