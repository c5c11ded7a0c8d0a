//! [`Blob`] wraps the encoded bytes of one tile as they travel from a render worker to the writer.
//!
//! ```rust
//! use tilesmith_core::Blob;
//!
//! let blob = Blob::from(vec![0x89, 0x50, 0x4e, 0x47]);
//! assert_eq!(blob.len(), 4);
//! assert_eq!(blob.as_slice(), &[0x89, 0x50, 0x4e, 0x47]);
//! ```

use std::fmt::Debug;

/// A simple wrapper around [`Vec<u8>`] holding an encoded tile payload.
#[derive(Clone, PartialEq, Eq, Default)]
pub struct Blob(Vec<u8>);

impl Blob {
	/// Returns the bytes as a slice.
	#[must_use]
	pub fn as_slice(&self) -> &[u8] {
		&self.0
	}

	/// Number of bytes.
	#[must_use]
	pub fn len(&self) -> usize {
		self.0.len()
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}
}

impl From<Vec<u8>> for Blob {
	fn from(value: Vec<u8>) -> Self {
		Blob(value)
	}
}

impl From<&[u8]> for Blob {
	fn from(value: &[u8]) -> Self {
		Blob(value.to_vec())
	}
}

impl<const N: usize> From<&[u8; N]> for Blob {
	fn from(value: &[u8; N]) -> Self {
		Blob(value.to_vec())
	}
}

impl Debug for Blob {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "Blob({} bytes)", self.0.len())
	}
}
