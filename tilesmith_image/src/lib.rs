//! Everything between a geographic extent and encoded tile bytes: the [`engine`] that draws a
//! map image, [`slice_metatile`] to cut it into tiles, and [`format`] to encode each tile.

pub mod engine;
pub mod format;
mod slice;

pub use format::{decode, encode};
pub use slice::slice_metatile;

#[cfg(test)]
pub(crate) mod test_images;
