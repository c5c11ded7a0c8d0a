//! Tile containers written by tilesmith.
//!
//! Only MBTiles is supported: [`MBTilesWriter`] is owned by the single writer thread of a
//! pipeline run, [`MBTilesReader`] opens a finished file for inspection.

mod mbtiles;

pub use mbtiles::*;
