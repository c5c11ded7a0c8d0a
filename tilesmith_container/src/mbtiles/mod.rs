//! `SQLite` file `*.mbtiles` as tile container
//!
//! - `MBTilesWriter`: writes tile batches and metadata, one transaction per batch.
//! - `MBTilesReader`: reads tiles and metadata back, honouring the stored row scheme.
//! - `MBTilesLayout`: plain `tiles` table or deduplicated `map` + `images` storage.
//! - `MBTilesMetadata`: the entries of the `metadata` table.

mod layout;
mod metadata;
mod reader;
mod writer;

pub use layout::MBTilesLayout;
pub use metadata::MBTilesMetadata;
pub use reader::MBTilesReader;
pub use writer::MBTilesWriter;
