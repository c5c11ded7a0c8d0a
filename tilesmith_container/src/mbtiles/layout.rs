//! Storage layouts of the `tiles` relation.

use anyhow::{Result, bail};
use r2d2_sqlite::rusqlite::{Connection, OptionalExtension};
use std::fmt::{Display, Formatter};

/// How tile payloads are stored.
///
/// `Plain` is the `tiles` table of the MBTiles 1.3 format. `Deduplicated` stores every
/// distinct payload once in `images`, keyed by its SHA-256 digest, references it from `map`
/// and exposes both through a `tiles` view, so readers see the same relation either way.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum MBTilesLayout {
	Plain,
	#[default]
	Deduplicated,
}

const SCHEMA_METADATA: &str = "CREATE TABLE IF NOT EXISTS metadata (name TEXT, value TEXT, UNIQUE (name));";

const SCHEMA_PLAIN: &str = "
	CREATE TABLE IF NOT EXISTS tiles (zoom_level INTEGER, tile_column INTEGER, tile_row INTEGER, tile_data BLOB);
	CREATE UNIQUE INDEX IF NOT EXISTS tile_index ON tiles (zoom_level, tile_column, tile_row);";

const SCHEMA_DEDUPLICATED: &str = "
	CREATE TABLE IF NOT EXISTS map (zoom_level INTEGER, tile_column INTEGER, tile_row INTEGER, tile_id TEXT);
	CREATE UNIQUE INDEX IF NOT EXISTS map_index ON map (zoom_level, tile_column, tile_row);
	CREATE TABLE IF NOT EXISTS images (tile_data BLOB, tile_id TEXT);
	CREATE UNIQUE INDEX IF NOT EXISTS images_id ON images (tile_id);
	CREATE VIEW IF NOT EXISTS tiles AS
		SELECT map.zoom_level AS zoom_level, map.tile_column AS tile_column, map.tile_row AS tile_row, images.tile_data AS tile_data
		FROM map JOIN images ON images.tile_id = map.tile_id;";

impl MBTilesLayout {
	/// Inspects an open database. `None` means the file has no `tiles` relation yet.
	pub(crate) fn detect(conn: &Connection) -> Result<Option<MBTilesLayout>> {
		let kind: Option<String> = conn
			.query_row("SELECT type FROM sqlite_master WHERE name = 'tiles'", [], |row| row.get(0))
			.optional()?;
		Ok(match kind.as_deref() {
			None => None,
			Some("table") => Some(MBTilesLayout::Plain),
			Some("view") => Some(MBTilesLayout::Deduplicated),
			Some(other) => bail!("unexpected kind of 'tiles' relation: {other}"),
		})
	}

	/// Creates every table, index and view of this layout that does not exist yet.
	pub(crate) fn create_schema(&self, conn: &Connection) -> Result<()> {
		conn.execute_batch(SCHEMA_METADATA)?;
		conn.execute_batch(match self {
			MBTilesLayout::Plain => SCHEMA_PLAIN,
			MBTilesLayout::Deduplicated => SCHEMA_DEDUPLICATED,
		})?;
		Ok(())
	}

	pub fn as_str(&self) -> &'static str {
		match self {
			MBTilesLayout::Plain => "plain",
			MBTilesLayout::Deduplicated => "deduplicated",
		}
	}
}

impl Display for MBTilesLayout {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		f.write_str(self.as_str())
	}
}
