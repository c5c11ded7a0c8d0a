//! Read tiles and metadata from an MBTiles (SQLite) database.
//!
//! The reader opens the file read-only. Rows are interpreted with the `scheme` entry of the
//! `metadata` table; files without that entry follow the MBTiles 1.3 format and are read as
//! TMS. Every coordinate handed in or out is XYZ.

use super::MBTilesLayout;
use anyhow::{Context, Result, ensure};
use r2d2::Pool;
use r2d2_sqlite::{
	SqliteConnectionManager,
	rusqlite::{OpenFlags, OptionalExtension, params},
};
use std::{collections::BTreeMap, path::Path};
use tilesmith_core::{Blob, TileCoord, TileScheme};
use tilesmith_derive::context;

/// Read-only access to a finished MBTiles file.
pub struct MBTilesReader {
	name: String,
	pool: Pool<SqliteConnectionManager>,
	layout: MBTilesLayout,
	scheme: TileScheme,
	metadata: BTreeMap<String, String>,
}

impl MBTilesReader {
	/// Opens an existing MBTiles file.
	///
	/// # Errors
	/// Returns an error if the file does not exist, is not an SQLite database or has no
	/// `tiles` relation.
	#[context("opening MBTiles '{}'", path.display())]
	pub fn open_path(path: &Path) -> Result<MBTilesReader> {
		log::debug!("open {path:?}");
		ensure!(path.exists(), "file {path:?} does not exist");

		let manager = SqliteConnectionManager::file(path).with_flags(OpenFlags::SQLITE_OPEN_READ_ONLY);
		let pool = Pool::builder().max_size(4).build(manager)?;

		let conn = pool.get()?;
		let layout = MBTilesLayout::detect(&conn)?.with_context(|| format!("{path:?} contains no tiles"))?;

		let mut stmt = conn.prepare("SELECT name, value FROM metadata")?;
		let metadata = stmt
			.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?
			.collect::<Result<BTreeMap<_, _>, _>>()?;
		drop(stmt);
		drop(conn);

		let scheme = match metadata.get("scheme").map(String::as_str) {
			Some("xyz") => TileScheme::Xyz,
			_ => TileScheme::Tms,
		};

		Ok(MBTilesReader {
			name: path.display().to_string(),
			pool,
			layout,
			scheme,
			metadata,
		})
	}

	pub fn layout(&self) -> MBTilesLayout {
		self.layout
	}

	/// Row numbering of the stored tiles.
	pub fn scheme(&self) -> TileScheme {
		self.scheme
	}

	/// All entries of the `metadata` table.
	pub fn metadata(&self) -> &BTreeMap<String, String> {
		&self.metadata
	}

	/// Fetches one tile by XYZ coordinate. Returns `Ok(None)` when the tile is not present.
	#[context("fetching tile {:?} from '{}'", coord, self.name)]
	pub fn get_tile(&self, coord: &TileCoord) -> Result<Option<Blob>> {
		log::trace!("read tile {coord:?}");
		let conn = self.pool.get()?;
		let mut stmt =
			conn.prepare_cached("SELECT tile_data FROM tiles WHERE zoom_level = ?1 AND tile_column = ?2 AND tile_row = ?3")?;
		let row = self.scheme.transform_y(coord.level, coord.y);
		let data = stmt
			.query_row(params![coord.level, coord.x, row], |row| row.get::<_, Vec<u8>>(0))
			.optional()?;
		Ok(data.map(Blob::from))
	}

	/// Number of addresses that hold a tile.
	#[context("counting tiles in '{}'", self.name)]
	pub fn count_tiles(&self) -> Result<u64> {
		let count: i64 = self.pool.get()?.query_row("SELECT COUNT(*) FROM tiles", [], |row| row.get(0))?;
		Ok(count as u64)
	}

	/// Number of distinct payloads stored. Equals [`count_tiles`](Self::count_tiles) for the plain layout.
	#[context("counting payloads in '{}'", self.name)]
	pub fn count_payloads(&self) -> Result<u64> {
		let sql = match self.layout {
			MBTilesLayout::Plain => "SELECT COUNT(*) FROM tiles",
			MBTilesLayout::Deduplicated => "SELECT COUNT(*) FROM images",
		};
		let count: i64 = self.pool.get()?.query_row(sql, [], |row| row.get(0))?;
		Ok(count as u64)
	}

	/// Every stored address as XYZ coordinate, sorted by level, row and column.
	#[context("listing tiles in '{}'", self.name)]
	pub fn list_coords(&self) -> Result<Vec<TileCoord>> {
		let conn = self.pool.get()?;
		let mut stmt = conn.prepare("SELECT zoom_level, tile_column, tile_row FROM tiles")?;
		let rows = stmt
			.query_map([], |row| Ok((row.get::<_, u8>(0)?, row.get::<_, u32>(1)?, row.get::<_, u32>(2)?)))?
			.collect::<Result<Vec<_>, _>>()?;

		let mut coords = rows
			.into_iter()
			.map(|(level, x, row)| TileCoord::new(level, x, self.scheme.transform_y(level, row)))
			.collect::<Result<Vec<_>>>()?;
		coords.sort();
		Ok(coords)
	}
}

impl std::fmt::Debug for MBTilesReader {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("MBTilesReader")
			.field("name", &self.name)
			.field("layout", &self.layout)
			.field("scheme", &self.scheme)
			.finish()
	}
}
