//! Write tiles and metadata into an MBTiles (SQLite) database.
//!
//! The writer is meant to be owned by exactly one thread. Tiles arrive in batches and every
//! batch is committed in a single transaction, so a tile is either stored completely or not at
//! all. Rows are numbered according to the [`TileScheme`] passed with each batch, and the
//! scheme is recorded in the `metadata` table when the file is finalized.
//!
//! While the writer is open the database runs in WAL mode with `synchronous = NORMAL`: every
//! committed batch survives a crash of the process, and only a power loss can roll back the
//! most recent commits. [`MBTilesWriter::finalize`] switches the file back to a rollback
//! journal, so the finished container is a single file again.
//!
//! An existing file is not truncated: its layout is detected and entries at the same address
//! are replaced, which makes re-running a render into the same file idempotent.
//!
//! ## Example
//! ```rust,no_run
//! use tilesmith_container::*;
//! use tilesmith_core::*;
//! use std::path::Path;
//! use anyhow::Result;
//!
//! fn main() -> Result<()> {
//! 	let mut writer = MBTilesWriter::open(Path::new("world.mbtiles"), MBTilesLayout::Deduplicated)?;
//! 	let tile = (TileCoord::new(0, 0, 0)?, Blob::from(vec![1, 2, 3]));
//! 	writer.write_tiles(&[tile], TileScheme::Tms)?;
//! 	writer.finalize(
//! 		&MBTilesMetadata {
//! 			name: "world".into(),
//! 			format: TileFormat::PNG,
//! 			bounds: GeoBBox::world(),
//! 			min_zoom: 0,
//! 			max_zoom: 0,
//! 			scheme: TileScheme::Tms,
//! 			description: None,
//! 			attribution: None,
//! 		},
//! 		true,
//! 	)?;
//! 	Ok(())
//! }
//! ```

use super::{MBTilesLayout, MBTilesMetadata};
use anyhow::Result;
use r2d2::Pool;
use r2d2_sqlite::{SqliteConnectionManager, rusqlite::params};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tilesmith_core::{Blob, TileCoord, TileScheme};
use tilesmith_derive::context;

/// Writer for MBTiles (SQLite) containers.
pub struct MBTilesWriter {
	pool: Pool<SqliteConnectionManager>,
	layout: MBTilesLayout,
	path: PathBuf,
}

impl MBTilesWriter {
	/// Opens `path` for writing, creating the file and its schema when necessary.
	///
	/// If the file already holds tiles, its layout wins over `layout` and a warning is logged
	/// when the two differ.
	///
	/// # Errors
	/// Returns an error if the database cannot be opened or the schema cannot be created.
	#[context("opening MBTiles '{}' for writing", path.display())]
	pub fn open(path: &Path, layout: MBTilesLayout) -> Result<MBTilesWriter> {
		log::debug!("open {path:?} for writing ({layout})");

		let manager = SqliteConnectionManager::file(path).with_init(|conn| {
			conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get::<_, String>(0))?;
			conn.execute_batch("PRAGMA synchronous = NORMAL; PRAGMA temp_store = MEMORY;")
		});
		let pool = Pool::builder().max_size(1).build(manager)?;

		let conn = pool.get()?;
		let layout = match MBTilesLayout::detect(&conn)? {
			Some(existing) => {
				if existing != layout {
					log::warn!("{path:?} already uses the {existing} layout, keeping it instead of {layout}");
				} else {
					log::info!("{path:?} already exists, replacing tiles at the same addresses");
				}
				existing
			}
			None => layout,
		};
		layout.create_schema(&conn)?;
		drop(conn);

		Ok(MBTilesWriter {
			pool,
			layout,
			path: path.to_path_buf(),
		})
	}

	/// The layout actually used, which may differ from the requested one for existing files.
	pub fn layout(&self) -> MBTilesLayout {
		self.layout
	}

	/// Stores a batch of tiles in one transaction, replacing tiles already stored at the same address.
	///
	/// Rows are converted from XYZ with `scheme` before insertion.
	///
	/// # Errors
	/// Returns an error if the transaction or any insertion fails. Nothing of the batch is
	/// stored in that case.
	#[context("writing {} tiles to '{}'", tiles.len(), self.path.display())]
	pub fn write_tiles(&mut self, tiles: &[(TileCoord, Blob)], scheme: TileScheme) -> Result<()> {
		let mut conn = self.pool.get()?;
		let transaction = conn.transaction()?;
		match self.layout {
			MBTilesLayout::Plain => {
				let mut insert = transaction.prepare_cached(
					"INSERT OR REPLACE INTO tiles (zoom_level, tile_column, tile_row, tile_data) VALUES (?1, ?2, ?3, ?4)",
				)?;
				for (coord, blob) in tiles {
					let row = scheme.transform_y(coord.level, coord.y);
					insert.execute(params![coord.level, coord.x, row, blob.as_slice()])?;
				}
			}
			MBTilesLayout::Deduplicated => {
				let mut insert_image =
					transaction.prepare_cached("INSERT OR IGNORE INTO images (tile_id, tile_data) VALUES (?1, ?2)")?;
				let mut insert_map = transaction.prepare_cached(
					"INSERT OR REPLACE INTO map (zoom_level, tile_column, tile_row, tile_id) VALUES (?1, ?2, ?3, ?4)",
				)?;
				for (coord, blob) in tiles {
					let tile_id = tile_id(blob);
					let row = scheme.transform_y(coord.level, coord.y);
					insert_image.execute(params![tile_id, blob.as_slice()])?;
					insert_map.execute(params![coord.level, coord.x, row, tile_id])?;
				}
			}
		}
		transaction.commit()?;
		log::trace!("committed {} tiles", tiles.len());
		Ok(())
	}

	/// Inserts or replaces one entry of the `metadata` table.
	#[context("setting metadata key '{}' = '{}'", name, value)]
	pub fn set_metadata(&self, name: &str, value: &str) -> Result<()> {
		self.pool.get()?.execute(
			"INSERT OR REPLACE INTO metadata (name, value) VALUES (?1, ?2)",
			params![name, value],
		)?;
		Ok(())
	}

	/// Writes `metadata`, removes payloads no longer referenced and closes the database.
	///
	/// With `optimize`, the statistics are refreshed (`ANALYZE`) and the file is compacted
	/// (`VACUUM`). The write-ahead log is checkpointed into the database file either way.
	#[context("finalizing '{}'", self.path.display())]
	pub fn finalize(self, metadata: &MBTilesMetadata, optimize: bool) -> Result<()> {
		for (key, value) in metadata.entries() {
			self.set_metadata(key, &value)?;
		}

		let conn = self.pool.get()?;
		if self.layout == MBTilesLayout::Deduplicated {
			let removed = conn.execute("DELETE FROM images WHERE tile_id NOT IN (SELECT tile_id FROM map)", [])?;
			if removed > 0 {
				log::debug!("removed {removed} unreferenced images");
			}
		}
		if optimize {
			log::debug!("optimizing {:?}", self.path);
			conn.execute_batch("ANALYZE; VACUUM;")?;
		}
		conn.pragma_update_and_check(None, "journal_mode", "DELETE", |row| row.get::<_, String>(0))?;
		Ok(())
	}
}

/// Content address of a payload in the `images` table.
fn tile_id(blob: &Blob) -> String {
	format!("{:x}", Sha256::digest(blob.as_slice()))
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::MBTilesReader;
	use assert_fs::NamedTempFile;
	use pretty_assertions::assert_eq;
	use rstest::rstest;
	use tilesmith_core::{GeoBBox, TileFormat};

	fn tile(level: u8, x: u32, y: u32, data: &[u8]) -> (TileCoord, Blob) {
		(TileCoord::new(level, x, y).unwrap(), Blob::from(data))
	}

	fn metadata(scheme: TileScheme) -> MBTilesMetadata {
		MBTilesMetadata {
			name: "test".into(),
			format: TileFormat::PNG,
			bounds: GeoBBox::new(-10.0, -10.0, 10.0, 10.0).unwrap(),
			min_zoom: 1,
			max_zoom: 2,
			scheme,
			description: None,
			attribution: Some("me".into()),
		}
	}

	#[test]
	fn tile_ids_are_sha256() {
		assert_eq!(
			tile_id(&Blob::from(b"abc")),
			"ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
		);
	}

	#[rstest]
	#[case::plain_xyz(MBTilesLayout::Plain, TileScheme::Xyz)]
	#[case::plain_tms(MBTilesLayout::Plain, TileScheme::Tms)]
	#[case::dedup_xyz(MBTilesLayout::Deduplicated, TileScheme::Xyz)]
	#[case::dedup_tms(MBTilesLayout::Deduplicated, TileScheme::Tms)]
	fn write_and_read_back(#[case] layout: MBTilesLayout, #[case] scheme: TileScheme) -> Result<()> {
		let file = NamedTempFile::new("test.mbtiles")?;
		let mut writer = MBTilesWriter::open(&file, layout)?;
		writer.write_tiles(&[tile(1, 0, 0, b"a"), tile(1, 1, 0, b"b")], scheme)?;
		writer.write_tiles(&[tile(2, 3, 1, b"a")], scheme)?;
		writer.finalize(&metadata(scheme), true)?;

		let reader = MBTilesReader::open_path(&file)?;
		assert_eq!(reader.layout(), layout);
		assert_eq!(reader.scheme(), scheme);
		assert_eq!(reader.count_tiles()?, 3);
		assert_eq!(reader.get_tile(&TileCoord::new(1, 1, 0)?)?, Some(Blob::from(b"b")));
		assert_eq!(reader.get_tile(&TileCoord::new(2, 3, 1)?)?, Some(Blob::from(b"a")));
		assert_eq!(reader.get_tile(&TileCoord::new(2, 3, 2)?)?, None);
		assert_eq!(
			reader.list_coords()?,
			vec![TileCoord::new(1, 0, 0)?, TileCoord::new(1, 1, 0)?, TileCoord::new(2, 3, 1)?]
		);
		Ok(())
	}

	#[test]
	fn tms_flips_stored_rows() -> Result<()> {
		let file = NamedTempFile::new("test.mbtiles")?;
		let mut writer = MBTilesWriter::open(&file, MBTilesLayout::Plain)?;
		writer.write_tiles(&[tile(3, 2, 1, b"x")], TileScheme::Tms)?;
		drop(writer);

		let conn = r2d2_sqlite::rusqlite::Connection::open(file.path())?;
		let row: u32 = conn.query_row("SELECT tile_row FROM tiles", [], |row| row.get(0))?;
		assert_eq!(row, 6);
		Ok(())
	}

	fn pragma<T: r2d2_sqlite::rusqlite::types::FromSql>(
		conn: &r2d2_sqlite::rusqlite::Connection,
		name: &str,
	) -> Result<T> {
		Ok(conn.query_row(&format!("PRAGMA {name}"), [], |row| row.get(0))?)
	}

	#[test]
	fn commits_are_durable_while_writing() -> Result<()> {
		let file = NamedTempFile::new("test.mbtiles")?;
		let mut writer = MBTilesWriter::open(&file, MBTilesLayout::Plain)?;
		{
			let conn = writer.pool.get()?;
			assert_eq!(pragma::<String>(&conn, "journal_mode")?, "wal");
			// 1 = NORMAL
			assert_eq!(pragma::<i64>(&conn, "synchronous")?, 1);
		}

		writer.write_tiles(&[tile(2, 1, 1, b"kept")], TileScheme::Xyz)?;
		// a run that dies before finalizing keeps every committed batch
		drop(writer);
		let reader = MBTilesReader::open_path(&file)?;
		assert_eq!(reader.get_tile(&TileCoord::new(2, 1, 1)?)?, Some(Blob::from(b"kept")));
		Ok(())
	}

	#[rstest]
	#[case::optimized(true)]
	#[case::interrupted(false)]
	fn finalized_files_use_a_rollback_journal(#[case] optimize: bool) -> Result<()> {
		let file = NamedTempFile::new("test.mbtiles")?;
		let mut writer = MBTilesWriter::open(&file, MBTilesLayout::Deduplicated)?;
		writer.write_tiles(&[tile(1, 0, 0, b"a")], TileScheme::Xyz)?;
		writer.finalize(&metadata(TileScheme::Xyz), optimize)?;

		let conn = r2d2_sqlite::rusqlite::Connection::open(file.path())?;
		assert_eq!(pragma::<String>(&conn, "journal_mode")?, "delete");
		let wal = file.path().with_extension("mbtiles-wal");
		assert!(!wal.exists(), "{wal:?} left behind");
		Ok(())
	}

	#[test]
	fn identical_payloads_are_stored_once() -> Result<()> {
		let file = NamedTempFile::new("test.mbtiles")?;
		let mut writer = MBTilesWriter::open(&file, MBTilesLayout::Deduplicated)?;
		let tiles: Vec<_> = (0..4).map(|x| tile(2, x, 0, b"ocean")).collect();
		writer.write_tiles(&tiles, TileScheme::Xyz)?;
		writer.finalize(&metadata(TileScheme::Xyz), false)?;

		let reader = MBTilesReader::open_path(&file)?;
		assert_eq!(reader.count_tiles()?, 4);
		assert_eq!(reader.count_payloads()?, 1);
		Ok(())
	}

	#[test]
	fn rewriting_replaces_entries() -> Result<()> {
		let file = NamedTempFile::new("test.mbtiles")?;
		for data in [b"old", b"new"] {
			let mut writer = MBTilesWriter::open(&file, MBTilesLayout::Deduplicated)?;
			writer.write_tiles(&[tile(1, 1, 1, data)], TileScheme::Xyz)?;
			writer.finalize(&metadata(TileScheme::Xyz), true)?;
		}

		let reader = MBTilesReader::open_path(&file)?;
		assert_eq!(reader.count_tiles()?, 1);
		assert_eq!(reader.count_payloads()?, 1);
		assert_eq!(reader.get_tile(&TileCoord::new(1, 1, 1)?)?, Some(Blob::from(b"new")));
		Ok(())
	}

	#[test]
	fn existing_layout_wins() -> Result<()> {
		let file = NamedTempFile::new("test.mbtiles")?;
		MBTilesWriter::open(&file, MBTilesLayout::Plain)?;
		let writer = MBTilesWriter::open(&file, MBTilesLayout::Deduplicated)?;
		assert_eq!(writer.layout(), MBTilesLayout::Plain);
		Ok(())
	}

	#[test]
	fn metadata_is_written() -> Result<()> {
		let file = NamedTempFile::new("test.mbtiles")?;
		let writer = MBTilesWriter::open(&file, MBTilesLayout::Plain)?;
		writer.finalize(&metadata(TileScheme::Tms), false)?;

		let reader = MBTilesReader::open_path(&file)?;
		let meta = reader.metadata();
		assert_eq!(meta.get("minzoom").map(String::as_str), Some("1"));
		assert_eq!(meta.get("maxzoom").map(String::as_str), Some("2"));
		assert_eq!(meta.get("bounds").map(String::as_str), Some("-10,-10,10,10"));
		assert_eq!(meta.get("attribution").map(String::as_str), Some("me"));
		assert_eq!(meta.get("description"), None);
		Ok(())
	}
}
