use anyhow::{Result, ensure};
use image::DynamicImage;

/// Cuts a rendered metatile into `cols × rows` tiles of `tile_size` pixels.
///
/// Tiles are returned row by row, north-west first, matching
/// [`TileBBox::iter_coords`](tilesmith_core::TileBBox::iter_coords). A 1×1 metatile is returned
/// as is.
pub fn slice_metatile(image: DynamicImage, cols: u32, rows: u32, tile_size: u32) -> Result<Vec<DynamicImage>> {
	ensure!(cols > 0 && rows > 0 && tile_size > 0, "metatile dimensions must be positive");
	ensure!(
		u64::from(image.width()) == u64::from(cols) * u64::from(tile_size)
			&& u64::from(image.height()) == u64::from(rows) * u64::from(tile_size),
		"image size {}x{} does not match {cols}x{rows} tiles of {tile_size} px",
		image.width(),
		image.height()
	);

	if cols == 1 && rows == 1 {
		return Ok(vec![image]);
	}

	let mut tiles = Vec::with_capacity((cols * rows) as usize);
	for row in 0..rows {
		for col in 0..cols {
			tiles.push(image.crop_imm(col * tile_size, row * tile_size, tile_size, tile_size));
		}
	}
	Ok(tiles)
}
