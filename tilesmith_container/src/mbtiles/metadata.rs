use tilesmith_core::{GeoBBox, TileFormat, TileScheme};

/// Values written to the `metadata` table when a run finishes.
#[derive(Clone, Debug, PartialEq)]
pub struct MBTilesMetadata {
	pub name: String,
	pub format: TileFormat,
	pub bounds: GeoBBox,
	pub min_zoom: u8,
	pub max_zoom: u8,
	pub scheme: TileScheme,
	pub description: Option<String>,
	pub attribution: Option<String>,
}

impl MBTilesMetadata {
	/// Key/value pairs in the order they are written. Optional values are omitted when unset or empty.
	///
	/// ```
	/// use tilesmith_container::MBTilesMetadata;
	/// use tilesmith_core::{GeoBBox, TileFormat, TileScheme};
	///
	/// let metadata = MBTilesMetadata {
	/// 	name: "world".into(),
	/// 	format: TileFormat::PNG24,
	/// 	bounds: GeoBBox::new(-10.0, -10.0, 10.0, 10.0).unwrap(),
	/// 	min_zoom: 4,
	/// 	max_zoom: 6,
	/// 	scheme: TileScheme::Xyz,
	/// 	description: None,
	/// 	attribution: Some(String::new()),
	/// };
	/// let entries = metadata.entries();
	/// assert_eq!(entries[1], ("format", "png".to_string()));
	/// assert_eq!(entries[2], ("bounds", "-10,-10,10,10".to_string()));
	/// assert_eq!(entries[3], ("center", "0,0,4".to_string()));
	/// assert_eq!(entries.len(), 9);
	/// ```
	pub fn entries(&self) -> Vec<(&'static str, String)> {
		let [lon, lat] = self.bounds.center();
		let mut entries = vec![
			("name", self.name.clone()),
			("format", self.format.extension().to_string()),
			("bounds", self.bounds.as_string_list()),
			("center", format!("{lon},{lat},{}", self.min_zoom)),
			("minzoom", self.min_zoom.to_string()),
			("maxzoom", self.max_zoom.to_string()),
			("type", String::from("overlay")),
			("version", String::from("1.1")),
			("scheme", self.scheme.to_string()),
		];
		for (key, value) in [("description", &self.description), ("attribution", &self.attribution)] {
			if let Some(value) = value.as_ref().filter(|v| !v.is_empty()) {
				entries.push((key, value.clone()));
			}
		}
		entries
	}
}
