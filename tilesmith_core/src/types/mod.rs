//! Contains coordinates, bounding boxes, zoom ranges, tile formats and the render pyramid.

mod blob;
pub use blob::*;

mod constants;
pub use constants::*;

mod geo_bbox;
pub use geo_bbox::*;

mod mercator;
pub use mercator::*;

mod tile_bbox;
pub use tile_bbox::*;

mod tile_coord;
pub use tile_coord::*;

mod tile_format;
pub use tile_format::*;

mod tile_pyramid;
pub use tile_pyramid::*;

mod tile_scheme;
pub use tile_scheme::*;

mod zoom_range;
pub use zoom_range::*;
