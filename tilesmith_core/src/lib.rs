//! Core types for tilesmith: geographic and tile bounding boxes, tile coordinates, the
//! XYZ/TMS scheme transform, tile formats, the pyramid enumerator and the error taxonomy
//! shared by every stage of the rendering pipeline.

pub mod error;
pub mod progress;
pub mod types;

pub use error::*;
pub use types::*;
