pub mod error;
pub mod field;
pub mod interp;
pub mod io;
pub mod march;
pub mod plugin;
pub mod primitives;
pub mod raster;
pub mod segment;
pub mod track;
pub mod types;
pub mod utils;

pub use field::Field;
pub use march::{RayMarchResult, march};
pub use plugin::TrackPlugin;
pub use raster::rasterize;
pub use segment::Segment;
pub use track::{Track, TrackBuilder};
