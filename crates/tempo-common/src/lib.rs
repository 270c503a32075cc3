//! Common types shared across the TEMPO NO2 pipeline crates.

pub mod bbox;
pub mod granule;
pub mod tile;

pub use bbox::{BoundsError, GeoBounds, GeoTransform};
pub use granule::Granule;
pub use tile::{latlon_to_tile, TileCoord, ZoomRange, MAX_ZOOM};
