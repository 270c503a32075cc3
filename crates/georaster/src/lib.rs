//! GeoTIFF output for extracted NO2 grids.
//!
//! Two rasters are produced per granule:
//! - `<stem>_NO2.tif`: Float32, EPSG:4326, NaN no-data
//! - `<stem>_NO2_colored.tif`: Byte indices with an RGBA color table, no-data 0

pub mod colorize;
pub mod error;
pub mod writer;

pub use colorize::{
    colored_geotiff_path, colorize_geotiff, read_indexed_geotiff, ColorizeOutcome, IndexedRaster,
};
pub use error::{GeoRasterError, GeoRasterResult};
pub use writer::{
    float_geotiff_path, metadata_item, read_float_geotiff, write_float_geotiff, FloatRaster,
    WGS84_EPSG,
};
