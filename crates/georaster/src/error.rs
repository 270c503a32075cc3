//! Error types for GeoTIFF operations.

use std::path::PathBuf;

use thiserror::Error;

pub type GeoRasterResult<T> = Result<T, GeoRasterError>;

#[derive(Error, Debug)]
pub enum GeoRasterError {
    #[error("GDAL error: {0}")]
    Gdal(#[from] gdal::errors::GdalError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid raster {path}: {message}")]
    InvalidRaster { path: PathBuf, message: String },

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}
