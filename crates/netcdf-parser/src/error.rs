//! Error types for NetCDF parsing operations.

use thiserror::Error;

/// Result type for NetCDF parser operations.
pub type NetCdfResult<T> = Result<T, NetCdfError>;

/// Error types for NetCDF parsing.
#[derive(Error, Debug)]
pub enum NetCdfError {
    /// File I/O error
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Missing required variable, coordinate or dimension
    #[error("Missing required data: {0}")]
    MissingData(String),

    /// Invalid data format or shape
    #[error("Invalid data format: {0}")]
    InvalidFormat(String),

    /// Command execution error (for the ncdump engine)
    #[error("Command execution failed: {0}")]
    CommandError(String),

    /// Error raised by the netcdf library
    #[error("NetCDF library error: {0}")]
    Library(String),
}

impl From<netcdf::Error> for NetCdfError {
    fn from(err: netcdf::Error) -> Self {
        NetCdfError::Library(err.to_string())
    }
}

impl From<tempo_common::BoundsError> for NetCdfError {
    fn from(err: tempo_common::BoundsError) -> Self {
        NetCdfError::InvalidFormat(err.to_string())
    }
}
