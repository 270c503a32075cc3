//! NetCDF reading for TEMPO NO2 gridded granules.
//!
//! This crate turns a TEMPO Level-3 NetCDF file into a north-up 2-D grid with
//! geographic bounds, ready to be written as a GeoTIFF.
//!
//! # Engines
//!
//! Two readers sit behind the [`GridSource`] trait:
//! - [`Engine::Native`] reads through libnetcdf (the `netcdf` crate). Requires
//!   `libnetcdf-dev` and `libhdf5-dev` at build time.
//! - [`Engine::Ncdump`] shells out to the `ncdump` utility and parses its CDL
//!   output.
//!
//! # TEMPO Data Structure
//!
//! Level-3 files carry 1-D `latitude`/`longitude` coordinates in the root
//! group and the NO2 columns in the `product` and `support_data` groups,
//! dimensioned `(time, latitude, longitude)` with latitude ascending.

pub mod array;
pub mod candidates;
pub mod cdl;
pub mod error;
pub mod extract;
pub mod native;
pub mod ncdump;
pub mod source;

pub use array::NamedArray;
pub use candidates::{default_no2_candidates, VariableCandidate};
pub use error::{NetCdfError, NetCdfResult};
pub use extract::{extract_file, extract_grid, is_ascending, ExtractedGrid};
pub use native::{silence_hdf5_errors, NativeSource};
pub use ncdump::NcdumpSource;
pub use source::{Engine, GridSource, MemorySource};
