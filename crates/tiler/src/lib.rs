//! XYZ tile generation from colorized GeoTIFFs using the GDAL command-line tools.
//!
//! Each tool invocation is a named [`TileStep`]. Steps run through a
//! [`ProcessRunner`] so tests can substitute the programs.

pub mod error;
pub mod generator;
pub mod pyramid;
pub mod runner;
pub mod steps;

pub use error::{TileError, TileResult};
pub use generator::{statistics_lines, TileGenerator, TileReport};
pub use pyramid::{inspect_pyramid, list_tiles, PyramidSummary, SampleTile};
pub use runner::{CommandOutput, ProcessRunner, SystemRunner};
pub use steps::{work_dir, StepCommand, TileConfig, TileStep, CLEAN_TIFF, RGBA_TIFF};
