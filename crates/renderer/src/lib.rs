//! Color mapping for NO2 rasters.
//!
//! Implements the two halves of colorizing a float raster:
//! - Stretch: choosing a value range and scaling samples to byte indices
//! - Color ramp: the 256-entry RGBA table attached to the byte raster

pub mod colormap;
pub mod stretch;

pub use colormap::{interpolate_color, Color, ColorRamp, NODATA_INDEX, NO2_ANCHORS};
pub use stretch::{
    choose_range, percentile, scale_to_bytes, scale_value, FixedRange, RangeSource, SampleStats,
    StretchConfig, StretchRange,
};
