//! Geographic bounds and the affine transform derived from them.

use serde::{Deserialize, Serialize};

/// A geographic bounding box in EPSG:4326 degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoBounds {
    pub min_lon: f64,
    pub min_lat: f64,
    pub max_lon: f64,
    pub max_lat: f64,
}

impl GeoBounds {
    /// Create bounds from corner coordinates, rejecting empty or inverted extents.
    pub fn new(min_lon: f64, min_lat: f64, max_lon: f64, max_lat: f64) -> Result<Self, BoundsError> {
        let bounds = Self {
            min_lon,
            min_lat,
            max_lon,
            max_lat,
        };
        bounds.validate()?;
        Ok(bounds)
    }

    /// Compute bounds from the extrema of coordinate arrays, ignoring NaN.
    pub fn from_coordinates(lons: &[f64], lats: &[f64]) -> Result<Self, BoundsError> {
        let (min_lon, max_lon) = finite_extent(lons).ok_or(BoundsError::NoFiniteCoordinates("longitude"))?;
        let (min_lat, max_lat) = finite_extent(lats).ok_or(BoundsError::NoFiniteCoordinates("latitude"))?;
        Self::new(min_lon, min_lat, max_lon, max_lat)
    }

    fn validate(&self) -> Result<(), BoundsError> {
        if !(self.min_lon < self.max_lon) {
            return Err(BoundsError::Degenerate {
                axis: "longitude",
                min: self.min_lon,
                max: self.max_lon,
            });
        }
        if !(self.min_lat < self.max_lat) {
            return Err(BoundsError::Degenerate {
                axis: "latitude",
                min: self.min_lat,
                max: self.max_lat,
            });
        }
        Ok(())
    }

    /// Width in degrees of longitude.
    pub fn width(&self) -> f64 {
        self.max_lon - self.min_lon
    }

    /// Height in degrees of latitude.
    pub fn height(&self) -> f64 {
        self.max_lat - self.min_lat
    }

    /// Centre point as `(lon, lat)`.
    pub fn center(&self) -> (f64, f64) {
        (
            (self.min_lon + self.max_lon) / 2.0,
            (self.min_lat + self.max_lat) / 2.0,
        )
    }
}

fn finite_extent(values: &[f64]) -> Option<(f64, f64)> {
    values
        .iter()
        .copied()
        .filter(|v| v.is_finite())
        .fold(None, |acc, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum BoundsError {
    #[error("Degenerate {axis} extent: min {min} is not below max {max}")]
    Degenerate {
        axis: &'static str,
        min: f64,
        max: f64,
    },

    #[error("No finite {0} coordinates")]
    NoFiniteCoordinates(&'static str),
}

/// GDAL-ordered affine coefficients mapping pixel (col, row) to (lon, lat).
///
/// Row 0 is always the northern edge, so the row coefficient is negative.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoTransform(pub [f64; 6]);

impl GeoTransform {
    /// Equivalent of a "from bounds" transform for a north-up raster.
    pub fn from_bounds(bounds: &GeoBounds, width: usize, height: usize) -> Self {
        let pixel_width = bounds.width() / width as f64;
        let pixel_height = bounds.height() / height as f64;
        Self([
            bounds.min_lon,
            pixel_width,
            0.0,
            bounds.max_lat,
            0.0,
            -pixel_height,
        ])
    }

    /// Map a pixel corner to geographic coordinates.
    pub fn pixel_to_geo(&self, col: f64, row: f64) -> (f64, f64) {
        let gt = &self.0;
        (
            gt[0] + col * gt[1] + row * gt[2],
            gt[3] + col * gt[4] + row * gt[5],
        )
    }

    /// Recover the bounds covered by a raster of the given size.
    pub fn bounds(&self, width: usize, height: usize) -> GeoBounds {
        let (x0, y0) = self.pixel_to_geo(0.0, 0.0);
        let (x1, y1) = self.pixel_to_geo(width as f64, height as f64);
        GeoBounds {
            min_lon: x0.min(x1),
            min_lat: y0.min(y1),
            max_lon: x0.max(x1),
            max_lat: y0.max(y1),
        }
    }

    pub fn as_array(&self) -> &[f64; 6] {
        &self.0
    }
}
