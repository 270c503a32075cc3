//! XYZ tile addressing.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Deepest zoom level accepted anywhere in the pipeline.
pub const MAX_ZOOM: u32 = 24;

/// Web Mercator latitude limit in degrees.
const MAX_MERCATOR_LAT: f64 = 85.051_128_779_806_59;

/// A tile coordinate (z/x/y) in the XYZ scheme (row 0 at the north).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TileCoord {
    /// Zoom level
    pub z: u32,
    /// Column (x)
    pub x: u32,
    /// Row (y)
    pub y: u32,
}

impl TileCoord {
    pub fn new(z: u32, x: u32, y: u32) -> Self {
        Self { z, x, y }
    }

    /// Relative path of this tile inside an XYZ tile directory.
    pub fn relative_path(&self, extension: &str) -> PathBuf {
        PathBuf::from(self.z.to_string())
            .join(self.x.to_string())
            .join(format!("{}.{}", self.y, extension))
    }

    /// Parse a `{z}/{x}/{y}.png` path relative to the tile root.
    ///
    /// Coordinates outside the tile grid of their zoom level are rejected.
    pub fn from_relative_path(path: &Path) -> Option<Self> {
        let mut parts = path.iter().map(|p| p.to_str());
        let z = parts.next()??.parse().ok()?;
        let x = parts.next()??.parse().ok()?;
        let file = parts.next()??;
        if parts.next().is_some() {
            return None;
        }
        let y = file.strip_suffix(".png")?.parse().ok()?;
        let n = tiles_per_axis(z)?;
        if x >= n || y >= n {
            return None;
        }
        Some(Self { z, x, y })
    }
}

/// Tiles along one axis at `zoom`, `None` above [`MAX_ZOOM`].
fn tiles_per_axis(zoom: u32) -> Option<u32> {
    if zoom > MAX_ZOOM {
        return None;
    }
    2u32.checked_pow(zoom)
}

impl fmt::Display for TileCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.z, self.x, self.y)
    }
}

/// Convert lat/lon to Web Mercator tile coordinates.
///
/// Points past the Mercator limits land in the edge tiles. Returns `None`
/// for zoom levels above [`MAX_ZOOM`].
pub fn latlon_to_tile(lat: f64, lon: f64, zoom: u32) -> Option<TileCoord> {
    let n = tiles_per_axis(zoom)?;
    let scale = n as f64;
    let last = n - 1;

    let lon = lon.clamp(-180.0, 180.0);
    let lat_rad = lat.clamp(-MAX_MERCATOR_LAT, MAX_MERCATOR_LAT).to_radians();
    let x = ((lon + 180.0) / 360.0 * scale).floor() as u32;
    let y = ((1.0 - lat_rad.tan().asinh() / std::f64::consts::PI) / 2.0 * scale).floor() as u32;

    Some(TileCoord {
        z: zoom,
        x: x.min(last),
        y: y.min(last),
    })
}

/// Inclusive zoom range, written `min-max` on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawZoomRange")]
pub struct ZoomRange {
    pub min: u32,
    pub max: u32,
}

#[derive(Deserialize)]
struct RawZoomRange {
    min: u32,
    max: u32,
}

impl TryFrom<RawZoomRange> for ZoomRange {
    type Error = String;

    fn try_from(raw: RawZoomRange) -> Result<Self, Self::Error> {
        Self::new(raw.min, raw.max)
    }
}

impl ZoomRange {
    pub fn new(min: u32, max: u32) -> Result<Self, String> {
        if min > max {
            return Err(format!("zoom range {}-{} has min above max", min, max));
        }
        if max > MAX_ZOOM {
            return Err(format!("zoom {} is above the maximum of {}", max, MAX_ZOOM));
        }
        Ok(Self { min, max })
    }
}

impl Default for ZoomRange {
    fn default() -> Self {
        Self { min: 2, max: 8 }
    }
}

impl fmt::Display for ZoomRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.min, self.max)
    }
}

impl FromStr for ZoomRange {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (min, max) = s
            .split_once('-')
            .ok_or_else(|| format!("Expected 'min-max', got '{}'", s))?;
        let min = min.trim().parse().map_err(|_| format!("Invalid zoom: {}", min))?;
        let max = max.trim().parse().map_err(|_| format!("Invalid zoom: {}", max))?;
        Self::new(min, max)
    }
}
