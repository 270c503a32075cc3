//! Test data generators for creating synthetic NO2-like grids.
//!
//! These generators create predictable, verifiable test data patterns
//! that can be used across the test suite.

/// A grid together with the 1-D coordinate arrays that describe it.
///
/// `values` is row-major with one row per latitude entry, in the same order as
/// `lats`.
#[derive(Debug, Clone)]
pub struct SyntheticGrid {
    pub lats: Vec<f64>,
    pub lons: Vec<f64>,
    pub values: Vec<f64>,
}

impl SyntheticGrid {
    pub fn width(&self) -> usize {
        self.lons.len()
    }

    pub fn height(&self) -> usize {
        self.lats.len()
    }

    /// Row `r` of the grid as stored.
    pub fn row(&self, r: usize) -> &[f64] {
        let w = self.width();
        &self.values[r * w..(r + 1) * w]
    }
}

/// Evenly spaced values from `start` to `end` inclusive.
pub fn linspace(start: f64, end: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (end - start) / (n - 1) as f64;
            (0..n).map(|i| start + step * i as f64).collect()
        }
    }
}

/// Creates a grid of tropospheric NO2 column values in molecules/cm².
///
/// Values run from 1e14 (clean background) to about 4e15 (urban plume),
/// increasing towards the bottom-right, all inside the physical domain.
pub fn create_no2_grid(width: usize, height: usize) -> Vec<f64> {
    let mut data = Vec::with_capacity(width * height);
    for row in 0..height {
        for col in 0..width {
            let x_factor = col as f64 / width.max(1) as f64;
            let y_factor = row as f64 / height.max(1) as f64;
            data.push(1.0e14 + (x_factor + y_factor) * 2.0e15);
        }
    }
    data
}

/// Creates a grid with NaN at the given `(col, row)` positions, `value` elsewhere.
pub fn create_grid_with_nans(
    width: usize,
    height: usize,
    value: f64,
    nan_positions: &[(usize, usize)],
) -> Vec<f64> {
    let mut data = vec![value; width * height];
    for &(col, row) in nan_positions {
        if col < width && row < height {
            data[row * width + col] = f64::NAN;
        }
    }
    data
}

/// A grid stored the way TEMPO Level-3 files store it: latitude ascending,
/// so the first row is the southern edge.
pub fn ascending_grid(
    width: usize,
    height: usize,
    (min_lon, min_lat, max_lon, max_lat): (f64, f64, f64, f64),
    values: Vec<f64>,
) -> SyntheticGrid {
    assert_eq!(values.len(), width * height, "values must fill the grid");
    SyntheticGrid {
        lats: linspace(min_lat, max_lat, height),
        lons: linspace(min_lon, max_lon, width),
        values,
    }
}

/// The 4x4 latitude-ascending grid over lon [-100, -97], lat [30, 33].
///
/// Row `r` holds `(r * 4 + c + 1) * 1e14`, so every value is distinct
/// and within the physical NO2 domain.
pub fn ascending_4x4() -> SyntheticGrid {
    let values = (0..16).map(|i| (i as f64 + 1.0) * 1.0e14).collect();
    ascending_grid(4, 4, (-100.0, 30.0, -97.0, 33.0), values)
}
