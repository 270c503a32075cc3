//! Extraction of a north-up 2-D grid from a gridded NO2 product.
//!
//! The steps are:
//! 1. Resolve the latitude/longitude coordinate variables.
//! 2. Pick the first candidate data variable present in the file.
//! 3. Reduce extra dimensions (time first) to a 2-D slice and mask
//!    non-finite samples as NaN.
//! 4. Put latitude on the rows, transposing when longitude comes first.
//! 5. Flip the rows when latitude increases down the array.
//! 6. Compute bounds from the coordinate extrema.

use std::path::Path;

use tempo_common::GeoBounds;
use tracing::{debug, info};

use crate::array::NamedArray;
use crate::candidates::{
    is_longitude_like, is_spatial, VariableCandidate, COORDINATE_NAMES, TIME_DIMENSION,
};
use crate::error::{NetCdfError, NetCdfResult};
use crate::source::{Engine, GridSource};

/// A 2-D grid ready for georeferencing. Row 0 is the northernmost row.
#[derive(Debug, Clone)]
pub struct ExtractedGrid {
    /// Row-major samples, NaN where there is no valid measurement
    pub values: Vec<f64>,
    pub width: usize,
    pub height: usize,
    pub bounds: GeoBounds,
    /// The candidate that matched
    pub variable: VariableCandidate,
    /// Rows were reversed because latitude was ascending
    pub flipped: bool,
    /// Axes were swapped because longitude came first
    pub transposed: bool,
}

impl ExtractedGrid {
    pub fn row(&self, row: usize) -> Option<&[f64]> {
        if row < self.height {
            Some(&self.values[row * self.width..(row + 1) * self.width])
        } else {
            None
        }
    }

    pub fn finite_count(&self) -> usize {
        self.values.iter().filter(|v| v.is_finite()).count()
    }
}

/// Open `path` with `engine` and extract the first matching candidate.
pub fn extract_file(
    path: &Path,
    engine: Engine,
    candidates: &[VariableCandidate],
) -> NetCdfResult<ExtractedGrid> {
    info!(path = %path.display(), engine = %engine, "Opening NetCDF file");
    let source = engine.open(path)?;
    extract_grid(source.as_ref(), candidates)
}

/// Extract a north-up grid from any [`GridSource`].
pub fn extract_grid(
    source: &dyn GridSource,
    candidates: &[VariableCandidate],
) -> NetCdfResult<ExtractedGrid> {
    let (lats, lons) = read_coordinates(source)?;
    let (variable, data) = read_first_candidate(source, candidates)?;

    let mut data = reduce_to_2d(data)?;
    let masked = data.mask_non_finite();
    if masked > 0 {
        debug!(variable = %variable, masked, "Masked infinite samples as NaN");
    }
    let (rows, cols) = data
        .shape2()
        .ok_or_else(|| NetCdfError::InvalidFormat("expected a 2-D slice".to_string()))?;
    debug!(variable = %variable, dims = ?data.dims, rows, cols, "Reduced to 2-D");

    // Coordinates as they line up with the data axes before any reordering
    let (mut row_coord, mut col_coord) = (lats, lons);
    let transposed = is_longitude_like(&data.dims[0]);
    if transposed {
        data = data.transpose()?;
        row_coord = orient_coordinate(row_coord, (rows, cols))?;
        col_coord = orient_coordinate(col_coord, (rows, cols))?;
        info!(variable = %variable, "Longitude is the leading axis, transposed to (lat, lon)");
    }

    let (height, width) = data
        .shape2()
        .ok_or_else(|| NetCdfError::InvalidFormat("expected a 2-D slice".to_string()))?;
    check_coordinate_shape(&row_coord, "latitude", height, (height, width))?;
    check_coordinate_shape(&col_coord, "longitude", width, (height, width))?;

    let flipped = is_ascending(&row_coord);
    if flipped {
        data.flip_rows()?;
        debug!("Latitude ascending, flipped rows to north-up");
    }

    let bounds = GeoBounds::from_coordinates(&col_coord.values, &row_coord.values)?;

    info!(
        variable = %variable,
        width,
        height,
        min_lon = bounds.min_lon,
        min_lat = bounds.min_lat,
        max_lon = bounds.max_lon,
        max_lat = bounds.max_lat,
        flipped,
        transposed,
        "Extracted grid"
    );

    Ok(ExtractedGrid {
        values: data.values,
        width,
        height,
        bounds,
        variable,
        flipped,
        transposed,
    })
}

/// True when latitude strictly increases from one row to the next.
///
/// For 2-D latitude arrays every column must increase down the rows.
pub fn is_ascending(lat: &NamedArray) -> bool {
    match lat.shape.as_slice() {
        [n] => (1..*n).all(|i| lat.values[i] > lat.values[i - 1]),
        [rows, cols] => (1..*rows).all(|r| {
            (0..*cols).all(|c| lat.values[r * cols + c] > lat.values[(r - 1) * cols + c])
        }),
        _ => false,
    }
}

fn read_coordinates(source: &dyn GridSource) -> NetCdfResult<(NamedArray, NamedArray)> {
    for (lat_name, lon_name) in COORDINATE_NAMES {
        if source.has_variable(None, lat_name)? && source.has_variable(None, lon_name)? {
            let lats = source.read_variable(None, lat_name)?;
            let lons = source.read_variable(None, lon_name)?;
            debug!(lat = lat_name, lon = lon_name, "Resolved coordinate variables");
            return Ok((lats, lons));
        }
    }

    let looked_for: Vec<String> = COORDINATE_NAMES
        .iter()
        .map(|(lat, lon)| format!("{}/{}", lat, lon))
        .collect();
    Err(NetCdfError::MissingData(format!(
        "no coordinate variables found, looked for {}",
        looked_for.join(", ")
    )))
}

fn read_first_candidate(
    source: &dyn GridSource,
    candidates: &[VariableCandidate],
) -> NetCdfResult<(VariableCandidate, NamedArray)> {
    for candidate in candidates {
        if source.has_variable(candidate.group.as_deref(), &candidate.name)? {
            let data = source.read_variable(candidate.group.as_deref(), &candidate.name)?;
            info!(variable = %candidate, dims = ?data.dims, shape = ?data.shape, "Found NO2 variable");
            return Ok((candidate.clone(), data));
        }
    }

    let looked_for: Vec<String> = candidates.iter().map(|c| c.to_string()).collect();
    Err(NetCdfError::MissingData(format!(
        "no NO2 variable found, looked for {}",
        looked_for.join(", ")
    )))
}

fn reduce_to_2d(mut data: NamedArray) -> NetCdfResult<NamedArray> {
    if let Some(axis) = data.axis_of(TIME_DIMENSION) {
        data = data.select_first(axis)?;
    }

    while data.ndim() > 2 {
        let axis = data.dims.iter().position(|d| !is_spatial(d)).ok_or_else(|| {
            NetCdfError::InvalidFormat(format!(
                "cannot reduce {:?} to two dimensions, all are spatial",
                data.dims
            ))
        })?;
        data = data.select_first(axis)?;
    }

    if data.ndim() < 2 {
        return Err(NetCdfError::InvalidFormat(format!(
            "variable has {} dimension(s) {:?}, need two",
            data.ndim(),
            data.dims
        )));
    }
    Ok(data)
}

/// 2-D coordinate arrays follow the data through a transpose. 1-D arrays
/// carry no axis order and pass through unchanged.
fn orient_coordinate(coord: NamedArray, data_shape: (usize, usize)) -> NetCdfResult<NamedArray> {
    match coord.shape2() {
        Some(shape) if shape == data_shape => coord.transpose(),
        _ => Ok(coord),
    }
}

fn check_coordinate_shape(
    coord: &NamedArray,
    name: &str,
    axis_len: usize,
    grid: (usize, usize),
) -> NetCdfResult<()> {
    let ok = match coord.shape.as_slice() {
        [n] => *n == axis_len,
        [r, c] => (*r, *c) == grid,
        _ => false,
    };
    if ok {
        Ok(())
    } else {
        Err(NetCdfError::InvalidFormat(format!(
            "{} coordinate shape {:?} does not match grid {}x{}",
            name, coord.shape, grid.0, grid.1
        )))
    }
}
