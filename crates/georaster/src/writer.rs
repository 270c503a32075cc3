//! Float32 GeoTIFF output for extracted grids.

use std::path::{Path, PathBuf};

use gdal::raster::Buffer;
use gdal::spatial_ref::SpatialRef;
use gdal::{Dataset, DriverManager, Metadata};
use netcdf_parser::ExtractedGrid;
use tempo_common::{GeoBounds, GeoTransform};
use tracing::{debug, info, warn};

use crate::error::{GeoRasterError, GeoRasterResult};

pub const WGS84_EPSG: u32 = 4326;

/// Suffix added to the NetCDF stem for the float GeoTIFF.
pub const FLOAT_SUFFIX: &str = "_NO2";

/// A single-band raster read back from disk.
#[derive(Debug, Clone)]
pub struct FloatRaster {
    pub width: usize,
    pub height: usize,
    pub transform: GeoTransform,
    pub epsg: Option<i32>,
    pub no_data: Option<f64>,
    /// Row-major samples, row 0 at the top
    pub values: Vec<f32>,
}

impl FloatRaster {
    pub fn bounds(&self) -> GeoBounds {
        self.transform.bounds(self.width, self.height)
    }
}

/// `<dir>/<stem>_NO2.tif` for a NetCDF source file.
pub fn float_geotiff_path(output_dir: &Path, source_file: &Path) -> GeoRasterResult<PathBuf> {
    let stem = file_stem(source_file)?;
    Ok(output_dir.join(format!("{}{}.tif", stem, FLOAT_SUFFIX)))
}

/// Write `grid` as a georeferenced Float32 GeoTIFF next to its siblings in
/// `output_dir`.
///
/// The raster uses EPSG:4326, NaN as no-data, and carries `DESCRIPTION`,
/// `SOURCE_FILE` and `VARIABLE_NAME` metadata items.
pub fn write_float_geotiff(
    grid: &ExtractedGrid,
    output_dir: &Path,
    source_file: &Path,
) -> GeoRasterResult<PathBuf> {
    if grid.width == 0 || grid.height == 0 {
        return Err(GeoRasterError::InvalidInput(format!(
            "cannot write an empty {}x{} grid",
            grid.width, grid.height
        )));
    }

    std::fs::create_dir_all(output_dir)?;
    let path = float_geotiff_path(output_dir, source_file)?;
    let stem = file_stem(source_file)?;
    let file_name = source_file
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| stem.clone());

    let transform = GeoTransform::from_bounds(&grid.bounds, grid.width, grid.height);
    info!(
        path = %path.display(),
        width = grid.width,
        height = grid.height,
        transform = ?transform.as_array(),
        "Writing float GeoTIFF"
    );

    let driver = DriverManager::get_driver_by_name("GTiff")?;
    let mut dataset =
        driver.create_with_band_type::<f32, _>(&path, grid.width, grid.height, 1)?;
    dataset.set_geo_transform(transform.as_array())?;
    dataset.set_spatial_ref(&SpatialRef::from_epsg(WGS84_EPSG)?)?;

    dataset.set_metadata_item("DESCRIPTION", &format!("TEMPO NO2 data from {}", stem), "")?;
    dataset.set_metadata_item("SOURCE_FILE", &file_name, "")?;
    dataset.set_metadata_item("VARIABLE_NAME", &grid.variable.to_string(), "")?;

    let samples: Vec<f32> = grid.values.iter().map(|&v| v as f32).collect();
    let mut buffer = Buffer::new((grid.width, grid.height), samples);

    let mut band = dataset.rasterband(1)?;
    band.set_no_data_value(Some(f64::NAN))?;
    band.write((0, 0), (grid.width, grid.height), &mut buffer)?;

    debug!(path = %path.display(), "Float GeoTIFF written");
    Ok(path)
}

/// Read the first band of a GeoTIFF as `f32` along with its georeferencing.
pub fn read_float_geotiff(path: &Path) -> GeoRasterResult<FloatRaster> {
    let dataset = Dataset::open(path)?;
    let (width, height) = dataset.raster_size();
    let transform = GeoTransform(dataset.geo_transform()?);
    let epsg = epsg_code(&dataset);
    if epsg.is_none() {
        warn!(path = %path.display(), "Raster has no EPSG code");
    }

    let band = dataset.rasterband(1)?;
    let no_data = band.no_data_value();
    let buffer = band.read_as::<f32>((0, 0), (width, height), (width, height), None)?;
    let values = buffer.data().to_vec();
    if values.len() != width * height {
        return Err(GeoRasterError::InvalidRaster {
            path: path.to_path_buf(),
            message: format!("read {} samples for {}x{}", values.len(), width, height),
        });
    }

    Ok(FloatRaster {
        width,
        height,
        transform,
        epsg,
        no_data,
        values,
    })
}

/// Metadata item from the default domain.
pub fn metadata_item(path: &Path, key: &str) -> GeoRasterResult<Option<String>> {
    let dataset = Dataset::open(path)?;
    Ok(dataset.metadata_item(key, ""))
}

pub(crate) fn epsg_code(dataset: &Dataset) -> Option<i32> {
    dataset.spatial_ref().ok()?.auth_code().ok()
}

pub(crate) fn file_stem(path: &Path) -> GeoRasterResult<String> {
    path.file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| GeoRasterError::InvalidInput(format!("{} has no file name", path.display())))
}
