//! Byte GeoTIFF with an attached RGBA color table.

use std::path::{Path, PathBuf};

use gdal::raster::{Buffer, ColorEntry, ColorTable, PaletteInterpretation, RgbaEntry};
use gdal::{Dataset, DriverManager};
use renderer::{
    choose_range, scale_to_bytes, Color, ColorRamp, SampleStats, StretchConfig, StretchRange,
    NODATA_INDEX,
};
use tempo_common::GeoTransform;
use tracing::{info, warn};

use crate::error::GeoRasterResult;
use crate::writer::{epsg_code, file_stem, read_float_geotiff};

/// Suffix added to the float GeoTIFF stem for the colorized output.
pub const COLORED_SUFFIX: &str = "_colored";

/// What the colorizer produced.
#[derive(Debug, Clone)]
pub enum ColorizeOutcome {
    Colorized {
        path: PathBuf,
        range: StretchRange,
        stats: SampleStats,
    },
    /// No finite samples; the input is handed on unchanged
    PassedThrough(PathBuf),
}

impl ColorizeOutcome {
    /// The raster the next stage should consume.
    pub fn path(&self) -> &Path {
        match self {
            ColorizeOutcome::Colorized { path, .. } => path,
            ColorizeOutcome::PassedThrough(path) => path,
        }
    }
}

/// A palette-indexed raster read back from disk.
#[derive(Debug, Clone)]
pub struct IndexedRaster {
    pub width: usize,
    pub height: usize,
    pub transform: GeoTransform,
    pub epsg: Option<i32>,
    pub no_data: Option<f64>,
    pub indices: Vec<u8>,
    /// Color table entries, if one is attached
    pub palette: Option<Vec<Color>>,
}

/// `<dir>/<stem>_colored.tif` for a float GeoTIFF.
pub fn colored_geotiff_path(output_dir: &Path, float_tif: &Path) -> GeoRasterResult<PathBuf> {
    let stem = file_stem(float_tif)?;
    Ok(output_dir.join(format!("{}{}.tif", stem, COLORED_SUFFIX)))
}

/// Scale a float GeoTIFF to byte indices and attach `ramp` as its color table.
///
/// Non-finite samples become index 0, which the ramp keeps transparent. The
/// output has the same size, transform and CRS as the input and no-data 0.
pub fn colorize_geotiff(
    input: &Path,
    output_dir: &Path,
    config: &StretchConfig,
    ramp: &ColorRamp,
) -> GeoRasterResult<ColorizeOutcome> {
    let raster = read_float_geotiff(input)?;
    let values: Vec<f64> = raster.values.iter().map(|&v| v as f64).collect();

    let (range, stats) = match (
        choose_range(&values, config),
        SampleStats::from_values(&values),
    ) {
        (Some(range), Some(stats)) => (range, stats),
        _ => {
            warn!(path = %input.display(), "No finite samples, skipping colorization");
            return Ok(ColorizeOutcome::PassedThrough(input.to_path_buf()));
        }
    };

    info!(
        source = ?range.source,
        min = range.min,
        max = range.max,
        data_min = stats.min,
        data_max = stats.max,
        mean = stats.mean,
        std_dev = stats.std_dev,
        valid = stats.count,
        "Color stretch"
    );

    let indices = scale_to_bytes(&values, &range);

    std::fs::create_dir_all(output_dir)?;
    let path = colored_geotiff_path(output_dir, input)?;

    let source = Dataset::open(input)?;
    let driver = DriverManager::get_driver_by_name("GTiff")?;
    let mut dataset =
        driver.create_with_band_type::<u8, _>(&path, raster.width, raster.height, 1)?;
    dataset.set_geo_transform(raster.transform.as_array())?;
    if let Ok(srs) = source.spatial_ref() {
        dataset.set_spatial_ref(&srs)?;
    }

    let mut band = dataset.rasterband(1)?;
    band.set_no_data_value(Some(NODATA_INDEX as f64))?;
    let mut table = ColorTable::new(PaletteInterpretation::Rgba);
    fill_color_table(&mut table, ramp);
    band.set_color_table(&table);
    let mut buffer = Buffer::new((raster.width, raster.height), indices);
    band.write((0, 0), (raster.width, raster.height), &mut buffer)?;

    info!(path = %path.display(), "Colorized GeoTIFF written");
    Ok(ColorizeOutcome::Colorized { path, range, stats })
}

/// Read a byte raster and its color table.
pub fn read_indexed_geotiff(path: &Path) -> GeoRasterResult<IndexedRaster> {
    let dataset = Dataset::open(path)?;
    let (width, height) = dataset.raster_size();
    let transform = GeoTransform(dataset.geo_transform()?);
    let epsg = epsg_code(&dataset);

    let band = dataset.rasterband(1)?;
    let no_data = band.no_data_value();
    let indices = band
        .read_as::<u8>((0, 0), (width, height), (width, height), None)?
        .data()
        .to_vec();

    let palette = band.color_table().map(|table| {
        (0..table.entry_count())
            .map(|i| match table.entry_as_rgb(i) {
                Some(e) => Color::new(e.r as u8, e.g as u8, e.b as u8, e.a as u8),
                None => Color::transparent(),
            })
            .collect()
    });

    Ok(IndexedRaster {
        width,
        height,
        transform,
        epsg,
        no_data,
        indices,
        palette,
    })
}

fn fill_color_table(table: &mut ColorTable, ramp: &ColorRamp) {
    for (i, color) in ramp.entries().iter().enumerate() {
        let entry = ColorEntry::Rgba(RgbaEntry {
            r: color.r as i16,
            g: color.g as i16,
            b: color.b as i16,
            a: color.a as i16,
        });
        table.set_color_entry(i as u16, &entry);
    }
}
