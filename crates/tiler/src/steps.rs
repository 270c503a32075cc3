//! The named external-tool steps of tile generation and their arguments.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tempo_common::ZoomRange;

/// Intermediate written by the byte-scaling step.
pub const CLEAN_TIFF: &str = "clean_tempo.tif";
/// Intermediate written by the RGBA expansion step.
pub const RGBA_TIFF: &str = "rgba_tempo.tif";

/// Options passed through to the GDAL tools.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TileConfig {
    pub zoom: ZoomRange,
    pub resampling: String,
    pub processes: u32,
    pub profile: String,
    pub webviewer: String,
    /// Output directory; defaults to `tiles/` next to the GeoTIFF's directory
    pub tiles_dir: Option<PathBuf>,
    pub gdalinfo: String,
    pub gdal_translate: String,
    pub gdal2tiles: String,
}

impl Default for TileConfig {
    fn default() -> Self {
        Self {
            zoom: ZoomRange::default(),
            resampling: "average".to_string(),
            processes: 2,
            profile: "mercator".to_string(),
            webviewer: "leaflet".to_string(),
            tiles_dir: None,
            gdalinfo: "gdalinfo".to_string(),
            gdal_translate: "gdal_translate".to_string(),
            gdal2tiles: "gdal2tiles.py".to_string(),
        }
    }
}

impl TileConfig {
    /// Where tiles go for a GeoTIFF at `input`.
    pub fn resolve_tiles_dir(&self, input: &Path) -> PathBuf {
        if let Some(dir) = &self.tiles_dir {
            return dir.clone();
        }
        let base = work_dir(input);
        base.parent().unwrap_or(&base).join("tiles")
    }

    /// File name of the viewer page gdal2tiles writes.
    pub fn viewer_page(&self) -> String {
        format!("{}.html", self.webviewer)
    }
}

/// Directory that holds the intermediates: the GeoTIFF's own directory.
pub fn work_dir(input: &Path) -> PathBuf {
    match input.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// One external-tool invocation, in pipeline order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TileStep {
    /// `gdalinfo -stats`, diagnostic only
    Statistics,
    /// `gdal_translate -ot Byte -scale` to a clean compressed GeoTIFF
    ByteScale,
    /// `gdal_translate -expand rgba` so the tiler does not depend on palettes
    ExpandRgba,
    /// `gdal2tiles.py` into an XYZ pyramid
    Pyramid,
}

impl TileStep {
    pub const ALL: [TileStep; 4] = [
        TileStep::Statistics,
        TileStep::ByteScale,
        TileStep::ExpandRgba,
        TileStep::Pyramid,
    ];

    pub fn name(self) -> &'static str {
        match self {
            TileStep::Statistics => "statistics",
            TileStep::ByteScale => "byte-scale",
            TileStep::ExpandRgba => "expand-rgba",
            TileStep::Pyramid => "pyramid",
        }
    }

    /// Whether a failure stops tile generation.
    pub fn is_fatal(self) -> bool {
        !matches!(self, TileStep::Statistics)
    }

    /// The program and arguments for this step.
    pub fn command(self, config: &TileConfig, input: &Path) -> StepCommand {
        let work = work_dir(input);
        let input_arg = path_arg(input);

        let (program, args) = match self {
            TileStep::Statistics => (config.gdalinfo.clone(), vec!["-stats".to_string(), input_arg]),
            TileStep::ByteScale => (
                config.gdal_translate.clone(),
                vec![
                    "-of".to_string(),
                    "GTiff".to_string(),
                    "-ot".to_string(),
                    "Byte".to_string(),
                    "-scale".to_string(),
                    "-co".to_string(),
                    "COMPRESS=LZW".to_string(),
                    "-co".to_string(),
                    "TILED=YES".to_string(),
                    "-co".to_string(),
                    "BIGTIFF=NO".to_string(),
                    input_arg,
                    path_arg(&work.join(CLEAN_TIFF)),
                ],
            ),
            TileStep::ExpandRgba => (
                config.gdal_translate.clone(),
                vec![
                    "-of".to_string(),
                    "GTiff".to_string(),
                    "-expand".to_string(),
                    "rgba".to_string(),
                    "-co".to_string(),
                    "COMPRESS=LZW".to_string(),
                    "-co".to_string(),
                    "TILED=YES".to_string(),
                    input_arg,
                    path_arg(&work.join(RGBA_TIFF)),
                ],
            ),
            TileStep::Pyramid => (
                config.gdal2tiles.clone(),
                vec![
                    format!("--zoom={}", config.zoom),
                    format!("--webviewer={}", config.webviewer),
                    format!("--processes={}", config.processes),
                    format!("--resampling={}", config.resampling),
                    format!("--profile={}", config.profile),
                    "--xyz".to_string(),
                    path_arg(&work.join(RGBA_TIFF)),
                    path_arg(&config.resolve_tiles_dir(input)),
                ],
            ),
        };

        StepCommand {
            step: self,
            program,
            args,
        }
    }
}

impl fmt::Display for TileStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A fully built invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepCommand {
    pub step: TileStep,
    pub program: String,
    pub args: Vec<String>,
}

impl fmt::Display for StepCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.program, self.args.join(" "))
    }
}

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}
