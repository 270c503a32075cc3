//! Runs the GDAL steps that turn a colorized GeoTIFF into an XYZ pyramid.

use std::path::{Path, PathBuf};
use std::time::Instant;

use tempo_common::GeoBounds;
use tracing::{debug, info, warn};

use crate::error::{TileError, TileResult};
use crate::pyramid::{inspect_pyramid, PyramidSummary};
use crate::runner::{CommandOutput, ProcessRunner};
use crate::steps::{work_dir, TileConfig, TileStep, CLEAN_TIFF, RGBA_TIFF};

/// Result of a successful tile run.
#[derive(Debug, Clone)]
pub struct TileReport {
    pub tiles_dir: PathBuf,
    /// `gdalinfo -stats` lines worth keeping, empty if the step failed
    pub statistics: Vec<String>,
    pub pyramid: PyramidSummary,
}

/// Drives the tile steps through a [`ProcessRunner`].
pub struct TileGenerator<R: ProcessRunner> {
    runner: R,
    config: TileConfig,
}

impl<R: ProcessRunner> TileGenerator<R> {
    pub fn new(runner: R, config: TileConfig) -> Self {
        Self { runner, config }
    }

    pub fn config(&self) -> &TileConfig {
        &self.config
    }

    /// Generate tiles for `input`.
    ///
    /// `bounds` picks the sample tile checked after the pyramid is built.
    pub fn generate(&self, input: &Path, bounds: Option<&GeoBounds>) -> TileResult<TileReport> {
        if !input.is_file() {
            return Err(TileError::InvalidInput(format!(
                "GeoTIFF not found: {}",
                input.display()
            )));
        }

        let start = Instant::now();
        let tiles_dir = self.config.resolve_tiles_dir(input);
        info!(
            input = %input.display(),
            tiles_dir = %tiles_dir.display(),
            zoom = %self.config.zoom,
            "Generating tiles"
        );

        let statistics = match self.run_step(TileStep::Statistics, input) {
            Ok(output) => {
                let lines = statistics_lines(&output.stdout);
                for line in &lines {
                    info!(stat = %line, "Raster statistics");
                }
                lines
            }
            Err(e) => {
                warn!(error = %e, "Statistics step failed, continuing");
                Vec::new()
            }
        };

        self.run_step(TileStep::ByteScale, input)?;
        self.run_step(TileStep::ExpandRgba, input)?;

        std::fs::create_dir_all(&tiles_dir)?;
        self.run_step(TileStep::Pyramid, input)?;

        remove_intermediates(&work_dir(input));

        let pyramid = inspect_pyramid(&tiles_dir, &self.config.viewer_page(), bounds);
        info!(
            tiles = pyramid.total_tiles(),
            zoom_levels = pyramid.tiles_per_zoom.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Tile generation complete"
        );

        Ok(TileReport {
            tiles_dir,
            statistics,
            pyramid,
        })
    }

    fn run_step(&self, step: TileStep, input: &Path) -> TileResult<CommandOutput> {
        let command = step.command(&self.config, input);
        info!(step = step.name(), command = %command, "Running step");

        let started = Instant::now();
        let output = self
            .runner
            .run(&command.program, &command.args)
            .map_err(|source| TileError::Launch {
                step: step.name(),
                program: command.program.clone(),
                source,
            })?;

        if !output.is_success() {
            warn!(
                step = step.name(),
                status = ?output.status,
                stdout = %output.stdout.trim(),
                stderr = %output.stderr.trim(),
                "Step failed"
            );
            return Err(TileError::StepFailed {
                step: step.name(),
                status: output.status,
                stdout: output.stdout,
                stderr: output.stderr,
            });
        }

        debug!(
            step = step.name(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Step finished"
        );
        Ok(output)
    }
}

/// The `Minimum=`, `Maximum=` and `Mean=` lines of `gdalinfo -stats` output.
pub fn statistics_lines(stdout: &str) -> Vec<String> {
    stdout
        .lines()
        .map(str::trim)
        .filter(|line| {
            line.contains("Minimum=") || line.contains("Maximum=") || line.contains("Mean=")
        })
        .map(str::to_string)
        .collect()
}

fn remove_intermediates(dir: &Path) {
    for name in [CLEAN_TIFF, RGBA_TIFF] {
        let path = dir.join(name);
        if !path.exists() {
            continue;
        }
        match std::fs::remove_file(&path) {
            Ok(()) => debug!(path = %path.display(), "Removed intermediate"),
            Err(e) => warn!(path = %path.display(), error = %e, "Failed to remove intermediate"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_statistics_lines() {
        let stdout = "Driver: GTiff/GeoTIFF\nBand 1 Block=256x256 Type=Byte\n  Minimum=0.000, Maximum=255.000, Mean=93.412, StdDev=61.2\n  Metadata:\n    STATISTICS_MEAN=93.41\n";
        assert_eq!(
            statistics_lines(stdout),
            vec!["Minimum=0.000, Maximum=255.000, Mean=93.412, StdDev=61.2"]
        );
    }
}
