//! Stage sequencing: locate, download, extract, georeference, colorize, tile.
//!
//! Stages run strictly in order on the calling thread. The first failure
//! stops the run; the report keeps whatever was produced before it.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use georaster::{colorize_geotiff, write_float_geotiff, ColorizeOutcome};
use netcdf_parser::extract_file;
use renderer::ColorRamp;
use tempo_common::{GeoBounds, Granule};
use tiler::{ProcessRunner, TileGenerator, TileReport};
use tracing::{error, info};

use crate::cmr::{GranuleLocator, GranuleQuery};
use crate::config::PipelineConfig;
use crate::credentials::Credentials;
use crate::download::{AuthenticatedDownloader, DownloadOutcome, EarthdataSession};
use crate::retention::ProductFamily;

/// Pipeline stages in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Locate,
    Download,
    Extract,
    Georeference,
    Colorize,
    Tile,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Locate => "locate",
            Stage::Download => "download",
            Stage::Extract => "extract",
            Stage::Georeference => "georeference",
            Stage::Colorize => "colorize",
            Stage::Tile => "tile",
        };
        f.write_str(name)
    }
}

/// Artifacts produced so far.
#[derive(Debug, Default)]
pub struct PipelineReport {
    pub granule: Option<Granule>,
    pub download: Option<DownloadOutcome>,
    pub netcdf: Option<PathBuf>,
    pub variable: Option<String>,
    pub bounds: Option<GeoBounds>,
    pub float_geotiff: Option<PathBuf>,
    pub colorized: Option<ColorizeOutcome>,
    pub tiles: Option<TileReport>,
    /// Stage that stopped the run
    pub failed_stage: Option<Stage>,
}

impl PipelineReport {
    pub fn succeeded(&self) -> bool {
        self.failed_stage.is_none()
    }

    /// Log every artifact produced.
    pub fn log_summary(&self) {
        if let Some(granule) = &self.granule {
            info!(title = %granule.title, url = %granule.download_url, "Granule");
        }
        if let Some(download) = &self.download {
            match download {
                DownloadOutcome::Downloaded { path, bytes } => {
                    info!(path = %path.display(), bytes, "NetCDF file (downloaded)")
                }
                DownloadOutcome::AlreadyPresent(path) => {
                    info!(path = %path.display(), "NetCDF file (already present)")
                }
            }
        } else if let Some(path) = &self.netcdf {
            info!(path = %path.display(), "NetCDF file");
        }
        if let Some(path) = &self.float_geotiff {
            info!(path = %path.display(), variable = ?self.variable, "Float GeoTIFF");
        }
        match &self.colorized {
            Some(ColorizeOutcome::Colorized { path, range, .. }) => info!(
                path = %path.display(),
                min = range.min,
                max = range.max,
                "Colorized GeoTIFF"
            ),
            Some(ColorizeOutcome::PassedThrough(path)) => {
                info!(path = %path.display(), "Colorization skipped, tiles built from float GeoTIFF")
            }
            None => {}
        }
        if let Some(tiles) = &self.tiles {
            info!(
                path = %tiles.tiles_dir.display(),
                tiles = tiles.pyramid.total_tiles(),
                min_zoom = ?tiles.pyramid.lowest_zoom(),
                max_zoom = ?tiles.pyramid.highest_zoom(),
                viewer = ?tiles.pyramid.viewer_page,
                "Tile pyramid"
            );
        }

        match self.failed_stage {
            None => info!("Pipeline completed"),
            Some(stage) => error!(stage = %stage, "Pipeline stopped"),
        }
    }
}

/// Runs stages against one [`PipelineConfig`].
pub struct Pipeline<R: ProcessRunner> {
    config: PipelineConfig,
    runner: R,
    report: PipelineReport,
}

impl<R: ProcessRunner> Pipeline<R> {
    pub fn new(config: PipelineConfig, runner: R) -> Self {
        Self {
            config,
            runner,
            report: PipelineReport::default(),
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn report(&self) -> &PipelineReport {
        &self.report
    }

    pub fn into_report(self) -> PipelineReport {
        self.report
    }

    /// Find the latest granule. `None` is not an error here.
    pub async fn locate(&mut self) -> Result<Option<Granule>> {
        let source = &self.config.product.source;
        let query = GranuleQuery {
            collection_id: source.collection_id.clone(),
            sort_key: source.sort_key.clone(),
            file_extension: source.file_extension.clone(),
        };
        let locator = self.stage(
            Stage::Locate,
            GranuleLocator::new(&self.config.cmr_url, &self.config.download.user_agent),
        )?;
        let result = locator.latest(&query).await;
        let granule = self.stage(Stage::Locate, result)?;
        self.report.granule = granule.clone();
        Ok(granule)
    }

    /// All six stages.
    pub async fn run(&mut self, credentials: Credentials) -> Result<()> {
        let Some(granule) = self.locate().await? else {
            self.report.failed_stage = Some(Stage::Locate);
            anyhow::bail!(
                "No downloadable granule found for collection {}",
                self.config.product.source.collection_id
            );
        };

        let outcome = self.download(&granule, credentials).await?;
        self.convert(outcome.path()).map(|_| ())
    }

    async fn download(&mut self, granule: &Granule, credentials: Credentials) -> Result<DownloadOutcome> {
        let session = self.stage(
            Stage::Download,
            EarthdataSession::new(credentials, &self.config.download),
        )?;
        if let Some(profile_url) = &self.config.credentials.profile_url {
            session.check_login(profile_url, &self.config.download).await;
        }

        let source = &self.config.product.source;
        let downloader =
            AuthenticatedDownloader::new(session, &self.config.data_dir, self.config.download.clone())
                .with_retention(ProductFamily::new(&source.family_prefix, &source.file_extension));

        let result = downloader.download(&granule.download_url).await;
        let outcome = self.stage(Stage::Download, result)?;
        self.report.netcdf = Some(outcome.path().to_path_buf());
        self.report.download = Some(outcome.clone());
        Ok(outcome)
    }

    /// Stages 3 to 6 on a local NetCDF file.
    pub fn convert(&mut self, netcdf: &Path) -> Result<&TileReport> {
        let started = Instant::now();
        self.report.netcdf = Some(netcdf.to_path_buf());

        let result = extract_file(netcdf, self.config.engine, self.config.candidates());
        let grid = self.stage(Stage::Extract, result)?;
        info!(
            variable = %grid.variable,
            width = grid.width,
            height = grid.height,
            valid = grid.finite_count(),
            flipped = grid.flipped,
            transposed = grid.transposed,
            "Grid extracted"
        );
        self.report.variable = Some(grid.variable.to_string());
        self.report.bounds = Some(grid.bounds);

        let result = write_float_geotiff(&grid, &self.config.geotiff_dir, netcdf);
        let float_tif = self.stage(Stage::Georeference, result)?;
        self.report.float_geotiff = Some(float_tif.clone());

        let result = colorize_geotiff(
            &float_tif,
            &self.config.geotiff_dir,
            &self.config.stretch(),
            &ColorRamp::no2(),
        );
        let colorized = self.stage(Stage::Colorize, result)?;
        let tile_input = colorized.path().to_path_buf();
        self.report.colorized = Some(colorized);

        let generator = TileGenerator::new(&self.runner, self.config.tiles.clone());
        let result = generator.generate(&tile_input, self.report.bounds.as_ref());
        let tiles = self.stage(Stage::Tile, result)?;

        info!(elapsed_ms = started.elapsed().as_millis() as u64, "Conversion complete");
        Ok(self.report.tiles.insert(tiles))
    }

    /// Record `stage` as failed if `result` is an error.
    fn stage<T, E>(&mut self, stage: Stage, result: Result<T, E>) -> Result<T>
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        result
            .inspect_err(|_| self.report.failed_stage = Some(stage))
            .with_context(|| format!("{} stage failed", stage))
    }
}
