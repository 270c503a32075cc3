//! TEMPO NO2 pipeline.
//!
//! Fetches the latest TEMPO gridded NO2 granule and produces:
//! - a Float32 GeoTIFF of the tropospheric column
//! - a colorized byte GeoTIFF with an RGBA color table
//! - an XYZ tile pyramid with a Leaflet viewer page

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use netcdf_parser::{silence_hdf5_errors, Engine};
use tempo_common::ZoomRange;
use tiler::SystemRunner;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

use tempo_pipeline::config::{
    CredentialsConfig, PipelineConfig, ProductConfig, DEFAULT_CMR_URL, DEFAULT_LOGIN_HOST,
};
use tempo_pipeline::{credentials, Pipeline};

/// `.env` locations, first one found wins.
const ENV_FILES: [&str; 3] = [".env", "../.env", "../.env.local"];

#[derive(Parser, Debug)]
#[command(name = "tempo-pipeline")]
#[command(about = "Download the latest TEMPO NO2 granule and build GeoTIFFs and web tiles")]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    /// CMR granule search endpoint
    #[arg(long, env = "TEMPO_CMR_URL", default_value = DEFAULT_CMR_URL)]
    cmr_url: String,

    /// Product YAML (collection, candidate variables, color stretch)
    #[arg(long, env = "TEMPO_PRODUCT_CONFIG")]
    product_config: Option<PathBuf>,

    /// Override the product's CMR collection id
    #[arg(long, env = "TEMPO_COLLECTION_ID")]
    collection_id: Option<String>,

    /// Directory for downloaded NetCDF files
    #[arg(long, env = "TEMPO_DATA_DIR", default_value = "../public/tempo/no2")]
    data_dir: PathBuf,

    /// Directory for GeoTIFF output
    #[arg(long, env = "TEMPO_GEOTIFF_DIR", default_value = "../public/tempo/geotiff")]
    geotiff_dir: PathBuf,

    /// Tile output directory (default: `tiles` next to the GeoTIFF directory)
    #[arg(long, env = "TEMPO_TILES_DIR")]
    tiles_dir: Option<PathBuf>,

    /// NetCDF reader: native or ncdump
    #[arg(long, env = "TEMPO_NETCDF_ENGINE", default_value = "native")]
    engine: Engine,

    /// Zoom levels to render, `min-max`
    #[arg(long, default_value = "2-8")]
    zoom: ZoomRange,

    /// gdal2tiles worker processes
    #[arg(long, default_value = "2")]
    processes: u32,

    /// gdal2tiles resampling method
    #[arg(long, default_value = "average")]
    resampling: String,

    /// Lower percentile of the fallback color stretch
    #[arg(long)]
    low_percentile: Option<f64>,

    /// Upper percentile of the fallback color stretch
    #[arg(long)]
    high_percentile: Option<f64>,

    /// Earthdata Login host
    #[arg(long, env = "EARTHDATA_LOGIN_HOST", default_value = DEFAULT_LOGIN_HOST)]
    login_host: String,

    /// netrc file to read credentials from (default: ~/.netrc)
    #[arg(long, env = "NETRC")]
    netrc: Option<PathBuf>,

    /// Fail instead of prompting when no credentials are configured
    #[arg(long)]
    no_prompt: bool,

    /// Skip the Earthdata profile request made before downloading
    #[arg(long)]
    skip_login_check: bool,

    /// Log level
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Log output format
    #[arg(long, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,
}

#[derive(Subcommand, Debug, Clone)]
enum Command {
    /// Locate, download and convert the latest granule (default)
    Run,
    /// Print the latest granule without downloading it
    Locate,
    /// Convert a local NetCDF file to GeoTIFFs and tiles
    Convert {
        /// NetCDF granule
        file: PathBuf,
    },
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
enum LogFormat {
    Text,
    Json,
}

fn main() -> ExitCode {
    load_env_file();

    let args = Args::parse();
    init_tracing(&args.log_level, args.log_format);
    silence_hdf5_errors();

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!(error = %e, "Failed to create Tokio runtime");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(args)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = format!("{:#}", e), "Pipeline failed");
            ExitCode::FAILURE
        }
    }
}

fn load_env_file() {
    for candidate in ENV_FILES {
        let path = Path::new(candidate);
        if path.is_file() {
            // Logging is not set up yet
            match dotenvy::from_path(path) {
                Ok(()) => eprintln!("Loaded environment from {}", path.display()),
                Err(e) => eprintln!("Failed to load {}: {}", path.display(), e),
            }
            return;
        }
    }
}

fn init_tracing(level: &str, format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    match format {
        LogFormat::Json => fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_level(true)
            .json()
            .init(),
        LogFormat::Text => fmt().with_env_filter(filter).with_target(false).init(),
    }
}

fn build_config(args: &Args) -> Result<PipelineConfig> {
    let mut product = match &args.product_config {
        Some(path) => ProductConfig::load(path)?,
        None => ProductConfig::tempo_no2(),
    };
    if let Some(collection_id) = &args.collection_id {
        product.source.collection_id = collection_id.clone();
    }
    if let Some(low) = args.low_percentile {
        product.stretch.low_percentile = low;
    }
    if let Some(high) = args.high_percentile {
        product.stretch.high_percentile = high;
    }
    product.validate()?;

    let mut config = PipelineConfig {
        cmr_url: args.cmr_url.clone(),
        product,
        data_dir: args.data_dir.clone(),
        geotiff_dir: args.geotiff_dir.clone(),
        engine: args.engine,
        credentials: CredentialsConfig {
            login_host: args.login_host.clone(),
            netrc_path: args.netrc.clone(),
            allow_prompt: !args.no_prompt,
            profile_url: (!args.skip_login_check)
                .then(|| format!("https://{}/profile", args.login_host)),
        },
        ..PipelineConfig::default()
    };
    config.tiles.zoom = args.zoom;
    config.tiles.processes = args.processes;
    config.tiles.resampling = args.resampling.clone();
    config.tiles.tiles_dir = args.tiles_dir.clone();

    Ok(config)
}

async fn run(args: Args) -> Result<()> {
    let config = build_config(&args)?;
    let command = args.command.clone().unwrap_or(Command::Run);

    info!(
        product = %config.product.product.id,
        collection = %config.product.source.collection_id,
        engine = %config.engine,
        data_dir = %config.data_dir.display(),
        geotiff_dir = %config.geotiff_dir.display(),
        "Starting TEMPO NO2 pipeline"
    );

    match command {
        Command::Locate => {
            let mut pipeline = Pipeline::new(config, SystemRunner);
            match pipeline.locate().await? {
                Some(granule) => {
                    println!("{}", serde_json::to_string_pretty(&granule)?);
                    Ok(())
                }
                None => anyhow::bail!("No downloadable granule found"),
            }
        }
        Command::Convert { file } => {
            let mut pipeline = Pipeline::new(config, SystemRunner);
            let result = pipeline.convert(&file).map(|_| ());
            pipeline.report().log_summary();
            result
        }
        Command::Run => {
            let (credentials, _source) = credentials::resolve(&config.credentials)
                .context("Failed to obtain Earthdata credentials")?;
            let mut pipeline = Pipeline::new(config, SystemRunner);
            let result = pipeline.run(credentials).await;
            pipeline.report().log_summary();
            result
        }
    }
}
