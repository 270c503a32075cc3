//! Pipeline configuration.
//!
//! Product-specific settings (collection, candidate variables, color
//! stretch) come from a YAML file such as `config/products/tempo_no2.yaml`,
//! falling back to the built-in TEMPO NO2 product. Everything else comes from
//! the command line or environment and is gathered into [`PipelineConfig`]
//! once at startup.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use netcdf_parser::{default_no2_candidates, Engine, VariableCandidate};
use renderer::{FixedRange, StretchConfig};
use serde::Deserialize;
use tiler::TileConfig;
use tracing::debug;

pub const DEFAULT_CMR_URL: &str = "https://cmr.earthdata.nasa.gov/search/granules.json";
pub const DEFAULT_COLLECTION_ID: &str = "C3685668637-LARC_CLOUD";
pub const DEFAULT_LOGIN_HOST: &str = "urs.earthdata.nasa.gov";
pub const USER_AGENT: &str = concat!("tempo-pipeline/", env!("CARGO_PKG_VERSION"));

/// Root of a product YAML file.
#[derive(Debug, Clone, Deserialize)]
pub struct ProductConfig {
    pub product: ProductInfo,
    pub source: SourceConfig,
    #[serde(default = "default_no2_candidates")]
    pub variables: Vec<VariableCandidate>,
    #[serde(default)]
    pub stretch: StretchSettings,
}

/// Product identification.
#[derive(Debug, Clone, Deserialize)]
pub struct ProductInfo {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
}

/// Where granules come from and what they are called on disk.
#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    pub collection_id: String,
    #[serde(default = "default_sort_key")]
    pub sort_key: String,
    #[serde(default = "default_extension")]
    pub file_extension: String,
    /// Files starting with this and ending in `file_extension` belong to the product
    pub family_prefix: String,
}

fn default_sort_key() -> String {
    "-start_date".to_string()
}

fn default_extension() -> String {
    ".nc".to_string()
}

/// Color stretch section of a product file.
#[derive(Debug, Clone, Deserialize)]
pub struct StretchSettings {
    #[serde(default = "default_low_percentile")]
    pub low_percentile: f64,
    #[serde(default = "default_high_percentile")]
    pub high_percentile: f64,
    #[serde(default = "default_fixed_range")]
    pub fixed_range: Option<FixedRange>,
}

fn default_low_percentile() -> f64 {
    1.0
}

fn default_high_percentile() -> f64 {
    99.0
}

fn default_fixed_range() -> Option<FixedRange> {
    Some(FixedRange::NO2)
}

impl Default for StretchSettings {
    fn default() -> Self {
        Self {
            low_percentile: default_low_percentile(),
            high_percentile: default_high_percentile(),
            fixed_range: default_fixed_range(),
        }
    }
}

impl StretchSettings {
    pub fn to_stretch_config(&self) -> StretchConfig {
        StretchConfig {
            low_percentile: self.low_percentile,
            high_percentile: self.high_percentile,
            fixed: self.fixed_range,
        }
    }
}

impl ProductConfig {
    /// The built-in TEMPO L3 NO2 product.
    pub fn tempo_no2() -> Self {
        Self {
            product: ProductInfo {
                id: "tempo_no2".to_string(),
                name: "TEMPO NO2 tropospheric column (L3)".to_string(),
                description: String::new(),
            },
            source: SourceConfig {
                collection_id: DEFAULT_COLLECTION_ID.to_string(),
                sort_key: default_sort_key(),
                file_extension: default_extension(),
                family_prefix: "TEMPO_NO2_".to_string(),
            },
            variables: default_no2_candidates(),
            stretch: StretchSettings::default(),
        }
    }

    /// Load a product configuration from a YAML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read product config: {}", path.display()))?;

        let config: ProductConfig = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse product config: {}", path.display()))?;
        config.validate()?;

        debug!(product = %config.product.id, path = %path.display(), "Loaded product config");
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.variables.is_empty() {
            anyhow::bail!("Product {} lists no candidate variables", self.product.id);
        }
        if self.source.family_prefix.is_empty() {
            anyhow::bail!("Product {} has an empty family_prefix", self.product.id);
        }
        self.stretch
            .to_stretch_config()
            .validate()
            .map_err(|e| anyhow::anyhow!("Product {}: {}", self.product.id, e))
    }
}

/// Timeouts and buffering for the authenticated downloader.
#[derive(Debug, Clone)]
pub struct DownloadConfig {
    /// Timeout for the redirect handshake requests
    pub handshake_timeout: Duration,
    /// Timeout for the streaming request
    pub transfer_timeout: Duration,
    /// Write buffer size
    pub chunk_size: usize,
    /// Bytes between progress log lines
    pub progress_interval: u64,
    pub max_redirects: usize,
    pub user_agent: String,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            handshake_timeout: Duration::from_secs(30),
            transfer_timeout: Duration::from_secs(300),
            chunk_size: 8192,
            progress_interval: 1024 * 1024,
            max_redirects: 10,
            user_agent: USER_AGENT.to_string(),
        }
    }
}

/// How credentials may be obtained.
#[derive(Debug, Clone)]
pub struct CredentialsConfig {
    /// Host whose netrc entry is used
    pub login_host: String,
    /// Defaults to `~/.netrc`
    pub netrc_path: Option<PathBuf>,
    /// Ask on the terminal when nothing else supplies credentials
    pub allow_prompt: bool,
    /// URL fetched once to report whether the credentials are accepted
    pub profile_url: Option<String>,
}

impl Default for CredentialsConfig {
    fn default() -> Self {
        Self {
            login_host: DEFAULT_LOGIN_HOST.to_string(),
            netrc_path: None,
            allow_prompt: true,
            profile_url: Some(format!("https://{}/profile", DEFAULT_LOGIN_HOST)),
        }
    }
}

/// Everything a pipeline run needs.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub cmr_url: String,
    pub product: ProductConfig,
    /// Downloaded NetCDF files
    pub data_dir: PathBuf,
    /// Float and colorized GeoTIFFs
    pub geotiff_dir: PathBuf,
    pub engine: Engine,
    pub download: DownloadConfig,
    pub credentials: CredentialsConfig,
    pub tiles: TileConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            cmr_url: DEFAULT_CMR_URL.to_string(),
            product: ProductConfig::tempo_no2(),
            data_dir: PathBuf::from("../public/tempo/no2"),
            geotiff_dir: PathBuf::from("../public/tempo/geotiff"),
            engine: Engine::default(),
            download: DownloadConfig::default(),
            credentials: CredentialsConfig::default(),
            tiles: TileConfig::default(),
        }
    }
}

impl PipelineConfig {
    pub fn stretch(&self) -> StretchConfig {
        self.product.stretch.to_stretch_config()
    }

    pub fn candidates(&self) -> &[VariableCandidate] {
        &self.product.variables
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_product_config() {
        let yaml = r#"
product:
  id: tempo_no2
  name: "TEMPO NO2"

source:
  collection_id: C3685668637-LARC_CLOUD
  family_prefix: TEMPO_NO2_

variables:
  - group: product
    name: vertical_column_troposphere
  - name: vertical_column_total

stretch:
  low_percentile: 2
  high_percentile: 98
  fixed_range: null
"#;

        let config: ProductConfig = serde_yaml::from_str(yaml).unwrap();
        config.validate().unwrap();
        assert_eq!(config.source.sort_key, "-start_date");
        assert_eq!(config.source.file_extension, ".nc");
        assert_eq!(
            config.variables,
            vec![
                VariableCandidate::in_group("product", "vertical_column_troposphere"),
                VariableCandidate::root("vertical_column_total"),
            ]
        );
        let stretch = config.stretch.to_stretch_config();
        assert_eq!((stretch.low_percentile, stretch.high_percentile), (2.0, 98.0));
        assert!(stretch.fixed.is_none());
    }

    #[test]
    fn test_defaults_when_sections_missing() {
        let yaml = r#"
product: { id: x, name: X }
source: { collection_id: C1-LARC, family_prefix: X_ }
"#;
        let config: ProductConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.variables, default_no2_candidates());
        assert_eq!(config.stretch.to_stretch_config(), StretchConfig::default());
    }

    #[test]
    fn test_bundled_product_file_matches_builtin() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../config/products/tempo_no2.yaml");
        let loaded = ProductConfig::load(&path).unwrap();
        let builtin = ProductConfig::tempo_no2();
        assert_eq!(loaded.source.collection_id, builtin.source.collection_id);
        assert_eq!(loaded.source.family_prefix, builtin.source.family_prefix);
        assert_eq!(loaded.variables, builtin.variables);
        assert_eq!(loaded.stretch.to_stretch_config(), builtin.stretch.to_stretch_config());
    }

    #[test]
    fn test_rejects_inverted_percentiles() {
        let mut config = ProductConfig::tempo_no2();
        config.stretch.low_percentile = 99.0;
        config.stretch.high_percentile = 1.0;
        assert!(config.validate().is_err());
    }
}
