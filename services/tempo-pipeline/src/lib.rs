//! TEMPO NO2 pipeline service.
//!
//! Finds the newest gridded NO2 granule in CMR, downloads it through the
//! Earthdata Login handshake, and hands it to the raster crates for GeoTIFF
//! and tile output.

pub mod cmr;
pub mod config;
pub mod credentials;
pub mod download;
pub mod pipeline;
pub mod retention;

pub use cmr::{GranuleLocator, GranuleQuery, LocatorError};
pub use config::{CredentialsConfig, DownloadConfig, PipelineConfig, ProductConfig};
pub use credentials::{CredentialSource, Credentials, CredentialsError};
pub use download::{AuthenticatedDownloader, DownloadError, DownloadOutcome, EarthdataSession};
pub use pipeline::{Pipeline, PipelineReport, Stage};
pub use retention::ProductFamily;
