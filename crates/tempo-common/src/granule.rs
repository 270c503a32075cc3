//! Granule references produced by catalog searches.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One discrete data file within a collection, as reported by the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Granule {
    /// Catalog identifier of the granule
    pub id: String,
    /// Direct (usually protected) download URL
    pub download_url: String,
    pub time_start: Option<DateTime<Utc>>,
    pub time_end: Option<DateTime<Utc>>,
    pub title: String,
}

impl Granule {
    /// File name the granule will be stored under: the last URL path segment.
    pub fn file_name(&self) -> Option<&str> {
        file_name_from_url(&self.download_url)
    }
}

/// Extract the last path segment of a URL, ignoring any query or fragment.
pub fn file_name_from_url(url: &str) -> Option<&str> {
    let without_query = url.split(['?', '#']).next().unwrap_or(url);
    let path = without_query
        .split_once("://")
        .map(|(_, rest)| rest)
        .unwrap_or(without_query);
    let (_, path) = path.split_once('/')?;
    path.rsplit('/').next().filter(|name| !name.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_name_from_url() {
        assert_eq!(
            file_name_from_url("https://data.asdc.earthdata.nasa.gov/tempo/TEMPO_NO2_L3_V03_20250101T120000Z_S003.nc"),
            Some("TEMPO_NO2_L3_V03_20250101T120000Z_S003.nc")
        );
        assert_eq!(
            file_name_from_url("https://host/path/file.nc?token=abc"),
            Some("file.nc")
        );
        assert_eq!(file_name_from_url("https://host/"), None);
        assert_eq!(file_name_from_url("https://host"), None);
    }
}
