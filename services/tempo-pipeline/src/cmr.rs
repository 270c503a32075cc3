//! Granule lookup against the CMR granule search API.

use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use tempo_common::Granule;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

/// Suffix of the `rel` attribute on direct-download links.
pub const DATA_REL_SUFFIX: &str = "/data#";

#[derive(Error, Debug)]
pub enum LocatorError {
    #[error("CMR request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("CMR returned HTTP {status} for {url}")]
    Status {
        status: reqwest::StatusCode,
        url: String,
    },
}

/// Search parameters for the latest granule.
#[derive(Debug, Clone)]
pub struct GranuleQuery {
    pub collection_id: String,
    pub sort_key: String,
    /// Required suffix of the download link, e.g. `.nc`
    pub file_extension: String,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    feed: Feed,
}

#[derive(Debug, Deserialize)]
struct Feed {
    #[serde(default)]
    entry: Vec<GranuleEntry>,
}

#[derive(Debug, Deserialize)]
struct GranuleEntry {
    #[serde(default)]
    id: String,
    #[serde(default)]
    title: String,
    time_start: Option<String>,
    time_end: Option<String>,
    #[serde(default)]
    links: Vec<Link>,
}

#[derive(Debug, Deserialize)]
struct Link {
    #[serde(default)]
    rel: String,
    #[serde(default)]
    href: String,
}

/// Finds the most recent granule of a collection.
pub struct GranuleLocator {
    client: Client,
    search_url: String,
}

impl GranuleLocator {
    pub fn new(search_url: impl Into<String>, user_agent: &str) -> Result<Self, LocatorError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(user_agent)
            .build()?;
        Ok(Self {
            client,
            search_url: search_url.into(),
        })
    }

    /// The newest granule with a qualifying download link.
    ///
    /// `Ok(None)` when the collection has no granules or the newest one has
    /// no link ending in the expected extension.
    #[instrument(skip(self), fields(collection = %query.collection_id))]
    pub async fn latest(&self, query: &GranuleQuery) -> Result<Option<Granule>, LocatorError> {
        let response = self
            .client
            .get(&self.search_url)
            .query(&[
                ("echo_collection_id", query.collection_id.as_str()),
                ("sort_key", query.sort_key.as_str()),
                ("page_size", "1"),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(LocatorError::Status {
                status,
                url: response.url().to_string(),
            });
        }

        let body: SearchResponse = response.json().await?;
        let Some(entry) = body.feed.entry.into_iter().next() else {
            warn!("CMR search returned no granules");
            return Ok(None);
        };

        let links: Vec<&str> = entry
            .links
            .iter()
            .filter(|l| l.rel.ends_with(DATA_REL_SUFFIX) && l.href.ends_with(&query.file_extension))
            .map(|l| l.href.as_str())
            .collect();
        debug!(title = %entry.title, candidates = links.len(), "Qualifying data links");

        let Some(download_url) = choose_link(&links) else {
            warn!(title = %entry.title, extension = %query.file_extension, "Latest granule has no downloadable link");
            return Ok(None);
        };

        let granule = Granule {
            id: entry.id,
            download_url: download_url.to_string(),
            time_start: entry.time_start.as_deref().and_then(parse_time),
            time_end: entry.time_end.as_deref().and_then(parse_time),
            title: entry.title,
        };

        info!(
            title = %granule.title,
            start = ?granule.time_start,
            end = ?granule.time_end,
            url = %granule.download_url,
            "Latest granule"
        );
        Ok(Some(granule))
    }
}

/// Prefer an `https://` link, otherwise the first one.
pub fn choose_link<'a>(links: &[&'a str]) -> Option<&'a str> {
    links
        .iter()
        .find(|href| href.starts_with("https://"))
        .or_else(|| links.first())
        .copied()
}

fn parse_time(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_choose_link_prefers_https() {
        let links = ["s3://bucket/a.nc", "http://host/a.nc", "https://host/a.nc"];
        assert_eq!(choose_link(&links), Some("https://host/a.nc"));
    }

    #[test]
    fn test_choose_link_falls_back_to_first() {
        let links = ["s3://bucket/a.nc", "http://host/a.nc"];
        assert_eq!(choose_link(&links), Some("s3://bucket/a.nc"));
        assert_eq!(choose_link(&[]), None);
    }

    #[test]
    fn test_parse_time() {
        let t = parse_time("2025-01-01T12:00:00.000Z").unwrap();
        assert_eq!(t.to_rfc3339(), "2025-01-01T12:00:00+00:00");
        assert!(parse_time("yesterday").is_none());
    }
}
