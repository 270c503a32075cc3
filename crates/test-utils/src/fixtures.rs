//! Common test fixtures for TEMPO pipeline tests.
//!
//! This module provides pre-defined test data that represents common
//! scenarios: CMR search responses and small TEMPO-shaped NetCDF files.

use std::path::Path;

use crate::generators::SyntheticGrid;

/// Common bounding box definitions for testing, as `(min_lon, min_lat, max_lon, max_lat)`.
pub mod bbox {
    /// Approximate TEMPO field of regard over North America
    pub const TEMPO_DOMAIN: (f64, f64, f64, f64) = (-170.0, 10.0, -10.0, 80.0);

    /// Continental United States bounding box
    pub const CONUS: (f64, f64, f64, f64) = (-130.0, 20.0, -60.0, 55.0);

    /// The 4x4 synthetic grid's extent
    pub const SMALL: (f64, f64, f64, f64) = (-100.0, 30.0, -97.0, 33.0);
}

/// CMR granule search responses.
pub mod cmr {
    use serde_json::{json, Value};

    pub const COLLECTION_ID: &str = "C3685668637-LARC_CLOUD";
    pub const DATA_REL: &str = "http://esipfed.org/ns/fedsearch/1.1/data#";
    pub const METADATA_REL: &str = "http://esipfed.org/ns/fedsearch/1.1/metadata#";
    pub const GRANULE_NAME: &str = "TEMPO_NO2_L3_V03_20250101T120000Z_S001.nc";

    /// A link object as it appears in a granule entry.
    pub fn link(rel: &str, href: &str) -> Value {
        json!({ "rel": rel, "href": href, "hreflang": "en-US" })
    }

    /// A data link (`rel` ends in `/data#`).
    pub fn data_link(href: &str) -> Value {
        link(DATA_REL, href)
    }

    /// A granule entry with the given links.
    pub fn granule_entry(title: &str, links: Vec<Value>) -> Value {
        json!({
            "id": "G3300000000-LARC_CLOUD",
            "title": title,
            "time_start": "2025-01-01T12:00:00.000Z",
            "time_end": "2025-01-01T12:59:59.000Z",
            "collection_concept_id": COLLECTION_ID,
            "links": links,
        })
    }

    /// A `granules.json` response with the given entries.
    pub fn feed(entries: Vec<Value>) -> Value {
        json!({
            "feed": {
                "updated": "2025-01-01T14:00:00.000Z",
                "id": "https://cmr.earthdata.nasa.gov/search/granules.json",
                "title": "ECHO granule metadata",
                "entry": entries,
            }
        })
    }

    /// A typical response: one granule with an https data link, an s3 data
    /// link and a metadata link.
    pub fn typical_feed() -> Value {
        feed(vec![granule_entry(
            GRANULE_NAME,
            vec![
                data_link(&format!("s3://asdc-prod-protected/TEMPO/{}", GRANULE_NAME)),
                data_link(&format!(
                    "https://data.asdc.earthdata.nasa.gov/asdc-prod-protected/TEMPO/{}",
                    GRANULE_NAME
                )),
                link(METADATA_REL, "https://cmr.earthdata.nasa.gov/search/concepts/G3300000000.xml"),
            ],
        )])
    }
}

/// Where the NO2 variable lives in a written fixture.
#[derive(Debug, Clone)]
pub struct NetCdfLayout {
    pub group: Option<String>,
    pub variable: String,
    pub lat_name: String,
    pub lon_name: String,
    /// Add a leading `time` dimension of length 1
    pub with_time: bool,
    pub fill_value: Option<f64>,
}

impl Default for NetCdfLayout {
    fn default() -> Self {
        Self {
            group: Some("product".to_string()),
            variable: "vertical_column_troposphere".to_string(),
            lat_name: "latitude".to_string(),
            lon_name: "longitude".to_string(),
            with_time: true,
            fill_value: Some(-1.0e30),
        }
    }
}

/// Writes a TEMPO-shaped NetCDF-4 file.
///
/// NaN samples are written as the layout's fill value when it has one.
pub fn write_tempo_netcdf(
    path: &Path,
    grid: &SyntheticGrid,
    layout: &NetCdfLayout,
) -> Result<(), netcdf::Error> {
    let mut file = netcdf::create(path)?;

    file.add_dimension(&layout.lat_name, grid.height())?;
    file.add_dimension(&layout.lon_name, grid.width())?;
    if layout.with_time {
        file.add_dimension("time", 1)?;
    }

    let mut lat = file.add_variable::<f64>(&layout.lat_name, &[layout.lat_name.as_str()])?;
    lat.put_attribute("units", "degrees_north")?;
    lat.put_values(&grid.lats, ..)?;

    let mut lon = file.add_variable::<f64>(&layout.lon_name, &[layout.lon_name.as_str()])?;
    lon.put_attribute("units", "degrees_east")?;
    lon.put_values(&grid.lons, ..)?;

    let mut dims: Vec<&str> = Vec::new();
    if layout.with_time {
        dims.push("time");
    }
    dims.push(&layout.lat_name);
    dims.push(&layout.lon_name);

    let values: Vec<f64> = match layout.fill_value {
        Some(fill) => grid
            .values
            .iter()
            .map(|v| if v.is_nan() { fill } else { *v })
            .collect(),
        None => grid.values.clone(),
    };

    match &layout.group {
        Some(group_name) => {
            let mut group = file.add_group(group_name)?;
            let mut var = group.add_variable::<f64>(&layout.variable, &dims)?;
            if let Some(fill) = layout.fill_value {
                var.set_fill_value(fill)?;
            }
            var.put_attribute("units", "molecules/cm^2")?;
            var.put_values(&values, ..)?;
        }
        None => {
            let mut var = file.add_variable::<f64>(&layout.variable, &dims)?;
            if let Some(fill) = layout.fill_value {
                var.set_fill_value(fill)?;
            }
            var.put_attribute("units", "molecules/cm^2")?;
            var.put_values(&values, ..)?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_typical_feed_shape() {
        let feed = cmr::typical_feed();
        let entries = feed["feed"]["entry"].as_array().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0]["links"].as_array().unwrap().len(), 3);
        assert!(entries[0]["links"][1]["href"]
            .as_str()
            .unwrap()
            .starts_with("https://"));
    }

    #[test]
    fn test_default_layout_is_product_group() {
        let layout = NetCdfLayout::default();
        assert_eq!(layout.group.as_deref(), Some("product"));
        assert!(layout.with_time);
    }
}
