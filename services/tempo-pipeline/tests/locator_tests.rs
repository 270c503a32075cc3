//! Granule lookup against a stand-in CMR search endpoint.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::Value;
use tempo_pipeline::config::{ProductConfig, USER_AGENT};
use tempo_pipeline::{GranuleLocator, GranuleQuery, LocatorError};
use test_utils::{cmr, MockServer};

struct Cmr {
    response: Value,
    status: StatusCode,
    queries: Mutex<Vec<HashMap<String, String>>>,
}

async fn search(
    State(state): State<Arc<Cmr>>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    state.queries.lock().unwrap().push(params);
    (state.status, Json(state.response.clone())).into_response()
}

async fn start(response: Value, status: StatusCode) -> (MockServer, Arc<Cmr>) {
    let state = Arc::new(Cmr {
        response,
        status,
        queries: Mutex::new(Vec::new()),
    });
    let router = Router::new()
        .route("/search/granules.json", get(search))
        .with_state(state.clone());
    (MockServer::start(router).await, state)
}

fn query() -> GranuleQuery {
    let product = ProductConfig::tempo_no2();
    GranuleQuery {
        collection_id: product.source.collection_id,
        sort_key: product.source.sort_key,
        file_extension: product.source.file_extension,
    }
}

fn locator(server: &MockServer) -> GranuleLocator {
    GranuleLocator::new(server.url("/search/granules.json"), USER_AGENT).unwrap()
}

#[tokio::test]
async fn test_latest_granule_prefers_https() {
    let (server, state) = start(cmr::typical_feed(), StatusCode::OK).await;

    let granule = locator(&server).latest(&query()).await.unwrap().unwrap();

    assert_eq!(granule.title, cmr::GRANULE_NAME);
    assert_eq!(granule.id, "G3300000000-LARC_CLOUD");
    assert!(granule.download_url.starts_with("https://"));
    assert!(granule.download_url.ends_with(".nc"));
    assert_eq!(granule.file_name(), Some(cmr::GRANULE_NAME));
    assert_eq!(
        granule.time_start.unwrap().to_rfc3339(),
        "2025-01-01T12:00:00+00:00"
    );
    assert!(granule.time_end.is_some());

    let queries = state.queries.lock().unwrap();
    assert_eq!(queries.len(), 1);
    let params = &queries[0];
    assert_eq!(params["echo_collection_id"], cmr::COLLECTION_ID);
    assert_eq!(params["sort_key"], "-start_date");
    assert_eq!(params["page_size"], "1");
}

#[tokio::test]
async fn test_falls_back_to_non_https_link() {
    let feed = cmr::feed(vec![cmr::granule_entry(
        cmr::GRANULE_NAME,
        vec![
            cmr::link(cmr::METADATA_REL, "https://cmr.example.com/meta.nc"),
            cmr::data_link("s3://asdc-prod-protected/TEMPO/granule.nc"),
        ],
    )]);
    let (server, _) = start(feed, StatusCode::OK).await;

    let granule = locator(&server).latest(&query()).await.unwrap().unwrap();
    assert_eq!(granule.download_url, "s3://asdc-prod-protected/TEMPO/granule.nc");
}

#[tokio::test]
async fn test_no_qualifying_link() {
    let feed = cmr::feed(vec![cmr::granule_entry(
        cmr::GRANULE_NAME,
        vec![
            cmr::data_link("https://data.example.com/granule.h5"),
            cmr::link(cmr::METADATA_REL, "https://cmr.example.com/granule.nc"),
        ],
    )]);
    let (server, _) = start(feed, StatusCode::OK).await;

    assert!(locator(&server).latest(&query()).await.unwrap().is_none());
}

#[tokio::test]
async fn test_empty_feed() {
    let (server, _) = start(cmr::feed(vec![]), StatusCode::OK).await;
    assert!(locator(&server).latest(&query()).await.unwrap().is_none());
}

#[tokio::test]
async fn test_missing_times_are_none() {
    let mut entry = cmr::granule_entry(
        cmr::GRANULE_NAME,
        vec![cmr::data_link("https://data.example.com/TEMPO_NO2_x.nc")],
    );
    entry["time_start"] = Value::Null;
    entry.as_object_mut().unwrap().remove("time_end");
    let (server, _) = start(cmr::feed(vec![entry]), StatusCode::OK).await;

    let granule = locator(&server).latest(&query()).await.unwrap().unwrap();
    assert!(granule.time_start.is_none());
    assert!(granule.time_end.is_none());
}

#[tokio::test]
async fn test_http_error_status() {
    let (server, _) = start(serde_json::json!({"errors": ["boom"]}), StatusCode::INTERNAL_SERVER_ERROR).await;

    let err = locator(&server).latest(&query()).await.unwrap_err();
    match err {
        LocatorError::Status { status, url } => {
            assert_eq!(status.as_u16(), 500);
            assert!(url.contains("echo_collection_id="));
        }
        other => panic!("unexpected error: {other}"),
    }
}
