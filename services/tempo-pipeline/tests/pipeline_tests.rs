//! Full pipeline runs with stand-in CMR/Earthdata servers and scripted GDAL tools.

use std::cell::RefCell;
use std::io;
use std::path::{Path, PathBuf};

use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use bytes::Bytes;
use georaster::{read_float_geotiff, read_indexed_geotiff, ColorizeOutcome};
use tempo_pipeline::{Credentials, Pipeline, PipelineConfig, Stage};
use tempo_common::TileCoord;
use test_utils::{ascending_4x4, cmr, write_tempo_netcdf, MockServer, NetCdfLayout};
use tiler::{CommandOutput, ProcessRunner};

/// Imitates gdal_translate and gdal2tiles.py by writing their outputs.
#[derive(Default)]
struct ScriptedGdal {
    programs: RefCell<Vec<String>>,
    fail_program: Option<&'static str>,
}

impl ProcessRunner for ScriptedGdal {
    fn run(&self, program: &str, args: &[String]) -> io::Result<CommandOutput> {
        self.programs.borrow_mut().push(program.to_string());
        if self.fail_program == Some(program) {
            return Ok(CommandOutput::failure(1, "ERROR 1: scripted failure"));
        }

        let last = PathBuf::from(args.last().cloned().unwrap_or_default());
        match program {
            "gdal_translate" => std::fs::write(&last, b"tif")?,
            "gdal2tiles.py" => {
                let tile = last.join(TileCoord::new(2, 0, 1).relative_path("png"));
                std::fs::create_dir_all(tile.parent().unwrap())?;
                image::RgbaImage::new(256, 256)
                    .save(&tile)
                    .map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()))?;
                std::fs::write(last.join("leaflet.html"), b"<html></html>")?;
            }
            _ => {}
        }
        Ok(CommandOutput::success("Minimum=0.000, Maximum=255.000, Mean=40.0"))
    }
}

fn netcdf_bytes(dir: &Path) -> Vec<u8> {
    let path = dir.join("fixture.nc");
    write_tempo_netcdf(&path, &ascending_4x4(), &NetCdfLayout::default()).unwrap();
    std::fs::read(path).unwrap()
}

struct Workspace {
    dir: tempfile::TempDir,
}

impl Workspace {
    fn new() -> Self {
        Self {
            dir: tempfile::tempdir().unwrap(),
        }
    }

    fn config(&self, cmr_url: String) -> PipelineConfig {
        let mut config = PipelineConfig {
            cmr_url,
            data_dir: self.dir.path().join("public/tempo/no2"),
            geotiff_dir: self.dir.path().join("public/tempo/geotiff"),
            ..PipelineConfig::default()
        };
        config.credentials.profile_url = None;
        config
    }

    fn tiles_dir(&self) -> PathBuf {
        self.dir.path().join("public/tempo/tiles")
    }
}

async fn start_servers(netcdf: Vec<u8>) -> MockServer {
    let netcdf = Bytes::from(netcdf);
    // The data link points back at this server, so the feed is built per request
    let router = Router::new()
        .route(
            "/search/granules.json",
            get(|headers: axum::http::HeaderMap| async move {
                let host = headers
                    .get(header::HOST)
                    .and_then(|h| h.to_str().ok())
                    .unwrap_or("127.0.0.1")
                    .to_string();
                Json(cmr::feed(vec![cmr::granule_entry(
                    cmr::GRANULE_NAME,
                    vec![cmr::data_link(&format!("http://{}/data/{}", host, cmr::GRANULE_NAME))],
                )]))
            }),
        )
        .route(
            "/data/:name",
            get(move || {
                let body = netcdf.clone();
                async move { (StatusCode::OK, body).into_response() }
            }),
        );
    MockServer::start(router).await
}

#[tokio::test]
async fn test_run_produces_every_artifact() {
    let ws = Workspace::new();
    let server = start_servers(netcdf_bytes(ws.dir.path())).await;
    let runner = ScriptedGdal::default();

    let mut pipeline = Pipeline::new(ws.config(server.url("/search/granules.json")), &runner);
    pipeline
        .run(Credentials::new("alice", "s3cret"))
        .await
        .unwrap();
    let report = pipeline.into_report();

    assert!(report.succeeded());
    assert_eq!(report.granule.as_ref().unwrap().title, cmr::GRANULE_NAME);

    let netcdf = report.netcdf.clone().unwrap();
    assert_eq!(netcdf.file_name().unwrap(), cmr::GRANULE_NAME);
    assert!(netcdf.exists());

    let float_tif = report.float_geotiff.clone().unwrap();
    assert!(float_tif
        .file_name()
        .unwrap()
        .to_string_lossy()
        .ends_with("_S001_NO2.tif"));
    let float = read_float_geotiff(&float_tif).unwrap();
    assert_eq!((float.width, float.height), (4, 4));
    assert_eq!(float.epsg, Some(4326));

    let colored_path = match report.colorized.as_ref().unwrap() {
        ColorizeOutcome::Colorized { path, .. } => path.clone(),
        other => panic!("unexpected outcome: {other:?}"),
    };
    let colored = read_indexed_geotiff(&colored_path).unwrap();
    // row 0 is the last (northernmost) source row
    assert_eq!(&colored.indices[0..4], &[66, 71, 76, 81]);
    assert_eq!(colored.palette.unwrap()[0].to_array(), [0, 0, 0, 0]);

    let tiles = report.tiles.unwrap();
    assert_eq!(tiles.tiles_dir, ws.tiles_dir());
    assert_eq!(tiles.pyramid.total_tiles(), 1);
    assert!(tiles.pyramid.sample.is_some());
    assert_eq!(
        *runner.programs.borrow(),
        vec!["gdalinfo", "gdal_translate", "gdal_translate", "gdal2tiles.py"]
    );
}

#[tokio::test]
async fn test_tile_failure_stops_at_tile_stage() {
    let ws = Workspace::new();
    let server = start_servers(netcdf_bytes(ws.dir.path())).await;
    let runner = ScriptedGdal {
        fail_program: Some("gdal2tiles.py"),
        ..ScriptedGdal::default()
    };

    let mut pipeline = Pipeline::new(ws.config(server.url("/search/granules.json")), &runner);
    let err = pipeline
        .run(Credentials::new("alice", "s3cret"))
        .await
        .unwrap_err();

    assert!(format!("{:#}", err).contains("scripted failure"));
    let report = pipeline.report();
    assert_eq!(report.failed_stage, Some(Stage::Tile));
    assert!(report.float_geotiff.as_ref().unwrap().exists());
    assert!(report.colorized.is_some());
    assert!(report.tiles.is_none());
}

#[tokio::test]
async fn test_unreachable_catalog_stops_at_locate() {
    let ws = Workspace::new();
    let runner = ScriptedGdal::default();

    let mut pipeline = Pipeline::new(ws.config("http://127.0.0.1:1/search".to_string()), &runner);
    assert!(pipeline.run(Credentials::new("a", "b")).await.is_err());

    let report = pipeline.report();
    assert_eq!(report.failed_stage, Some(Stage::Locate));
    assert!(report.netcdf.is_none());
    assert!(runner.programs.borrow().is_empty());
}

#[test]
fn test_convert_local_file() {
    let ws = Workspace::new();
    let nc = ws.dir.path().join(cmr::GRANULE_NAME);
    write_tempo_netcdf(&nc, &ascending_4x4(), &NetCdfLayout::default()).unwrap();
    let runner = ScriptedGdal::default();

    let mut pipeline = Pipeline::new(ws.config("http://unused".to_string()), &runner);
    let tiles = pipeline.convert(&nc).unwrap();
    assert_eq!(tiles.pyramid.tiles_per_zoom.get(&2), Some(&1));

    let report = pipeline.report();
    assert_eq!(report.variable.as_deref(), Some("product/vertical_column_troposphere"));
    let bounds = report.bounds.unwrap();
    assert_eq!((bounds.min_lon, bounds.max_lon), (-100.0, -97.0));
}

#[test]
fn test_convert_missing_variable_fails_at_extract() {
    let ws = Workspace::new();
    let nc = ws.dir.path().join("TEMPO_NO2_other.nc");
    let layout = NetCdfLayout {
        variable: "cloud_fraction".to_string(),
        ..NetCdfLayout::default()
    };
    write_tempo_netcdf(&nc, &ascending_4x4(), &layout).unwrap();
    let runner = ScriptedGdal::default();

    let mut pipeline = Pipeline::new(ws.config("http://unused".to_string()), &runner);
    assert!(pipeline.convert(&nc).is_err());
    assert_eq!(pipeline.report().failed_stage, Some(Stage::Extract));
    assert!(pipeline.report().float_geotiff.is_none());
}
