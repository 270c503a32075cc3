//! Extraction from NetCDF files written on the fly.

use netcdf_parser::{default_no2_candidates, extract_file, Engine, NetCdfError, VariableCandidate};
use test_utils::{
    ascending_4x4, assert_approx_eq, create_grid_with_nans, ascending_grid, require_tool,
    temp_test_dir_with_prefix, write_tempo_netcdf, NetCdfLayout,
};

#[test]
fn test_native_engine_flips_ascending_latitude() {
    let dir = temp_test_dir_with_prefix("nc_extract");
    let path = dir.path().join("TEMPO_NO2_L3_test.nc");
    let source = ascending_4x4();
    write_tempo_netcdf(&path, &source, &NetCdfLayout::default()).unwrap();

    let grid = extract_file(&path, Engine::Native, &default_no2_candidates()).unwrap();

    assert_eq!((grid.width, grid.height), (4, 4));
    assert!(grid.flipped);
    assert!(!grid.transposed);
    assert_eq!(grid.row(0).unwrap(), source.row(3));
    assert_eq!(grid.row(3).unwrap(), source.row(0));
    assert_approx_eq!(grid.bounds.min_lon, -100.0, 1e-9);
    assert_approx_eq!(grid.bounds.max_lat, 33.0, 1e-9);
    assert_eq!(
        grid.variable,
        VariableCandidate::in_group("product", "vertical_column_troposphere")
    );
}

#[test]
fn test_native_engine_fill_value_becomes_nan() {
    let dir = temp_test_dir_with_prefix("nc_fill");
    let path = dir.path().join("fill.nc");
    let values = create_grid_with_nans(3, 2, 2.0e15, &[(0, 0)]);
    let source = ascending_grid(3, 2, (-100.0, 30.0, -98.0, 31.0), values);
    write_tempo_netcdf(&path, &source, &NetCdfLayout::default()).unwrap();

    let grid = extract_file(&path, Engine::Native, &default_no2_candidates()).unwrap();

    // Source row 0 is the south edge, so the NaN lands in the last row
    assert!(grid.row(1).unwrap()[0].is_nan());
    assert_eq!(grid.finite_count(), 5);
}

#[test]
fn test_native_engine_infinities_become_nan() {
    let dir = temp_test_dir_with_prefix("nc_inf");
    let path = dir.path().join("inf.nc");
    let mut values = vec![1.0e15; 6];
    values[1] = f64::INFINITY;
    values[4] = f64::NEG_INFINITY;
    let source = ascending_grid(3, 2, (-100.0, 30.0, -98.0, 31.0), values);
    write_tempo_netcdf(&path, &source, &NetCdfLayout::default()).unwrap();

    let grid = extract_file(&path, Engine::Native, &default_no2_candidates()).unwrap();

    // rows are flipped: source row 1 is now row 0
    assert!(grid.row(0).unwrap()[1].is_nan());
    assert!(grid.row(1).unwrap()[1].is_nan());
    assert_eq!(grid.finite_count(), 4);
}

#[test]
fn test_native_engine_root_variable_and_short_names() {
    let dir = temp_test_dir_with_prefix("nc_root");
    let path = dir.path().join("root.nc");
    let layout = NetCdfLayout {
        group: None,
        variable: "vertical_column_total".to_string(),
        lat_name: "lat".to_string(),
        lon_name: "lon".to_string(),
        with_time: false,
        fill_value: None,
    };
    write_tempo_netcdf(&path, &ascending_4x4(), &layout).unwrap();

    let grid = extract_file(&path, Engine::Native, &default_no2_candidates()).unwrap();
    assert_eq!(grid.variable, VariableCandidate::root("vertical_column_total"));
}

#[test]
fn test_native_engine_no_candidate() {
    let dir = temp_test_dir_with_prefix("nc_none");
    let path = dir.path().join("other.nc");
    let layout = NetCdfLayout {
        variable: "cloud_fraction".to_string(),
        ..NetCdfLayout::default()
    };
    write_tempo_netcdf(&path, &ascending_4x4(), &layout).unwrap();

    let err = extract_file(&path, Engine::Native, &default_no2_candidates()).unwrap_err();
    assert!(matches!(err, NetCdfError::MissingData(_)));
}

#[test]
fn test_native_engine_missing_file() {
    let err = extract_file(
        std::path::Path::new("/nonexistent/TEMPO.nc"),
        Engine::Native,
        &default_no2_candidates(),
    )
    .unwrap_err();
    assert!(matches!(err, NetCdfError::InvalidFormat(_)));
}

#[test]
fn test_ncdump_engine_matches_native() {
    require_tool!("ncdump");

    let dir = temp_test_dir_with_prefix("nc_ncdump");
    let path = dir.path().join("TEMPO_NO2_L3_test.nc");
    write_tempo_netcdf(&path, &ascending_4x4(), &NetCdfLayout::default()).unwrap();

    let native = extract_file(&path, Engine::Native, &default_no2_candidates()).unwrap();
    let dumped = extract_file(&path, Engine::Ncdump, &default_no2_candidates()).unwrap();

    assert_eq!(native.values, dumped.values);
    assert_eq!(native.bounds, dumped.bounds);
}

#[test]
fn test_ncdump_engine_infinities_become_nan() {
    require_tool!("ncdump");

    let dir = temp_test_dir_with_prefix("nc_ncdump_inf");
    let path = dir.path().join("inf.nc");
    let mut values = vec![1.0e15; 4];
    values[0] = f64::INFINITY;
    values[3] = f64::NEG_INFINITY;
    let source = ascending_grid(2, 2, (-100.0, 30.0, -99.0, 31.0), values);
    write_tempo_netcdf(&path, &source, &NetCdfLayout::default()).unwrap();

    let grid = extract_file(&path, Engine::Ncdump, &default_no2_candidates()).unwrap();

    assert_eq!(grid.finite_count(), 2);
    assert!(grid.row(0).unwrap()[1].is_nan());
    assert!(grid.row(1).unwrap()[0].is_nan());
}
