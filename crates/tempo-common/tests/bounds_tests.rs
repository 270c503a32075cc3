//! Tests for GeoBounds and GeoTransform.

use tempo_common::bbox::{BoundsError, GeoBounds, GeoTransform};

// ============================================================================
// Construction
// ============================================================================

#[test]
fn test_bounds_new_valid() {
    let bounds = GeoBounds::new(-125.0, 24.0, -66.0, 50.0).unwrap();
    assert_eq!(bounds.width(), 59.0);
    assert_eq!(bounds.height(), 26.0);
}

#[test]
fn test_bounds_inverted_longitude_rejected() {
    let err = GeoBounds::new(-66.0, 24.0, -125.0, 50.0).unwrap_err();
    assert!(matches!(err, BoundsError::Degenerate { axis: "longitude", .. }));
}

#[test]
fn test_bounds_from_all_nan_coordinates() {
    let err = GeoBounds::from_coordinates(&[f64::NAN; 3], &[30.0, 31.0]).unwrap_err();
    assert_eq!(err, BoundsError::NoFiniteCoordinates("longitude"));
}

#[test]
fn test_bounds_from_2d_coordinates_flattened() {
    // 2x2 curvilinear grid flattened row-major
    let lons = [-100.0, -98.0, -100.5, -98.5];
    let lats = [33.0, 33.1, 30.0, 30.2];
    let bounds = GeoBounds::from_coordinates(&lons, &lats).unwrap();
    assert_eq!(bounds.min_lon, -100.5);
    assert_eq!(bounds.max_lon, -98.0);
    assert_eq!(bounds.min_lat, 30.0);
    assert_eq!(bounds.max_lat, 33.1);
}

// ============================================================================
// Transform
// ============================================================================

#[test]
fn test_transform_non_square_pixels() {
    let bounds = GeoBounds::new(-120.0, 20.0, -60.0, 50.0).unwrap();
    let gt = GeoTransform::from_bounds(&bounds, 600, 150);
    assert!((gt.0[1] - 0.1).abs() < 1e-12);
    assert!((gt.0[5] + 0.2).abs() < 1e-12);
    let (lon, lat) = gt.pixel_to_geo(600.0, 150.0);
    assert!((lon + 60.0).abs() < 1e-9);
    assert!((lat - 20.0).abs() < 1e-9);
}

#[test]
fn test_center() {
    let bounds = GeoBounds::new(-100.0, 30.0, -97.0, 33.0).unwrap();
    let (lon, lat) = bounds.center();
    assert_eq!((lon, lat), (-98.5, 31.5));
}
