//! Stretch and ramp working together on synthetic NO2 grids.

use renderer::{choose_range, scale_to_bytes, ColorRamp, RangeSource, StretchConfig, NODATA_INDEX};
use test_utils::{create_grid_with_nans, create_no2_grid};

#[test]
fn test_nan_maps_to_transparent() {
    let data = create_grid_with_nans(8, 8, 2.0e15, &[(0, 0), (7, 7)]);
    let range = choose_range(&data, &StretchConfig::default()).unwrap();
    let indices = scale_to_bytes(&data, &range);

    let ramp = ColorRamp::no2();
    assert_eq!(indices[0], NODATA_INDEX);
    assert_eq!(indices[63], NODATA_INDEX);
    assert_eq!(ramp.get(indices[0]).a, 0);
    // 2e15 / 5e15 * 255 = 102
    assert_eq!(indices[1], 102);
    assert_eq!(ramp.get(indices[1]).a, 255);
}

#[test]
fn test_in_domain_grid_uses_fixed_range() {
    let data = create_no2_grid(64, 32);
    let range = choose_range(&data, &StretchConfig::default()).unwrap();
    assert_eq!(range.source, RangeSource::Fixed);

    let indices = scale_to_bytes(&data, &range);
    // Values grow towards the bottom-right, so indices never decrease along a row
    for row in indices.chunks(64) {
        assert!(row.windows(2).all(|w| w[0] <= w[1]));
    }
}

#[test]
fn test_percentile_fallback_spans_full_byte_range() {
    // A negative retrieval artifact pushes the data out of the valid domain
    let mut data: Vec<f64> = (0..1000).map(|i| i as f64 * 1.0e13).collect();
    data[0] = -5.0e14;
    let range = choose_range(&data, &StretchConfig::default()).unwrap();
    assert_eq!(range.source, RangeSource::Percentile);

    let indices = scale_to_bytes(&data, &range);
    assert_eq!(indices[0], 0);
    assert_eq!(*indices.last().unwrap(), 255);
}

#[test]
fn test_wide_band_clips_less() {
    let mut data: Vec<f64> = (0..1000).map(|i| i as f64).collect();
    data[0] = -1.0;
    let narrow = choose_range(&data, &StretchConfig::default()).unwrap();
    let wide = choose_range(&data, &StretchConfig::wide()).unwrap();
    assert!(wide.min > narrow.min);
    assert!(wide.max < narrow.max);
}
