//! Range selection and byte scaling for NO2 column densities.
//!
//! A fixed scientific range keeps colors comparable between granules. It is
//! used whenever every finite sample lies inside the physically plausible
//! domain; otherwise the range comes from percentiles of the data.

use serde::{Deserialize, Serialize};
use tracing::debug;

/// A fixed display range and the domain it applies to.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FixedRange {
    /// Samples must all lie in `[valid_min, valid_max]` for the fixed range to apply
    pub valid_min: f64,
    pub valid_max: f64,
    pub min: f64,
    pub max: f64,
}

impl FixedRange {
    /// Tropospheric NO2 in molecules/cm².
    pub const NO2: FixedRange = FixedRange {
        valid_min: 0.0,
        valid_max: 1.0e16,
        min: 0.0,
        max: 5.0e15,
    };

    fn covers(&self, min: f64, max: f64) -> bool {
        min >= self.valid_min && max <= self.valid_max
    }
}

/// How the display range is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StretchConfig {
    /// Lower percentile (0-100) for the fallback range
    pub low_percentile: f64,
    /// Upper percentile (0-100) for the fallback range
    pub high_percentile: f64,
    /// Fixed range to prefer when the data allow it
    #[serde(default)]
    pub fixed: Option<FixedRange>,
}

impl StretchConfig {
    /// The 2/98 band used by some product variants.
    pub fn wide() -> Self {
        Self {
            low_percentile: 2.0,
            high_percentile: 98.0,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        let in_bounds = |p: f64| (0.0..=100.0).contains(&p);
        if !in_bounds(self.low_percentile) || !in_bounds(self.high_percentile) {
            return Err(format!(
                "percentiles must be within 0-100, got {}/{}",
                self.low_percentile, self.high_percentile
            ));
        }
        if self.low_percentile >= self.high_percentile {
            return Err(format!(
                "low percentile {} must be below high percentile {}",
                self.low_percentile, self.high_percentile
            ));
        }
        Ok(())
    }
}

impl Default for StretchConfig {
    fn default() -> Self {
        Self {
            low_percentile: 1.0,
            high_percentile: 99.0,
            fixed: Some(FixedRange::NO2),
        }
    }
}

/// Where a [`StretchRange`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeSource {
    Fixed,
    Percentile,
}

/// The value range mapped onto bytes 0-255.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StretchRange {
    pub min: f64,
    pub max: f64,
    pub source: RangeSource,
}

impl StretchRange {
    pub fn span(&self) -> f64 {
        self.max - self.min
    }
}

/// Summary statistics of the finite samples.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SampleStats {
    pub count: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    /// Population standard deviation
    pub std_dev: f64,
}

impl SampleStats {
    /// `None` when there are no finite samples.
    pub fn from_values(values: &[f64]) -> Option<Self> {
        let finite: Vec<f64> = finite_values(values);
        if finite.is_empty() {
            return None;
        }

        let count = finite.len();
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        let mut sum = 0.0;
        for &v in &finite {
            min = min.min(v);
            max = max.max(v);
            sum += v;
        }
        let mean = sum / count as f64;
        let variance = finite.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / count as f64;

        Some(Self {
            count,
            min,
            max,
            mean,
            std_dev: variance.sqrt(),
        })
    }
}

/// The finite subset of `values`.
pub fn finite_values(values: &[f64]) -> Vec<f64> {
    values.iter().copied().filter(|v| v.is_finite()).collect()
}

/// Percentile of already sorted values, interpolating linearly between
/// closest ranks.
///
/// `pct` is in 0-100 and is clamped. Returns NaN for an empty slice.
pub fn percentile_sorted(sorted: &[f64], pct: f64) -> f64 {
    match sorted.len() {
        0 => f64::NAN,
        1 => sorted[0],
        n => {
            let rank = pct.clamp(0.0, 100.0) * (n - 1) as f64 / 100.0;
            let lo = rank.floor() as usize;
            let hi = rank.ceil() as usize;
            let frac = rank - lo as f64;
            sorted[lo] + (sorted[hi] - sorted[lo]) * frac
        }
    }
}

/// Percentile of the finite samples in `values`.
pub fn percentile(values: &[f64], pct: f64) -> f64 {
    let mut sorted = finite_values(values);
    sorted.sort_by(f64::total_cmp);
    percentile_sorted(&sorted, pct)
}

/// Pick the display range for `values`, or `None` if nothing is finite.
pub fn choose_range(values: &[f64], config: &StretchConfig) -> Option<StretchRange> {
    let mut sorted = finite_values(values);
    if sorted.is_empty() {
        return None;
    }
    sorted.sort_by(f64::total_cmp);

    let data_min = sorted[0];
    let data_max = sorted[sorted.len() - 1];

    if let Some(fixed) = config.fixed {
        if fixed.covers(data_min, data_max) {
            debug!(
                data_min,
                data_max,
                min = fixed.min,
                max = fixed.max,
                "Data within valid domain, using fixed range"
            );
            return Some(StretchRange {
                min: fixed.min,
                max: fixed.max,
                source: RangeSource::Fixed,
            });
        }
    }

    let min = percentile_sorted(&sorted, config.low_percentile);
    let max = percentile_sorted(&sorted, config.high_percentile);
    debug!(
        data_min,
        data_max,
        low = config.low_percentile,
        high = config.high_percentile,
        min,
        max,
        "Using percentile range"
    );
    Some(StretchRange {
        min,
        max,
        source: RangeSource::Percentile,
    })
}

/// Scale one sample to a byte: clip to the range, map onto 0-255, truncate.
///
/// Non-finite samples and a non-positive span give 0.
pub fn scale_value(value: f64, range: &StretchRange) -> u8 {
    let span = range.span();
    if !value.is_finite() || !(span > 0.0) {
        return 0;
    }
    let normalized = ((value - range.min) / span).clamp(0.0, 1.0);
    (normalized * 255.0) as u8
}

/// Scale every sample with [`scale_value`].
pub fn scale_to_bytes(values: &[f64], range: &StretchRange) -> Vec<u8> {
    values.iter().map(|&v| scale_value(v, range)).collect()
}
