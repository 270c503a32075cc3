//! Shared test utilities for the TEMPO pipeline workspace.
//!
//! This crate provides common testing infrastructure including:
//! - Synthetic NO2 grid generators
//! - CMR response fixtures and a TEMPO-shaped NetCDF writer
//! - An in-process HTTP server for network tests
//! - Skip macros for tests that need external tools
//!
//! # Usage
//!
//! Add to your crate's `Cargo.toml`:
//!
//! ```toml
//! [dev-dependencies]
//! test-utils = { path = "../test-utils" }
//! ```
//!
//! Then import in your tests:
//!
//! ```ignore
//! use test_utils::{require_tool, fixtures};
//! ```

pub mod fixtures;
pub mod generators;
pub mod mock_server;
pub mod paths;

// Re-export commonly used items at the crate root
pub use fixtures::*;
pub use generators::*;
pub use mock_server::MockServer;
pub use paths::*;

/// Macro to skip a test if an external tool is not on `PATH`.
///
/// Tests that drive `gdal_translate`, `gdal2tiles.py` or `ncdump` use this so
/// they pass on machines without the GDAL/NetCDF utilities installed.
///
/// # Usage
///
/// ```ignore
/// use test_utils::require_tool;
///
/// #[test]
/// fn test_real_tiles() {
///     let gdal2tiles = require_tool!("gdal2tiles.py");
///     // Test code using the tool...
/// }
/// ```
///
/// If the tool is not found, the test will print a skip message and return early.
#[macro_export]
macro_rules! require_tool {
    ($name:expr) => {{
        match $crate::find_tool($name) {
            Some(path) => path,
            None => {
                eprintln!("SKIPPED: '{}' not found on PATH.", $name);
                return;
            }
        }
    }};
}

/// Macro for approximate floating-point equality assertions.
///
/// # Usage
///
/// ```ignore
/// use test_utils::assert_approx_eq;
///
/// assert_approx_eq!(1.0001_f64, 1.0_f64, 0.001_f64); // passes
/// assert_approx_eq!(1.1_f32, 1.0_f32, 0.001_f32);    // fails
/// ```
#[macro_export]
macro_rules! assert_approx_eq {
    ($left:expr, $right:expr, $epsilon:expr) => {{
        let left: f64 = $left as f64;
        let right: f64 = $right as f64;
        let epsilon: f64 = $epsilon as f64;
        let diff = (left - right).abs();
        if diff > epsilon {
            panic!(
                "assertion failed: `(left ≈ right)`\n  left: `{:?}`,\n right: `{:?}`,\n  diff: `{:?}` > epsilon `{:?}`",
                left, right, diff, epsilon
            );
        }
    }};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assert_approx_eq_passes() {
        assert_approx_eq!(1.0001, 1.0, 0.001);
        assert_approx_eq!(0.0, 0.0, 0.0001);
        assert_approx_eq!(-5.5, -5.500001, 0.0001);
    }

    #[test]
    #[should_panic(expected = "assertion failed")]
    fn test_assert_approx_eq_fails() {
        assert_approx_eq!(1.1, 1.0, 0.001);
    }
}
