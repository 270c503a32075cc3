//! Native NetCDF reading using the netcdf library.
//!
//! Opens NetCDF-4 files (including HDF5-backed groups) directly through
//! libnetcdf. This is the default engine.

use std::path::Path;
use std::sync::Once;

use tracing::debug;

use crate::array::NamedArray;
use crate::error::{NetCdfError, NetCdfResult};
use crate::source::GridSource;

/// Silence HDF5's automatic error printing to stderr.
///
/// The HDF5 C library prints verbose error messages to stderr even when errors
/// are handled gracefully by the Rust code (e.g., when probing for a group or
/// attribute that doesn't exist). This creates confusing log spam like:
///
/// ```text
/// HDF5-DIAG: Error detected in HDF5 (1.10.8) thread 3:
///   #003: ../../../src/H5Adense.c line 397 in H5A__dense_open(): can't locate attribute in name index
/// ```
///
/// Only needs to be called once per process, but is safe to call multiple times.
pub fn silence_hdf5_errors() {
    static INIT: Once = Once::new();

    INIT.call_once(|| {
        // SAFETY: H5Eset_auto2 is thread-safe and we're passing null pointers
        // to disable error output, which is a documented valid use.
        unsafe {
            hdf5_metno_sys::h5e::H5Eset_auto2(
                hdf5_metno_sys::h5e::H5E_DEFAULT,
                None,
                std::ptr::null_mut(),
            );
        }
    });
}

/// A NetCDF file opened through libnetcdf.
pub struct NativeSource {
    file: netcdf::File,
}

impl NativeSource {
    pub fn open(path: &Path) -> NetCdfResult<Self> {
        silence_hdf5_errors();

        let file = netcdf::open(path).map_err(|e| {
            NetCdfError::InvalidFormat(format!("Failed to open NetCDF {}: {}", path.display(), e))
        })?;
        debug!(path = %path.display(), "Opened NetCDF file with native engine");

        Ok(Self { file })
    }
}

impl GridSource for NativeSource {
    fn has_variable(&self, group: Option<&str>, name: &str) -> NetCdfResult<bool> {
        match group {
            None => Ok(self.file.variable(name).is_some()),
            Some(group_name) => match self.file.group(group_name)? {
                Some(group) => Ok(group.variable(name).is_some()),
                None => Ok(false),
            },
        }
    }

    fn read_variable(&self, group: Option<&str>, name: &str) -> NetCdfResult<NamedArray> {
        let missing = || {
            NetCdfError::MissingData(format!("variable {}/{}", group.unwrap_or(""), name))
        };

        match group {
            None => {
                let var = self.file.variable(name).ok_or_else(missing)?;
                read_as_named_array(&var)
            }
            Some(group_name) => {
                let group = self.file.group(group_name)?.ok_or_else(missing)?;
                let var = group.variable(name).ok_or_else(missing)?;
                read_as_named_array(&var)
            }
        }
    }
}

fn read_as_named_array(var: &netcdf::Variable) -> NetCdfResult<NamedArray> {
    let dims: Vec<String> = var.dimensions().iter().map(|d| d.name()).collect();
    let shape: Vec<usize> = var.dimensions().iter().map(|d| d.len()).collect();

    // Read everything using (..) and let libnetcdf convert to f64
    let raw: Vec<f64> = var.get_values(..).map_err(|e| {
        NetCdfError::InvalidFormat(format!("Failed to read {}: {}", var.name(), e))
    })?;

    let fill_value = get_f64_attr(var, "_FillValue");
    let scale_factor = get_f64_attr(var, "scale_factor").unwrap_or(1.0);
    let add_offset = get_f64_attr(var, "add_offset").unwrap_or(0.0);

    let values = raw
        .into_iter()
        .map(|val| {
            if !val.is_finite() || fill_value == Some(val) {
                f64::NAN
            } else {
                val * scale_factor + add_offset
            }
        })
        .collect();

    debug!(variable = %var.name(), dims = ?dims, shape = ?shape, "Read variable");
    NamedArray::new(dims, shape, values)
}

/// Check if a variable has an attribute with the given name.
/// This avoids HDF5 error spam when checking for optional attributes.
fn has_attr(var: &netcdf::Variable, name: &str) -> bool {
    var.attributes().any(|attr| attr.name() == name)
}

/// Helper to get an attribute as f64.
fn get_f64_attr(var: &netcdf::Variable, name: &str) -> Option<f64> {
    if !has_attr(var, name) {
        return None;
    }
    let attr_value = var.attribute_value(name)?.ok()?;
    f64::try_from(attr_value).ok()
}
