//! Reading through the `ncdump` command-line tool.
//!
//! Useful on hosts where libnetcdf was built without HDF5 group support but
//! the NetCDF utilities are installed.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::debug;

use crate::array::NamedArray;
use crate::cdl::{self, CdlHeader};
use crate::error::{NetCdfError, NetCdfResult};
use crate::source::GridSource;

/// Significant digits requested for float and double output.
const PRECISION: &str = "9,17";

/// A NetCDF file read by shelling out to `ncdump`.
pub struct NcdumpSource {
    path: PathBuf,
    program: String,
    header: CdlHeader,
}

impl NcdumpSource {
    pub fn open(path: &Path) -> NetCdfResult<Self> {
        Self::open_with(path, "ncdump")
    }

    /// Open using a specific `ncdump` executable.
    pub fn open_with(path: &Path, program: &str) -> NetCdfResult<Self> {
        if !path.exists() {
            return Err(NetCdfError::IoError(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("{} does not exist", path.display()),
            )));
        }

        let text = run_ncdump(program, &[OsStr::new("-h"), path.as_os_str()])?;
        let header = cdl::parse_header(&text)?;
        debug!(
            path = %path.display(),
            variables = header.variables().len(),
            "Parsed ncdump header"
        );

        Ok(Self {
            path: path.to_path_buf(),
            program: program.to_string(),
            header,
        })
    }

    pub fn header(&self) -> &CdlHeader {
        &self.header
    }
}

impl GridSource for NcdumpSource {
    fn has_variable(&self, group: Option<&str>, name: &str) -> NetCdfResult<bool> {
        Ok(self.header.variable(group, name).is_some())
    }

    fn read_variable(&self, group: Option<&str>, name: &str) -> NetCdfResult<NamedArray> {
        let var = self.header.variable(group, name).ok_or_else(|| {
            NetCdfError::MissingData(format!("variable {}/{}", group.unwrap_or(""), name))
        })?;
        let shape = self.header.shape_of(var)?;

        let qualified = match group {
            Some(group) => format!("/{}/{}", group, name),
            None => name.to_string(),
        };
        let text = run_ncdump(
            &self.program,
            &[
                OsStr::new("-v"),
                OsStr::new(&qualified),
                OsStr::new("-p"),
                OsStr::new(PRECISION),
                self.path.as_os_str(),
            ],
        )?;

        let raw = cdl::parse_data_values(&text, name)?;
        let values = raw.into_iter().map(|v| var.unpack(v)).collect();

        debug!(variable = %qualified, shape = ?shape, "Read variable via ncdump");
        NamedArray::new(var.dims.clone(), shape, values)
    }
}

fn run_ncdump(program: &str, args: &[&OsStr]) -> NetCdfResult<String> {
    let output = Command::new(program)
        .args(args)
        .output()
        .map_err(|e| NetCdfError::CommandError(format!("failed to run {}: {}", program, e)))?;

    if !output.status.success() {
        return Err(NetCdfError::CommandError(format!(
            "{} exited with {}: {}",
            program,
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }

    String::from_utf8(output.stdout)
        .map_err(|e| NetCdfError::InvalidFormat(format!("ncdump output is not UTF-8: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file() {
        let err = NcdumpSource::open(Path::new("/nonexistent/file.nc"))
            .err()
            .unwrap();
        assert!(matches!(err, NetCdfError::IoError(_)));
    }

    #[test]
    fn test_missing_program() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let err = NcdumpSource::open_with(file.path(), "definitely-not-ncdump")
            .err()
            .unwrap();
        assert!(matches!(err, NetCdfError::CommandError(_)));
    }
}
