//! Removal of superseded granules from the download directory.

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

/// Files that belong to one product: `<prefix>*<extension>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductFamily {
    pub prefix: String,
    pub extension: String,
}

impl ProductFamily {
    pub fn new(prefix: impl Into<String>, extension: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            extension: extension.into(),
        }
    }

    pub fn matches(&self, file_name: &str) -> bool {
        file_name.len() >= self.prefix.len() + self.extension.len()
            && file_name.starts_with(&self.prefix)
            && file_name.ends_with(&self.extension)
    }
}

/// Files of `family` directly inside `dir`, sorted by name.
pub fn list_family(dir: &Path, family: &ProductFamily) -> std::io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let name = entry.file_name();
        if name.to_str().map_or(false, |n| family.matches(n)) {
            files.push(entry.path());
        }
    }
    files.sort();
    Ok(files)
}

/// Delete every file of `family` in `dir` except `keep`.
///
/// Individual failures are logged and skipped. Returns the deleted paths.
pub fn remove_superseded(dir: &Path, family: &ProductFamily, keep: &Path) -> Vec<PathBuf> {
    let files = match list_family(dir, family) {
        Ok(files) => files,
        Err(e) => {
            warn!(dir = %dir.display(), error = %e, "Failed to list download directory");
            return Vec::new();
        }
    };
    debug!(count = files.len(), "Granules of this product in download directory");

    let keep_name = keep.file_name();
    let mut removed = Vec::new();
    for path in files {
        if path.file_name() == keep_name {
            continue;
        }
        match std::fs::remove_file(&path) {
            Ok(()) => {
                info!(path = %path.display(), "Removed superseded granule");
                removed.push(path);
            }
            Err(e) => warn!(path = %path.display(), error = %e, "Failed to remove old granule"),
        }
    }
    removed
}
