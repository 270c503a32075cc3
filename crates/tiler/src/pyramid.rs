//! Inspection of a finished `{z}/{x}/{y}.png` tile tree.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use image::GenericImageView;
use tempo_common::{latlon_to_tile, GeoBounds, TileCoord};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// A decoded sample tile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleTile {
    pub coord: TileCoord,
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
}

/// What was found in a tiles directory.
#[derive(Debug, Clone, Default)]
pub struct PyramidSummary {
    pub root: PathBuf,
    /// Tile count per zoom level
    pub tiles_per_zoom: BTreeMap<u32, usize>,
    pub viewer_page: Option<PathBuf>,
    /// Set when a sample tile decoded cleanly
    pub sample: Option<SampleTile>,
}

impl PyramidSummary {
    pub fn total_tiles(&self) -> usize {
        self.tiles_per_zoom.values().sum()
    }

    pub fn lowest_zoom(&self) -> Option<u32> {
        self.tiles_per_zoom.keys().next().copied()
    }

    pub fn highest_zoom(&self) -> Option<u32> {
        self.tiles_per_zoom.keys().next_back().copied()
    }
}

/// Every tile under `root`, sorted by z, x, y.
pub fn list_tiles(root: &Path) -> Vec<TileCoord> {
    let mut tiles: Vec<TileCoord> = WalkDir::new(root)
        .min_depth(3)
        .max_depth(3)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter_map(|entry| {
            let relative = entry.path().strip_prefix(root).ok()?;
            TileCoord::from_relative_path(relative)
        })
        .collect();
    tiles.sort();
    tiles
}

/// Count tiles, look for the viewer page and decode one sample tile.
///
/// The sample is the tile covering the centre of `bounds` at the lowest zoom
/// present, or the first tile at that zoom. A tile that fails to decode is
/// reported as a warning and leaves `sample` empty.
pub fn inspect_pyramid(root: &Path, viewer_page: &str, bounds: Option<&GeoBounds>) -> PyramidSummary {
    let tiles = list_tiles(root);

    let mut tiles_per_zoom = BTreeMap::new();
    for tile in &tiles {
        *tiles_per_zoom.entry(tile.z).or_insert(0usize) += 1;
    }
    for (zoom, count) in &tiles_per_zoom {
        info!(zoom, count, "Tiles at zoom level");
    }

    let page = root.join(viewer_page);
    let viewer_page = if page.is_file() {
        Some(page)
    } else {
        warn!(path = %page.display(), "Viewer page not found");
        None
    };

    let sample = pick_sample(&tiles, bounds).and_then(|coord| decode_sample(root, coord));

    PyramidSummary {
        root: root.to_path_buf(),
        tiles_per_zoom,
        viewer_page,
        sample,
    }
}

fn pick_sample(tiles: &[TileCoord], bounds: Option<&GeoBounds>) -> Option<TileCoord> {
    let lowest = tiles.first()?.z;
    if let Some(bounds) = bounds {
        let (lon, lat) = bounds.center();
        match latlon_to_tile(lat, lon, lowest) {
            Some(centre) if tiles.binary_search(&centre).is_ok() => return Some(centre),
            Some(centre) => debug!(tile = %centre, "No tile at raster centre, using first tile"),
            None => debug!(zoom = lowest, "Zoom out of range, using first tile"),
        }
    }
    tiles.first().copied()
}

fn decode_sample(root: &Path, coord: TileCoord) -> Option<SampleTile> {
    let path = root.join(coord.relative_path("png"));
    match image::open(&path) {
        Ok(img) => {
            let (width, height) = img.dimensions();
            info!(tile = %coord, width, height, "Sample tile decoded");
            Some(SampleTile {
                coord,
                path,
                width,
                height,
            })
        }
        Err(e) => {
            warn!(tile = %coord, path = %path.display(), error = %e, "Sample tile is not a valid image");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_tiles_ignores_other_files() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        std::fs::create_dir_all(root.join("2/1")).unwrap();
        std::fs::write(root.join("2/1/1.png"), b"").unwrap();
        std::fs::write(root.join("2/1/notes.txt"), b"").unwrap();
        std::fs::write(root.join("leaflet.html"), b"").unwrap();

        assert_eq!(list_tiles(root), vec![TileCoord::new(2, 1, 1)]);
    }

    #[test]
    fn test_list_tiles_ignores_out_of_range_zoom() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        for rel in ["40/0/0.png", "2/9/1.png", "2/1/1.png"] {
            let path = root.join(rel);
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(path, b"").unwrap();
        }

        assert_eq!(list_tiles(root), vec![TileCoord::new(2, 1, 1)]);
        let bounds = GeoBounds::new(-100.0, 30.0, -97.0, 33.0).unwrap();
        let summary = inspect_pyramid(root, "leaflet.html", Some(&bounds));
        assert_eq!(summary.tiles_per_zoom.len(), 1);
    }

    #[test]
    fn test_pick_sample_prefers_centre() {
        let bounds = GeoBounds::new(-100.0, 30.0, -97.0, 33.0).unwrap();
        let centre = latlon_to_tile(31.5, -98.5, 2).unwrap();
        let mut tiles = vec![TileCoord::new(2, 0, 0), centre, TileCoord::new(3, 1, 3)];
        tiles.sort();
        assert_eq!(pick_sample(&tiles, Some(&bounds)), Some(centre));
    }

    #[test]
    fn test_pick_sample_falls_back_to_first() {
        let tiles = vec![TileCoord::new(4, 2, 2), TileCoord::new(5, 4, 4)];
        let bounds = GeoBounds::new(100.0, -10.0, 101.0, -9.0).unwrap();
        assert_eq!(pick_sample(&tiles, Some(&bounds)), Some(TileCoord::new(4, 2, 2)));
        assert_eq!(pick_sample(&[], None), None);
    }
}
