//! Shared test utilities for the photostream test suite.
//!
//! Provides canned photo records and filesystem fixture helpers used by the
//! builder, store, and flattener tests. Pixel-free: traversal tests pair
//! these with [`MockDescriptor`](crate::photo::tests::MockDescriptor), so
//! image files can be empty placeholders.

use crate::types::{IsoSpeed, PhotoRecord};
use std::path::Path;

use crate::config::SortConfig;

/// A fully populated record for the photo at `path` (site-relative,
/// `./`-prefixed). The derivative path is derived the way the production
/// descriptor derives it.
pub fn photo_record(path: &str) -> PhotoRecord {
    PhotoRecord {
        width: 1200,
        height: 800,
        camera: "Canon EOS R6".to_string(),
        aperture: "f/2.8".to_string(),
        exposure: "1/250s".to_string(),
        iso: IsoSpeed::Rating(200),
        focal: "35mm".to_string(),
        path: path.to_string(),
        min_path: derivative_of(path),
    }
}

fn derivative_of(path: &str) -> String {
    match path.rsplit_once('.') {
        Some((stem, _ext)) => format!("{stem}.min.avif"),
        None => format!("{path}.min.avif"),
    }
}

/// Create an empty placeholder file, making parent directories as needed.
pub fn touch(path: &Path) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, b"").unwrap();
}

/// Plain ascending name ordering — the predictable baseline for tests.
pub fn name_order() -> SortConfig {
    SortConfig {
        sort_by_time: false,
        order_by: crate::config::TimeKey::Access,
        reverse: false,
    }
}
