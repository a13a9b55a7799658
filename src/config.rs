//! Gallery configuration module.
//!
//! Handles loading, validating, and merging `gallery.toml`. User values are
//! merged on top of stock defaults, so a config file only needs the keys it
//! wants to override. Unknown keys are rejected to catch typos early.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! title = "Gallery"          # Root album name
//! photos_dir = "photos"      # Content root, relative to the site directory
//! data_dir = "_data"         # Manifest output directory
//! keep_order = false         # Preserve manual manifest ordering on rerun
//!
//! [albums]                   # Sub-album ordering
//! sort_by_time = true
//! order_by = "access"        # access | modify | create
//! reverse = true
//!
//! [photos]                   # Photo ordering
//! sort_by_time = false
//! order_by = "access"
//! reverse = true
//!
//! [derivatives]
//! min_width = 600            # Derivative width in pixels
//! quality = 90               # AVIF quality (1-100)
//!
//! [processing]
//! max_processes = 4          # Max parallel workers (omit for auto = CPU cores)
//! ```
//!
//! ## Derived paths
//!
//! Everything the pipeline writes lands under `data_dir`:
//!
//! ```text
//! <site>/<data_dir>/albums/<chain>.json   # one manifest per leaf album
//! <site>/<data_dir>/gallery.json          # root album tree
//! <site>/<data_dir>/stream.json           # flattened photo stream
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Gallery configuration loaded from `gallery.toml`.
///
/// All fields have sensible defaults. User config files need only specify
/// the values they want to override. Unknown keys are rejected.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GalleryConfig {
    /// Display name of the root album.
    pub title: String,
    /// Content root holding the nested album directories.
    pub photos_dir: String,
    /// Output directory for all generated manifests.
    pub data_dir: String,
    /// Preserve a previously persisted manual ordering when rewriting
    /// manifests (see the order-merge contiguity rule).
    pub keep_order: bool,
    /// Ordering of sub-albums within an album.
    pub albums: SortConfig,
    /// Ordering of photos within an album.
    pub photos: SortConfig,
    /// Derivative generation settings.
    pub derivatives: DerivativesConfig,
    /// Parallel processing settings.
    pub processing: ProcessingConfig,
}

impl Default for GalleryConfig {
    fn default() -> Self {
        Self {
            title: "Gallery".to_string(),
            photos_dir: "photos".to_string(),
            data_dir: "_data".to_string(),
            keep_order: false,
            albums: SortConfig {
                sort_by_time: true,
                order_by: TimeKey::Access,
                reverse: true,
            },
            photos: SortConfig {
                sort_by_time: false,
                order_by: TimeKey::Access,
                reverse: true,
            },
            derivatives: DerivativesConfig::default(),
            processing: ProcessingConfig::default(),
        }
    }
}

impl GalleryConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.derivatives.quality == 0 || self.derivatives.quality > 100 {
            return Err(ConfigError::Validation(
                "derivatives.quality must be 1-100".into(),
            ));
        }
        if self.derivatives.min_width == 0 {
            return Err(ConfigError::Validation(
                "derivatives.min_width must be non-zero".into(),
            ));
        }
        if self.photos_dir.is_empty() {
            return Err(ConfigError::Validation("photos_dir must not be empty".into()));
        }
        Ok(())
    }

    pub fn photos_path(&self, site: &Path) -> PathBuf {
        site.join(&self.photos_dir)
    }

    pub fn albums_path(&self, site: &Path) -> PathBuf {
        site.join(&self.data_dir).join("albums")
    }

    /// Root album-tree manifest.
    pub fn tree_path(&self, site: &Path) -> PathBuf {
        site.join(&self.data_dir).join("gallery.json")
    }

    /// Final flattened photo-stream manifest.
    pub fn stream_path(&self, site: &Path) -> PathBuf {
        site.join(&self.data_dir).join("stream.json")
    }
}

/// Ordering settings for one entry category (albums or photos).
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SortConfig {
    /// Sort by a filesystem timestamp instead of by name.
    pub sort_by_time: bool,
    /// Which timestamp to sort by when `sort_by_time` is set.
    pub order_by: TimeKey,
    /// Descending order.
    pub reverse: bool,
}

/// Filesystem timestamp selector.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeKey {
    #[default]
    Access,
    Modify,
    Create,
}

/// Derivative generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DerivativesConfig {
    /// Derivative width in pixels (sources are never upscaled).
    pub min_width: u32,
    /// AVIF encoding quality (1 = worst, 100 = best).
    pub quality: u32,
}

impl Default for DerivativesConfig {
    fn default() -> Self {
        Self {
            min_width: 600,
            quality: 90,
        }
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel photo-description workers.
    /// When absent or null, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_processes: Option<usize>,
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config.max_processes.map(|n| n.min(cores)).unwrap_or(cores)
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the canonical representation of all default values, used as the
/// base layer for merging user overrides on top.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(GalleryConfig::default()).expect("default config must serialize")
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load a config file as a raw TOML value.
///
/// Returns `Ok(None)` if no file exists at `config_path`.
/// Returns `Err` if the file exists but contains invalid TOML.
pub fn load_raw_config(config_path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !config_path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(config_path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<GalleryConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: GalleryConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from a `gallery.toml` path.
///
/// Merges user values on top of stock defaults, rejects unknown keys,
/// and validates the result. A missing file yields the stock defaults.
pub fn load_config(config_path: &Path) -> Result<GalleryConfig, ConfigError> {
    let base = stock_defaults_value();
    let overlay = load_raw_config(config_path)?;
    resolve_config(base, overlay)
}

/// Returns a fully-commented stock `gallery.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# photostream Configuration
# =========================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.

# Display name of the root album.
title = "Gallery"

# Content root holding the nested album directories (relative to the site dir).
photos_dir = "photos"

# Output directory for all generated manifests:
#   <data_dir>/albums/<chain>.json   one manifest per leaf album
#   <data_dir>/gallery.json          root album tree
#   <data_dir>/stream.json           flattened photo stream
data_dir = "_data"

# Preserve a previously persisted manual ordering when rewriting manifests.
# The old order is carried forward only when its surviving entries form one
# contiguous block of the fresh order; otherwise the fresh order wins.
keep_order = false

# ---------------------------------------------------------------------------
# Ordering — albums and photos are sorted independently
# ---------------------------------------------------------------------------
[albums]
# Sort sub-albums by a filesystem timestamp instead of by name.
sort_by_time = true

# Which timestamp: "access", "modify", or "create".
order_by = "access"

# Newest (or last in name order) first.
reverse = true

[photos]
sort_by_time = false
order_by = "access"
reverse = true

# ---------------------------------------------------------------------------
# Derivative generation
# ---------------------------------------------------------------------------
[derivatives]
# Width of the generated <stem>.min.avif files. Sources narrower than this
# are encoded at their original size.
min_width = 600

# AVIF encoding quality (1 = worst, 100 = best).
quality = 90

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum parallel photo-description workers.
# Omit or comment out to auto-detect (= number of CPU cores).
# max_processes = 4
"##
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_config_values() {
        let config = GalleryConfig::default();
        assert_eq!(config.title, "Gallery");
        assert_eq!(config.photos_dir, "photos");
        assert_eq!(config.data_dir, "_data");
        assert!(!config.keep_order);
        assert!(config.albums.sort_by_time);
        assert!(!config.photos.sort_by_time);
        assert_eq!(config.albums.order_by, TimeKey::Access);
        assert_eq!(config.derivatives.min_width, 600);
        assert_eq!(config.derivatives.quality, 90);
        assert_eq!(config.processing.max_processes, None);
    }

    #[test]
    fn derived_paths() {
        let config = GalleryConfig::default();
        let site = Path::new("/site");
        assert_eq!(config.photos_path(site), Path::new("/site/photos"));
        assert_eq!(config.albums_path(site), Path::new("/site/_data/albums"));
        assert_eq!(config.tree_path(site), Path::new("/site/_data/gallery.json"));
        assert_eq!(config.stream_path(site), Path::new("/site/_data/stream.json"));
    }

    #[test]
    fn resolve_partial_config_keeps_other_defaults() {
        let base = stock_defaults_value();
        let overlay: toml::Value = toml::from_str(
            r#"
keep_order = true

[photos]
sort_by_time = true
order_by = "modify"
"#,
        )
        .unwrap();

        let config = resolve_config(base, Some(overlay)).unwrap();
        assert!(config.keep_order);
        assert!(config.photos.sort_by_time);
        assert_eq!(config.photos.order_by, TimeKey::Modify);
        // Untouched sections keep their defaults
        assert!(config.photos.reverse);
        assert!(config.albums.sort_by_time);
        assert_eq!(config.derivatives.min_width, 600);
    }

    #[test]
    fn load_config_returns_default_when_no_file() {
        let tmp = TempDir::new().unwrap();
        let config = load_config(&tmp.path().join("gallery.toml")).unwrap();
        assert_eq!(config.title, "Gallery");
    }

    #[test]
    fn load_config_reads_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("gallery.toml");
        fs::write(
            &path,
            r#"
title = "Portfolio"

[derivatives]
min_width = 900
"#,
        )
        .unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.title, "Portfolio");
        assert_eq!(config.derivatives.min_width, 900);
        assert_eq!(config.derivatives.quality, 90);
    }

    #[test]
    fn load_config_invalid_toml_is_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("gallery.toml");
        fs::write(&path, "this is not valid toml [[[").unwrap();

        let result = load_config(&path);
        assert!(matches!(result, Err(ConfigError::Toml(_))));
    }

    // =========================================================================
    // Unknown key rejection
    // =========================================================================

    #[test]
    fn unknown_key_rejected() {
        let base = stock_defaults_value();
        let overlay: toml::Value = toml::from_str("keep_ordr = true").unwrap();
        let result = resolve_config(base, Some(overlay));
        assert!(result.is_err());
    }

    #[test]
    fn unknown_nested_key_rejected() {
        let base = stock_defaults_value();
        let overlay: toml::Value = toml::from_str(
            r#"
[photos]
sortby = "name"
"#,
        )
        .unwrap();
        assert!(resolve_config(base, Some(overlay)).is_err());
    }

    #[test]
    fn unknown_order_by_value_rejected() {
        let base = stock_defaults_value();
        let overlay: toml::Value = toml::from_str(
            r#"
[albums]
order_by = "birth"
"#,
        )
        .unwrap();
        assert!(resolve_config(base, Some(overlay)).is_err());
    }

    // =========================================================================
    // Validation
    // =========================================================================

    #[test]
    fn validate_default_config_passes() {
        assert!(GalleryConfig::default().validate().is_ok());
    }

    #[test]
    fn validate_quality_bounds() {
        let mut config = GalleryConfig::default();
        config.derivatives.quality = 100;
        assert!(config.validate().is_ok());
        config.derivatives.quality = 101;
        assert!(config.validate().is_err());
        config.derivatives.quality = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_min_width_nonzero() {
        let mut config = GalleryConfig::default();
        config.derivatives.min_width = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_photos_dir_nonempty() {
        let mut config = GalleryConfig::default();
        config.photos_dir = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn load_config_validates_values() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("gallery.toml");
        fs::write(
            &path,
            r#"
[derivatives]
quality = 200
"#,
        )
        .unwrap();

        let result = load_config(&path);
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    // =========================================================================
    // merge_toml
    // =========================================================================

    #[test]
    fn merge_toml_scalar_override() {
        let base: toml::Value = toml::from_str(r#"keep_order = false"#).unwrap();
        let overlay: toml::Value = toml::from_str(r#"keep_order = true"#).unwrap();
        let merged = merge_toml(base, overlay);
        assert_eq!(merged.get("keep_order").unwrap().as_bool(), Some(true));
    }

    #[test]
    fn merge_toml_table_merge_preserves_base_keys() {
        let base: toml::Value = toml::from_str(
            r#"
[derivatives]
min_width = 600
quality = 90
"#,
        )
        .unwrap();
        let overlay: toml::Value = toml::from_str(
            r#"
[derivatives]
quality = 70
"#,
        )
        .unwrap();
        let merged = merge_toml(base, overlay);
        let derivatives = merged.get("derivatives").unwrap();
        assert_eq!(derivatives.get("quality").unwrap().as_integer(), Some(70));
        assert_eq!(derivatives.get("min_width").unwrap().as_integer(), Some(600));
    }

    // =========================================================================
    // stock_config_toml
    // =========================================================================

    #[test]
    fn stock_config_toml_is_valid_toml() {
        let content = stock_config_toml();
        let _: toml::Value = toml::from_str(content).expect("stock config must be valid TOML");
    }

    #[test]
    fn stock_config_toml_roundtrips_to_defaults() {
        let config: GalleryConfig = toml::from_str(stock_config_toml()).unwrap();
        assert_eq!(config.title, "Gallery");
        assert!(!config.keep_order);
        assert!(config.albums.sort_by_time);
        assert!(config.albums.reverse);
        assert!(!config.photos.sort_by_time);
        assert_eq!(config.derivatives.min_width, 600);
        assert_eq!(config.derivatives.quality, 90);
    }

    #[test]
    fn stock_config_toml_contains_all_sections() {
        let content = stock_config_toml();
        assert!(content.contains("[albums]"));
        assert!(content.contains("[photos]"));
        assert!(content.contains("[derivatives]"));
        assert!(content.contains("[processing]"));
    }

    // =========================================================================
    // Processing config
    // =========================================================================

    #[test]
    fn effective_threads_auto_uses_all_cores() {
        let cores = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        assert_eq!(effective_threads(&ProcessingConfig::default()), cores);
    }

    #[test]
    fn effective_threads_clamped_to_cores() {
        let config = ProcessingConfig {
            max_processes: Some(99999),
        };
        let cores = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        assert_eq!(effective_threads(&config), cores);
    }

    #[test]
    fn effective_threads_user_constrains_down() {
        let config = ProcessingConfig {
            max_processes: Some(1),
        };
        assert_eq!(effective_threads(&config), 1);
    }
}
