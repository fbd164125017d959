//! Blog configuration module.
//!
//! Handles loading, validating, and merging `config.toml`. The file lives in
//! the config directory (the working directory unless `--config-dir` says
//! otherwise) and is layered on top of the stock defaults.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! database = "blog.redb"        # Index store file
//! content_root = "content"      # One sub-directory per page
//!
//! [storage]
//! bucket = "blog-media"
//! cdn_base_url = ""             # Empty -> https://storage.googleapis.com/<bucket>
//! objects_dir = "objects"       # Root of the filesystem object store
//! cache_max_age = 86400         # Seconds, sent as Cache-Control max-age
//!
//! [images]
//! preview_width = 80            # Preview width in pixels
//! preview_quality = 75          # Preview JPEG quality (1-100)
//!
//! [processing]
//! max_processes = 4             # Max parallel decode workers (omit for auto = CPU cores)
//! ```
//!
//! ## Partial Configuration
//!
//! Config files are sparse — override just the values you want:
//!
//! ```toml
//! [storage]
//! cdn_base_url = "https://media.example.org"
//! ```
//!
//! Relative paths are resolved against the config directory.
//! Unknown keys are rejected to catch typos early.

use crate::imaging::{PreviewConfig, Quality};
use crate::parse::ParseSettings;
use crate::publish::PublishSettings;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Public endpoint used when no CDN base URL is configured.
pub const DEFAULT_CDN_HOST: &str = "https://storage.googleapis.com";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Blog configuration loaded from `config.toml`.
///
/// All fields have defaults. User config files need only specify the values
/// they want to override. Unknown keys are rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BlogConfig {
    /// Path of the index store file.
    pub database: String,
    /// Directory holding one sub-directory per page.
    pub content_root: String,
    /// Object storage and CDN settings.
    pub storage: StorageConfig,
    /// Preview generation settings.
    pub images: ImagesConfig,
    /// Parallel processing settings.
    pub processing: ProcessingConfig,
}

impl Default for BlogConfig {
    fn default() -> Self {
        Self {
            database: "blog.redb".to_string(),
            content_root: "content".to_string(),
            storage: StorageConfig::default(),
            images: ImagesConfig::default(),
            processing: ProcessingConfig::default(),
        }
    }
}

impl BlogConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database.trim().is_empty() {
            return Err(ConfigError::Validation("database must not be empty".into()));
        }
        if self.storage.bucket.trim().is_empty() {
            return Err(ConfigError::Validation(
                "storage.bucket must not be empty".into(),
            ));
        }
        if self.images.preview_width == 0 {
            return Err(ConfigError::Validation(
                "images.preview_width must be non-zero".into(),
            ));
        }
        if !(1..=100).contains(&self.images.preview_quality) {
            return Err(ConfigError::Validation(
                "images.preview_quality must be 1-100".into(),
            ));
        }
        Ok(())
    }

    /// Base URL images are served from, without a trailing slash.
    pub fn cdn_url(&self) -> String {
        let base = self.storage.cdn_base_url.trim_end_matches('/');
        if base.is_empty() {
            format!("{DEFAULT_CDN_HOST}/{}", self.storage.bucket)
        } else {
            base.to_string()
        }
    }

    /// Settings consumed by the parser.
    pub fn parse_settings(&self) -> ParseSettings {
        ParseSettings {
            cdn_base_url: self.cdn_url(),
            preview: PreviewConfig {
                width: self.images.preview_width,
                quality: Quality::new(self.images.preview_quality),
            },
        }
    }

    /// Settings consumed by the publishing coordinator.
    pub fn publish_settings(&self) -> PublishSettings {
        PublishSettings {
            parse: self.parse_settings(),
            cache_max_age: self.storage.cache_max_age,
        }
    }

    /// Index store path, resolved against `base` when relative.
    pub fn database_path(&self, base: &Path) -> PathBuf {
        base.join(&self.database)
    }

    /// Content root, resolved against `base` when relative.
    pub fn content_path(&self, base: &Path) -> PathBuf {
        base.join(&self.content_root)
    }

    /// Object store root, resolved against `base` when relative.
    pub fn objects_path(&self, base: &Path) -> PathBuf {
        base.join(&self.storage.objects_dir)
    }
}

/// Object storage settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StorageConfig {
    /// Bucket name, also used to derive the default CDN URL.
    pub bucket: String,
    /// Base URL of uploaded images. Empty means the bucket's public URL.
    pub cdn_base_url: String,
    /// Root directory of the filesystem object store.
    pub objects_dir: String,
    /// `Cache-Control: public, max-age=<n>` of uploaded objects.
    pub cache_max_age: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            bucket: "blog-media".to_string(),
            cdn_base_url: String::new(),
            objects_dir: "objects".to_string(),
            cache_max_age: 86400,
        }
    }
}

/// Preview generation settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ImagesConfig {
    /// Preview width in pixels; height follows the aspect ratio.
    pub preview_width: u32,
    /// Preview JPEG quality (1 = worst, 100 = best).
    pub preview_quality: u32,
}

impl Default for ImagesConfig {
    fn default() -> Self {
        Self {
            preview_width: 80,
            preview_quality: 75,
        }
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel image decode workers.
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
    toml::Value::try_from(BlogConfig::default()).expect("default config must serialize")
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

/// Load a `config.toml` from a directory as a raw TOML value.
///
/// Returns `Ok(None)` if no `config.toml` exists in the directory.
/// Returns `Err` if the file exists but contains invalid TOML.
pub fn load_raw_config(dir: &Path) -> Result<Option<toml::Value>, ConfigError> {
    let config_path = dir.join("config.toml");
    if !config_path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(&config_path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<BlogConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: BlogConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from `config.toml` in the given directory.
///
/// Merges user values on top of stock defaults, rejects unknown keys,
/// and validates the result.
pub fn load_config(dir: &Path) -> Result<BlogConfig, ConfigError> {
    let base = stock_defaults_value();
    let overlay = load_raw_config(dir)?;
    let config = resolve_config(base, overlay)?;
    tracing::debug!(dir = %dir.display(), database = %config.database, "Loaded config");
    Ok(config)
}

/// Returns a fully-commented stock `config.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# Folio Configuration
# ===================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
#
# Relative paths are resolved against the directory holding this file.
# Unknown keys will cause an error.

# Index store file (created on first use).
database = "blog.redb"

# Directory holding one sub-directory per page.
content_root = "content"

# ---------------------------------------------------------------------------
# Object storage
# ---------------------------------------------------------------------------
[storage]
# Bucket name. Images are served from https://storage.googleapis.com/<bucket>
# unless cdn_base_url is set.
bucket = "blog-media"

# Base URL image references are rewritten to. Empty = derive from bucket.
cdn_base_url = ""

# Root directory of the filesystem object store.
objects_dir = "objects"

# Cache-Control max-age of uploaded images, in seconds.
cache_max_age = 86400

# ---------------------------------------------------------------------------
# Previews
# ---------------------------------------------------------------------------
[images]
# Preview width in pixels. Height follows the source aspect ratio.
preview_width = 80

# Preview JPEG quality (1 = worst, 100 = best).
preview_quality = 75

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum parallel image-decoding workers.
# Omit or comment out to auto-detect (= number of CPU cores).
# max_processes = 4
"##
}
