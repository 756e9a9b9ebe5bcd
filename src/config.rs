//! Project settings.
//!
//! Handles loading, validating, and merging `settings.toml`. Stock defaults
//! are serialized to a TOML table, the project's `settings.toml` (if any) is
//! merged over it key by key, and the result is deserialized and validated.
//!
//! ## File Location
//!
//! ```text
//! project/
//! ├── settings.toml     # Optional, sparse overrides of the stock defaults
//! ├── entries/
//! ├── uploads/
//! └── cache/
//! ```
//!
//! ## Configuration Options
//!
//! ```toml
//! date_format = "%Y-%m-%d %H:%M:%S"   # chrono strftime pattern
//! url = ""                            # Base URL override for media full_url
//!
//! [media]
//! accept_file_types = "gif, jpg, jpeg, png, ico, zip, ..."
//! max_file_size = 8000000             # bytes
//! safe_names = true                   # slugify uploaded file names
//! max_image_width = 0                 # validation bound, 0 = unbounded
//! max_image_height = 0
//! exact = false                       # require exact max dimensions
//! image_width = 1600                  # resize target, 0 = none
//! image_height = 0
//! image_quality = 70
//! url_prefix = "project/uploads"
//!
//! [entries.fields.created_at]
//! enabled = true
//!
//! [entries.fields.published_at]
//! enabled = true
//!
//! [cache]
//! enabled = true
//! driver = "file"                     # "file" or "memory"
//! directory = "cache"
//! default_ttl = 0                     # seconds, 0 = never expires
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Name of the settings file inside the project root.
pub const SETTINGS_FILENAME: &str = "settings.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Project settings loaded from `settings.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// strftime pattern used when defaulting timestamp fields on create.
    pub date_format: String,
    /// Base URL for absolute media links. Empty means "use the request origin".
    pub url: String,
    pub media: MediaConfig,
    pub entries: EntriesConfig,
    pub cache: CacheConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            date_format: "%Y-%m-%d %H:%M:%S".to_string(),
            url: String::new(),
            media: MediaConfig::default(),
            entries: EntriesConfig::default(),
            cache: CacheConfig::default(),
        }
    }
}

impl Settings {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.media.image_quality == 0 || self.media.image_quality > 100 {
            return Err(ConfigError::Validation(
                "media.image_quality must be 1-100".into(),
            ));
        }
        if self.media.max_file_size == 0 {
            return Err(ConfigError::Validation(
                "media.max_file_size must be greater than zero".into(),
            ));
        }
        if self.date_format.trim().is_empty() {
            return Err(ConfigError::Validation(
                "date_format must not be empty".into(),
            ));
        }
        if chrono::format::StrftimeItems::new(&self.date_format)
            .any(|item| matches!(item, chrono::format::Item::Error))
        {
            return Err(ConfigError::Validation(format!(
                "date_format '{}' is not a valid strftime pattern",
                self.date_format
            )));
        }
        Ok(())
    }

    /// The configured base URL, if one is set.
    pub fn base_url(&self) -> Option<&str> {
        let url = self.url.trim_end_matches('/');
        (!url.is_empty()).then_some(url)
    }
}

/// Upload validation and image normalization settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MediaConfig {
    /// Delimited list of accepted extensions. Matched by containment.
    pub accept_file_types: String,
    /// Largest accepted upload, in bytes (inclusive).
    pub max_file_size: u64,
    /// Rewrite uploaded file names to slugs, keeping the extension.
    pub safe_names: bool,
    /// Validation bound on image width. 0 leaves the width unbounded.
    pub max_image_width: u32,
    /// Validation bound on image height. 0 leaves the height unbounded.
    pub max_image_height: u32,
    /// Require the image to match the bounds exactly instead of fitting.
    pub exact: bool,
    /// Resize target width. 0 disables width-driven resizing.
    pub image_width: u32,
    /// Resize target height. 0 disables height-driven resizing.
    pub image_height: u32,
    /// Encoding quality for re-encoded images (1-100).
    pub image_quality: u32,
    /// URL path under which the uploads root is served.
    pub url_prefix: String,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            accept_file_types: "gif, jpg, jpeg, png, ico, zip, tgz, txt, md, doc, docx, pdf, \
                                epub, xls, xlsx, ppt, pptx, mp3, ogg, wav, m4a, mp4, m4v, ogv, \
                                wmv, avi, webm, svg"
                .to_string(),
            max_file_size: 8_000_000,
            safe_names: true,
            max_image_width: 0,
            max_image_height: 0,
            exact: false,
            image_width: 1600,
            image_height: 0,
            image_quality: 70,
            url_prefix: "project/uploads".to_string(),
        }
    }
}

impl MediaConfig {
    /// Validation bounds, `None` where unconfigured.
    pub fn max_image_bounds(&self) -> (Option<u32>, Option<u32>) {
        (non_zero(self.max_image_width), non_zero(self.max_image_height))
    }

    /// Resize targets, `None` where unconfigured.
    pub fn image_target(&self) -> (Option<u32>, Option<u32>) {
        (non_zero(self.image_width), non_zero(self.image_height))
    }
}

fn non_zero(value: u32) -> Option<u32> {
    (value > 0).then_some(value)
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EntriesConfig {
    pub fields: FieldsConfig,
}

/// Toggles for the computed entry fields.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FieldsConfig {
    pub created_at: FieldToggle,
    pub published_at: FieldToggle,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FieldToggle {
    pub enabled: bool,
}

impl Default for FieldToggle {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// Which cache backend the project uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheDriver {
    File,
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CacheConfig {
    pub enabled: bool,
    pub driver: CacheDriver,
    /// Cache directory for the file driver, relative to the project root.
    pub directory: String,
    /// TTL applied when a caller sets a value without one. 0 = never expires.
    pub default_ttl: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            driver: CacheDriver::File,
            directory: "cache".to_string(),
            default_ttl: 0,
        }
    }
}

// =============================================================================
// Settings loading, merging, and validation
// =============================================================================

/// Returns the stock default settings as a `toml::Value::Table`.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(Settings::default()).expect("default settings must serialize")
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

/// Load `settings.toml` from a project root as a raw TOML value.
///
/// Returns `Ok(None)` if the file does not exist.
pub fn load_raw_settings(project_root: &Path) -> Result<Option<toml::Value>, ConfigError> {
    let path = project_root.join(SETTINGS_FILENAME);
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(&path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_settings(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<Settings, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let settings: Settings = merged.try_into()?;
    settings.validate()?;
    Ok(settings)
}

/// Load settings for a project: stock defaults with `settings.toml` on top.
pub fn load_settings(project_root: &Path) -> Result<Settings, ConfigError> {
    resolve_settings(stock_defaults_value(), load_raw_settings(project_root)?)
}

/// A fully-commented stock `settings.toml`, printed by `quire gen-config`.
pub fn stock_settings_toml() -> &'static str {
    r##"# Quire settings
# ==============
# All settings are optional. Values shown below are the defaults.
# Unknown keys cause an error.

# chrono strftime pattern used when a timestamp field is defaulted on create.
date_format = "%Y-%m-%d %H:%M:%S"

# Base URL for absolute media links. Leave empty to use the request origin.
url = ""

# ---------------------------------------------------------------------------
# Media uploads
# ---------------------------------------------------------------------------
[media]
# Accepted extensions. An upload is accepted when its lower-cased extension
# appears anywhere in this string.
accept_file_types = "gif, jpg, jpeg, png, ico, zip, tgz, txt, md, doc, docx, pdf, epub, xls, xlsx, ppt, pptx, mp3, ogg, wav, m4a, mp4, m4v, ogv, wmv, avi, webm, svg"

# Largest accepted upload in bytes.
max_file_size = 8000000

# Rewrite file names to lower-case slugs (extension kept).
safe_names = true

# Image validation bounds. 0 leaves a dimension unbounded.
max_image_width = 0
max_image_height = 0

# When true, images must match the bounds exactly.
exact = false

# Resize targets applied after upload. 0 disables a dimension.
image_width = 1600
image_height = 0

# Quality for re-encoded images (1-100).
image_quality = 70

# URL path under which the uploads directory is served.
url_prefix = "project/uploads"

# ---------------------------------------------------------------------------
# Computed entry fields
# ---------------------------------------------------------------------------
[entries.fields.created_at]
enabled = true

[entries.fields.published_at]
enabled = true

# ---------------------------------------------------------------------------
# Cache
# ---------------------------------------------------------------------------
[cache]
enabled = true
# "file" or "memory"
driver = "file"
# Directory for the file driver, relative to the project root.
directory = "cache"
# Seconds; 0 means entries never expire.
default_ttl = 0
"##
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_settings_have_media_limits() {
        let settings = Settings::default();
        assert_eq!(settings.media.max_file_size, 8_000_000);
        assert!(settings.media.safe_names);
        assert_eq!(settings.media.image_quality, 70);
        assert_eq!(settings.media.image_target(), (Some(1600), None));
        assert_eq!(settings.media.max_image_bounds(), (None, None));
    }

    #[test]
    fn default_settings_enable_timestamp_fields() {
        let settings = Settings::default();
        assert!(settings.entries.fields.created_at.enabled);
        assert!(settings.entries.fields.published_at.enabled);
    }

    #[test]
    fn parse_partial_settings() {
        let toml = r#"
[media]
max_file_size = 1024
"#;
        let settings: Settings = toml::from_str(toml).unwrap();
        assert_eq!(settings.media.max_file_size, 1024);
        // Defaults preserved
        assert!(settings.media.safe_names);
        assert_eq!(settings.date_format, "%Y-%m-%d %H:%M:%S");
        assert_eq!(settings.cache.driver, CacheDriver::File);
    }

    #[test]
    fn parse_field_toggles() {
        let toml = r#"
[entries.fields.published_at]
enabled = false
"#;
        let settings: Settings = toml::from_str(toml).unwrap();
        assert!(settings.entries.fields.created_at.enabled);
        assert!(!settings.entries.fields.published_at.enabled);
    }

    #[test]
    fn parse_cache_driver() {
        let settings: Settings = toml::from_str("[cache]\ndriver = \"memory\"\n").unwrap();
        assert_eq!(settings.cache.driver, CacheDriver::Memory);
    }

    #[test]
    fn base_url_empty_is_none() {
        let mut settings = Settings::default();
        assert_eq!(settings.base_url(), None);
        settings.url = "https://example.org/".to_string();
        assert_eq!(settings.base_url(), Some("https://example.org"));
    }

    // =========================================================================
    // load_settings tests
    // =========================================================================

    #[test]
    fn load_settings_returns_default_when_no_file() {
        let tmp = TempDir::new().unwrap();
        let settings = load_settings(tmp.path()).unwrap();
        assert_eq!(settings.media.max_file_size, 8_000_000);
    }

    #[test]
    fn load_settings_reads_file() {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path().join(SETTINGS_FILENAME),
            r#"
url = "https://cdn.example.org"

[media]
safe_names = false
max_image_width = 200
"#,
        )
        .unwrap();

        let settings = load_settings(tmp.path()).unwrap();
        assert_eq!(settings.base_url(), Some("https://cdn.example.org"));
        assert!(!settings.media.safe_names);
        assert_eq!(settings.media.max_image_bounds(), (Some(200), None));
        // Unspecified values stay at defaults
        assert_eq!(settings.media.image_quality, 70);
    }

    #[test]
    fn load_settings_invalid_toml_is_error() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(SETTINGS_FILENAME), "this is not [valid toml").unwrap();
        assert!(matches!(
            load_settings(tmp.path()),
            Err(ConfigError::Toml(_))
        ));
    }

    #[test]
    fn unknown_key_rejected_via_load_settings() {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path().join(SETTINGS_FILENAME),
            "[media]\nmax_file_sise = 10\n",
        )
        .unwrap();
        assert!(load_settings(tmp.path()).is_err());
    }

    // =========================================================================
    // merge_toml tests
    // =========================================================================

    #[test]
    fn merge_toml_scalar_override() {
        let base: toml::Value = toml::from_str("a = 1\nb = 2").unwrap();
        let overlay: toml::Value = toml::from_str("b = 3").unwrap();
        let merged = merge_toml(base, overlay);
        assert_eq!(merged["a"].as_integer(), Some(1));
        assert_eq!(merged["b"].as_integer(), Some(3));
    }

    #[test]
    fn merge_toml_deep_nested() {
        let base: toml::Value =
            toml::from_str("[entries.fields.created_at]\nenabled = true\n[entries.fields.published_at]\nenabled = true").unwrap();
        let overlay: toml::Value =
            toml::from_str("[entries.fields.created_at]\nenabled = false").unwrap();
        let merged = merge_toml(base, overlay);
        assert_eq!(
            merged["entries"]["fields"]["created_at"]["enabled"].as_bool(),
            Some(false)
        );
        assert_eq!(
            merged["entries"]["fields"]["published_at"]["enabled"].as_bool(),
            Some(true)
        );
    }

    // =========================================================================
    // Validation
    // =========================================================================

    #[test]
    fn validate_quality_bounds() {
        let mut settings = Settings::default();
        settings.media.image_quality = 100;
        assert!(settings.validate().is_ok());
        settings.media.image_quality = 101;
        assert!(settings.validate().is_err());
        settings.media.image_quality = 0;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn validate_zero_max_file_size() {
        let mut settings = Settings::default();
        settings.media.max_file_size = 0;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn validate_empty_date_format() {
        let mut settings = Settings::default();
        settings.date_format = "  ".to_string();
        assert!(settings.validate().is_err());
    }

    #[test]
    fn validate_rejects_bad_date_format() {
        let mut settings = Settings::default();
        settings.date_format = "%Q".to_string();
        assert!(matches!(
            settings.validate(),
            Err(ConfigError::Validation(_))
        ));
        settings.date_format = "%d/%m/%Y %H:%M".to_string();
        assert!(settings.validate().is_ok());

        let overlay: toml::Value = toml::from_str("date_format = \"%Q\"").unwrap();
        assert!(resolve_settings(stock_defaults_value(), Some(overlay)).is_err());
    }

    #[test]
    fn resolve_settings_rejects_invalid_values() {
        let overlay: toml::Value = toml::from_str("[media]\nimage_quality = 250").unwrap();
        assert!(resolve_settings(stock_defaults_value(), Some(overlay)).is_err());
    }

    // =========================================================================
    // Stock settings file
    // =========================================================================

    #[test]
    fn stock_settings_toml_roundtrips_to_defaults() {
        let parsed: Settings = toml::from_str(stock_settings_toml()).unwrap();
        let defaults = Settings::default();
        assert_eq!(parsed.date_format, defaults.date_format);
        assert_eq!(
            parsed.media.accept_file_types,
            defaults.media.accept_file_types
        );
        assert_eq!(parsed.media.max_file_size, defaults.media.max_file_size);
        assert_eq!(parsed.media.image_width, defaults.media.image_width);
        assert_eq!(parsed.cache.directory, defaults.cache.directory);
    }

    #[test]
    fn stock_defaults_value_has_all_sections() {
        let value = stock_defaults_value();
        let table = value.as_table().unwrap();
        for key in ["date_format", "url", "media", "entries", "cache"] {
            assert!(table.contains_key(key), "missing {key}");
        }
    }
}
