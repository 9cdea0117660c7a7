//! Configuration management for Stockroom.
//!
//! Provides TOML-based configuration with XDG-compliant paths and
//! environment variable overrides. The gallery API key is only ever
//! taken from the environment.

use crate::error::{ConfigError, ConfigResult};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Primary environment variable holding the gallery API key.
pub const API_KEY_VAR: &str = "STOCKROOM_API_KEY";

/// Fallback environment variable for the API key, shared with the
/// maintenance scripts that read the same `.env` file.
pub const LEGACY_API_KEY_VAR: &str = "API_KEY";

/// Main application configuration.
///
/// This is loaded from `~/.config/stockroom/config.toml` (or platform equivalent).
/// If the file doesn't exist, default values are used.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Remote gallery API settings
    pub gallery: GalleryConfig,
    /// Browser automation settings
    pub browser: BrowserConfig,
    /// Local input and log file settings
    pub ingest: IngestConfig,
    /// Scrape targets and selectors
    pub source: SourceConfig,
}

impl AppConfig {
    /// Load configuration from the default location, falling back to defaults if not found.
    ///
    /// # Errors
    /// Returns error if:
    /// - Config directory cannot be determined
    /// - File exists but cannot be read
    /// - File contents are not valid TOML
    pub fn load() -> ConfigResult<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            tracing::debug!("Config file not found, using defaults");
            Ok(Self::default())
        }
    }

    /// Load configuration from an explicit path. The file must exist.
    pub fn load_from(path: &Path) -> ConfigResult<Self> {
        if !path.exists() {
            return Err(ConfigError::NotFound {
                path: path.display().to_string(),
            });
        }

        tracing::debug!("Loading config from {}", path.display());
        let contents = fs::read_to_string(path)?;
        let config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration with environment variable overrides.
    ///
    /// Uses `path` when given, otherwise the default location. Supports:
    /// - `STOCKROOM_HEADLESS`: Override browser headless mode (true/false)
    /// - `STOCKROOM_COMPLETED_LOG`: Override completion log path
    /// - `STOCKROOM_FAILED_LOG`: Override failure log path
    /// - `STOCKROOM_GALLERY_ENDPOINT`: Override gallery API endpoint
    /// - `STOCKROOM_API_KEY` (or `API_KEY`): Gallery API key
    pub fn load_with_env(path: Option<&Path>) -> ConfigResult<Self> {
        let mut config = match path {
            Some(path) => Self::load_from(path)?,
            None => Self::load()?,
        };
        config.apply_env_overrides(|name| std::env::var(name).ok());
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the pipeline cannot run with.
    pub fn validate(&self) -> ConfigResult<()> {
        let invalid = |field: &str, reason: &str| ConfigError::InvalidValue {
            field: field.to_string(),
            reason: reason.to_string(),
        };

        if self.ingest.keyword_cap == 0 || self.ingest.keyword_cap > 50 {
            return Err(invalid("ingest.keyword_cap", "must be between 1 and 50"));
        }
        if self.ingest.size_limit_bytes == 0 {
            return Err(invalid("ingest.size_limit_bytes", "must be greater than zero"));
        }
        if self.ingest.file_prefix.is_empty() {
            return Err(invalid("ingest.file_prefix", "must not be empty"));
        }
        if self.ingest.extensions.is_empty() {
            return Err(invalid("ingest.extensions", "must list at least one extension"));
        }
        if self.browser.render_rounds == 0 {
            return Err(invalid("browser.render_rounds", "must be at least 1"));
        }
        if self.source.search_url_base.is_empty() {
            return Err(invalid("source.search_url_base", "must not be empty"));
        }
        Ok(())
    }

    /// Apply overrides from a variable lookup (normally the process environment).
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(val) = lookup("STOCKROOM_HEADLESS") {
            if let Ok(headless) = val.parse() {
                self.browser.headless = headless;
                tracing::debug!("Override browser.headless from env: {}", headless);
            }
        }

        if let Some(val) = lookup("STOCKROOM_COMPLETED_LOG") {
            tracing::debug!("Override ingest.completed_log from env: {}", val);
            self.ingest.completed_log = PathBuf::from(val);
        }

        if let Some(val) = lookup("STOCKROOM_FAILED_LOG") {
            tracing::debug!("Override ingest.failed_log from env: {}", val);
            self.ingest.failed_log = PathBuf::from(val);
        }

        if let Some(val) = lookup("STOCKROOM_GALLERY_ENDPOINT") {
            tracing::debug!("Override gallery.endpoint from env: {}", val);
            self.gallery.endpoint = val;
        }

        let api_key = lookup(API_KEY_VAR)
            .or_else(|| lookup(LEGACY_API_KEY_VAR))
            .filter(|key| !key.trim().is_empty());
        if api_key.is_some() {
            self.gallery.api_key = api_key;
        }
    }

    /// Get the API key, failing if none was provided.
    pub fn require_api_key(&self) -> ConfigResult<&str> {
        self.gallery
            .api_key
            .as_deref()
            .ok_or_else(|| ConfigError::MissingCredential {
                variable: API_KEY_VAR.to_string(),
            })
    }

    /// Get the path to the configuration file.
    ///
    /// Uses XDG base directories: `~/.config/stockroom/config.toml`
    pub fn config_path() -> ConfigResult<PathBuf> {
        let dirs =
            ProjectDirs::from("com", "stockroom", "stockroom").ok_or(ConfigError::NoConfigDir)?;
        Ok(dirs.config_dir().join("config.toml"))
    }
}

/// Remote gallery API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GalleryConfig {
    /// Method-dispatch endpoint (all calls POST here)
    pub endpoint: String,
    /// Header carrying the API key
    pub api_key_header: String,
    /// API key (from the environment, never from the config file)
    #[serde(skip)]
    pub api_key: Option<String>,
    /// Album new assets are filed under
    pub category_id: u32,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for GalleryConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://mines.piwigo.com/ws.php?format=json".to_string(),
            api_key_header: "X-PIWIGO-API".to_string(),
            api_key: None,
            category_id: 3,
            timeout_secs: 30,
        }
    }
}

/// Browser automation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    /// Run browser in headless mode
    pub headless: bool,
    /// Browser window width
    pub window_width: u32,
    /// Browser window height
    pub window_height: u32,
    /// Navigation timeout in seconds
    pub navigation_timeout_secs: u64,
    /// How long to wait for an expected element, in milliseconds
    pub element_timeout_ms: u64,
    /// Pause after each scroll step while forcing lazy content to render
    pub settle_delay_ms: u64,
    /// Upper bound on render-forcing sweeps over a lazy list
    pub render_rounds: u32,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            // The alt-text tool stalls when the window is hidden.
            headless: false,
            window_width: 1920,
            window_height: 1080,
            navigation_timeout_secs: 30,
            element_timeout_ms: 10_000,
            settle_delay_ms: 250,
            render_rounds: 4,
        }
    }
}

/// Local input and log file settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// Append-only log of fully published assets
    pub completed_log: PathBuf,
    /// Per-run log of failed assets (truncated at start)
    pub failed_log: PathBuf,
    /// File name prefix before the deposit ID
    pub file_prefix: String,
    /// Marker between the deposit ID and the extension
    pub file_marker: String,
    /// Accepted file extensions (case-insensitive, without dot)
    pub extensions: Vec<String>,
    /// Files at or above this many bytes are rejected before any network call
    pub size_limit_bytes: u64,
    /// Maximum number of keywords kept per asset
    pub keyword_cap: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            completed_log: PathBuf::from("completed.tsv"),
            failed_log: PathBuf::from("failed.tsv"),
            file_prefix: "Depositphotos_".to_string(),
            file_marker: "_XL".to_string(),
            extensions: vec!["jpg".to_string()],
            size_limit_bytes: 19_500_000,
            keyword_cap: 50,
        }
    }
}

/// Scrape targets and the selectors used on them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Page of the alt-text generation tool
    pub alt_text_tool_url: String,
    /// File input on the tool page
    pub file_input_selector: String,
    /// Text field the tool writes its result into
    pub alt_text_selector: String,
    /// Search URL; the deposit ID is appended
    pub search_url_base: String,
    /// Heading holding the asset title
    pub title_selector: String,
    /// Medium-type decorations stripped from the end of titles
    pub title_suffixes: Vec<String>,
    /// Heading text shown when the search has no match
    pub not_found_title: String,
    /// Author badge element
    pub author_selector: String,
    /// Prefixes preceding the author name in the badge
    pub author_prefixes: Vec<String>,
    /// Keyword list container; the last match on the page is used
    pub keyword_list_selector: String,
    /// Keyword item inside the container
    pub keyword_item_selector: String,
    /// Publisher named in descriptions and attributions
    pub publisher: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            alt_text_tool_url: "https://www.tailwindapp.com/marketing/tools/image-alt-text-generator"
                .to_string(),
            file_input_selector: r#"input[type="file"]"#.to_string(),
            alt_text_selector: "textarea".to_string(),
            search_url_base: "https://depositphotos.com/search/".to_string(),
            title_selector: "h1".to_string(),
            title_suffixes: vec![" — Photo".to_string(), " — Vector".to_string()],
            not_found_title: "Sorry, but we haven't found anything".to_string(),
            author_selector: "._wdeBj".to_string(),
            author_prefixes: vec!["Photo by ".to_string(), "Vector by ".to_string()],
            keyword_list_selector: "._U57rH".to_string(),
            keyword_item_selector: "li".to_string(),
            publisher: "DepositPhotos".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.ingest.size_limit_bytes, 19_500_000);
        assert_eq!(config.ingest.keyword_cap, 50);
        assert_eq!(config.browser.element_timeout_ms, 10_000);
        assert_eq!(config.browser.settle_delay_ms, 250);
        assert_eq!(config.gallery.api_key_header, "X-PIWIGO-API");
        assert!(config.gallery.api_key.is_none());
    }

    #[test]
    fn test_config_serialization() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("[gallery]"));
        assert!(toml_str.contains("[browser]"));
        assert!(toml_str.contains("[ingest]"));
        assert!(toml_str.contains("[source]"));

        let parsed: AppConfig = toml::from_str(&toml_str).expect("parse serialized config");
        assert_eq!(parsed.source.publisher, config.source.publisher);
    }

    #[test]
    fn test_api_key_never_serialized() {
        let mut config = AppConfig::default();
        config.gallery.api_key = Some("secret-key".to_string());
        let toml_str = toml::to_string_pretty(&config).expect("serialize config");
        assert!(!toml_str.contains("secret-key"));
    }

    #[test]
    fn test_load_from_file() {
        let tmp = TempDir::new().expect("create temp dir");
        let config_path = tmp.path().join("config.toml");
        fs::write(
            &config_path,
            r#"
[ingest]
completed_log = "/var/lib/stockroom/completed.tsv"
keyword_cap = 30

[gallery]
category_id = 7
"#,
        )
        .expect("write config file");

        let config = AppConfig::load_from(&config_path).expect("load config");
        assert_eq!(
            config.ingest.completed_log,
            PathBuf::from("/var/lib/stockroom/completed.tsv")
        );
        assert_eq!(config.ingest.keyword_cap, 30);
        assert_eq!(config.gallery.category_id, 7);
        // These should be defaults
        assert_eq!(config.ingest.failed_log, PathBuf::from("failed.tsv"));
        assert_eq!(config.browser.render_rounds, 4);
    }

    #[test]
    fn test_load_from_missing_file() {
        let tmp = TempDir::new().expect("create temp dir");
        let err = AppConfig::load_from(&tmp.path().join("nope.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound { .. }));
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            ("STOCKROOM_HEADLESS", "true"),
            ("STOCKROOM_COMPLETED_LOG", "done.tsv"),
            ("STOCKROOM_GALLERY_ENDPOINT", "http://localhost:9000/ws.php"),
            ("API_KEY", "legacy-key"),
        ]
        .into_iter()
        .collect();

        let mut config = AppConfig::default();
        config.apply_env_overrides(|name| vars.get(name).map(ToString::to_string));

        assert!(config.browser.headless);
        assert_eq!(config.ingest.completed_log, PathBuf::from("done.tsv"));
        assert_eq!(config.gallery.endpoint, "http://localhost:9000/ws.php");
        assert_eq!(config.require_api_key().expect("api key"), "legacy-key");
    }

    #[test]
    fn test_primary_api_key_wins() {
        let vars: HashMap<&str, &str> = [("API_KEY", "legacy"), ("STOCKROOM_API_KEY", "primary")]
            .into_iter()
            .collect();

        let mut config = AppConfig::default();
        config.apply_env_overrides(|name| vars.get(name).map(ToString::to_string));
        assert_eq!(config.require_api_key().expect("api key"), "primary");
    }

    #[test]
    fn test_default_config_is_valid() {
        AppConfig::default().validate().expect("defaults validate");
    }

    #[test]
    fn test_keyword_cap_above_log_limit_rejected() {
        let mut config = AppConfig::default();
        config.ingest.keyword_cap = 73;
        let err = config.validate().unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue { ref field, .. } if field == "ingest.keyword_cap"
        ));
        assert_eq!(
            err.to_string(),
            "invalid config value for ingest.keyword_cap: must be between 1 and 50"
        );
    }

    #[test]
    fn test_zero_render_rounds_rejected() {
        let mut config = AppConfig::default();
        config.browser.render_rounds = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { ref field, .. }) if field == "browser.render_rounds"
        ));
    }

    #[test]
    fn test_missing_api_key() {
        let mut config = AppConfig::default();
        config.apply_env_overrides(|name| (name == "STOCKROOM_API_KEY").then(|| "  ".to_string()));

        let err = config.require_api_key().unwrap_err();
        assert!(matches!(err, ConfigError::MissingCredential { .. }));
    }
}
