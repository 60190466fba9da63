//! Configuration management for finwire.
//!
//! Configuration is read from `~/.config/finwire/config.toml` unless a path
//! is given on the command line. If the default file doesn't exist, one with
//! commented defaults is created.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::collector::{FeedSource, PageSource};
use crate::fetcher::http_fetcher::DEFAULT_USER_AGENT;
use crate::scraper::ScraperConfig;

/// Main configuration struct.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub http: HttpConfig,
    pub sources: SourcesConfig,
    pub cache: CacheConfig,
    pub scraper: ScraperConfig,
}

/// Settings shared by every HTTP-based collector.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub timeout_secs: u64,
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl HttpConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Which collectors get registered.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SourcesConfig {
    /// 财联社, 东方财富, 新浪财经, 证券时报
    pub domestic_api: bool,
    /// Bloomberg, CNBC, WSJ
    pub international_feeds: bool,
    /// Built-in pages that need a headless browser
    pub rendered_pages: bool,
    /// Extra RSS/Atom feeds
    pub feeds: Vec<FeedSource>,
    /// Extra rendered pages; these also need a browser
    pub pages: Vec<PageSource>,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            domestic_api: true,
            international_feeds: true,
            rendered_pages: false,
            feeds: Vec::new(),
            pages: Vec::new(),
        }
    }
}

impl SourcesConfig {
    pub fn needs_browser(&self) -> bool {
        self.rendered_pages || !self.pages.is_empty()
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Age after which a cached result is refreshed on read.
    pub max_age_minutes: u64,
    /// Background refresh period in service mode.
    pub refresh_interval_minutes: u64,
    /// Replace the cache even when a cycle collected nothing.
    pub publish_empty: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_age_minutes: 60,
            refresh_interval_minutes: 30,
            publish_empty: false,
        }
    }
}

impl CacheConfig {
    pub fn max_age(&self) -> Duration {
        Duration::from_secs(self.max_age_minutes.saturating_mul(60))
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_minutes.saturating_mul(60))
    }

    fn validate(&self) -> Result<(), String> {
        if self.refresh_interval_minutes == 0 {
            return Err("cache.refresh_interval_minutes must be greater than zero".to_string());
        }
        for (key, minutes) in [
            ("max_age_minutes", self.max_age_minutes),
            ("refresh_interval_minutes", self.refresh_interval_minutes),
        ] {
            if minutes.checked_mul(60).is_none() {
                return Err(format!("cache.{} is too large: {}", key, minutes));
            }
        }
        Ok(())
    }
}

impl Config {
    /// Load configuration from the default path.
    ///
    /// If the config file doesn't exist, creates a default one with comments.
    /// If the config file exists but is invalid, returns an error.
    /// Missing fields in the config file will use default values.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::default_config_path()?;

        if !config_path.exists() {
            Self::create_default_config(&config_path)?;
            return Ok(Self::default());
        }

        Self::load_from(&config_path)
    }

    /// Load configuration from an explicit path. The file must exist.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            source: e,
        })?;

        config.cache.validate().map_err(|message| ConfigError::Invalid {
            path: path.to_path_buf(),
            message,
        })?;
        Ok(config)
    }

    /// Get the default config file path: `~/.config/finwire/config.toml`
    pub fn default_config_path() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(config_dir.join("finwire").join("config.toml"))
    }

    /// Create a default config file with comments.
    fn create_default_config(path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let mut file = fs::File::create(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        file.write_all(Self::default_config_content().as_bytes())
            .map_err(|e| ConfigError::Io {
                path: path.to_path_buf(),
                source: e,
            })?;

        tracing::info!("Wrote default configuration to {}", path.display());
        Ok(())
    }

    /// Generate the default config file content with comments.
    fn default_config_content() -> &'static str {
        r##"# finwire configuration
#
# Every section and key is optional; anything left out uses the value shown.

[http]
# Per-request timeout for API and feed sources, in seconds
timeout_secs = 30
user_agent = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36"

[sources]
# 财联社, 东方财富 and 新浪财经 JSON APIs, 证券时报 list page
domestic_api = true

# Bloomberg, CNBC and WSJ RSS feeds
international_feeds = true

# 金十数据, 华尔街见闻 and 东财快讯 (needs Chrome or Chromium)
rendered_pages = false

# Extra feeds. category is one of macro, industry, company, international,
# other; leave it out to classify items by keyword.
#
# [[sources.feeds]]
# name = "FT"
# url = "https://www.ft.com/rss/home"
# source_type = "international"
# language = "en"
# category = "international"

# Extra rendered pages. strategy.kind is one of selector, anchors,
# time_marked.
#
# [[sources.pages]]
# name = "Example live"
# url = "https://example.com/live"
# source_type = "domestic"
# settle_ms = 3000
# strategy = { kind = "selector", item = ".live-item", text = ".content", time = ".time" }

[cache]
# A cached result older than this is refreshed on read
max_age_minutes = 60

# Background refresh period for `finwire serve`
refresh_interval_minutes = 30

# Replace the cached result even when every source came back empty
publish_empty = false

[scraper]
# Run browser in headless mode (no visible window)
headless = true

# Budget for one page: navigation, settle wait and extraction, in seconds
timeout_secs = 45

# Default wait after navigation for injected content (milliseconds)
wait_after_load_ms = 3000

# Maximum concurrent browser pages
max_concurrency = 2
"##
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error("Failed to read/write config file at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Invalid config file at {path}: {message}")]
    Invalid { path: PathBuf, message: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{NewsCategory, SourceType};
    use crate::scraper::ScrapeStrategy;

    #[test]
    fn test_default_config_deserializes() {
        let config: Config =
            toml::from_str(Config::default_config_content()).expect("Default config should be valid TOML");

        assert_eq!(config.http.timeout_secs, 30);
        assert!(config.sources.domestic_api);
        assert!(!config.sources.needs_browser());
        assert_eq!(config.cache.max_age(), Duration::from_secs(3600));
        assert_eq!(config.cache.refresh_interval(), Duration::from_secs(1800));
        assert_eq!(config.scraper.max_concurrency, 2);
    }

    #[test]
    fn test_empty_config() {
        let config: Config = toml::from_str("").expect("Empty config should work");
        assert_eq!(config.cache.max_age_minutes, 60);
        assert!(!config.cache.publish_empty);
        assert!(config.sources.feeds.is_empty());
    }

    #[test]
    fn test_partial_config_with_extra_sources() {
        let content = r##"
[sources]
international_feeds = false

[[sources.feeds]]
name = "FT"
url = "https://www.ft.com/rss/home"
category = "macro"

[[sources.pages]]
name = "财新"
url = "https://finance.caixin.com/"
strategy = { kind = "anchors", href_contains = "caixin.com/20" }
"##;
        let config: Config = toml::from_str(content).expect("Partial config should work");

        assert!(config.sources.domestic_api);
        assert!(!config.sources.international_feeds);
        assert_eq!(config.sources.feeds[0].category, Some(NewsCategory::Macro));
        assert_eq!(config.sources.feeds[0].source_type, SourceType::International);

        let page = &config.sources.pages[0];
        assert_eq!(page.source_type, SourceType::Domestic);
        assert_eq!(page.limit, 30);
        assert_eq!(page.min_title_chars, 10);
        assert_eq!(
            page.strategy,
            ScrapeStrategy::Anchors {
                href_contains: "caixin.com/20".into()
            }
        );
        assert!(config.sources.needs_browser());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[cache]\npublish_empty = true\n").unwrap();

        let config = Config::load_from(&path).unwrap();
        assert!(config.cache.publish_empty);
        assert_eq!(config.cache.refresh_interval_minutes, 30);
    }

    #[test]
    fn test_load_from_reports_parse_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[cache\n").unwrap();

        assert!(matches!(Config::load_from(&path), Err(ConfigError::Parse { .. })));
        assert!(matches!(
            Config::load_from(&dir.path().join("missing.toml")),
            Err(ConfigError::Io { .. })
        ));
    }

    #[test]
    fn test_create_default_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        Config::create_default_config(&path).unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.scraper.timeout_secs, 45);
    }

    #[test]
    fn test_zero_refresh_interval_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[cache]\nrefresh_interval_minutes = 0\n").unwrap();

        let err = Config::load_from(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
        assert!(err.to_string().contains("refresh_interval_minutes"));
    }

    #[test]
    fn test_oversized_minutes_rejected_not_panicking() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, format!("[cache]\nmax_age_minutes = {}\n", u64::MAX / 2)).unwrap();
        assert!(matches!(Config::load_from(&path), Err(ConfigError::Invalid { .. })));

        let cache = CacheConfig {
            max_age_minutes: u64::MAX,
            ..Default::default()
        };
        assert_eq!(cache.max_age(), Duration::from_secs(u64::MAX));
    }

}
