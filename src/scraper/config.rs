use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the shared headless browser
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScraperConfig {
    /// Whether to run the browser in headless mode (default: true)
    pub headless: bool,

    /// Budget for one page: navigation, settle wait and extraction (default: 45)
    pub timeout_secs: u64,

    /// Settle wait used by pages that do not set their own, in milliseconds (default: 3000)
    pub wait_after_load_ms: u64,

    /// Maximum concurrent browser pages (default: 2)
    pub max_concurrency: usize,

    /// User agent string to use
    pub user_agent: Option<String>,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            headless: true,
            timeout_secs: 45,
            wait_after_load_ms: 3000,
            max_concurrency: 2,
            user_agent: Some(
                "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 \
                 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36"
                    .to_string(),
            ),
        }
    }
}

impl ScraperConfig {
    /// Get the page timeout as a Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Get the default settle wait as a Duration
    pub fn wait_after_load(&self) -> Duration {
        Duration::from_millis(self.wait_after_load_ms)
    }
}
