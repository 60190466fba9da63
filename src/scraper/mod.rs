//! Headless-browser access for rendered-page collectors.
//!
//! # Architecture
//!
//! ```text
//! RenderedPageCollector → Scraper (shared) → page → extraction script → RawEntry list
//! ```
//!
//! One [`ChromeScraper`] is shared by every rendered-page collector. The
//! browser process is launched on first use, and concurrent pages are
//! bounded by a semaphore so collectors never race on navigation.
//!
//! # Usage
//!
//! ```rust,ignore
//! use finwire::scraper::{ChromeScraper, ContentExtractor, Scraper, ScrapeStrategy, ScraperConfig};
//!
//! let scraper = ChromeScraper::new(ScraperConfig::default());
//! let script = ContentExtractor::extraction_script(&ScrapeStrategy::Anchors {
//!     href_contains: "caixin.com/20".into(),
//! });
//! let value = scraper.evaluate("https://finance.caixin.com/", settle, &script).await?;
//! scraper.close().await;
//! ```

mod chrome;
mod config;
mod extractor;
mod session;

pub use chrome::ChromeScraper;
pub use config::ScraperConfig;
pub use extractor::{ContentExtractor, ScrapeStrategy};

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use crate::app::Result;

/// One candidate headline as returned by an extraction script
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RawEntry {
    pub title: String,
    pub url: Option<String>,
    pub time: Option<String>,
}

/// Trait for rendered-page access
#[async_trait]
pub trait Scraper: Send + Sync {
    /// Navigate to `url`, wait `settle` for injected content, then evaluate
    /// `script` in the page and return its JSON result.
    async fn evaluate(&self, url: &str, settle: Duration, script: &str) -> Result<serde_json::Value>;

    /// Shut the browser down. Safe to call repeatedly or before first use.
    async fn close(&self);
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use super::*;
    use crate::app::FinwireError;

    /// Returns a fixed JSON value for every page.
    pub struct FakeScraper {
        value: std::result::Result<serde_json::Value, FinwireError>,
        pub visited: Mutex<Vec<(String, Duration)>>,
        pub closed: AtomicUsize,
    }

    impl FakeScraper {
        pub fn returning(value: serde_json::Value) -> Self {
            Self {
                value: Ok(value),
                visited: Mutex::new(Vec::new()),
                closed: AtomicUsize::new(0),
            }
        }

        pub fn failing(err: FinwireError) -> Self {
            Self {
                value: Err(err),
                visited: Mutex::new(Vec::new()),
                closed: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl Scraper for FakeScraper {
        async fn evaluate(&self, url: &str, settle: Duration, _script: &str) -> Result<serde_json::Value> {
            self.visited.lock().unwrap().push((url.to_string(), settle));
            match &self.value {
                Ok(v) => Ok(v.clone()),
                Err(FinwireError::ResourceExhausted(msg)) => Err(FinwireError::ResourceExhausted(msg.clone())),
                Err(e) => Err(FinwireError::Browser(e.to_string())),
            }
        }

        async fn close(&self) {
            self.closed.fetch_add(1, Ordering::SeqCst);
        }
    }
}
