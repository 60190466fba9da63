//! Built-in sources and the registry that turns configuration into
//! collectors.

pub mod cls;
pub mod eastmoney;
pub mod feeds;
pub mod pages;
pub mod sina;
pub mod stcn;

pub use cls::Cls;
pub use eastmoney::EastMoney;
pub use sina::Sina;
pub use stcn::Stcn;

use std::sync::Arc;

use crate::collector::{ApiCollector, Collector, FeedCollector, HtmlCollector, RenderedPageCollector};
use crate::config::Config;
use crate::fetcher::http_fetcher::HttpFetcher;
use crate::fetcher::Fetcher;
use crate::scraper::{ChromeScraper, Scraper};

/// Registered collectors in registration order, plus the browser they
/// share when any of them renders pages.
pub struct Catalog {
    pub collectors: Vec<Arc<dyn Collector>>,
    pub scraper: Option<Arc<dyn Scraper>>,
}

impl Catalog {
    /// Build every collector the configuration enables.
    ///
    /// Order: domestic HTTP sources, international feeds, configured feeds, built-in
    /// pages, configured pages. No client or browser is started here.
    pub fn from_config(config: &Config) -> Self {
        let scraper: Option<Arc<dyn Scraper>> = config
            .sources
            .needs_browser()
            .then(|| Arc::new(ChromeScraper::new(config.scraper.clone())) as Arc<dyn Scraper>);
        Self::with_scraper(config, scraper)
    }

    /// Like `from_config`, with the page scraper supplied by the caller.
    pub fn with_scraper(config: &Config, scraper: Option<Arc<dyn Scraper>>) -> Self {
        let fetcher = || -> Box<dyn Fetcher + Send + Sync> {
            Box::new(HttpFetcher::with_settings(config.http.timeout(), &config.http.user_agent))
        };

        let mut collectors: Vec<Arc<dyn Collector>> = Vec::new();

        if config.sources.domestic_api {
            collectors.push(Arc::new(ApiCollector::new(Cls, fetcher())));
            collectors.push(Arc::new(ApiCollector::new(EastMoney, fetcher())));
            collectors.push(Arc::new(ApiCollector::new(Sina, fetcher())));
            collectors.push(Arc::new(HtmlCollector::new(Stcn, fetcher())));
        }

        let mut feed_sources = Vec::new();
        if config.sources.international_feeds {
            feed_sources.extend(feeds::international());
        }
        feed_sources.extend(config.sources.feeds.iter().cloned());
        for source in feed_sources {
            collectors.push(Arc::new(FeedCollector::new(source, fetcher())));
        }

        let mut page_sources = Vec::new();
        if config.sources.rendered_pages {
            page_sources.extend(pages::builtin());
        }
        page_sources.extend(config.sources.pages.iter().cloned());
        match &scraper {
            Some(scraper) => {
                let settle = config.scraper.wait_after_load();
                for source in page_sources {
                    collectors.push(Arc::new(RenderedPageCollector::new(source, scraper.clone(), settle)));
                }
            }
            None if !page_sources.is_empty() => {
                tracing::warn!("{} rendered pages configured without a browser; skipping", page_sources.len());
            }
            None => {}
        }

        Self { collectors, scraper }
    }

    pub fn names(&self) -> Vec<&str> {
        self.collectors.iter().map(|c| c.name()).collect()
    }
}
