use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, Utc};

use crate::app::{ItemParseError, Result};
use crate::collector::{keep_parsed, Collector};
use crate::domain::time::beijing;
use crate::domain::NewsItem;
use crate::fetcher::{FetchRequest, Fetcher};

/// A server-rendered listing page read without a browser.
pub trait HtmlSource: Send + Sync {
    fn name(&self) -> &str;

    fn request(&self) -> FetchRequest;

    /// One result per listed entry. `now` anchors wall-clock times shown on
    /// the page.
    fn parse(&self, html: &str, now: DateTime<FixedOffset>) -> Vec<std::result::Result<NewsItem, ItemParseError>>;
}

pub struct HtmlCollector<S> {
    source: S,
    fetcher: Box<dyn Fetcher + Send + Sync>,
}

impl<S: HtmlSource> HtmlCollector<S> {
    pub fn new(source: S, fetcher: Box<dyn Fetcher + Send + Sync>) -> Self {
        Self { source, fetcher }
    }
}

#[async_trait]
impl<S: HtmlSource> Collector for HtmlCollector<S> {
    fn name(&self) -> &str {
        self.source.name()
    }

    async fn collect(&self) -> Result<Vec<NewsItem>> {
        let body = self.fetcher.fetch(&self.source.request()).await?;
        let html = String::from_utf8_lossy(&body);
        let now = Utc::now().with_timezone(&beijing());

        let results = self.source.parse(&html, now);
        tracing::debug!("{}: {} listed entries", self.source.name(), results.len());
        Ok(keep_parsed(self.source.name(), results))
    }

    async fn close(&self) {
        self.fetcher.close().await;
    }
}
