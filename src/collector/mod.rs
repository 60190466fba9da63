//! News collectors.
//!
//! Every source implements [`Collector`]. Four families share the work:
//!
//! - [`ApiCollector`]: JSON endpoints, one [`ApiSource`] per provider
//! - [`HtmlCollector`]: server-rendered listing pages, one [`HtmlSource`] each
//! - [`FeedCollector`]: RSS 2.0 / Atom documents
//! - [`RenderedPageCollector`]: pages that only exist after JavaScript runs
//!
//! The aggregator only ever calls [`Collector::safe_collect`], which turns
//! ordinary failures into an empty result plus a log line.

pub mod api;
pub mod feed;
pub mod html;
pub mod rendered;
pub mod sources;

pub use api::{ApiCollector, ApiSource};
pub use feed::{FeedCollector, FeedSource};
pub use html::{HtmlCollector, HtmlSource};
pub use rendered::{PageSource, RenderedPageCollector};

use async_trait::async_trait;

use crate::app::Result;
use crate::domain::NewsItem;

#[async_trait]
pub trait Collector: Send + Sync {
    /// Human-readable source name used in logs.
    fn name(&self) -> &str;

    /// One fetch-and-parse cycle against the source.
    async fn collect(&self) -> Result<Vec<NewsItem>>;

    /// Release the collector's client. Idempotent.
    async fn close(&self) {}

    /// `collect` with failure isolation.
    ///
    /// Ordinary failures are logged and yield no items. Only fatal errors
    /// (see [`FinwireError::is_fatal`](crate::app::FinwireError::is_fatal))
    /// are returned.
    async fn safe_collect(&self) -> Result<Vec<NewsItem>> {
        match self.collect().await {
            Ok(mut items) => {
                let before = items.len();
                items.retain(NewsItem::has_title);
                if items.len() < before {
                    tracing::debug!("{} dropped {} untitled items", self.name(), before - items.len());
                }
                tracing::info!(collector = self.name(), count = items.len(), "collected");
                Ok(items)
            }
            Err(e) if e.is_fatal() => {
                tracing::error!("{} hit a fatal error: {}", self.name(), e);
                Err(e)
            }
            Err(e) => {
                tracing::warn!("{} collection failed: {}", self.name(), e);
                Ok(Vec::new())
            }
        }
    }
}

/// Keep successfully mapped entries, logging the ones that were skipped.
pub(crate) fn keep_parsed<E: std::fmt::Display>(
    source: &str,
    results: impl IntoIterator<Item = std::result::Result<NewsItem, E>>,
) -> Vec<NewsItem> {
    results
        .into_iter()
        .filter_map(|result| match result {
            Ok(item) => Some(item),
            Err(e) => {
                tracing::debug!("Skipping {} entry: {}", source, e);
                None
            }
        })
        .collect()
}
