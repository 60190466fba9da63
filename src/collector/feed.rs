use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::app::{ItemParseError, Result};
use crate::collector::{keep_parsed, Collector};
use crate::domain::{Classifier, NewsCategory, NewsItem, SourceType};
use crate::fetcher::{FetchRequest, Fetcher};
use crate::normalizer::{FeedEntry, Normalizer};

/// An RSS or Atom feed and the metadata stamped onto its items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedSource {
    pub name: String,
    pub url: String,
    #[serde(default = "default_feed_type")]
    pub source_type: SourceType,
    #[serde(default = "default_feed_language")]
    pub language: String,
    /// Fixed category for every item; classified by keyword when unset.
    #[serde(default)]
    pub category: Option<NewsCategory>,
}

fn default_feed_type() -> SourceType {
    SourceType::International
}

fn default_feed_language() -> String {
    "en".to_string()
}

impl FeedSource {
    /// An English-language international feed with the International category.
    pub fn international(name: &str, url: &str) -> Self {
        Self {
            name: name.to_string(),
            url: url.to_string(),
            source_type: SourceType::International,
            language: "en".to_string(),
            category: Some(NewsCategory::International),
        }
    }

    fn to_item(&self, entry: FeedEntry) -> std::result::Result<NewsItem, ItemParseError> {
        let mut item = NewsItem::new(&entry.title, &self.name)?;
        if !entry.content.is_empty() {
            item.content = entry.content;
        }
        item.url = entry.link;
        item.published_at = entry.published_at;
        item.source_type = self.source_type;
        item.language = self.language.clone();
        item.category = self
            .category
            .unwrap_or_else(|| Classifier::default().classify_item(&item.title, &item.content));
        Ok(item)
    }
}

pub struct FeedCollector {
    source: FeedSource,
    fetcher: Box<dyn Fetcher + Send + Sync>,
    normalizer: Normalizer,
}

impl FeedCollector {
    pub fn new(source: FeedSource, fetcher: Box<dyn Fetcher + Send + Sync>) -> Self {
        Self {
            source,
            fetcher,
            normalizer: Normalizer::new(),
        }
    }
}

#[async_trait]
impl Collector for FeedCollector {
    fn name(&self) -> &str {
        &self.source.name
    }

    async fn collect(&self) -> Result<Vec<NewsItem>> {
        let body = self.fetcher.fetch(&FetchRequest::get(&self.source.url)).await?;
        let entries = self.normalizer.normalize(&body)?;

        Ok(keep_parsed(
            &self.source.name,
            entries
                .into_iter()
                .map(|entry| entry.and_then(|e| self.source.to_item(e))),
        ))
    }

    async fn close(&self) {
        self.fetcher.close().await;
    }
}
