//! Boundary to the analysis stage that consumes each aggregation.
//!
//! The cache treats an analyzer's output as opaque JSON. [`DigestAnalyzer`]
//! is an offline implementation that summarizes the collection without any
//! model call.

use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;
use serde_json::Value;

use crate::aggregator::Aggregation;
use crate::app::{FinwireError, Result};
use crate::domain::time::beijing;
use crate::domain::NewsCategory;

#[async_trait]
pub trait Analyzer: Send + Sync {
    fn name(&self) -> &str;

    async fn analyze(&self, aggregation: &Aggregation) -> Result<Value>;
}

pub const DEFAULT_HEADLINES: usize = 20;

#[derive(Serialize)]
struct Headline<'a> {
    title: &'a str,
    source: &'a str,
    category: NewsCategory,
    #[serde(skip_serializing_if = "Option::is_none")]
    published_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    url: Option<&'a str>,
}

/// Category counts plus the newest headlines.
#[derive(Debug, Clone)]
pub struct DigestAnalyzer {
    headlines: usize,
}

impl DigestAnalyzer {
    pub fn new(headlines: usize) -> Self {
        Self { headlines }
    }
}

impl Default for DigestAnalyzer {
    fn default() -> Self {
        Self::new(DEFAULT_HEADLINES)
    }
}

#[async_trait]
impl Analyzer for DigestAnalyzer {
    fn name(&self) -> &str {
        "digest"
    }

    async fn analyze(&self, aggregation: &Aggregation) -> Result<Value> {
        let collection = &aggregation.collection;

        let categories: serde_json::Map<String, Value> = collection
            .count_by_category()
            .into_iter()
            .map(|(category, count)| (category.as_str().to_string(), Value::from(count)))
            .collect();

        let headlines: Vec<Headline<'_>> = collection
            .items
            .iter()
            .take(self.headlines)
            .map(|item| Headline {
                title: &item.title,
                source: &item.source,
                category: item.category,
                published_at: item.published_at.map(|t| t.to_rfc3339()),
                url: item.url.as_deref(),
            })
            .collect();
        let headlines = serde_json::to_value(headlines).map_err(|e| FinwireError::Analyzer(e.to_string()))?;

        let digest = serde_json::json!({
            "generated_at": Utc::now().with_timezone(&beijing()).to_rfc3339(),
            "collected_at": collection.collected_at.to_rfc3339(),
            "news_count": collection.len(),
            "categories": categories,
            "sources": aggregation.source_stats,
            "headlines": headlines,
        });
        Ok(digest)
    }
}


#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::collector::testing::item;
    use crate::domain::Collection;

    fn aggregation() -> Aggregation {
        let mut macro_item = item("财联社", "央行宣布降准0.5个百分点", Some("2024-01-01T10:00:00+08:00"));
        macro_item.category = NewsCategory::Macro;
        macro_item.url = Some("https://www.cls.cn/detail/1".into());
        let other = item("WSJ", "Markets open mixed", None);

        let mut stats = BTreeMap::new();
        stats.insert("财联社".to_string(), 1);
        stats.insert("WSJ".to_string(), 1);

        Aggregation {
            collection: Collection::new(vec![macro_item, other]),
            source_stats: stats,
        }
    }

    #[tokio::test]
    async fn test_digest_shape() {
        let digest = DigestAnalyzer::default().analyze(&aggregation()).await.unwrap();

        assert_eq!(digest["news_count"], 2);
        assert_eq!(digest["categories"]["macro"], 1);
        assert_eq!(digest["categories"]["other"], 1);
        assert_eq!(digest["sources"]["WSJ"], 1);

        let headlines = digest["headlines"].as_array().unwrap();
        assert_eq!(headlines[0]["title"], "央行宣布降准0.5个百分点");
        assert_eq!(headlines[0]["category"], "macro");
        assert_eq!(headlines[0]["published_at"], "2024-01-01T10:00:00+08:00");
        assert!(headlines[1].get("published_at").is_none());
        assert!(headlines[1].get("url").is_none());
    }

    #[tokio::test]
    async fn test_digest_limits_headlines() {
        let digest = DigestAnalyzer::new(1).analyze(&aggregation()).await.unwrap();
        assert_eq!(digest["headlines"].as_array().unwrap().len(), 1);
        assert_eq!(digest["news_count"], 2);
    }
}
