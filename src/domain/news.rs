use std::collections::BTreeMap;

use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};

use crate::app::ItemParseError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    #[default]
    Domestic,
    International,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum NewsCategory {
    Macro,
    Industry,
    Company,
    International,
    #[default]
    Other,
}

impl NewsCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Macro => "macro",
            Self::Industry => "industry",
            Self::Company => "company",
            Self::International => "international",
            Self::Other => "other",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsItem {
    pub title: String,
    pub content: String,
    pub source: String,
    pub source_type: SourceType,
    pub url: Option<String>,
    pub published_at: Option<DateTime<FixedOffset>>,
    pub category: NewsCategory,
    pub language: String,
    pub summary_zh: Option<String>,
}

impl NewsItem {
    /// Build an item with defaults for everything but title and source.
    ///
    /// The title is trimmed and must not be empty; `content` starts out as a
    /// copy of the title.
    pub fn new(title: &str, source: &str) -> Result<Self, ItemParseError> {
        let title = title.trim();
        if title.is_empty() {
            return Err(ItemParseError::EmptyTitle);
        }

        Ok(Self {
            title: title.to_string(),
            content: title.to_string(),
            source: source.to_string(),
            source_type: SourceType::Domestic,
            url: None,
            published_at: None,
            category: NewsCategory::Other,
            language: "zh".to_string(),
            summary_zh: None,
        })
    }

    pub fn has_title(&self) -> bool {
        !self.title.trim().is_empty()
    }
}

/// Truncate to at most `max` characters, never splitting a code point.
pub fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}

/// The ordered result of one aggregation cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Collection {
    pub items: Vec<NewsItem>,
    pub collected_at: DateTime<Utc>,
}

impl Collection {
    pub fn new(items: Vec<NewsItem>) -> Self {
        Self {
            items,
            collected_at: Utc::now(),
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn count_by_category(&self) -> BTreeMap<NewsCategory, usize> {
        let mut counts = BTreeMap::new();
        for item in &self.items {
            *counts.entry(item.category).or_insert(0) += 1;
        }
        counts
    }
}
