use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::app::{FinwireError, Result};
use crate::collector::Collector;
use crate::domain::time::{beijing, resolve_clock_time};
use crate::domain::{truncate_chars, NewsItem, SourceType};
use crate::scraper::{ContentExtractor, RawEntry, ScrapeStrategy, Scraper};

pub const TITLE_LIMIT: usize = 500;

/// Navigation, footer and promo text that selectors tend to sweep up.
const STOPLIST: &[&str] = &[
    "登录",
    "下载APP",
    "下载客户端",
    "扫码",
    "广告合作",
    "免责声明",
    "版权所有",
    "关于我们",
    "联系我们",
    "用户协议",
    "隐私政策",
    "ICP备",
];

static WS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid whitespace regex"));

/// A page whose headlines only exist after its scripts have run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageSource {
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub source_type: SourceType,
    #[serde(default = "default_language")]
    pub language: String,
    /// Wait after navigation before extracting; the scraper default when unset.
    #[serde(default)]
    pub settle_ms: Option<u64>,
    pub strategy: ScrapeStrategy,
    #[serde(default = "default_limit")]
    pub limit: usize,
    #[serde(default = "default_min_title_chars")]
    pub min_title_chars: usize,
}

fn default_language() -> String {
    "zh".to_string()
}

fn default_limit() -> usize {
    30
}

fn default_min_title_chars() -> usize {
    10
}

impl PageSource {
    pub fn new(name: &str, url: &str, source_type: SourceType, strategy: ScrapeStrategy) -> Self {
        Self {
            name: name.to_string(),
            url: url.to_string(),
            source_type,
            language: default_language(),
            settle_ms: None,
            strategy,
            limit: default_limit(),
            min_title_chars: default_min_title_chars(),
        }
    }

    /// Turn raw script output into items.
    ///
    /// Entries are cleaned, filtered and deduplicated in page order, then
    /// capped at `limit`. `now` is the scrape time in the page's zone.
    pub fn refine(&self, raw: Vec<RawEntry>, now: DateTime<FixedOffset>) -> Vec<NewsItem> {
        let base = Url::parse(&self.url).ok();
        let mut seen = HashSet::new();
        let mut items = Vec::new();

        for entry in raw {
            if items.len() >= self.limit {
                break;
            }

            let title = WS_RE.replace_all(entry.title.trim(), " ").into_owned();
            if title.chars().count() < self.min_title_chars {
                continue;
            }
            if STOPLIST.iter().any(|phrase| title.contains(phrase)) {
                continue;
            }
            if !seen.insert(title.clone()) {
                continue;
            }

            let title = truncate_chars(&title, TITLE_LIMIT);
            let Ok(mut item) = NewsItem::new(&title, &self.name) else {
                continue;
            };
            item.url = Some(resolve_link(base.as_ref(), entry.url.as_deref()).unwrap_or_else(|| self.url.clone()));
            item.published_at = entry
                .time
                .as_deref()
                .and_then(|t| resolve_clock_time(t, now))
                .or(Some(now));
            item.source_type = self.source_type;
            item.language = self.language.clone();
            items.push(item);
        }

        items
    }
}

fn resolve_link(base: Option<&Url>, href: Option<&str>) -> Option<String> {
    let href = href?.trim();
    if href.is_empty() || href.starts_with("javascript:") {
        return None;
    }
    match base {
        Some(base) => base.join(href).ok().map(String::from),
        None => Url::parse(href).ok().map(String::from),
    }
}

pub struct RenderedPageCollector {
    source: PageSource,
    scraper: Arc<dyn Scraper>,
    default_settle: Duration,
}

impl RenderedPageCollector {
    pub fn new(source: PageSource, scraper: Arc<dyn Scraper>, default_settle: Duration) -> Self {
        Self {
            source,
            scraper,
            default_settle,
        }
    }

    fn settle(&self) -> Duration {
        self.source
            .settle_ms
            .map(Duration::from_millis)
            .unwrap_or(self.default_settle)
    }
}

#[async_trait]
impl Collector for RenderedPageCollector {
    fn name(&self) -> &str {
        &self.source.name
    }

    async fn collect(&self) -> Result<Vec<NewsItem>> {
        let script = ContentExtractor::extraction_script(&self.source.strategy);
        let value = self.scraper.evaluate(&self.source.url, self.settle(), &script).await?;

        let serde_json::Value::Array(values) = value else {
            return Err(FinwireError::Protocol(format!(
                "extraction on {} did not return a list",
                self.source.url
            )));
        };

        let raw: Vec<RawEntry> = values
            .into_iter()
            .filter_map(|v| serde_json::from_value(v).ok())
            .collect();
        tracing::debug!("{}: {} raw entries", self.source.name, raw.len());

        let now = Utc::now().with_timezone(&beijing());
        Ok(self.source.refine(raw, now))
    }

    // The browser is shared; the aggregator closes it once for everyone.
}
