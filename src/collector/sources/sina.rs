use serde::Deserialize;
use serde_json::Value;

use crate::app::{FinwireError, ItemParseError, Result};
use crate::collector::api::{list_at, typed};
use crate::collector::ApiSource;
use crate::domain::time::{from_unix, unix_from_value};
use crate::domain::{Classifier, NewsItem};
use crate::fetcher::FetchRequest;

pub const NAME: &str = "新浪财经";
const ENDPOINT: &str = "https://feed.mix.sina.com.cn/api/roll/get";

#[derive(Debug, Deserialize)]
struct RollEntry {
    #[serde(default)]
    title: String,
    #[serde(default)]
    intro: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    ctime: Option<Value>,
}

/// 新浪财经 rolling news list.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sina;

impl ApiSource for Sina {
    fn name(&self) -> &str {
        NAME
    }

    fn request(&self) -> FetchRequest {
        FetchRequest::get(ENDPOINT)
            .query("pageid", "153")
            .query("lid", "2516")
            .query("k", "")
            .query("num", 50)
            .query("page", 1)
    }

    fn entries(&self, body: &[u8]) -> Result<Vec<Value>> {
        let mut value: Value = serde_json::from_slice(body)
            .map_err(|e| FinwireError::Protocol(format!("{} returned invalid JSON: {}", NAME, e)))?;
        Ok(list_at(&mut value, &["result", "data"]))
    }

    fn map_entry(&self, entry: Value) -> std::result::Result<NewsItem, ItemParseError> {
        let entry: RollEntry = typed(entry)?;
        let mut item = NewsItem::new(&entry.title, NAME)?;

        if let Some(intro) = entry.intro.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            item.content = intro.to_string();
        }
        item.url = entry.url.filter(|u| !u.is_empty());
        item.published_at = entry.ctime.as_ref().and_then(unix_from_value).and_then(from_unix);
        item.category = Classifier::SINA.classify_item(&item.title, &item.content);
        Ok(item)
    }
}
