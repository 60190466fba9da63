use serde::Deserialize;
use serde_json::Value;

use crate::app::{FinwireError, ItemParseError, Result};
use crate::collector::api::{list_at, typed};
use crate::collector::ApiSource;
use crate::domain::time::{from_unix, unix_from_value};
use crate::domain::{truncate_chars, Classifier, NewsItem};
use crate::fetcher::FetchRequest;

pub const NAME: &str = "财联社";
const ENDPOINT: &str = "https://www.cls.cn/nodeapi/updateTelegraphList";
const PAGE_SIZE: u32 = 50;
const TITLE_LIMIT: usize = 100;
const FALLBACK_TITLE_CHARS: usize = 50;

#[derive(Debug, Deserialize)]
struct Telegraph {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    ctime: Option<Value>,
}

/// 财联社 telegraph roll.
#[derive(Debug, Clone, Copy, Default)]
pub struct Cls;

impl ApiSource for Cls {
    fn name(&self) -> &str {
        NAME
    }

    fn request(&self) -> FetchRequest {
        FetchRequest::get(ENDPOINT)
            .query("app", "CailianpressWeb")
            .query("os", "web")
            .query("sv", "7.7.5")
            .query("rn", PAGE_SIZE)
    }

    fn entries(&self, body: &[u8]) -> Result<Vec<Value>> {
        let mut value: Value = serde_json::from_slice(body)
            .map_err(|e| FinwireError::Protocol(format!("{} returned invalid JSON: {}", NAME, e)))?;
        Ok(list_at(&mut value, &["data", "roll_data"]))
    }

    fn map_entry(&self, entry: Value) -> std::result::Result<NewsItem, ItemParseError> {
        let telegraph: Telegraph = typed(entry)?;
        let content = telegraph.content.unwrap_or_default().trim().to_string();
        let title = match telegraph.title.as_deref().map(str::trim) {
            Some(t) if !t.is_empty() => t.to_string(),
            _ => truncate_chars(&content, FALLBACK_TITLE_CHARS),
        };

        let mut item = NewsItem::new(&truncate_chars(&title, TITLE_LIMIT), NAME)?;
        if !content.is_empty() {
            item.content = content;
        }
        item.published_at = telegraph.ctime.as_ref().and_then(unix_from_value).and_then(from_unix);
        item.category = Classifier::CLS.classify_item(&title, &item.content);
        Ok(item)
    }
}
