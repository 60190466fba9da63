use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;

use crate::app::{FinwireError, ItemParseError, Result};
use crate::collector::api::{list_at, typed};
use crate::collector::ApiSource;
use crate::domain::time::parse_beijing;
use crate::domain::{Classifier, NewsItem};
use crate::fetcher::FetchRequest;

pub const NAME: &str = "东方财富";
const ENDPOINT: &str = "https://newsapi.eastmoney.com/kuaixun/v1/getlist_102_ajaxResult_50_1_.html";
const SHOWTIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

static JSONP_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)var ajaxResult\s*=\s*(\{.*\})").expect("valid JSONP regex"));

#[derive(Debug, Deserialize)]
struct Live {
    #[serde(default)]
    title: String,
    #[serde(default)]
    digest: Option<String>,
    #[serde(default)]
    url_w: Option<String>,
    #[serde(default)]
    showtime: Option<String>,
}

/// 东方财富 live news list, served as JSONP.
#[derive(Debug, Clone, Copy, Default)]
pub struct EastMoney;

impl ApiSource for EastMoney {
    fn name(&self) -> &str {
        NAME
    }

    fn request(&self) -> FetchRequest {
        FetchRequest::get(ENDPOINT)
    }

    fn entries(&self, body: &[u8]) -> Result<Vec<Value>> {
        let text = String::from_utf8_lossy(body);
        let payload = JSONP_RE
            .captures(&text)
            .and_then(|caps| caps.get(1))
            .ok_or_else(|| FinwireError::Protocol(format!("{} response has no ajaxResult wrapper", NAME)))?;

        let mut value: Value = serde_json::from_str(payload.as_str())
            .map_err(|e| FinwireError::Protocol(format!("{} returned invalid JSON: {}", NAME, e)))?;
        Ok(list_at(&mut value, &["LivesList"]))
    }

    fn map_entry(&self, entry: Value) -> std::result::Result<NewsItem, ItemParseError> {
        let live: Live = typed(entry)?;
        let mut item = NewsItem::new(&live.title, NAME)?;

        if let Some(digest) = live.digest.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            item.content = digest.to_string();
        }
        item.url = live.url_w.filter(|u| !u.is_empty());
        item.published_at = live
            .showtime
            .as_deref()
            .and_then(|s| parse_beijing(s, SHOWTIME_FORMAT));
        item.category = Classifier::EASTMONEY.classify_item(&item.title, &item.content);
        Ok(item)
    }
}
