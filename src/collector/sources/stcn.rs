use ::scraper::{ElementRef, Html, Selector};
use chrono::{DateTime, FixedOffset};
use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

use crate::app::ItemParseError;
use crate::collector::HtmlSource;
use crate::domain::time::resolve_clock_time;
use crate::domain::{Classifier, NewsItem};
use crate::fetcher::FetchRequest;

pub const NAME: &str = "证券时报";
const PAGE_URL: &str = "https://www.stcn.com/article/list/gd.html";
const MIN_TITLE_CHARS: usize = 4;

static LIST_ITEM: Lazy<Selector> = Lazy::new(|| Selector::parse("ul.list > li").expect("valid selector"));
static TITLE_LINK: Lazy<Selector> = Lazy::new(|| Selector::parse("div.tt a").expect("valid selector"));
static SUMMARY: Lazy<Selector> = Lazy::new(|| Selector::parse("div.text").expect("valid selector"));
static INFO_SPAN: Lazy<Selector> = Lazy::new(|| Selector::parse("div.info span").expect("valid selector"));
static DETAIL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"/article/detail/\d+\.html").expect("valid detail regex"));

/// 证券时报 rolling news list.
#[derive(Debug, Clone, Copy, Default)]
pub struct Stcn;

impl HtmlSource for Stcn {
    fn name(&self) -> &str {
        NAME
    }

    fn request(&self) -> FetchRequest {
        FetchRequest::get(PAGE_URL)
    }

    fn parse(&self, html: &str, now: DateTime<FixedOffset>) -> Vec<Result<NewsItem, ItemParseError>> {
        let document = Html::parse_document(html);
        document.select(&LIST_ITEM).map(|li| map_entry(li, now)).collect()
    }
}

/// Text of every descendant node, each piece trimmed.
fn text_of(element: ElementRef<'_>) -> String {
    element.text().map(str::trim).collect()
}

fn map_entry(li: ElementRef<'_>, now: DateTime<FixedOffset>) -> Result<NewsItem, ItemParseError> {
    // the summary and thumbnail repeat the link; only the one under div.tt is the headline
    let (anchor, href) = li
        .select(&TITLE_LINK)
        .find_map(|a| {
            a.value()
                .attr("href")
                .filter(|href| DETAIL_RE.is_match(href))
                .map(|href| (a, href))
        })
        .ok_or_else(|| ItemParseError::Malformed("no article link".into()))?;

    let title = text_of(anchor);
    if !title.is_empty() && title.chars().count() < MIN_TITLE_CHARS {
        return Err(ItemParseError::Malformed(format!("title too short: {}", title)));
    }
    let mut item = NewsItem::new(&title, NAME)?;

    item.url = Url::parse(PAGE_URL)
        .and_then(|base| base.join(href))
        .map(String::from)
        .ok();

    if let Some(summary) = li.select(&SUMMARY).next().map(text_of).filter(|s| !s.is_empty()) {
        item.content = summary;
    }

    let spans: Vec<String> = li.select(&INFO_SPAN).map(text_of).collect();
    item.published_at = spans.iter().rev().find_map(|text| resolve_clock_time(text, now));

    item.category = Classifier::STCN.classify(&item.title);
    Ok(item)
}
