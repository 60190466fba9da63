use crate::collector::PageSource;
use crate::domain::SourceType;
use crate::scraper::ScrapeStrategy;

/// The built-in rendered pages, in registration order.
pub fn builtin() -> Vec<PageSource> {
    vec![
        PageSource::new(
            "金十数据",
            "https://www.jin10.com/",
            SourceType::International,
            ScrapeStrategy::Selector {
                item: ".jin-flash-item".into(),
                text: Some(".right-content".into()),
                time: Some(".item-time".into()),
                link: None,
            },
        ),
        PageSource::new(
            "华尔街见闻",
            "https://wallstreetcn.com/live/global",
            SourceType::International,
            ScrapeStrategy::Selector {
                item: ".live-item".into(),
                text: Some(".live-item_main".into()),
                time: Some(".live-item_created".into()),
                link: None,
            },
        ),
        PageSource::new(
            "东财快讯",
            "https://kuaixun.eastmoney.com/",
            SourceType::Domestic,
            ScrapeStrategy::Selector {
                item: ".news_detail_link".into(),
                text: Some(".news_detail_text".into()),
                time: None,
                link: None,
            },
        ),
    ]
}
