use crate::collector::FeedSource;

pub const BLOOMBERG: &str = "https://feeds.bloomberg.com/markets/news.rss";
pub const CNBC: &str = "https://search.cnbc.com/rs/search/combinedcms/view.xml?partnerId=wrss01&id=10001147";
pub const WSJ: &str = "https://feeds.a.dj.com/rss/RSSMarketsMain.xml";

/// The built-in international market feeds.
pub fn international() -> Vec<FeedSource> {
    vec![
        FeedSource::international("Bloomberg", BLOOMBERG),
        FeedSource::international("CNBC", CNBC),
        FeedSource::international("WSJ", WSJ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{NewsCategory, SourceType};

    #[test]
    fn test_international_feeds() {
        let feeds = international();
        let names: Vec<_> = feeds.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["Bloomberg", "CNBC", "WSJ"]);
        for feed in &feeds {
            assert_eq!(feed.source_type, SourceType::International);
            assert_eq!(feed.category, Some(NewsCategory::International));
            assert_eq!(feed.language, "en");
            assert!(url::Url::parse(&feed.url).is_ok());
        }
    }
}
