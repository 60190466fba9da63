use crate::domain::NewsCategory;

/// Keyword-membership classifier.
///
/// Rules are checked in a fixed order (macro, international, industry,
/// company) and the first category with a keyword contained in the text wins.
#[derive(Debug, Clone, Copy)]
pub struct Classifier {
    macro_words: &'static [&'static str],
    international_words: &'static [&'static str],
    industry_words: &'static [&'static str],
    company_words: &'static [&'static str],
}

impl Classifier {
    pub const fn new(
        macro_words: &'static [&'static str],
        international_words: &'static [&'static str],
        industry_words: &'static [&'static str],
        company_words: &'static [&'static str],
    ) -> Self {
        Self {
            macro_words,
            international_words,
            industry_words,
            company_words,
        }
    }

    /// Table used by the 财联社 telegraph feed.
    pub const CLS: Classifier = Classifier::new(
        &["央行", "政策", "国务院", "发改委", "财政"],
        &["美股", "美联储", "欧洲", "日本", "外资"],
        &["板块", "行业", "概念", "涨停", "跌停"],
        &["公司", "股份", "集团", "业绩", "财报"],
    );

    /// Table used by the 新浪财经 roll feed.
    pub const SINA: Classifier = Classifier::new(
        &["央行", "政策", "国务院", "发改委", "财政"],
        &["美股", "美联储", "欧洲", "日本", "外资"],
        &["板块", "行业", "概念", "赛道"],
        &["公司", "股份", "集团", "业绩"],
    );

    /// Table used by the 东方财富 live list.
    pub const EASTMONEY: Classifier = Classifier::new(
        &["央行", "政策", "国务院", "发改委", "财政", "货币"],
        &["美股", "美联储", "欧洲", "日本", "外资", "港股"],
        &["板块", "行业", "概念", "赛道", "产业链"],
        &["公司", "股份", "集团", "业绩", "财报", "增持"],
    );

    /// Table used by the 证券时报 rolling list, applied to titles only.
    pub const STCN: Classifier = Classifier::new(
        &["央行", "政策", "国务院", "发改委", "财政", "证监会"],
        &["美股", "美联储", "欧洲", "日本", "外资"],
        &["板块", "行业", "概念", "赛道", "ETF"],
        &["公司", "股份", "集团", "业绩", "财报"],
    );

    pub fn classify(&self, text: &str) -> NewsCategory {
        let rules = [
            (NewsCategory::Macro, self.macro_words),
            (NewsCategory::International, self.international_words),
            (NewsCategory::Industry, self.industry_words),
            (NewsCategory::Company, self.company_words),
        ];

        rules
            .iter()
            .find(|(_, words)| words.iter().any(|w| text.contains(w)))
            .map(|(category, _)| *category)
            .unwrap_or(NewsCategory::Other)
    }

    /// Classify over the concatenation of title and content.
    pub fn classify_item(&self, title: &str, content: &str) -> NewsCategory {
        let mut text = String::with_capacity(title.len() + content.len());
        text.push_str(title);
        text.push_str(content);
        self.classify(&text)
    }
}

impl Default for Classifier {
    fn default() -> Self {
        Self::CLS
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priority_macro_before_international() {
        let c = Classifier::CLS;
        assert_eq!(c.classify("央行与美联储同步操作"), NewsCategory::Macro);
    }

    #[test]
    fn test_each_category() {
        let c = Classifier::CLS;
        assert_eq!(c.classify("美股三大指数收涨"), NewsCategory::International);
        assert_eq!(c.classify("半导体板块午后拉升"), NewsCategory::Industry);
        assert_eq!(c.classify("某集团发布年报"), NewsCategory::Company);
        assert_eq!(c.classify("今日天气晴"), NewsCategory::Other);
    }

    #[test]
    fn test_industry_beats_company_on_overlap() {
        // contains both 行业 and 公司
        let c = Classifier::SINA;
        assert_eq!(c.classify("行业龙头公司扩产"), NewsCategory::Industry);
    }

    #[test]
    fn test_tables_differ_per_source() {
        assert_eq!(Classifier::EASTMONEY.classify("港股午后走强"), NewsCategory::International);
        assert_eq!(Classifier::CLS.classify("港股午后走强"), NewsCategory::Other);
        assert_eq!(Classifier::CLS.classify("多股涨停"), NewsCategory::Industry);
        assert_eq!(Classifier::SINA.classify("多股涨停"), NewsCategory::Other);
        assert_eq!(Classifier::STCN.classify("证监会就新规征求意见"), NewsCategory::Macro);
        assert_eq!(Classifier::STCN.classify("红利ETF份额创新高"), NewsCategory::Industry);
    }

    #[test]
    fn test_classify_item_spans_title_and_content() {
        let c = Classifier::CLS;
        assert_eq!(c.classify_item("快讯", "国务院常务会议召开"), NewsCategory::Macro);
    }
}
