//! Concurrent fan-out over every registered collector.
//!
//! Each cycle runs all collectors at once and merges their output in
//! registration order. Repeated titles are dropped and the rest sorted
//! newest first.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use serde::Serialize;
use tokio::task::JoinSet;

use crate::app::Result;
use crate::collector::sources::Catalog;
use crate::collector::Collector;
use crate::domain::{Collection, NewsItem};
use crate::scraper::Scraper;

/// Output of one aggregation cycle.
#[derive(Debug, Clone, Serialize)]
pub struct Aggregation {
    pub collection: Collection,
    /// Items each source returned, counted before deduplication.
    pub source_stats: BTreeMap<String, usize>,
}

impl Aggregation {
    pub fn is_degraded(&self) -> bool {
        self.collection.is_empty()
    }
}

pub struct Aggregator {
    collectors: Vec<Arc<dyn Collector>>,
    scraper: Option<Arc<dyn Scraper>>,
}

impl Aggregator {
    pub fn new(collectors: Vec<Arc<dyn Collector>>) -> Self {
        Self {
            collectors,
            scraper: None,
        }
    }

    pub fn from_catalog(catalog: Catalog) -> Self {
        Self {
            collectors: catalog.collectors,
            scraper: catalog.scraper,
        }
    }

    pub fn collectors(&self) -> &[Arc<dyn Collector>] {
        &self.collectors
    }

    /// Run every collector concurrently and merge the results.
    ///
    /// A failing or panicking collector contributes nothing. A fatal error
    /// from any collector fails the cycle once every task has finished.
    /// Dropping the returned future aborts the outstanding tasks.
    pub async fn collect_all(&self) -> Result<Aggregation> {
        let mut tasks = JoinSet::new();
        for (idx, collector) in self.collectors.iter().enumerate() {
            let collector = collector.clone();
            tasks.spawn(async move { (idx, collector.safe_collect().await) });
        }

        let mut batches = Vec::with_capacity(self.collectors.len());
        let mut fatal = None;
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((idx, Ok(items))) => batches.push((idx, items)),
                Ok((_, Err(e))) if fatal.is_none() => fatal = Some(e),
                Ok((_, Err(_))) => {}
                Err(e) => tracing::error!("Collector task failed: {}", e),
            }
        }
        if let Some(e) = fatal {
            return Err(e);
        }

        batches.sort_by_key(|(idx, _)| *idx);
        let items: Vec<NewsItem> = batches.into_iter().flat_map(|(_, items)| items).collect();

        let total = items.len();
        let source_stats = count_by_source(&items);
        let mut items = dedup_by_title(items);
        sort_by_recency(&mut items);

        if items.is_empty() {
            tracing::warn!("No items collected from {} sources", self.collectors.len());
        } else {
            tracing::info!("Collected {} unique items ({} before dedup)", items.len(), total);
        }

        Ok(Aggregation {
            collection: Collection::new(items),
            source_stats,
        })
    }

    /// Close every collector and the shared browser. Safe to repeat.
    pub async fn close(&self) {
        for collector in &self.collectors {
            collector.close().await;
        }
        if let Some(scraper) = &self.scraper {
            scraper.close().await;
        }
    }
}

fn count_by_source(items: &[NewsItem]) -> BTreeMap<String, usize> {
    let mut stats = BTreeMap::new();
    for item in items {
        *stats.entry(item.source.clone()).or_insert(0) += 1;
    }
    stats
}

/// Keep the first item for each exact title.
pub fn dedup_by_title(items: Vec<NewsItem>) -> Vec<NewsItem> {
    let mut seen = HashSet::with_capacity(items.len());
    items
        .into_iter()
        .filter(|item| seen.insert(item.title.clone()))
        .collect()
}

/// Newest first; undated items last. Ties keep their input order.
pub fn sort_by_recency(items: &mut [NewsItem]) {
    items.sort_by(|a, b| b.published_at.cmp(&a.published_at));
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;
    use std::time::Duration;

    use super::*;
    use crate::app::FinwireError;
    use crate::collector::testing::{item, Behavior, StubCollector};
    use crate::scraper::testing::FakeScraper;

    fn aggregator(stubs: Vec<StubCollector>) -> Aggregator {
        Aggregator::new(
            stubs
                .into_iter()
                .map(|s| Arc::new(s) as Arc<dyn Collector>)
                .collect(),
        )
    }

    fn titles(aggregation: &Aggregation) -> Vec<(String, String)> {
        aggregation
            .collection
            .items
            .iter()
            .map(|i| (i.source.clone(), i.title.clone()))
            .collect()
    }

    #[tokio::test]
    async fn test_first_seen_title_wins_regardless_of_timestamp() {
        // fan-out order B, A, C
        let agg = aggregator(vec![
            StubCollector::new("B", Behavior::Items(vec![item("B", "title1", Some("2024-01-01T10:00:00+08:00"))])),
            StubCollector::new("A", Behavior::Items(vec![item("A", "title1", None)])),
            StubCollector::new("C", Behavior::Items(vec![item("C", "title2", Some("2024-01-01T09:00:00+08:00"))])),
        ]);

        let result = agg.collect_all().await.unwrap();
        assert_eq!(
            titles(&result),
            vec![("B".into(), "title1".into()), ("C".into(), "title2".into())]
        );
    }

    #[tokio::test]
    async fn test_merge_follows_registration_not_completion() {
        let agg = aggregator(vec![
            StubCollector::new("A", Behavior::Items(vec![item("A", "title1", None)]))
                .with_delay(Duration::from_millis(50)),
            StubCollector::new("B", Behavior::Items(vec![item("B", "title1", Some("2024-01-01T10:00:00+08:00"))])),
        ]);

        let result = agg.collect_all().await.unwrap();
        assert_eq!(titles(&result), vec![("A".into(), "title1".into())]);
        assert_eq!(result.source_stats.get("B"), Some(&1));
    }

    #[tokio::test]
    async fn test_failing_collector_is_isolated() {
        let agg = aggregator(vec![
            StubCollector::new("A", Behavior::Items(vec![item("A", "a1", Some("2024-01-01T08:00:00+08:00"))])),
            StubCollector::new("B", Behavior::Fail),
            StubCollector::new("P", Behavior::Panic),
            StubCollector::new("C", Behavior::Items(vec![item("C", "c1", Some("2024-01-01T09:00:00+08:00"))])),
        ]);

        let result = agg.collect_all().await.unwrap();
        assert_eq!(
            titles(&result),
            vec![("C".into(), "c1".into()), ("A".into(), "a1".into())]
        );
        assert!(!result.source_stats.contains_key("B"));
    }

    #[tokio::test]
    async fn test_fatal_error_fails_cycle_after_all_finish() {
        let slow = Arc::new(
            StubCollector::new("slow", Behavior::Items(vec![item("slow", "x", None)]))
                .with_delay(Duration::from_millis(30)),
        );
        let agg = Aggregator::new(vec![
            Arc::new(StubCollector::new("pages", Behavior::Fatal)) as Arc<dyn Collector>,
            slow.clone(),
        ]);

        let err = agg.collect_all().await.unwrap_err();
        assert!(matches!(err, FinwireError::ResourceExhausted(_)));
        assert_eq!(slow.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_all_failing_is_degraded_not_error() {
        let agg = aggregator(vec![
            StubCollector::new("A", Behavior::Fail),
            StubCollector::new("B", Behavior::Fail),
        ]);
        let result = agg.collect_all().await.unwrap();
        assert!(result.is_degraded());
        assert!(result.source_stats.is_empty());
    }

    #[tokio::test]
    async fn test_source_stats_count_before_dedup() {
        let agg = aggregator(vec![
            StubCollector::new("A", Behavior::Items(vec![item("A", "same", None), item("A", "other", None)])),
            StubCollector::new("B", Behavior::Items(vec![item("B", "same", None)])),
        ]);
        let result = agg.collect_all().await.unwrap();
        assert_eq!(result.collection.len(), 2);
        assert_eq!(result.source_stats.get("A"), Some(&2));
        assert_eq!(result.source_stats.get("B"), Some(&1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_collectors_run_concurrently() {
        let agg = aggregator(
            (0..5)
                .map(|i| {
                    let name = format!("S{}", i);
                    StubCollector::new(&name, Behavior::Items(vec![item(&name, &name, None)]))
                        .with_delay(Duration::from_secs(10))
                })
                .collect(),
        );

        let started = tokio::time::Instant::now();
        let result = agg.collect_all().await.unwrap();
        assert_eq!(result.collection.len(), 5);
        assert!(started.elapsed() < Duration::from_secs(20));
    }

    #[test]
    fn test_dedup_keeps_first() {
        let items = vec![item("A", "t", None), item("B", "t", None), item("C", "u", None)];
        let deduped = dedup_by_title(items);
        let sources: Vec<_> = deduped.iter().map(|i| i.source.as_str()).collect();
        assert_eq!(sources, vec!["A", "C"]);
        assert_eq!(dedup_by_title(deduped.clone()), deduped);
    }

    #[test]
    fn test_sort_is_stable_with_undated_last() {
        let mut items = vec![
            item("A", "undated-1", None),
            item("B", "early", Some("2024-01-01T08:00:00+08:00")),
            item("C", "tie-1", Some("2024-01-01T09:00:00+08:00")),
            item("D", "undated-2", None),
            item("E", "tie-2", Some("2024-01-01T01:00:00+00:00")),
        ];
        sort_by_recency(&mut items);

        let order: Vec<_> = items.iter().map(|i| i.title.as_str()).collect();
        assert_eq!(order, vec!["tie-1", "tie-2", "early", "undated-1", "undated-2"]);
    }

    #[tokio::test]
    async fn test_close_reaches_collectors_and_scraper() {
        let stub = Arc::new(StubCollector::new("A", Behavior::Fail));
        let scraper = Arc::new(FakeScraper::returning(serde_json::json!([])));
        let agg = Aggregator::from_catalog(Catalog {
            collectors: vec![stub.clone() as Arc<dyn Collector>],
            scraper: Some(scraper.clone() as Arc<dyn Scraper>),
        });

        agg.close().await;
        agg.close().await;
        assert_eq!(stub.closed.load(Ordering::SeqCst), 2);
        assert_eq!(scraper.closed.load(Ordering::SeqCst), 2);
    }
}
