use std::sync::Arc;

use async_trait::async_trait;

use crate::aggregator::Aggregator;
use crate::analyzer::Analyzer;
use crate::app::{FinwireError, Result};
use crate::cache::{Refresh, Snapshot};

/// One refresh cycle: collect everything, analyze it, hand the result to
/// the cache.
pub struct Pipeline {
    aggregator: Arc<Aggregator>,
    analyzer: Arc<dyn Analyzer>,
    publish_empty: bool,
}

impl Pipeline {
    pub fn new(aggregator: Arc<Aggregator>, analyzer: Arc<dyn Analyzer>) -> Self {
        Self {
            aggregator,
            analyzer,
            publish_empty: false,
        }
    }

    /// Publish cycles that collected nothing instead of reporting them as
    /// degraded.
    pub fn publish_empty(mut self, publish_empty: bool) -> Self {
        self.publish_empty = publish_empty;
        self
    }
}

#[async_trait]
impl Refresh for Pipeline {
    async fn refresh(&self) -> Result<Snapshot> {
        let aggregation = self.aggregator.collect_all().await?;
        tracing::info!(
            news_count = aggregation.collection.len(),
            "Collected from sources: {:?}",
            aggregation.source_stats
        );

        if aggregation.is_degraded() && !self.publish_empty {
            return Err(FinwireError::Degraded);
        }

        let result = self.analyzer.analyze(&aggregation).await?;
        tracing::info!("Analysis by {} finished", self.analyzer.name());

        Ok(Snapshot {
            result,
            news_count: aggregation.collection.len(),
            source_stats: aggregation.source_stats,
        })
    }
}
