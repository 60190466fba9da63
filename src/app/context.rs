use std::sync::Arc;

use crate::aggregator::Aggregator;
use crate::analyzer::{Analyzer, DigestAnalyzer};
use crate::cache::CacheState;
use crate::collector::sources::Catalog;
use crate::config::Config;
use crate::pipeline::Pipeline;

pub struct AppContext {
    pub config: Config,
    pub aggregator: Arc<Aggregator>,
    pub cache: CacheState,
}

impl AppContext {
    pub fn new(config: Config) -> Self {
        Self::with_analyzer(config, Arc::new(DigestAnalyzer::default()))
    }

    pub fn with_analyzer(config: Config, analyzer: Arc<dyn Analyzer>) -> Self {
        let catalog = Catalog::from_config(&config);
        Self::from_parts(config, Aggregator::from_catalog(catalog), analyzer)
    }

    pub fn from_parts(config: Config, aggregator: Aggregator, analyzer: Arc<dyn Analyzer>) -> Self {
        let aggregator = Arc::new(aggregator);
        let pipeline = Pipeline::new(aggregator.clone(), analyzer).publish_empty(config.cache.publish_empty);
        let cache = CacheState::new(Arc::new(pipeline));

        Self {
            config,
            aggregator,
            cache,
        }
    }

    /// Stop background work and release every client and the browser.
    pub async fn shutdown(&self) {
        self.cache.stop_scheduler().await;
        self.aggregator.close().await;
    }
}
