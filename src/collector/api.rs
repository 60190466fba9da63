use async_trait::async_trait;
use serde_json::Value;

use crate::app::{ItemParseError, Result};
use crate::collector::{keep_parsed, Collector};
use crate::domain::NewsItem;
use crate::fetcher::{FetchRequest, Fetcher};

/// One JSON endpoint: how to ask for it and how to read it.
pub trait ApiSource: Send + Sync {
    fn name(&self) -> &str;

    fn request(&self) -> FetchRequest;

    /// Extract the raw entry list from a response body.
    ///
    /// A body that cannot be read at all is a protocol error; a readable
    /// body without the expected list yields no entries.
    fn entries(&self, body: &[u8]) -> Result<Vec<Value>>;

    fn map_entry(&self, entry: Value) -> std::result::Result<NewsItem, ItemParseError>;
}

/// Collector for a single [`ApiSource`].
pub struct ApiCollector<S> {
    source: S,
    fetcher: Box<dyn Fetcher + Send + Sync>,
}

impl<S: ApiSource> ApiCollector<S> {
    pub fn new(source: S, fetcher: Box<dyn Fetcher + Send + Sync>) -> Self {
        Self { source, fetcher }
    }
}

#[async_trait]
impl<S: ApiSource> Collector for ApiCollector<S> {
    fn name(&self) -> &str {
        self.source.name()
    }

    async fn collect(&self) -> Result<Vec<NewsItem>> {
        let body = self.fetcher.fetch(&self.source.request()).await?;
        let entries = self.source.entries(&body)?;
        let total = entries.len();

        let items = keep_parsed(
            self.source.name(),
            entries.into_iter().map(|entry| self.source.map_entry(entry)),
        );
        if items.len() < total {
            tracing::debug!("{}: mapped {} of {} entries", self.source.name(), items.len(), total);
        }
        Ok(items)
    }

    async fn close(&self) {
        self.fetcher.close().await;
    }
}

/// Walk `path` through nested objects and return the array found there.
///
/// Anything missing or not an array along the way yields an empty list.
pub(crate) fn list_at(value: &mut Value, path: &[&str]) -> Vec<Value> {
    let mut current = value;
    for key in path {
        match current.get_mut(*key) {
            Some(next) => current = next,
            None => return Vec::new(),
        }
    }
    match current.take() {
        Value::Array(entries) => entries,
        _ => Vec::new(),
    }
}

/// Deserialize one raw entry into a source's typed record.
pub(crate) fn typed<T: serde::de::DeserializeOwned>(entry: Value) -> std::result::Result<T, ItemParseError> {
    serde_json::from_value(entry).map_err(|e| ItemParseError::Malformed(e.to_string()))
}
