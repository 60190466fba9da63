pub mod http_fetcher;

use async_trait::async_trait;
use url::Url;

use crate::app::Result;

/// One GET request against a source endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub url: String,
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
}

impl FetchRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            query: Vec::new(),
            headers: Vec::new(),
        }
    }

    pub fn query(mut self, key: &str, value: impl ToString) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }

    pub fn header(mut self, key: &str, value: &str) -> Self {
        self.headers.push((key.to_string(), value.to_string()));
        self
    }

    /// Final URL with the query parameters appended.
    pub fn full_url(&self) -> Result<Url> {
        if self.query.is_empty() {
            return Ok(Url::parse(&self.url)?);
        }
        Ok(Url::parse_with_params(&self.url, &self.query)?)
    }
}

#[async_trait]
pub trait Fetcher {
    /// Perform the request and return the body of a 2xx response.
    async fn fetch(&self, request: &FetchRequest) -> Result<Vec<u8>>;

    /// Release pooled connections. The next `fetch` starts a fresh client.
    async fn close(&self) {}
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use super::*;
    use crate::app::FinwireError;

    /// Serves a canned body and records the requests it saw.
    pub struct StaticFetcher {
        body: std::result::Result<Vec<u8>, String>,
        pub requests: Mutex<Vec<FetchRequest>>,
        pub closed: AtomicUsize,
    }

    impl StaticFetcher {
        pub fn ok(body: impl Into<Vec<u8>>) -> Self {
            Self {
                body: Ok(body.into()),
                requests: Mutex::new(Vec::new()),
                closed: AtomicUsize::new(0),
            }
        }

        pub fn failing(msg: &str) -> Self {
            Self {
                body: Err(msg.to_string()),
                requests: Mutex::new(Vec::new()),
                closed: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl Fetcher for StaticFetcher {
        async fn fetch(&self, request: &FetchRequest) -> Result<Vec<u8>> {
            self.requests.lock().unwrap().push(request.clone());
            self.body.clone().map_err(FinwireError::Other)
        }

        async fn close(&self) {
            self.closed.fetch_add(1, Ordering::SeqCst);
        }
    }

    /// Lets a test keep a handle on a fetcher that a collector owns.
    pub struct SharedFetcher(pub std::sync::Arc<StaticFetcher>);

    #[async_trait]
    impl Fetcher for SharedFetcher {
        async fn fetch(&self, request: &FetchRequest) -> Result<Vec<u8>> {
            self.0.fetch(request).await
        }

        async fn close(&self) {
            self.0.close().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_url_without_query() {
        let req = FetchRequest::get("https://example.com/feed.xml");
        assert_eq!(req.full_url().unwrap().as_str(), "https://example.com/feed.xml");
    }

    #[test]
    fn test_full_url_appends_params() {
        let req = FetchRequest::get("https://www.cls.cn/nodeapi/updateTelegraphList")
            .query("app", "CailianpressWeb")
            .query("rn", 50);
        assert_eq!(
            req.full_url().unwrap().as_str(),
            "https://www.cls.cn/nodeapi/updateTelegraphList?app=CailianpressWeb&rn=50"
        );
    }

    #[test]
    fn test_full_url_rejects_garbage() {
        assert!(FetchRequest::get("not a url").full_url().is_err());
    }
}
