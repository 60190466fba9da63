use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Client;

use crate::app::Result;
use crate::fetcher::{FetchRequest, Fetcher};

pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

/// reqwest-backed fetcher owned by a single collector.
///
/// The client is built on first use and dropped by `close`, so a collector
/// that never runs never opens a connection pool.
pub struct HttpFetcher {
    timeout: Duration,
    user_agent: String,
    client: Mutex<Option<Client>>,
}

impl HttpFetcher {
    pub fn new() -> Self {
        Self::with_settings(Duration::from_secs(30), DEFAULT_USER_AGENT)
    }

    pub fn with_settings(timeout: Duration, user_agent: &str) -> Self {
        Self {
            timeout,
            user_agent: user_agent.to_string(),
            client: Mutex::new(None),
        }
    }

    fn client(&self) -> Result<Client> {
        let mut slot = self.client.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(client) = slot.as_ref() {
            return Ok(client.clone());
        }

        let client = Client::builder()
            .timeout(self.timeout)
            .gzip(true)
            .brotli(true)
            .user_agent(self.user_agent.as_str())
            .build()?;
        *slot = Some(client.clone());
        Ok(client)
    }

    pub fn is_open(&self) -> bool {
        self.client
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, request: &FetchRequest) -> Result<Vec<u8>> {
        let mut headers = HeaderMap::new();
        for (key, value) in &request.headers {
            if let (Ok(name), Ok(value)) = (
                HeaderName::from_bytes(key.as_bytes()),
                HeaderValue::from_str(value),
            ) {
                headers.insert(name, value);
            }
        }

        let url = request.full_url()?;
        let response = self.client()?.get(url).headers(headers).send().await?;

        response.error_for_status_ref()?;

        let body = response.bytes().await?.to_vec();
        Ok(body)
    }

    async fn close(&self) {
        self.client
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }
}
