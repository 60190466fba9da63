use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::Page;
use futures::future::BoxFuture;
use futures::{FutureExt, StreamExt};
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;

use crate::app::{FinwireError, Result};
use crate::scraper::config::ScraperConfig;
use crate::scraper::session::{CloseOnDrop, Liveness, SessionSlot};
use crate::scraper::Scraper;

struct Session {
    browser: Browser,
    handler: JoinHandle<()>,
}

impl Liveness for Session {
    // the handler task ends when the CDP connection does
    fn is_alive(&self) -> bool {
        !self.handler.is_finished()
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.handler.abort();
    }
}

fn close_page(page: Page) -> BoxFuture<'static, ()> {
    async move {
        if let Err(e) = page.close().await {
            tracing::debug!("Failed to close page: {}", e);
        }
    }
    .boxed()
}

/// Chrome-based page scraper using chromiumoxide
///
/// The browser is launched lazily by the first `evaluate` and shared by
/// every caller afterwards. A browser that crashed or refused a new page is
/// relaunched on the next call.
pub struct ChromeScraper {
    config: ScraperConfig,
    session: SessionSlot<Session>,
    semaphore: Arc<Semaphore>,
}

impl ChromeScraper {
    pub fn new(config: ScraperConfig) -> Self {
        let semaphore = Arc::new(Semaphore::new(config.max_concurrency.max(1)));
        Self {
            config,
            session: SessionSlot::new(),
            semaphore,
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(ScraperConfig::default())
    }

    async fn launch(&self) -> Result<Session> {
        let mut builder = BrowserConfig::builder()
            .arg("--no-sandbox")
            .arg("--disable-gpu")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-software-rasterizer");

        if !self.config.headless {
            builder = builder.with_head();
        }

        let browser_config = builder
            .build()
            .map_err(|e| FinwireError::Browser(format!("Failed to build browser config: {}", e)))?;

        let (browser, mut handler) = Browser::launch(browser_config).await.map_err(|e| {
            FinwireError::Browser(format!(
                "Failed to launch browser: {}. Is Chrome or Chromium installed and in PATH?",
                e
            ))
        })?;

        let handler = tokio::spawn(async move {
            while let Some(_event) = handler.next().await {
                // drive the CDP connection
            }
        });

        tracing::info!("Headless browser launched");
        Ok(Session { browser, handler })
    }

    async fn scrape_page(&self, page: &Page, settle: Duration, script: &str) -> Result<serde_json::Value> {
        if let Some(ref ua) = self.config.user_agent {
            page.set_user_agent(ua)
                .await
                .map_err(|e| FinwireError::Browser(format!("Failed to set user agent: {}", e)))?;
        }

        page.wait_for_navigation()
            .await
            .map_err(|e| FinwireError::Browser(format!("Navigation failed: {}", e)))?;

        // content is injected after load; the fixed wait is the only readiness signal
        tokio::time::sleep(settle).await;

        page.evaluate(script)
            .await
            .map_err(|e| FinwireError::Browser(format!("Script execution failed: {}", e)))?
            .into_value()
            .map_err(|e| FinwireError::Browser(format!("Failed to parse result: {:?}", e)))
    }
}

#[async_trait]
impl Scraper for ChromeScraper {
    async fn evaluate(&self, url: &str, settle: Duration, script: &str) -> Result<serde_json::Value> {
        let _permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|e| FinwireError::ResourceExhausted(format!("Page pool closed: {}", e)))?;

        let page = self
            .session
            .run(
                || self.launch(),
                |session| async move {
                    session
                        .browser
                        .new_page(url)
                        .await
                        .map_err(|e| FinwireError::ResourceExhausted(format!("Failed to create page: {}", e)))
                },
            )
            .await?;

        // closes the tab even if this future is dropped mid-scrape
        let page = CloseOnDrop::new(page, close_page);
        let result = match page.get() {
            Some(tab) => tokio::time::timeout(self.config.timeout(), self.scrape_page(tab, settle, script))
                .await
                .unwrap_or_else(|_| Err(FinwireError::Browser(format!("Timed out rendering {}", url)))),
            None => Err(FinwireError::Browser(format!("Page for {} already closed", url))),
        };
        page.close().await;

        result
    }

    async fn close(&self) {
        let Some(session) = self.session.take().await else {
            return;
        };

        match Arc::try_unwrap(session) {
            Ok(mut session) => {
                if let Err(e) = session.browser.close().await {
                    tracing::warn!("Failed to close browser: {}", e);
                }
            }
            Err(_) => tracing::warn!("Browser still in use at shutdown; dropping handle"),
        }
        tracing::info!("Headless browser closed");
    }
}
