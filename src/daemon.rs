//! Long-running mode: keep the cache fresh until the process is told to stop.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::app::{AppContext, FinwireError, Result};
use crate::cache::CacheEntry;

#[derive(Debug, Clone)]
pub struct DaemonConfig {
    /// Refresh interval in seconds (default: 1800 = 30 minutes)
    pub refresh_interval_secs: u64,
    /// Maximum age of a restored result before the first refresh replaces it
    pub max_age_secs: u64,
    /// Whether to refresh immediately on start
    pub update_on_start: bool,
    /// Previously written result to seed the cache with
    pub warm_from: Option<PathBuf>,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            refresh_interval_secs: 1800,
            max_age_secs: 3600,
            update_on_start: true,
            warm_from: None,
        }
    }
}

impl DaemonConfig {
    /// Parse interval string like "1h", "30m", "6h", "1d"
    pub fn parse_interval(s: &str) -> std::result::Result<u64, String> {
        let s = s.trim().to_lowercase();

        let (number, unit, label) = if let Some(hours) = s.strip_suffix('h') {
            (hours, 3600, "hours")
        } else if let Some(minutes) = s.strip_suffix('m') {
            (minutes, 60, "minutes")
        } else if let Some(days) = s.strip_suffix('d') {
            (days, 86400, "days")
        } else if let Some(secs) = s.strip_suffix('s') {
            (secs, 1, "seconds")
        } else {
            (s.as_str(), 1, "interval")
        };

        let secs = number
            .parse::<u64>()
            .map_err(|_| format!("Invalid {}: {}. Use format like '1h', '30m', '1d'", label, number))?
            .checked_mul(unit)
            .ok_or_else(|| format!("Interval too large: {}", s))?;

        if secs == 0 {
            return Err("Interval must be greater than zero".to_string());
        }
        Ok(secs)
    }

    /// Format interval for display
    pub fn format_interval(secs: u64) -> String {
        if secs >= 86400 && secs.is_multiple_of(86400) {
            format!("{}d", secs / 86400)
        } else if secs >= 3600 && secs.is_multiple_of(3600) {
            format!("{}h", secs / 3600)
        } else if secs >= 60 && secs.is_multiple_of(60) {
            format!("{}m", secs / 60)
        } else {
            format!("{}s", secs)
        }
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }

    pub fn max_age(&self) -> Duration {
        Duration::from_secs(self.max_age_secs)
    }
}

pub struct Daemon {
    ctx: Arc<AppContext>,
    config: DaemonConfig,
}

impl Daemon {
    pub fn new(ctx: Arc<AppContext>, config: DaemonConfig) -> Self {
        Self { ctx, config }
    }

    /// Run until SIGINT or SIGTERM, then stop the scheduler and release
    /// every collector.
    pub async fn run(&self) -> Result<()> {
        self.start().await;
        let signal = shutdown_signal().await;
        tracing::info!("Daemon shutting down");
        self.ctx.shutdown().await;
        signal
    }

    /// Warm the cache, run the optional first refresh and start the
    /// background loop. Returns once the loop is running.
    pub async fn start(&self) {
        if let Some(path) = &self.config.warm_from {
            match CacheEntry::read_from(path) {
                Ok(entry) => {
                    tracing::info!(
                        news_count = entry.news_count,
                        "Restored result from {} ({})",
                        path.display(),
                        entry.updated_at
                    );
                    self.ctx.cache.restore(entry);
                }
                Err(e) => tracing::warn!("Could not restore {}: {}", path.display(), e),
            }
        }

        tracing::info!(
            "finwire daemon started (refresh interval: {}, PID: {})",
            DaemonConfig::format_interval(self.config.refresh_interval_secs),
            std::process::id()
        );

        if self.config.update_on_start {
            tracing::info!("Running initial refresh");
            match self.ctx.cache.get_or_refresh(self.config.max_age()).await {
                Ok(entry) => tracing::info!(
                    news_count = entry.news_count,
                    "Initial result ready ({})",
                    entry.updated_at
                ),
                Err(e) => tracing::warn!("Initial refresh failed: {}", e),
            }
        }

        self.ctx.cache.start_scheduler(self.config.refresh_interval()).await;
    }
}

#[cfg(unix)]
async fn shutdown_signal() -> Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| FinwireError::Other(format!("Failed to set up SIGTERM handler: {}", e)))?;
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| FinwireError::Other(format!("Failed to set up SIGINT handler: {}", e)))?;

    tokio::select! {
        _ = sigterm.recv() => {},
        _ = sigint.recv() => {},
    }
    Ok(())
}

#[cfg(windows)]
async fn shutdown_signal() -> Result<()> {
    tokio::signal::ctrl_c()
        .await
        .map_err(|e| FinwireError::Other(format!("Failed to listen for Ctrl-C: {}", e)))
}
