//! The shared, periodically refreshed result.
//!
//! [`CacheState`] is a cloneable handle. Every clone sees the same entry,
//! the same in-flight refresh and the same background scheduler.
//!
//! Concurrent callers never start more than one refresh: the first caller
//! creates a shared future and parks a weak handle to it, and everyone who
//! arrives before it completes awaits that same future.

mod scheduler;

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::future::{BoxFuture, Shared, WeakShared};
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::app::{FinwireError, Result};
use scheduler::Scheduler;

/// One published refresh result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub result: Value,
    pub updated_at: DateTime<Utc>,
    pub news_count: usize,
    pub source_stats: BTreeMap<String, usize>,
}

impl CacheEntry {
    /// Whether the entry is at most `max_age` old at `now`.
    pub fn is_fresh_at(&self, max_age: Duration, now: DateTime<Utc>) -> bool {
        match chrono::Duration::from_std(max_age) {
            Ok(max_age) => now - self.updated_at <= max_age,
            Err(_) => true,
        }
    }

    /// Read an entry previously written with [`CacheEntry::write_to`].
    pub fn read_from(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    pub fn write_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_vec_pretty(self)?)?;
        Ok(())
    }
}

/// What a refresh cycle hands to the cache.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub result: Value,
    pub news_count: usize,
    pub source_stats: BTreeMap<String, usize>,
}

/// Produces a new snapshot on demand.
#[async_trait]
pub trait Refresh: Send + Sync {
    async fn refresh(&self) -> Result<Snapshot>;
}

type RefreshOutcome = std::result::Result<Arc<CacheEntry>, Arc<FinwireError>>;
type RefreshFuture = Shared<BoxFuture<'static, RefreshOutcome>>;

struct Inner {
    source: Arc<dyn Refresh>,
    slot: RwLock<Option<Arc<CacheEntry>>>,
    inflight: Mutex<Option<WeakShared<BoxFuture<'static, RefreshOutcome>>>>,
    scheduler: tokio::sync::Mutex<Option<Scheduler>>,
}

#[derive(Clone)]
pub struct CacheState {
    inner: Arc<Inner>,
}

impl CacheState {
    pub fn new(source: Arc<dyn Refresh>) -> Self {
        Self {
            inner: Arc::new(Inner {
                source,
                slot: RwLock::new(None),
                inflight: Mutex::new(None),
                scheduler: tokio::sync::Mutex::new(None),
            }),
        }
    }

    /// The current entry, if any. Never triggers a refresh.
    pub fn snapshot(&self) -> Option<Arc<CacheEntry>> {
        self.inner
            .slot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Seed the cache with a previously published entry.
    ///
    /// Ignored if the cache already holds something newer.
    pub fn restore(&self, entry: CacheEntry) {
        let mut slot = self.inner.slot.write().unwrap_or_else(PoisonError::into_inner);
        if slot.as_ref().is_some_and(|current| current.updated_at > entry.updated_at) {
            return;
        }
        *slot = Some(Arc::new(entry));
    }

    /// Return the cached entry if it is at most `max_age` old, otherwise
    /// refresh first.
    ///
    /// A refresh that collected nothing leaves the previous entry in place,
    /// and that entry is returned; with nothing cached the error is returned.
    pub async fn get_or_refresh(&self, max_age: Duration) -> Result<Arc<CacheEntry>> {
        if let Some(entry) = self.fresh(max_age) {
            return Ok(entry);
        }

        match self.join_or_start(Some(max_age)).await {
            Ok(entry) => Ok(entry),
            Err(e) if e.is_degraded() => match self.snapshot() {
                Some(previous) => {
                    tracing::warn!("Refresh collected nothing; serving result from {}", previous.updated_at);
                    Ok(previous)
                }
                None => Err(FinwireError::Refresh(e)),
            },
            Err(e) => Err(FinwireError::Refresh(e)),
        }
    }

    /// Refresh now, or join a refresh that is already running.
    pub async fn refresh(&self) -> Result<Arc<CacheEntry>> {
        self.join_or_start(None).await.map_err(FinwireError::Refresh)
    }

    /// Start the background refresh loop. Returns false if one is running.
    pub async fn start_scheduler(&self, every: Duration) -> bool {
        let mut scheduler = self.inner.scheduler.lock().await;
        if scheduler.as_ref().is_some_and(|s| !s.is_finished()) {
            return false;
        }
        *scheduler = Some(Scheduler::spawn(self.clone(), every));
        true
    }

    /// Stop the background loop and wait for it. Interrupts a refresh the
    /// loop is waiting on; the cache keeps its last complete entry.
    pub async fn stop_scheduler(&self) {
        let scheduler = self.inner.scheduler.lock().await.take();
        if let Some(scheduler) = scheduler {
            scheduler.shutdown().await;
        }
    }

    pub async fn scheduler_running(&self) -> bool {
        self.inner
            .scheduler
            .lock()
            .await
            .as_ref()
            .is_some_and(|s| !s.is_finished())
    }

    fn fresh(&self, max_age: Duration) -> Option<Arc<CacheEntry>> {
        self.snapshot()
            .filter(|entry| entry.is_fresh_at(max_age, Utc::now()))
    }

    async fn join_or_start(&self, max_age: Option<Duration>) -> RefreshOutcome {
        let refresh: RefreshFuture = {
            let mut inflight = self.inner.inflight.lock().unwrap_or_else(PoisonError::into_inner);

            // another caller may have finished a refresh while we waited for the lock
            if let Some(entry) = max_age.and_then(|max_age| self.fresh(max_age)) {
                return Ok(entry);
            }

            match inflight.as_ref().and_then(WeakShared::upgrade) {
                Some(running) => running,
                None => {
                    let started = run_refresh(self.inner.clone()).boxed().shared();
                    *inflight = started.downgrade();
                    started
                }
            }
        };

        refresh.await
    }
}

async fn run_refresh(inner: Arc<Inner>) -> RefreshOutcome {
    tracing::debug!("Refresh started");
    let outcome = match inner.source.refresh().await {
        Ok(snapshot) => {
            let mut slot = inner.slot.write().unwrap_or_else(PoisonError::into_inner);
            let now = Utc::now();
            let updated_at = slot.as_ref().map_or(now, |previous| previous.updated_at.max(now));
            let entry = Arc::new(CacheEntry {
                result: snapshot.result,
                updated_at,
                news_count: snapshot.news_count,
                source_stats: snapshot.source_stats,
            });
            *slot = Some(entry.clone());
            Ok(entry)
        }
        Err(e) => Err(Arc::new(e)),
    };

    *inner.inflight.lock().unwrap_or_else(PoisonError::into_inner) = None;
    outcome
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    use super::*;

    /// Counts calls; each refresh takes `delay` and reports the call number.
    struct CountingSource {
        calls: AtomicUsize,
        delay: Duration,
        degraded: AtomicBool,
        failing: AtomicBool,
    }

    impl CountingSource {
        fn new(delay: Duration) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                delay,
                degraded: AtomicBool::new(false),
                failing: AtomicBool::new(false),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Refresh for CountingSource {
        async fn refresh(&self) -> Result<Snapshot> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            if self.failing.load(Ordering::SeqCst) {
                return Err(FinwireError::Protocol("upstream down".into()));
            }
            if self.degraded.load(Ordering::SeqCst) {
                return Err(FinwireError::Degraded);
            }
            Ok(Snapshot {
                result: serde_json::json!({ "call": call }),
                news_count: call,
                source_stats: BTreeMap::new(),
            })
        }
    }

    fn entry_aged(age: chrono::Duration) -> CacheEntry {
        CacheEntry {
            result: serde_json::json!({ "call": 0 }),
            updated_at: Utc::now() - age,
            news_count: 0,
            source_stats: BTreeMap::new(),
        }
    }

    const HOUR: Duration = Duration::from_secs(3600);

    #[tokio::test]
    async fn test_empty_cache_refreshes() {
        let source = CountingSource::new(Duration::ZERO);
        let cache = CacheState::new(source.clone());
        assert!(cache.snapshot().is_none());

        let entry = cache.get_or_refresh(HOUR).await.unwrap();
        assert_eq!(entry.result["call"], 1);
        assert_eq!(source.calls(), 1);

        let again = cache.get_or_refresh(HOUR).await.unwrap();
        assert!(Arc::ptr_eq(&entry, &again));
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test]
    async fn test_ttl_boundary() {
        let source = CountingSource::new(Duration::ZERO);
        let cache = CacheState::new(source.clone());

        cache.restore(entry_aged(chrono::Duration::seconds(59 * 60 + 59)));
        let entry = cache.get_or_refresh(HOUR).await.unwrap();
        assert_eq!(entry.result["call"], 0);
        assert_eq!(source.calls(), 0);

        let cache = CacheState::new(source.clone());
        cache.restore(entry_aged(chrono::Duration::seconds(60 * 60 + 1)));
        let entry = cache.get_or_refresh(HOUR).await.unwrap();
        assert_eq!(entry.result["call"], 1);
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_callers_share_one_refresh() {
        let source = CountingSource::new(Duration::from_millis(50));
        let cache = CacheState::new(source.clone());
        cache.restore(entry_aged(chrono::Duration::hours(2)));

        let callers: Vec<_> = (0..8)
            .map(|_| {
                let cache = cache.clone();
                tokio::spawn(async move { cache.get_or_refresh(HOUR).await.unwrap() })
            })
            .collect();

        let mut entries = Vec::new();
        for caller in callers {
            entries.push(caller.await.unwrap());
        }

        assert_eq!(source.calls(), 1);
        assert!(entries.iter().all(|e| Arc::ptr_eq(e, &entries[0])));
        assert_eq!(entries[0].result["call"], 1);
    }

    #[tokio::test]
    async fn test_refresh_after_completion_starts_new_cycle() {
        let source = CountingSource::new(Duration::ZERO);
        let cache = CacheState::new(source.clone());

        cache.refresh().await.unwrap();
        let second = cache.refresh().await.unwrap();
        assert_eq!(second.result["call"], 2);
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test]
    async fn test_degraded_refresh_keeps_previous_entry() {
        let source = CountingSource::new(Duration::ZERO);
        source.degraded.store(true, Ordering::SeqCst);
        let cache = CacheState::new(source.clone());
        cache.restore(entry_aged(chrono::Duration::hours(2)));
        let previous = cache.snapshot().unwrap();

        let served = cache.get_or_refresh(HOUR).await.unwrap();
        assert!(Arc::ptr_eq(&previous, &served));
        assert!(Arc::ptr_eq(&previous, &cache.snapshot().unwrap()));
        assert_eq!(source.calls(), 1);

        assert!(cache.refresh().await.unwrap_err().is_degraded());
    }

    #[tokio::test]
    async fn test_degraded_with_nothing_cached_is_an_error() {
        let source = CountingSource::new(Duration::ZERO);
        source.degraded.store(true, Ordering::SeqCst);
        let cache = CacheState::new(source);

        let err = cache.get_or_refresh(HOUR).await.unwrap_err();
        assert!(err.is_degraded());
        assert!(cache.snapshot().is_none());
    }

    #[tokio::test]
    async fn test_failed_refresh_leaves_cache_untouched() {
        let source = CountingSource::new(Duration::ZERO);
        source.failing.store(true, Ordering::SeqCst);
        let cache = CacheState::new(source.clone());
        cache.restore(entry_aged(chrono::Duration::hours(2)));

        let err = cache.get_or_refresh(HOUR).await.unwrap_err();
        assert!(matches!(err, FinwireError::Refresh(_)));
        assert_eq!(cache.snapshot().unwrap().result["call"], 0);
    }

    #[tokio::test]
    async fn test_updated_at_never_goes_backwards() {
        let source = CountingSource::new(Duration::ZERO);
        let cache = CacheState::new(source);
        let future = Utc::now() + chrono::Duration::hours(1);
        cache.restore(CacheEntry {
            updated_at: future,
            ..entry_aged(chrono::Duration::zero())
        });

        let entry = cache.refresh().await.unwrap();
        assert_eq!(entry.updated_at, future);
    }

    #[tokio::test]
    async fn test_restore_ignores_older_entry() {
        let cache = CacheState::new(CountingSource::new(Duration::ZERO));
        cache.restore(entry_aged(chrono::Duration::minutes(1)));
        cache.restore(entry_aged(chrono::Duration::minutes(10)));

        let age = Utc::now() - cache.snapshot().unwrap().updated_at;
        assert!(age < chrono::Duration::minutes(5));
    }

    #[tokio::test]
    async fn test_cancelled_caller_does_not_block_next_refresh() {
        let source = CountingSource::new(Duration::from_secs(60));
        let cache = CacheState::new(source.clone());

        let pending = tokio::time::timeout(Duration::from_millis(10), cache.refresh()).await;
        assert!(pending.is_err());
        assert!(cache.snapshot().is_none());

        // the abandoned refresh had no other waiters, so a new one starts
        let _ = tokio::time::timeout(Duration::from_millis(10), cache.refresh()).await;
        assert_eq!(source.calls(), 2);
    }

    #[test]
    fn test_entry_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("latest.json");
        let mut entry = entry_aged(chrono::Duration::minutes(3));
        entry.source_stats.insert("新浪财经".into(), 12);

        entry.write_to(&path).unwrap();
        assert_eq!(CacheEntry::read_from(&path).unwrap(), entry);
        assert!(CacheEntry::read_from(&dir.path().join("missing.json")).is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_scheduler_refreshes_each_interval() {
        let source = CountingSource::new(Duration::ZERO);
        let cache = CacheState::new(source.clone());

        assert!(cache.start_scheduler(Duration::from_secs(60)).await);
        assert!(!cache.start_scheduler(Duration::from_secs(60)).await);

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(source.calls(), 0);

        tokio::time::sleep(Duration::from_secs(31)).await;
        assert_eq!(source.calls(), 1);

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(source.calls(), 2);
        assert_eq!(cache.snapshot().unwrap().result["call"], 2);

        cache.stop_scheduler().await;
        assert!(!cache.scheduler_running().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_scheduler_survives_failures() {
        let source = CountingSource::new(Duration::ZERO);
        source.failing.store(true, Ordering::SeqCst);
        let cache = CacheState::new(source.clone());
        cache.start_scheduler(Duration::from_secs(10)).await;

        tokio::time::sleep(Duration::from_secs(35)).await;
        assert_eq!(source.calls(), 3);
        assert!(cache.snapshot().is_none());

        source.failing.store(false, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(cache.snapshot().unwrap().result["call"], 4);

        cache.stop_scheduler().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_interrupts_sleep_and_refresh() {
        let source = CountingSource::new(Duration::from_secs(600));
        let cache = CacheState::new(source.clone());
        cache.start_scheduler(Duration::from_secs(5)).await;

        // loop is now inside a long refresh
        tokio::time::sleep(Duration::from_secs(6)).await;
        assert_eq!(source.calls(), 1);

        let started = tokio::time::Instant::now();
        cache.stop_scheduler().await;
        assert!(started.elapsed() < Duration::from_secs(1));
        assert!(cache.snapshot().is_none());

        // restartable after stop
        assert!(cache.start_scheduler(Duration::from_secs(5)).await);
        cache.stop_scheduler().await;
    }
}
