use std::time::Duration;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::cache::CacheState;

/// A running background refresh loop.
pub(crate) struct Scheduler {
    shutdown_sender: broadcast::Sender<()>,
    task: JoinHandle<()>,
}

impl Scheduler {
    pub(crate) fn spawn(cache: CacheState, every: Duration) -> Self {
        let (shutdown_sender, shutdown_receiver) = broadcast::channel(1);
        let task = tokio::spawn(run(cache, every, shutdown_receiver));
        tracing::info!("Scheduler started, refreshing every {:?}", every);
        Self { shutdown_sender, task }
    }

    /// Signal the loop and wait for it to exit.
    pub(crate) async fn shutdown(self) {
        let _ = self.shutdown_sender.send(());
        if let Err(e) = self.task.await {
            tracing::error!("Scheduler task failed: {}", e);
        }
        tracing::info!("Scheduler stopped");
    }

    pub(crate) fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

async fn run(cache: CacheState, every: Duration, mut shutdown_receiver: broadcast::Receiver<()>) {
    loop {
        tokio::select! {
            _ = tokio::time::sleep(every) => {}
            _ = shutdown_receiver.recv() => break,
        }

        tracing::info!("Scheduled refresh starting");
        tokio::select! {
            result = cache.refresh() => match result {
                Ok(entry) => tracing::info!(
                    news_count = entry.news_count,
                    "Scheduled refresh finished"
                ),
                Err(e) if e.is_degraded() => {
                    tracing::warn!("Scheduled refresh collected nothing; keeping previous result")
                }
                Err(e) => tracing::error!("Scheduled refresh failed: {}", e),
            },
            _ = shutdown_receiver.recv() => break,
        }
    }
}
