use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use tokio::sync::Mutex;

use crate::app::Result;

/// Something that can report whether its connection is still usable.
pub(crate) trait Liveness {
    fn is_alive(&self) -> bool;
}

/// Lazily launched shared session that is relaunched after it breaks.
pub(crate) struct SessionSlot<S> {
    current: Mutex<Option<Arc<S>>>,
}

impl<S: Liveness> SessionSlot<S> {
    pub(crate) fn new() -> Self {
        Self {
            current: Mutex::new(None),
        }
    }

    /// Run `op` against the live session, launching one first if there is
    /// none or the cached one died. If `op` fails the session is dropped so
    /// the next call starts over.
    pub(crate) async fn run<T, L, LF, O, OF>(&self, launch: L, op: O) -> Result<T>
    where
        L: FnOnce() -> LF,
        LF: Future<Output = Result<S>>,
        O: FnOnce(Arc<S>) -> OF,
        OF: Future<Output = Result<T>>,
    {
        let session = self.get_or_launch(launch).await?;
        match op(session.clone()).await {
            Ok(value) => Ok(value),
            Err(e) => {
                self.discard(&session).await;
                Err(e)
            }
        }
    }

    async fn get_or_launch<L, LF>(&self, launch: L) -> Result<Arc<S>>
    where
        L: FnOnce() -> LF,
        LF: Future<Output = Result<S>>,
    {
        let mut current = self.current.lock().await;
        match current.as_ref() {
            Some(session) if session.is_alive() => return Ok(session.clone()),
            Some(_) => tracing::warn!("Browser connection lost; relaunching"),
            None => {}
        }

        let session = Arc::new(launch().await?);
        *current = Some(session.clone());
        Ok(session)
    }

    /// Forget `stale` unless another caller already replaced it.
    async fn discard(&self, stale: &Arc<S>) {
        let mut current = self.current.lock().await;
        if current.as_ref().is_some_and(|s| Arc::ptr_eq(s, stale)) {
            *current = None;
        }
    }

    pub(crate) async fn take(&self) -> Option<Arc<S>> {
        self.current.lock().await.take()
    }

    #[cfg(test)]
    pub(crate) async fn is_empty(&self) -> bool {
        self.current.lock().await.is_none()
    }
}

/// Owns a resource and hands it to `close` when dropped without being
/// closed explicitly, e.g. because the owning future was cancelled.
pub(crate) struct CloseOnDrop<T: Send + 'static> {
    value: Option<T>,
    close: fn(T) -> BoxFuture<'static, ()>,
}

impl<T: Send + 'static> CloseOnDrop<T> {
    pub(crate) fn new(value: T, close: fn(T) -> BoxFuture<'static, ()>) -> Self {
        Self {
            value: Some(value),
            close,
        }
    }

    pub(crate) fn get(&self) -> Option<&T> {
        self.value.as_ref()
    }

    pub(crate) async fn close(mut self) {
        if let Some(value) = self.value.take() {
            (self.close)(value).await;
        }
    }
}

impl<T: Send + 'static> Drop for CloseOnDrop<T> {
    fn drop(&mut self) {
        let Some(value) = self.value.take() else {
            return;
        };
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn((self.close)(value));
            }
            Err(_) => tracing::debug!("No runtime to close a dropped resource"),
        }
    }
}
