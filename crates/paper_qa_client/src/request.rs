//! Correlation handles for long-running calls.
//!
//! A call started with [`spawn`] keeps running when the caller moves on; the
//! caller gets a [`Pending`] back and decides, using its [`RequestId`] and a
//! [`RequestTracker`], whether a late result is still wanted.

use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error::{ClientError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId(u64);

impl RequestId {
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

const NONE: u64 = 0;

/// Issues request ids for one scope and remembers which one is current.
/// Clones share state.
#[derive(Debug, Clone, Default)]
pub struct RequestTracker {
    inner: Arc<TrackerState>,
}

#[derive(Debug, Default)]
struct TrackerState {
    next: AtomicU64,
    current: AtomicU64,
}

impl RequestTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a fresh id without making it current.
    pub fn issue(&self) -> RequestId {
        RequestId(self.inner.next.fetch_add(1, Ordering::Relaxed) + 1)
    }

    /// Issue a fresh id and mark it current; earlier ids become stale.
    pub fn begin(&self) -> RequestId {
        let id = self.issue();
        self.inner.current.store(id.0, Ordering::Release);
        id
    }

    pub fn is_current(&self, id: RequestId) -> bool {
        self.inner.current.load(Ordering::Acquire) == id.0
    }

    pub fn current(&self) -> Option<RequestId> {
        match self.inner.current.load(Ordering::Acquire) {
            NONE => None,
            id => Some(RequestId(id)),
        }
    }

    /// Forget the current request, e.g. when its view is left. Does not cancel it.
    pub fn invalidate(&self) {
        self.inner.current.store(NONE, Ordering::Release);
    }
}

/// Result of a [`Pending`] call tagged with the id it was issued under.
#[derive(Debug)]
pub struct Completion<T> {
    pub id: RequestId,
    pub outcome: Result<T>,
}

impl<T> Completion<T> {
    /// The outcome, or `None` when `tracker` no longer considers this request current.
    pub fn if_current(self, tracker: &RequestTracker) -> Option<Result<T>> {
        if tracker.is_current(self.id) {
            Some(self.outcome)
        } else {
            tracing::debug!("discarding stale result for request {}", self.id);
            None
        }
    }
}

/// A call running on its own task.
#[derive(Debug)]
pub struct Pending<T> {
    id: RequestId,
    cancel: CancellationToken,
    handle: JoinHandle<Result<T>>,
}

/// Run `fut` on a new task under `id`. Must be called within a tokio runtime.
pub fn spawn<T, F>(id: RequestId, fut: F) -> Pending<T>
where
    T: Send + 'static,
    F: Future<Output = Result<T>> + Send + 'static,
{
    let cancel = CancellationToken::new();
    let token = cancel.clone();
    let handle = tokio::spawn(async move {
        tokio::select! {
            _ = token.cancelled() => Err(ClientError::Cancelled),
            outcome = fut => outcome,
        }
    });
    Pending { id, cancel, handle }
}

impl<T> Pending<T> {
    pub fn id(&self) -> RequestId {
        self.id
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Stop waiting for the backend. The outcome becomes [`ClientError::Cancelled`]
    /// unless the call had already completed.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub async fn wait(self) -> Completion<T> {
        let outcome = match self.handle.await {
            Ok(outcome) => outcome,
            Err(e) if e.is_cancelled() => Err(ClientError::Cancelled),
            Err(e) => std::panic::resume_unwind(e.into_panic()),
        };
        Completion {
            id: self.id,
            outcome,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn begin_makes_earlier_ids_stale() {
        let tracker = RequestTracker::new();
        assert_eq!(tracker.current(), None);
        let first = tracker.begin();
        let second = tracker.begin();
        assert!(first < second);
        assert!(!tracker.is_current(first));
        assert!(tracker.is_current(second));
        tracker.invalidate();
        assert!(!tracker.is_current(second));
    }

    #[test]
    fn clones_share_state() {
        let tracker = RequestTracker::new();
        let other = tracker.clone();
        let id = other.begin();
        assert!(tracker.is_current(id));
    }

    #[tokio::test]
    async fn completion_is_discarded_once_stale() {
        let tracker = RequestTracker::new();
        let id = tracker.begin();
        let pending = spawn(id, async { Ok::<_, ClientError>(7) });
        tracker.begin();
        let completion = pending.wait().await;
        assert_eq!(completion.id, id);
        assert!(completion.if_current(&tracker).is_none());
    }

    #[tokio::test]
    async fn cancel_resolves_to_cancelled() {
        let tracker = RequestTracker::new();
        let pending = spawn(tracker.begin(), async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok::<_, ClientError>(())
        });
        pending.cancel();
        let completion = pending.wait().await;
        assert!(matches!(completion.outcome, Err(ClientError::Cancelled)));
    }
}
