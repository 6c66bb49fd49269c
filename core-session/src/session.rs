//! # Sessions and Subscription Handles
//!
//! A [`Session`] is one running capability subscription. It exclusively owns
//! a [`SubscriptionHandle`]: the cancellation token plus the task pumping
//! readings out of the platform stream. Disposing the handle twice is a
//! no-op, and dropping it disposes it.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use bridge_traits::{capability::ReadingStream, CapabilityKind};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use uuid::Uuid;

/// Unique identifier for a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What a session delivers to its consumer
#[derive(Debug, Clone, PartialEq)]
pub enum SessionSignal<T> {
    Reading(T),
    /// The platform stream failed or closed; the session is gone.
    ///
    /// Not sent when the session is stopped on request.
    Ended { reason: String },
}

/// Why [`drive_stream`] returned
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamExit {
    Cancelled,
    Failed(String),
    Closed,
}

impl StreamExit {
    /// Reason text for an exit the consumer did not ask for.
    pub fn reason(&self) -> Option<String> {
        match self {
            StreamExit::Cancelled => None,
            StreamExit::Failed(message) => Some(message.clone()),
            StreamExit::Closed => Some("Reading stream closed".to_string()),
        }
    }
}

/// Forward items from `stream` to `on_item` until cancelled, failed or closed.
///
/// The token is checked before every delivery, so nothing reaches `on_item`
/// once cancellation has been requested.
pub async fn drive_stream<T, F>(
    mut stream: Box<dyn ReadingStream<T>>,
    token: &CancellationToken,
    mut on_item: F,
) -> StreamExit
where
    T: Send,
    F: FnMut(T),
{
    loop {
        let next = tokio::select! {
            biased;
            _ = token.cancelled() => return StreamExit::Cancelled,
            next = stream.next() => next,
        };

        if token.is_cancelled() {
            return StreamExit::Cancelled;
        }

        match next {
            Some(Ok(item)) => on_item(item),
            Some(Err(e)) => return StreamExit::Failed(e.to_string()),
            None => return StreamExit::Closed,
        }
    }
}

/// Exclusive owner of a running subscription task
pub struct SubscriptionHandle {
    token: CancellationToken,
    task: Mutex<Option<JoinHandle<()>>>,
    disposed: AtomicBool,
}

impl SubscriptionHandle {
    /// Spawn `work` on the current tokio runtime with a fresh token.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime, like `tokio::spawn`.
    pub fn spawn<F, Fut>(work: F) -> Self
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let token = CancellationToken::new();
        let task = tokio::spawn(work(token.clone()));
        Self {
            token,
            task: Mutex::new(Some(task)),
            disposed: AtomicBool::new(false),
        }
    }

    /// Cancel the subscription.
    ///
    /// Returns `true` only for the call that actually disposed the handle.
    pub fn dispose(&self) -> bool {
        if self.disposed.swap(true, Ordering::SeqCst) {
            return false;
        }
        self.token.cancel();
        // The task observes the token and exits on its own
        if let Ok(mut task) = self.task.lock() {
            task.take();
        }
        debug!("Subscription disposed");
        true
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }

    /// Whether the pump task has exited (or was released by `dispose`).
    pub fn is_finished(&self) -> bool {
        match self.task.lock() {
            Ok(task) => task.as_ref().map_or(true, |t| t.is_finished()),
            Err(_) => true,
        }
    }
}

impl Drop for SubscriptionHandle {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl std::fmt::Debug for SubscriptionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriptionHandle")
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

/// An active capability subscription
#[derive(Debug)]
pub struct Session<C> {
    id: SessionId,
    capability: CapabilityKind,
    config: C,
    started_at: DateTime<Utc>,
    handle: SubscriptionHandle,
}

impl<C> Session<C> {
    pub(crate) fn new(
        id: SessionId,
        capability: CapabilityKind,
        config: C,
        handle: SubscriptionHandle,
    ) -> Self {
        Self {
            id,
            capability,
            config,
            started_at: Utc::now(),
            handle,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn capability(&self) -> CapabilityKind {
        self.capability
    }

    pub fn config(&self) -> &C {
        &self.config
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Cancel the subscription. Safe to call more than once.
    pub fn dispose(&self) -> bool {
        self.handle.dispose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_traits::{error::Result as BridgeResult, BridgeError};
    use std::collections::VecDeque;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;

    struct VecStream(VecDeque<BridgeResult<u32>>);

    #[async_trait]
    impl ReadingStream<u32> for VecStream {
        async fn next(&mut self) -> Option<BridgeResult<u32>> {
            self.0.pop_front()
        }
    }

    struct PendingStream;

    #[async_trait]
    impl ReadingStream<u32> for PendingStream {
        async fn next(&mut self) -> Option<BridgeResult<u32>> {
            std::future::pending().await
        }
    }

    #[tokio::test]
    async fn test_drive_stream_until_closed() {
        let stream = VecStream(VecDeque::from(vec![Ok(1), Ok(2)]));
        let token = CancellationToken::new();
        let mut seen = Vec::new();

        let exit = drive_stream(Box::new(stream), &token, |v| seen.push(v)).await;
        assert_eq!(exit, StreamExit::Closed);
        assert_eq!(seen, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_drive_stream_stops_on_error() {
        let stream = VecStream(VecDeque::from(vec![
            Ok(1),
            Err(BridgeError::OperationFailed("gone".to_string())),
            Ok(3),
        ]));
        let token = CancellationToken::new();
        let mut seen = Vec::new();

        let exit = drive_stream(Box::new(stream), &token, |v| seen.push(v)).await;
        assert!(matches!(exit, StreamExit::Failed(ref m) if m.contains("gone")));
        assert_eq!(seen, vec![1]);
    }

    #[tokio::test]
    async fn test_drive_stream_cancelled_delivers_nothing() {
        let stream = VecStream(VecDeque::from(vec![Ok(1)]));
        let token = CancellationToken::new();
        token.cancel();

        let exit = drive_stream(Box::new(stream), &token, |_| panic!("delivered")).await;
        assert_eq!(exit, StreamExit::Cancelled);
    }

    #[tokio::test]
    async fn test_handle_dispose_is_idempotent() {
        let exits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&exits);

        let handle = SubscriptionHandle::spawn(move |token| async move {
            let exit = drive_stream(Box::new(PendingStream), &token, |_| {}).await;
            if exit == StreamExit::Cancelled {
                counter.fetch_add(1, Ordering::SeqCst);
            }
        });

        assert!(handle.dispose());
        assert!(!handle.dispose());
        assert!(handle.is_disposed());

        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        assert_eq!(exits.load(Ordering::SeqCst), 1);
    }
}
