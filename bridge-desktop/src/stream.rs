//! Broadcast-backed reading stream

use async_trait::async_trait;
use bridge_traits::{capability::ReadingStream, error::Result, BridgeError};
use tokio::sync::broadcast;
use tracing::warn;

/// Message carried on a simulated device channel.
///
/// Errors travel as strings because `BridgeError` is not `Clone`.
pub(crate) type SimulatedItem<T> = std::result::Result<T, String>;

/// [`ReadingStream`] over a `tokio::sync::broadcast` receiver.
///
/// Lagging subscribers skip the missed readings; the stream ends when every
/// sender has been dropped.
pub struct BroadcastReadingStream<T> {
    receiver: broadcast::Receiver<SimulatedItem<T>>,
}

impl<T> BroadcastReadingStream<T> {
    pub(crate) fn new(receiver: broadcast::Receiver<SimulatedItem<T>>) -> Self {
        Self { receiver }
    }
}

#[async_trait]
impl<T> ReadingStream<T> for BroadcastReadingStream<T>
where
    T: Clone + Send + 'static,
{
    async fn next(&mut self) -> Option<Result<T>> {
        loop {
            match self.receiver.recv().await {
                Ok(Ok(reading)) => return Some(Ok(reading)),
                Ok(Err(message)) => return Some(Err(BridgeError::OperationFailed(message))),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Reading stream lagged, dropping readings");
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}
