//! Progress types and stream adapters

use std::future::Future;

use bridge_traits::{ble::BlobWriteProgress, error::Result as BridgeResult};
use futures::stream::{self, BoxStream, StreamExt};
use serde::{Deserialize, Serialize};

/// Incremental update of one operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub position: u64,
    pub total: u64,
}

impl ProgressEvent {
    pub fn new(position: u64, total: u64) -> Self {
        Self { position, total }
    }

    /// Completion ratio in `0.0..=1.0`; zero-length operations report 1.0.
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            1.0
        } else {
            (self.position as f64 / self.total as f64).min(1.0)
        }
    }
}

impl From<BlobWriteProgress> for ProgressEvent {
    fn from(progress: BlobWriteProgress) -> Self {
        Self {
            position: progress.position,
            total: progress.total_length,
        }
    }
}

/// One item of an operation stream
#[derive(Debug, Clone, PartialEq)]
pub enum OperationUpdate<T> {
    Progress(ProgressEvent),
    Completed(T),
}

/// What [`OperationRunner`](crate::OperationRunner) consumes
pub type OperationStream<T> = BoxStream<'static, BridgeResult<OperationUpdate<T>>>;

/// Adapt a single-shot future into an operation with no progress.
pub fn single<T, Fut>(future: Fut) -> OperationStream<T>
where
    T: Send + 'static,
    Fut: Future<Output = BridgeResult<T>> + Send + 'static,
{
    stream::once(async move { future.await.map(OperationUpdate::Completed) }).boxed()
}

/// Adapt a BLOB write progress stream.
///
/// Each acknowledgement becomes a progress event. When the platform stream
/// ends, the operation completes with the number of bytes written.
pub fn blob_progress(
    progress: BoxStream<'static, BridgeResult<BlobWriteProgress>>,
) -> OperationStream<u64> {
    stream::unfold(
        (progress, 0u64, false),
        |(mut progress, written, done)| async move {
            if done {
                return None;
            }
            match progress.next().await {
                Some(Ok(step)) => Some((
                    Ok(OperationUpdate::Progress(step.into())),
                    (progress, step.position, false),
                )),
                Some(Err(e)) => Some((Err(e), (progress, written, true))),
                None => Some((Ok(OperationUpdate::Completed(written)), (progress, written, true))),
            }
        },
    )
    .boxed()
}
