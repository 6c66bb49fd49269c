//! # Operation Runner
//!
//! Drives an [`OperationStream`] to completion while honouring a
//! cancellation token and an optional timeout.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use core_operation::{blob_progress, CallbackObserver, OperationRunner, RunOptions};
//!
//! let runner = OperationRunner::new();
//! let observer = CallbackObserver::new()
//!     .on_progress(|p| println!("{} of {}", p.position, p.total))
//!     .on_complete(|bytes| println!("wrote {}", bytes))
//!     .on_error(|e| eprintln!("{}", e));
//!
//! let handle = runner.spawn(
//!     blob_progress(characteristic.blob_write(data, false)),
//!     Arc::new(observer),
//!     RunOptions::new("blob_write"),
//! );
//! // From the loading dialog's Cancel button:
//! handle.cancel();
//! ```
//!
//! ## Race Resolution
//!
//! Each loop iteration polls, in this order: the cancellation token, the
//! timeout deadline, then the stream. The token is checked again after an
//! item arrives, so no progress is delivered once cancellation was requested.

use std::future::pending;
use std::sync::Arc;
use std::time::{Duration, Instant};

use core_runtime::events::{CoreEvent, EventBus, OperationEvent};
use futures::StreamExt;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::error::{OperationError, Result};
use crate::observer::{OperationObserver, TerminalGuard};
use crate::progress::{OperationStream, OperationUpdate};

/// Per-run settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOptions {
    /// Short label used in logs and events, e.g. "read"
    pub name: String,
    /// Fail with [`OperationError::Timeout`] if no result within this bound
    pub timeout: Option<Duration>,
}

impl RunOptions {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// How a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationOutcome {
    Completed,
    Failed,
    TimedOut,
    Cancelled,
}

/// Runs operations and reports to observers
#[derive(Clone, Default)]
pub struct OperationRunner {
    event_bus: Option<EventBus>,
}

impl OperationRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish operation events to `bus`.
    pub fn with_event_bus(bus: EventBus) -> Self {
        Self {
            event_bus: Some(bus),
        }
    }

    fn emit(&self, event: OperationEvent) {
        if let Some(bus) = &self.event_bus {
            bus.emit(CoreEvent::Operation(event)).ok();
        }
    }

    /// Drive `stream` until it completes, fails, times out or is cancelled.
    ///
    /// Exactly one of `on_complete` / `on_error` reaches `observer`, after all
    /// progress. Progress positions lower than the last delivered one are
    /// dropped; equal positions are delivered.
    #[instrument(skip_all, fields(operation = %options.name))]
    pub async fn run<T>(
        &self,
        mut stream: OperationStream<T>,
        observer: Arc<dyn OperationObserver<T>>,
        token: CancellationToken,
        options: RunOptions,
    ) -> OperationOutcome
    where
        T: Send + 'static,
    {
        let operation_id = Uuid::new_v4().to_string();
        let guard = TerminalGuard::new(observer);
        let started = Instant::now();
        let mut last_position: Option<u64> = None;

        debug!(operation_id = %operation_id, timeout = ?options.timeout, "Operation started");
        self.emit(OperationEvent::Started {
            operation_id: operation_id.clone(),
            name: options.name.clone(),
        });

        let deadline = async {
            match options.timeout {
                Some(timeout) => tokio::time::sleep(timeout).await,
                None => pending::<()>().await,
            }
        };
        tokio::pin!(deadline);

        loop {
            let next = tokio::select! {
                biased;
                _ = token.cancelled() => None,
                _ = &mut deadline => {
                    let timeout = options.timeout.unwrap_or_default();
                    warn!(operation_id = %operation_id, timeout_ms = timeout.as_millis() as u64, "Operation timed out");
                    guard.fail(OperationError::Timeout(timeout));
                    self.emit(OperationEvent::TimedOut {
                        operation_id,
                        timeout_ms: timeout.as_millis() as u64,
                    });
                    return OperationOutcome::TimedOut;
                }
                item = stream.next() => Some(item),
            };

            let item = match next {
                Some(item) if !token.is_cancelled() => item,
                _ => {
                    info!(operation_id = %operation_id, last_position, "Operation cancelled");
                    guard.fail(OperationError::Cancelled);
                    self.emit(OperationEvent::Cancelled {
                        operation_id,
                        last_position,
                    });
                    return OperationOutcome::Cancelled;
                }
            };

            match item {
                Some(Ok(OperationUpdate::Progress(event))) => {
                    if matches!(last_position, Some(last) if event.position < last) {
                        warn!(
                            operation_id = %operation_id,
                            position = event.position,
                            last = last_position,
                            "Progress went backwards, dropping"
                        );
                        continue;
                    }
                    last_position = Some(event.position);
                    guard.progress(event);
                    self.emit(OperationEvent::Progress {
                        operation_id: operation_id.clone(),
                        position: event.position,
                        total: event.total,
                    });
                }
                Some(Ok(OperationUpdate::Completed(result))) => {
                    let elapsed_ms = started.elapsed().as_millis() as u64;
                    info!(operation_id = %operation_id, elapsed_ms, "Operation completed");
                    guard.complete(result);
                    self.emit(OperationEvent::Completed {
                        operation_id,
                        elapsed_ms,
                    });
                    return OperationOutcome::Completed;
                }
                Some(Err(e)) => {
                    let error = OperationError::from(e);
                    warn!(operation_id = %operation_id, error = %error, "Operation failed");
                    self.emit(OperationEvent::Failed {
                        operation_id,
                        message: error.to_string(),
                    });
                    guard.fail(error);
                    return OperationOutcome::Failed;
                }
                None => {
                    let error =
                        OperationError::Transport("Operation ended without a result".to_string());
                    warn!(operation_id = %operation_id, "Operation stream ended early");
                    self.emit(OperationEvent::Failed {
                        operation_id,
                        message: error.to_string(),
                    });
                    guard.fail(error);
                    return OperationOutcome::Failed;
                }
            }
        }
    }

    /// Run on a new tokio task and return a handle for cancellation.
    pub fn spawn<T>(
        &self,
        stream: OperationStream<T>,
        observer: Arc<dyn OperationObserver<T>>,
        options: RunOptions,
    ) -> OperationHandle
    where
        T: Send + 'static,
    {
        let token = CancellationToken::new();
        let runner = self.clone();
        let task_token = token.clone();
        let task =
            tokio::spawn(async move { runner.run(stream, observer, task_token, options).await });
        OperationHandle { token, task }
    }
}

impl std::fmt::Debug for OperationRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OperationRunner")
            .field("event_bus", &self.event_bus.is_some())
            .finish()
    }
}

/// A spawned run
///
/// Dropping the handle before the run ends cancels it. Keep the handle for as
/// long as the run should continue.
pub struct OperationHandle {
    token: CancellationToken,
    task: JoinHandle<OperationOutcome>,
}

impl OperationHandle {
    /// Request cancellation. The observer receives `Cancelled` unless the
    /// run already finished.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Token that cancels this run, for wiring into UI callbacks.
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the run to end.
    pub async fn wait(mut self) -> Result<OperationOutcome> {
        (&mut self.task)
            .await
            .map_err(|e| OperationError::Transport(format!("Operation task failed: {}", e)))
    }
}

impl Drop for OperationHandle {
    fn drop(&mut self) {
        if !self.task.is_finished() {
            debug!("Operation handle dropped, cancelling run");
            self.token.cancel();
        }
    }
}
