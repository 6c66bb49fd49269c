//! Operation observers
//!
//! [`TerminalGuard`] wraps any observer and enforces the delivery contract:
//! progress only before the terminal event, and at most one terminal event.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::warn;

use crate::error::OperationError;
use crate::progress::ProgressEvent;

/// Receives the outcome of an operation run
pub trait OperationObserver<T>: Send + Sync {
    fn on_progress(&self, event: ProgressEvent);

    fn on_complete(&self, result: T);

    fn on_error(&self, error: OperationError);
}

type ProgressFn = Box<dyn Fn(ProgressEvent) + Send + Sync>;
type CompleteFn<T> = Box<dyn Fn(T) + Send + Sync>;
type ErrorFn = Box<dyn Fn(OperationError) + Send + Sync>;

/// Observer assembled from closures; missing callbacks are ignored
pub struct CallbackObserver<T> {
    progress: Option<ProgressFn>,
    complete: Option<CompleteFn<T>>,
    error: Option<ErrorFn>,
}

impl<T> CallbackObserver<T> {
    pub fn new() -> Self {
        Self {
            progress: None,
            complete: None,
            error: None,
        }
    }

    pub fn on_progress(mut self, f: impl Fn(ProgressEvent) + Send + Sync + 'static) -> Self {
        self.progress = Some(Box::new(f));
        self
    }

    pub fn on_complete(mut self, f: impl Fn(T) + Send + Sync + 'static) -> Self {
        self.complete = Some(Box::new(f));
        self
    }

    pub fn on_error(mut self, f: impl Fn(OperationError) + Send + Sync + 'static) -> Self {
        self.error = Some(Box::new(f));
        self
    }
}

impl<T> Default for CallbackObserver<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Send> OperationObserver<T> for CallbackObserver<T> {
    fn on_progress(&self, event: ProgressEvent) {
        if let Some(f) = &self.progress {
            f(event);
        }
    }

    fn on_complete(&self, result: T) {
        if let Some(f) = &self.complete {
            f(result);
        }
    }

    fn on_error(&self, error: OperationError) {
        if let Some(f) = &self.error {
            f(error);
        }
    }
}

/// Delivers to an inner observer at most one terminal callback
pub struct TerminalGuard<T> {
    inner: Arc<dyn OperationObserver<T>>,
    finished: AtomicBool,
}

impl<T> TerminalGuard<T> {
    pub fn new(inner: Arc<dyn OperationObserver<T>>) -> Self {
        Self {
            inner,
            finished: AtomicBool::new(false),
        }
    }

    pub fn is_finished(&self) -> bool {
        self.finished.load(Ordering::SeqCst)
    }

    /// Forward progress unless the operation already finished.
    pub fn progress(&self, event: ProgressEvent) -> bool {
        if self.is_finished() {
            warn!(position = event.position, "Progress after terminal event dropped");
            return false;
        }
        self.inner.on_progress(event);
        true
    }

    /// Deliver completion. Returns `false` if a terminal event was already sent.
    pub fn complete(&self, result: T) -> bool {
        if self.finished.swap(true, Ordering::SeqCst) {
            return false;
        }
        self.inner.on_complete(result);
        true
    }

    /// Deliver an error. Returns `false` if a terminal event was already sent.
    pub fn fail(&self, error: OperationError) -> bool {
        if self.finished.swap(true, Ordering::SeqCst) {
            warn!(error = %error, "Second terminal event dropped");
            return false;
        }
        self.inner.on_error(error);
        true
    }
}
