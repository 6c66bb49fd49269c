//! UI dispatcher
//!
//! Models the single UI-bound thread: closures posted from capability tasks
//! run one at a time, in posting order.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

type Job = Box<dyn FnOnce() + Send>;

#[derive(Clone)]
enum Mode {
    Queued(mpsc::UnboundedSender<Job>),
    Immediate,
}

/// Sequential executor for state mutations
#[derive(Clone)]
pub struct UiDispatcher {
    mode: Arc<Mode>,
}

impl UiDispatcher {
    /// Spawn the dispatcher loop on the current tokio runtime.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime, like `tokio::spawn`.
    pub fn spawn() -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<Job>();
        tokio::spawn(async move {
            while let Some(job) = rx.recv().await {
                job();
            }
            debug!("UI dispatcher stopped");
        });
        Self {
            mode: Arc::new(Mode::Queued(tx)),
        }
    }

    /// Run posted closures inline on the posting task.
    ///
    /// For hosts that already marshal to their UI thread, and for tests.
    pub fn immediate() -> Self {
        Self {
            mode: Arc::new(Mode::Immediate),
        }
    }

    pub fn post(&self, job: impl FnOnce() + Send + 'static) {
        match self.mode.as_ref() {
            Mode::Immediate => job(),
            Mode::Queued(tx) => {
                if tx.send(Box::new(job)).is_err() {
                    warn!("UI dispatcher closed, dropping update");
                }
            }
        }
    }

    /// Wait until everything posted before this call has run.
    pub async fn flush(&self) {
        let (tx, rx) = oneshot::channel();
        self.post(move || {
            tx.send(()).ok();
        });
        rx.await.ok();
    }
}

impl Default for UiDispatcher {
    fn default() -> Self {
        Self::immediate()
    }
}

impl std::fmt::Debug for UiDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mode = match self.mode.as_ref() {
            Mode::Queued(_) => "queued",
            Mode::Immediate => "immediate",
        };
        f.debug_struct("UiDispatcher").field("mode", &mode).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[tokio::test]
    async fn test_jobs_run_in_order() {
        let dispatcher = UiDispatcher::spawn();
        let seen = Arc::new(Mutex::new(Vec::new()));

        for i in 0..10 {
            let seen = Arc::clone(&seen);
            dispatcher.post(move || seen.lock().unwrap().push(i));
        }
        dispatcher.flush().await;

        assert_eq!(*seen.lock().unwrap(), (0..10).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_posts_from_many_tasks_all_run() {
        let dispatcher = UiDispatcher::spawn();
        let seen = Arc::new(Mutex::new(0usize));

        let mut tasks = Vec::new();
        for _ in 0..4 {
            let dispatcher = dispatcher.clone();
            let seen = Arc::clone(&seen);
            tasks.push(tokio::spawn(async move {
                for _ in 0..25 {
                    let seen = Arc::clone(&seen);
                    dispatcher.post(move || *seen.lock().unwrap() += 1);
                }
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }
        dispatcher.flush().await;

        assert_eq!(*seen.lock().unwrap(), 100);
    }

    #[test]
    fn test_immediate_runs_inline() {
        let dispatcher = UiDispatcher::immediate();
        let seen = Arc::new(Mutex::new(false));
        let s = Arc::clone(&seen);
        dispatcher.post(move || *s.lock().unwrap() = true);
        assert!(*seen.lock().unwrap());
    }
}
