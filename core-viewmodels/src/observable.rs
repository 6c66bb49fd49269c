//! Observable state container
//!
//! Plain state plus an explicit observer list. Every [`update`](Observable::update)
//! call is one batch: observers are notified once, after all mutations in
//! the closure, with a snapshot of the new state.

use std::sync::{Arc, Mutex};

use crate::lock;

/// Handle returned by [`Observable::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

type ObserverFn<S> = Arc<dyn Fn(&S) + Send + Sync>;

struct Inner<S> {
    state: S,
    observers: Vec<(ObserverId, ObserverFn<S>)>,
    next_id: u64,
}

/// Shared, observable state. Clones refer to the same state.
pub struct Observable<S> {
    inner: Arc<Mutex<Inner<S>>>,
}

impl<S> Clone for Observable<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: Clone + Send + 'static> Observable<S> {
    pub fn new(state: S) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                state,
                observers: Vec::new(),
                next_id: 0,
            })),
        }
    }

    /// Snapshot of the current state.
    pub fn get(&self) -> S {
        lock(&self.inner).state.clone()
    }

    /// Read part of the state without cloning all of it.
    pub fn with<R>(&self, read: impl FnOnce(&S) -> R) -> R {
        read(&lock(&self.inner).state)
    }

    /// Apply `mutate` and notify observers once.
    ///
    /// Observers run after the lock is released, so they may read the
    /// observable again.
    pub fn update<R>(&self, mutate: impl FnOnce(&mut S) -> R) -> R {
        let (result, snapshot, observers) = {
            let mut inner = lock(&self.inner);
            let result = mutate(&mut inner.state);
            let observers: Vec<ObserverFn<S>> =
                inner.observers.iter().map(|(_, f)| Arc::clone(f)).collect();
            (result, inner.state.clone(), observers)
        };

        for observer in observers {
            observer(&snapshot);
        }
        result
    }

    pub fn subscribe(&self, observer: impl Fn(&S) + Send + Sync + 'static) -> ObserverId {
        let mut inner = lock(&self.inner);
        let id = ObserverId(inner.next_id);
        inner.next_id += 1;
        inner.observers.push((id, Arc::new(observer)));
        id
    }

    /// Returns `false` if `id` was not subscribed.
    pub fn unsubscribe(&self, id: ObserverId) -> bool {
        let mut inner = lock(&self.inner);
        let before = inner.observers.len();
        inner.observers.retain(|(existing, _)| *existing != id);
        inner.observers.len() != before
    }

    pub fn observer_count(&self) -> usize {
        lock(&self.inner).observers.len()
    }
}

impl<S: Clone + Default + Send + 'static> Default for Observable<S> {
    fn default() -> Self {
        Self::new(S::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, Clone, Default, PartialEq)]
    struct Point {
        x: i32,
        y: i32,
    }

    #[test]
    fn test_batch_notifies_once() {
        let observable = Observable::new(Point::default());
        let count = Arc::new(AtomicUsize::new(0));
        let last = Arc::new(Mutex::new(None));

        let (c, l) = (Arc::clone(&count), Arc::clone(&last));
        observable.subscribe(move |p: &Point| {
            c.fetch_add(1, Ordering::SeqCst);
            *l.lock().unwrap() = Some(p.clone());
        });

        observable.update(|p| {
            p.x = 1;
            p.y = 2;
        });

        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(*last.lock().unwrap(), Some(Point { x: 1, y: 2 }));
    }

    #[test]
    fn test_unsubscribe() {
        let observable = Observable::new(0u32);
        let count = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&count);
        let id = observable.subscribe(move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        });

        observable.update(|v| *v += 1);
        assert!(observable.unsubscribe(id));
        assert!(!observable.unsubscribe(id));
        observable.update(|v| *v += 1);

        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(observable.get(), 2);
    }

    #[test]
    fn test_observer_may_read_state() {
        let observable = Observable::new(5u32);
        let reader = observable.clone();
        let seen = Arc::new(AtomicUsize::new(0));
        let s = Arc::clone(&seen);
        observable.subscribe(move |_| {
            s.store(reader.get() as usize, Ordering::SeqCst);
        });

        observable.update(|v| *v = 9);
        assert_eq!(seen.load(Ordering::SeqCst), 9);
    }
}
