//! # Event Bus System
//!
//! Broadcasts capability session and long-running operation lifecycle events
//! using `tokio::sync::broadcast`.
//!
//! ## Overview
//!
//! Session controllers and the operation runner publish to an optional
//! [`EventBus`]. Hosts (diagnostics screens, analytics, tests) subscribe
//! without the publishers knowing about them.
//!
//! ```text
//! ┌───────────────────┐  emit   ┌───────────┐  subscribe  ┌────────────┐
//! │ SessionController ├────────>│           ├────────────>│ Subscriber │
//! └───────────────────┘         │ EventBus  │             └────────────┘
//! ┌───────────────────┐  emit   │           │  subscribe  ┌────────────┐
//! │ OperationRunner   ├────────>│           ├────────────>│ Subscriber │
//! └───────────────────┘         └───────────┘             └────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use core_runtime::events::{CoreEvent, EventBus, SessionEvent};
//! use bridge_traits::{AccessState, CapabilityKind};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let bus = EventBus::new(16);
//! let mut stream = bus.subscribe();
//!
//! bus.emit(CoreEvent::Session(SessionEvent::AccessChanged {
//!     capability: CapabilityKind::Gps,
//!     access: AccessState::Available,
//! }))
//! .ok();
//!
//! let event = stream.recv().await.unwrap();
//! assert_eq!(event.description(), "Capability access changed");
//! # }
//! ```
//!
//! ## Error Handling
//!
//! - **`RecvError::Lagged(n)`**: the subscriber missed `n` events; it may keep
//!   receiving.
//! - **`RecvError::Closed`**: every sender is gone; treat as shutdown.
//!
//! Emitting with no subscribers returns an error that publishers ignore with
//! `.ok()`.

use bridge_traits::{AccessState, CapabilityKind};
use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;

pub use tokio::sync::broadcast::error::{RecvError, SendError};
pub use tokio::sync::broadcast::Receiver;

/// Default buffer size for the event bus channel.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 100;

// ============================================================================
// Core Event Types
// ============================================================================

/// Top-level event published on the bus.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "payload")]
pub enum CoreEvent {
    /// Capability access and session lifecycle
    Session(SessionEvent),
    /// Long-running operation progress and outcome
    Operation(OperationEvent),
}

impl CoreEvent {
    /// Returns a human-readable description of the event.
    pub fn description(&self) -> &str {
        match self {
            CoreEvent::Session(e) => e.description(),
            CoreEvent::Operation(e) => e.description(),
        }
    }

    /// Returns the severity level of the event.
    pub fn severity(&self) -> EventSeverity {
        match self {
            CoreEvent::Session(SessionEvent::Failed { .. }) => EventSeverity::Error,
            CoreEvent::Operation(OperationEvent::Failed { .. }) => EventSeverity::Error,
            CoreEvent::Operation(OperationEvent::TimedOut { .. }) => EventSeverity::Warning,
            CoreEvent::Session(SessionEvent::AccessChanged { access, .. })
                if !access.is_available() =>
            {
                EventSeverity::Warning
            }
            CoreEvent::Session(SessionEvent::Started { .. })
            | CoreEvent::Session(SessionEvent::Stopped { .. })
            | CoreEvent::Operation(OperationEvent::Completed { .. })
            | CoreEvent::Operation(OperationEvent::Cancelled { .. }) => EventSeverity::Info,
            _ => EventSeverity::Debug,
        }
    }
}

/// Event severity levels for filtering and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventSeverity {
    Debug,
    Info,
    Warning,
    Error,
}

// ============================================================================
// Session Events
// ============================================================================

/// Events emitted by capability session controllers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum SessionEvent {
    /// An access check or request produced a new state.
    AccessChanged {
        capability: CapabilityKind,
        access: AccessState,
    },
    /// A session became active.
    Started {
        session_id: String,
        capability: CapabilityKind,
    },
    /// A session was stopped on request or on teardown.
    Stopped {
        session_id: String,
        capability: CapabilityKind,
    },
    /// The underlying subscription failed and the session ended.
    Failed {
        session_id: String,
        capability: CapabilityKind,
        message: String,
    },
}

impl SessionEvent {
    fn description(&self) -> &str {
        match self {
            SessionEvent::AccessChanged { .. } => "Capability access changed",
            SessionEvent::Started { .. } => "Session started",
            SessionEvent::Stopped { .. } => "Session stopped",
            SessionEvent::Failed { .. } => "Session failed",
        }
    }
}

// ============================================================================
// Operation Events
// ============================================================================

/// Events emitted by the operation runner.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum OperationEvent {
    Started {
        operation_id: String,
        /// Short label such as "blob_write" or "read"
        name: String,
    },
    Progress {
        operation_id: String,
        position: u64,
        total: u64,
    },
    Completed {
        operation_id: String,
        elapsed_ms: u64,
    },
    Failed {
        operation_id: String,
        message: String,
    },
    TimedOut {
        operation_id: String,
        timeout_ms: u64,
    },
    Cancelled {
        operation_id: String,
        /// Last position reported before cancellation
        last_position: Option<u64>,
    },
}

impl OperationEvent {
    fn description(&self) -> &str {
        match self {
            OperationEvent::Started { .. } => "Operation started",
            OperationEvent::Progress { .. } => "Operation in progress",
            OperationEvent::Completed { .. } => "Operation completed",
            OperationEvent::Failed { .. } => "Operation failed",
            OperationEvent::TimedOut { .. } => "Operation timed out",
            OperationEvent::Cancelled { .. } => "Operation cancelled",
        }
    }
}

// ============================================================================
// Event Bus
// ============================================================================

/// Central broadcast channel for [`CoreEvent`]s.
///
/// Cloning is cheap; clones share the same channel.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CoreEvent>,
}

impl EventBus {
    /// Creates a bus holding at most `capacity` undelivered events per subscriber.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publishes an event to every current subscriber.
    ///
    /// Returns the number of subscribers reached, or an error if there are none.
    pub fn emit(&self, event: CoreEvent) -> Result<usize, SendError<CoreEvent>> {
        self.sender.send(event)
    }

    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

// ============================================================================
// Event Stream Wrapper
// ============================================================================

type EventFilter = Box<dyn Fn(&CoreEvent) -> bool + Send + Sync>;

/// Receiver that skips events not matching a predicate.
pub struct EventStream {
    receiver: Receiver<CoreEvent>,
    filter: Option<EventFilter>,
}

impl EventStream {
    pub fn new(receiver: Receiver<CoreEvent>) -> Self {
        Self {
            receiver,
            filter: None,
        }
    }

    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&CoreEvent) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Box::new(predicate));
        self
    }

    /// Waits for the next matching event.
    pub async fn recv(&mut self) -> Result<CoreEvent, RecvError> {
        loop {
            let event = self.receiver.recv().await?;
            match &self.filter {
                Some(filter) if !filter(&event) => continue,
                _ => return Ok(event),
            }
        }
    }

    /// Returns the next matching event if one is already buffered.
    pub fn try_recv(&mut self) -> Option<Result<CoreEvent, RecvError>> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => match &self.filter {
                    Some(filter) if !filter(&event) => continue,
                    _ => return Some(Ok(event)),
                },
                Err(broadcast::error::TryRecvError::Empty) => return None,
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    return Some(Err(RecvError::Lagged(n)))
                }
                Err(broadcast::error::TryRecvError::Closed) => return Some(Err(RecvError::Closed)),
            }
        }
    }
}

impl fmt::Debug for EventStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStream")
            .field("has_filter", &self.filter.is_some())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn progress(position: u64) -> CoreEvent {
        CoreEvent::Operation(OperationEvent::Progress {
            operation_id: "op-1".to_string(),
            position,
            total: 5000,
        })
    }

    #[tokio::test]
    async fn test_event_emission_no_subscribers() {
        let bus = EventBus::new(10);
        assert_eq!(bus.subscriber_count(), 0);
        assert!(bus.emit(progress(1000)).is_err());
    }

    #[tokio::test]
    async fn test_multiple_subscribers_receive_same_event() {
        let bus = EventBus::new(10);
        let mut sub1 = bus.subscribe();
        let mut sub2 = bus.subscribe();

        let event = CoreEvent::Session(SessionEvent::Started {
            session_id: "s-1".to_string(),
            capability: CapabilityKind::Gps,
        });
        assert_eq!(bus.emit(event.clone()).unwrap(), 2);

        assert_eq!(sub1.recv().await.unwrap(), event);
        assert_eq!(sub2.recv().await.unwrap(), event);
    }

    #[tokio::test]
    async fn test_event_stream_with_filter() {
        let bus = EventBus::new(10);
        let mut stream = EventStream::new(bus.subscribe())
            .filter(|event| matches!(event, CoreEvent::Session(_)));

        bus.emit(progress(1000)).ok();
        let session_event = CoreEvent::Session(SessionEvent::Stopped {
            session_id: "s-1".to_string(),
            capability: CapabilityKind::Beacons,
        });
        bus.emit(session_event.clone()).ok();

        assert_eq!(stream.recv().await.unwrap(), session_event);
        assert!(stream.try_recv().is_none());
    }

    #[tokio::test]
    async fn test_progress_order_preserved() {
        let bus = EventBus::new(16);
        let mut sub = bus.subscribe();

        for position in [1000, 2000, 3000, 4000, 5000] {
            bus.emit(progress(position)).ok();
        }

        for expected in [1000, 2000, 3000, 4000, 5000] {
            match sub.recv().await.unwrap() {
                CoreEvent::Operation(OperationEvent::Progress { position, .. }) => {
                    assert_eq!(position, expected)
                }
                other => panic!("unexpected event {:?}", other),
            }
        }
    }

    #[tokio::test]
    async fn test_lagged_subscriber() {
        let bus = EventBus::new(2);
        let mut sub = bus.subscribe();

        for i in 0..5 {
            bus.emit(progress(i * 100)).ok();
        }

        assert!(matches!(sub.recv().await, Err(RecvError::Lagged(_))));
    }

    #[test]
    fn test_event_severity() {
        let denied = CoreEvent::Session(SessionEvent::AccessChanged {
            capability: CapabilityKind::Gps,
            access: AccessState::Denied,
        });
        assert_eq!(denied.severity(), EventSeverity::Warning);

        let granted = CoreEvent::Session(SessionEvent::AccessChanged {
            capability: CapabilityKind::Gps,
            access: AccessState::Available,
        });
        assert_eq!(granted.severity(), EventSeverity::Debug);

        let failed = CoreEvent::Operation(OperationEvent::Failed {
            operation_id: "op-1".to_string(),
            message: "GATT error 133".to_string(),
        });
        assert_eq!(failed.severity(), EventSeverity::Error);
        assert_eq!(progress(1).severity(), EventSeverity::Debug);
    }

    #[test]
    fn test_event_serialization_shape() {
        let event = CoreEvent::Operation(OperationEvent::Cancelled {
            operation_id: "op-9".to_string(),
            last_position: Some(2000),
        });
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "Operation");
        assert_eq!(json["payload"]["event"], "Cancelled");
        assert_eq!(json["payload"]["last_position"], 2000);
    }
}
