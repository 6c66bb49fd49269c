//! # Session State Machine
//!
//! ```text
//! Idle ──────────> AccessPending ──────> AccessGranted ──────> Active
//!   │                │       ↑                ↑                  │
//!   │                ↓       │                │                  │
//!   │              Denied ───┘                │                  │
//!   └──── already available ──────────────────┘                  │
//! Idle <─────────────────── stop / stream failure ───────────────┘
//! ```
//!
//! `Denied` is sticky: only an explicit `request_access` moves it back to
//! `AccessPending`.

use crate::error::{Result, SessionError};
use serde::{Deserialize, Serialize};

/// Lifecycle state of a [`SessionController`](crate::SessionController)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// No session and no access decision yet (or the last session ended)
    #[default]
    Idle,
    /// An access prompt is in flight
    AccessPending,
    /// The last access request was refused
    Denied,
    /// Access is available; no session is running
    AccessGranted,
    /// A session is running
    Active,
}

impl SessionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::Idle => "idle",
            SessionState::AccessPending => "access_pending",
            SessionState::Denied => "denied",
            SessionState::AccessGranted => "access_granted",
            SessionState::Active => "active",
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, SessionState::Active)
    }

    /// Whether the machine may move from `self` to `to`.
    pub fn can_transition_to(&self, to: SessionState) -> bool {
        use SessionState::*;

        matches!(
            (*self, to),
            (Idle, AccessPending)
                | (Denied, AccessPending)
                | (AccessGranted, AccessPending)
                | (AccessPending, Denied)
                | (AccessPending, AccessGranted)
                // A non-prompting check found access already available
                | (Idle, AccessGranted)
                | (AccessGranted, Active)
                | (Active, Idle)
        )
    }

    /// Validate and return the next state.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::InvalidTransition`] when the move is not allowed.
    pub fn transition(self, to: SessionState) -> Result<SessionState> {
        if self.can_transition_to(to) {
            Ok(to)
        } else {
            Err(SessionError::InvalidTransition {
                from: self.as_str().to_string(),
                to: to.as_str().to_string(),
            })
        }
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path() {
        let state = SessionState::Idle
            .transition(SessionState::AccessPending)
            .and_then(|s| s.transition(SessionState::AccessGranted))
            .and_then(|s| s.transition(SessionState::Active))
            .and_then(|s| s.transition(SessionState::Idle))
            .unwrap();
        assert_eq!(state, SessionState::Idle);
    }

    #[test]
    fn test_denied_is_sticky() {
        assert!(!SessionState::Denied.can_transition_to(SessionState::Active));
        assert!(!SessionState::Denied.can_transition_to(SessionState::AccessGranted));
        assert!(SessionState::Denied.can_transition_to(SessionState::AccessPending));
    }

    #[test]
    fn test_cannot_start_twice() {
        let err = SessionState::Active
            .transition(SessionState::Active)
            .unwrap_err();
        assert!(matches!(err, SessionError::InvalidTransition { .. }));
        assert_eq!(
            err.to_string(),
            "Invalid session transition from active to active"
        );
    }

    #[test]
    fn test_idle_cannot_skip_to_active() {
        assert!(!SessionState::Idle.can_transition_to(SessionState::Active));
    }
}
