//! # Capability Session Module
//!
//! Access negotiation and the lifecycle of long-running capability
//! subscriptions (GPS updates, notifications, region monitoring).
//!
//! ## Overview
//!
//! A [`SessionController`] wraps one [`CapabilityManager`](bridge_traits::CapabilityManager)
//! and enforces:
//! - access is requested explicitly and never silently re-prompted
//! - at most one [`Session`] is active at a time
//! - stopping is idempotent and happens automatically on teardown
//! - an externally failed subscription returns the controller to `Idle`
//!
//! ## Components
//!
//! - **Session State Machine** (`state`): validated transitions between
//!   `Idle`, `AccessPending`, `Denied`, `AccessGranted` and `Active`
//! - **Session** (`session`): identity, configuration and the exclusively
//!   owned [`SubscriptionHandle`]
//! - **Session Controller** (`controller`): the public entry point

pub mod controller;
pub mod error;
pub mod session;
pub mod state;

pub use controller::SessionController;
pub use error::{Result, SessionError};
pub use session::{drive_stream, Session, SessionId, SessionSignal, StreamExit, SubscriptionHandle};
pub use state::SessionState;
