use bridge_traits::{AccessState, BridgeError, CapabilityKind};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Access not available: {0}")]
    AccessDenied(AccessState),

    #[error("A {0} session is already active")]
    AlreadyActive(CapabilityKind),

    #[error("Session controller has been shut down")]
    Disposed,

    #[error("Invalid session transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    #[error("Capability error: {0}")]
    Bridge(#[from] BridgeError),
}

pub type Result<T> = std::result::Result<T, SessionError>;
