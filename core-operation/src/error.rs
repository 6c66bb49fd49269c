use std::time::Duration;

use bridge_traits::BridgeError;
use thiserror::Error;

/// Terminal failure of an operation run
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OperationError {
    #[error("Operation timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    #[error("{0}")]
    Transport(String),

    #[error("Operation cancelled")]
    Cancelled,
}

impl From<BridgeError> for OperationError {
    fn from(err: BridgeError) -> Self {
        OperationError::Transport(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, OperationError>;
