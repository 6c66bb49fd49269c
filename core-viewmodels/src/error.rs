use bridge_traits::BridgeError;
use core_operation::OperationError;
use core_session::SessionError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ViewModelError {
    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Operation(#[from] OperationError),

    #[error(transparent)]
    Bridge(#[from] BridgeError),

    #[error(transparent)]
    Runtime(#[from] core_runtime::Error),

    #[error("Invalid input for {field}: {message}")]
    InvalidInput { field: String, message: String },

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, ViewModelError>;
