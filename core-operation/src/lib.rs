//! # Operation Module
//!
//! Runs long and single-shot capability operations (characteristic reads,
//! writes, BLOB transfers) with progress, cancellation and timeouts.
//!
//! ## Overview
//!
//! An operation is a stream of [`OperationUpdate`]s: zero or more progress
//! events followed by one completion. [`OperationRunner`] drives that stream
//! and reports to an [`OperationObserver`] with these guarantees:
//! - progress positions never go backwards (regressions are dropped)
//! - exactly one of `on_complete` / `on_error` fires, after all progress
//! - cancellation stops progress at once and reports a single
//!   [`OperationError::Cancelled`]
//! - an optional timeout reports [`OperationError::Timeout`]; a cancellation
//!   that is already pending wins over it
//! - platform errors surface as [`OperationError::Transport`] and are never
//!   retried
//!
//! ## Components
//!
//! - **Progress** (`progress`): update types and stream adapters
//! - **Observer** (`observer`): callback trait and the terminal guard
//! - **Runner** (`runner`): the driving loop and spawned handles

pub mod error;
pub mod observer;
pub mod progress;
pub mod runner;

pub use error::{OperationError, Result};
pub use observer::{CallbackObserver, OperationObserver, TerminalGuard};
pub use progress::{blob_progress, single, OperationStream, OperationUpdate, ProgressEvent};
pub use runner::{OperationHandle, OperationOutcome, OperationRunner, RunOptions};
