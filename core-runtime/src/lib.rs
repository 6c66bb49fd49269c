//! # Core Runtime Module
//!
//! Provides foundational runtime infrastructure for the capability core:
//! - Logging and tracing infrastructure
//! - Configuration management (explicit collaborator injection)
//! - Event bus for session and operation lifecycle events
//!
//! ## Overview
//!
//! Every other core crate depends on this one for its configuration record,
//! its logging conventions, and the broadcast channel used to observe
//! capability sessions and long-running operations from outside the
//! ViewModels.

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use error::{Error, Result};
