//! Workspace placeholder crate.
//!
//! This crate exists to expose shared feature flags that map to the individual
//! workspace crates (e.g., `core-viewmodels`, `core-session`, `core-operation`).
//! Host applications can depend on `capability-samples` and enable the
//! documented features without needing to wire each crate individually.

#[cfg(feature = "desktop-shims")]
pub use core_viewmodels as viewmodels;

#[cfg(feature = "session")]
pub use core_session as session;

#[cfg(feature = "operation")]
pub use core_operation as operation;
