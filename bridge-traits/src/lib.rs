//! # Host Bridge Traits
//!
//! Platform abstraction traits that must be implemented by each host platform.
//!
//! ## Overview
//!
//! This crate defines the contract between the capability core and the
//! platform-specific device plugins. The core never touches GPS, Bluetooth or
//! region-monitoring hardware directly; it drives these traits and the host
//! injects concrete implementations.
//!
//! ## Traits
//!
//! ### Device Capabilities
//! - [`CapabilityManager`](capability::CapabilityManager) - Access checks, start/stop and reading streams
//! - [`GpsManager`](gps::GpsManager) - Location listener plus last known fix
//! - [`GattCharacteristic`](ble::GattCharacteristic) - BLE read/write/notify and BLOB writes
//! - [`RegionMonitor`](region::RegionMonitor) - Beacon and geofence region registration
//!
//! ### Presentation
//! - [`UserDialogs`](dialogs::UserDialogs) - Confirm, prompt, action sheet, toast, alert, loading
//! - [`Navigator`](navigation::Navigator) - Page navigation with typed parameters
//!
//! ### Utilities
//! - [`Clock`](time::Clock) - Time source for deterministic testing
//! - [`LoggerSink`](time::LoggerSink) - Forward structured logs to host logging
//!
//! ## Platform Requirements
//!
//! | Platform | Implementation Crate | Status |
//! |----------|---------------------|--------|
//! | Desktop  | `bridge-desktop` (simulated) | ✅ Available |
//! | iOS      | TBD                 | 📋 Planned |
//! | Android  | TBD                 | 📋 Planned |
//!
//! ## Error Handling
//!
//! All bridge traits use [`BridgeError`](error::BridgeError). Platform
//! implementations should convert native errors into it with an actionable
//! message; the core reports these to the user verbatim.
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync` so that implementations can be
//! shared across tokio tasks behind `Arc`.

pub mod access;
pub mod ble;
pub mod capability;
pub mod dialogs;
pub mod error;
pub mod gps;
pub mod navigation;
pub mod region;
pub mod time;

pub use error::BridgeError;

// Re-export commonly used types
pub use access::AccessState;
pub use ble::{BlobWriteProgress, CharacteristicProperties, CharacteristicResult, GattCharacteristic};
pub use capability::{CapabilityKind, CapabilityManager, ReadingStream, SessionConfig};
pub use dialogs::{
    ActionSheetConfig, CancelAction, ConfirmConfig, LoadingDialog, PromptConfig, PromptResult,
    UserDialogs,
};
pub use gps::{Distance, GpsManager, GpsPriority, GpsReading, GpsRequest, Position};
pub use navigation::{NavigationParameters, Navigator};
pub use region::{BeaconRegion, GeofenceRegion, MonitoredRegion, RegionMonitor};
pub use time::{Clock, ConsoleLogger, LogEntry, LogLevel, LoggerSink, ManualClock, SystemClock};
