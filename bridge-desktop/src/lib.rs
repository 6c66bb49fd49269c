//! # Desktop Bridge Implementations
//!
//! Simulated implementations of the bridge traits for desktop hosts
//! (macOS, Windows, Linux) and for tests.
//!
//! ## Overview
//!
//! Desktop machines rarely carry GPS receivers or beacon radios, so this
//! crate provides in-process stand-ins that behave like the platform plugins:
//! - `GpsManager` via [`SimulatedGpsManager`] (readings pushed by the host)
//! - `GattCharacteristic` via [`SimulatedCharacteristic`] (chunked BLOB writes)
//! - `RegionMonitor` via [`InMemoryRegionMonitor`]
//! - `UserDialogs` via [`ScriptedDialogs`] (answers queued up front)
//! - `Navigator` via [`RecordingNavigator`]
//!
//! Access states, failures and delays are all configurable so that every
//! permission and error path of the ViewModels can be exercised.
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_desktop::{ScriptedDialogs, SimulatedGpsManager};
//! use bridge_traits::AccessState;
//!
//! let gps = SimulatedGpsManager::new().with_request_outcome(AccessState::Available);
//! let dialogs = ScriptedDialogs::new();
//! dialogs.push_confirm(true);
//! ```

mod ble;
mod dialogs;
mod gps;
mod navigation;
mod region;
mod stream;

pub use ble::SimulatedCharacteristic;
pub use dialogs::{DialogRecord, ScriptedDialogs};
pub use gps::SimulatedGpsManager;
pub use navigation::RecordingNavigator;
pub use region::InMemoryRegionMonitor;
pub use stream::BroadcastReadingStream;

use std::sync::{Mutex, MutexGuard};

/// Lock a std mutex, recovering the data if a holder panicked.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
