//! # ViewModels
//!
//! UI-bindable state and commands for the capability sample screens.
//!
//! ## Overview
//!
//! Each ViewModel owns plain state inside an [`Observable`], exposes async
//! commands, and talks to the device only through bridge traits:
//! - [`GpsViewModel`] - access, priority and deferred settings, live readings
//! - [`GattCharacteristicViewModel`] - read, write, notify and BLOB transfer
//! - [`MonitoringViewModel`] - monitored beacon or geofence regions
//!
//! Work runs on tokio tasks; state changes are marshalled through a
//! [`UiDispatcher`] so observers always see them in order on one logical
//! thread.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use core_runtime::config::SamplesConfig;
//! use core_viewmodels::GpsViewModel;
//!
//! let config = SamplesConfig::builder()
//!     .dialogs(dialogs)
//!     .navigator(navigator)
//!     .build()?;
//! let gps = GpsViewModel::new(Arc::new(gps_manager), &config);
//! gps.observable().subscribe(|state| render(state));
//! gps.toggle_updates().await?;
//! ```

pub mod ble;
pub mod command;
pub mod dispatcher;
pub mod error;
pub mod gps;
pub mod monitoring;
pub mod observable;

pub use ble::{CharacteristicAction, CharacteristicState, GattCharacteristicViewModel};
pub use command::CommandItem;
pub use dispatcher::UiDispatcher;
pub use error::{Result, ViewModelError};
pub use gps::{GpsState, GpsValues, GpsViewModel};
pub use monitoring::{
    BeaconMonitoringViewModel, GeofenceMonitoringViewModel, MonitoringTarget, MonitoringViewModel,
};
pub use observable::{Observable, ObserverId};

use std::sync::{Mutex, MutexGuard};

pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
