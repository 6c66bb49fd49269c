//! Capability Manager Abstraction
//!
//! The contract every listening-style device capability (GPS, beacon ranging,
//! geofencing) exposes to the core: access checks, a start/stop pair, and a
//! stream of readings.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{access::AccessState, error::Result};

/// Identifies which device capability a manager or session belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CapabilityKind {
    Gps,
    BluetoothLe,
    Beacons,
    Geofencing,
}

impl CapabilityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CapabilityKind::Gps => "gps",
            CapabilityKind::BluetoothLe => "bluetooth_le",
            CapabilityKind::Beacons => "beacons",
            CapabilityKind::Geofencing => "geofencing",
        }
    }
}

impl fmt::Display for CapabilityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Configuration record passed to [`CapabilityManager::start`].
pub trait SessionConfig: Clone + fmt::Debug + Send + Sync + 'static {
    /// Whether the session must keep running while the app is backgrounded.
    fn requires_background(&self) -> bool;
}

/// Stream of readings produced by a running capability.
///
/// `Some(Err(_))` reports a failure of the underlying hardware subscription;
/// `None` means the stream has closed.
#[async_trait::async_trait]
pub trait ReadingStream<T>: Send {
    async fn next(&mut self) -> Option<Result<T>>;
}

/// Capability manager trait
///
/// Implemented by each platform for a listening-style capability. The core
/// never talks to hardware directly; it drives this trait.
///
/// # Platform Support
///
/// - **iOS**: CoreLocation / CoreBluetooth managers
/// - **Android**: FusedLocationProvider, BluetoothLeScanner
/// - **Desktop**: simulated managers from `bridge-desktop`
///
/// # Example
///
/// ```ignore
/// use bridge_traits::capability::CapabilityManager;
///
/// async fn ensure_running<M: CapabilityManager>(manager: &M, config: M::Config) -> Result<()> {
///     if manager.request_access(false).await.is_available() && !manager.is_listening() {
///         manager.start(config).await?;
///     }
///     Ok(())
/// }
/// ```
#[async_trait::async_trait]
pub trait CapabilityManager: Send + Sync {
    /// Configuration accepted by [`start`](Self::start)
    type Config: SessionConfig;
    /// Reading type emitted while listening
    type Reading: Clone + fmt::Debug + Send + 'static;

    /// Which capability this manager drives
    fn kind(&self) -> CapabilityKind;

    /// Query the current permission status without prompting.
    async fn check_access(&self, require_background: bool) -> AccessState;

    /// Ask the platform for access, prompting the user if needed.
    async fn request_access(&self, require_background: bool) -> AccessState;

    /// Begin listening with the given configuration.
    async fn start(&self, config: Self::Config) -> Result<()>;

    /// Stop listening. Must be safe to call when not listening.
    async fn stop(&self) -> Result<()>;

    /// Whether the platform is currently delivering readings
    fn is_listening(&self) -> bool;

    /// Subscribe to readings.
    ///
    /// Each subscriber gets its own stream; dropping the stream unsubscribes.
    async fn subscribe(&self) -> Result<Box<dyn ReadingStream<Self::Reading>>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capability_kind_display() {
        assert_eq!(CapabilityKind::Gps.to_string(), "gps");
        assert_eq!(CapabilityKind::BluetoothLe.as_str(), "bluetooth_le");
    }
}
