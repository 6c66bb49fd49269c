//! Region Monitoring Abstraction
//!
//! Beacon regions and circular geofences share the same monitoring contract:
//! register a region, list what is registered, unregister one or all.

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use uuid::Uuid;

use crate::{access::AccessState, error::Result, gps::Position};

/// A region that can be registered with a [`RegionMonitor`].
pub trait MonitoredRegion:
    Clone + std::fmt::Debug + PartialEq + Serialize + DeserializeOwned + Send + Sync + 'static
{
    /// Navigation parameter name the region travels under
    const PARAMETER_NAME: &'static str;

    /// Stable identifier chosen by the user
    fn identifier(&self) -> &str;

    /// Secondary line for list display
    fn detail(&self) -> String;
}

/// iBeacon region. Unset major/minor match every beacon in the UUID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BeaconRegion {
    pub identifier: String,
    pub uuid: Uuid,
    pub major: Option<u16>,
    pub minor: Option<u16>,
}

impl BeaconRegion {
    pub fn new(identifier: impl Into<String>, uuid: Uuid) -> Self {
        Self {
            identifier: identifier.into(),
            uuid,
            major: None,
            minor: None,
        }
    }

    pub fn with_major(mut self, major: u16) -> Self {
        self.major = Some(major);
        self
    }

    pub fn with_minor(mut self, minor: u16) -> Self {
        self.minor = Some(minor);
        self
    }
}

impl MonitoredRegion for BeaconRegion {
    const PARAMETER_NAME: &'static str = "BeaconRegion";

    fn identifier(&self) -> &str {
        &self.identifier
    }

    fn detail(&self) -> String {
        format!(
            "{}/{}/{}",
            self.uuid,
            self.major.unwrap_or(0),
            self.minor.unwrap_or(0)
        )
    }
}

/// Circular geofence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeofenceRegion {
    pub identifier: String,
    pub center: Position,
    pub radius_meters: f64,
    pub notify_on_entry: bool,
    pub notify_on_exit: bool,
}

impl GeofenceRegion {
    pub fn new(identifier: impl Into<String>, center: Position, radius_meters: f64) -> Self {
        Self {
            identifier: identifier.into(),
            center,
            radius_meters,
            notify_on_entry: true,
            notify_on_exit: true,
        }
    }
}

impl MonitoredRegion for GeofenceRegion {
    const PARAMETER_NAME: &'static str = "GeofenceRegion";

    fn identifier(&self) -> &str {
        &self.identifier
    }

    fn detail(&self) -> String {
        format!(
            "{:.6}, {:.6} ({}m)",
            self.center.latitude, self.center.longitude, self.radius_meters
        )
    }
}

/// Region monitor trait
///
/// # Platform Support
///
/// - **iOS**: CLLocationManager region monitoring
/// - **Android**: GeofencingClient / AltBeacon
/// - **Desktop**: in-memory monitors from `bridge-desktop`
#[async_trait::async_trait]
pub trait RegionMonitor<R: MonitoredRegion>: Send + Sync {
    async fn check_access(&self) -> AccessState;

    async fn request_access(&self) -> AccessState;

    /// All regions currently registered
    async fn monitored_regions(&self) -> Result<Vec<R>>;

    /// Register a region. Re-registering an identifier replaces the old region.
    async fn start_monitoring(&self, region: R) -> Result<()>;

    async fn stop_monitoring(&self, region: &R) -> Result<()>;

    async fn stop_all_monitoring(&self) -> Result<()>;
}
