//! GPS Abstraction
//!
//! Location readings and the listener contract for GPS hardware.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    capability::{CapabilityManager, SessionConfig},
    error::Result,
};

/// Desired accuracy / power trade-off for GPS listening
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum GpsPriority {
    Highest,
    #[default]
    Normal,
    Low,
}

impl GpsPriority {
    pub const ALL: [GpsPriority; 3] = [GpsPriority::Highest, GpsPriority::Normal, GpsPriority::Low];

    pub fn label(&self) -> &'static str {
        match self {
            GpsPriority::Highest => "Highest",
            GpsPriority::Normal => "Normal",
            GpsPriority::Low => "Low",
        }
    }
}

/// A distance in meters
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Distance {
    meters: f64,
}

impl Distance {
    pub fn from_meters(meters: f64) -> Self {
        Self { meters }
    }

    pub fn from_kilometers(km: f64) -> Self {
        Self {
            meters: km * 1000.0,
        }
    }

    pub fn meters(&self) -> f64 {
        self.meters
    }
}

/// GPS listener configuration
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GpsRequest {
    /// Keep listening while the app is backgrounded
    pub use_background: bool,
    /// Accuracy / power trade-off
    pub priority: GpsPriority,
    /// Only deliver readings after moving this far
    pub deferred_distance: Option<Distance>,
    /// Only deliver readings after this much time has passed
    pub deferred_time: Option<Duration>,
}

impl SessionConfig for GpsRequest {
    fn requires_background(&self) -> bool {
        self.use_background
    }
}

/// Geographic coordinate
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub latitude: f64,
    pub longitude: f64,
}

impl Position {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

/// A single GPS fix
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GpsReading {
    pub position: Position,
    /// Altitude in meters
    pub altitude: f64,
    /// Horizontal accuracy in meters
    pub position_accuracy: f64,
    /// Heading in degrees from true north
    pub heading: f64,
    pub heading_accuracy: f64,
    /// Speed in meters per second
    pub speed: f64,
    pub timestamp: DateTime<Utc>,
}

/// GPS manager trait
///
/// A [`CapabilityManager`] for location updates plus a one-shot query for the
/// last known fix.
///
/// # Platform Support
///
/// - **iOS**: CLLocationManager
/// - **Android**: FusedLocationProviderClient
/// - **Desktop**: `bridge_desktop::SimulatedGpsManager`
#[async_trait::async_trait]
pub trait GpsManager: CapabilityManager<Config = GpsRequest, Reading = GpsReading> {
    /// Last known reading, if the platform has one cached
    async fn last_reading(&self) -> Result<Option<GpsReading>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gps_request_default() {
        let request = GpsRequest::default();
        assert!(!request.requires_background());
        assert_eq!(request.priority, GpsPriority::Normal);
        assert!(request.deferred_distance.is_none());
    }

    #[test]
    fn test_distance_conversion() {
        assert_eq!(Distance::from_kilometers(1.5).meters(), 1500.0);
    }
}
