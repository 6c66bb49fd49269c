//! In-Memory Region Monitoring

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use bridge_traits::{
    error::Result,
    region::{MonitoredRegion, RegionMonitor},
    AccessState, BridgeError,
};
use tracing::{debug, info};

use crate::lock;

/// Region registry kept in memory
///
/// Works for any [`MonitoredRegion`], so one type backs both beacon and
/// geofence monitoring. Starting a region whose identifier is already
/// registered replaces it, matching the mobile platforms.
pub struct InMemoryRegionMonitor<R> {
    access: Mutex<AccessState>,
    request_outcome: Mutex<AccessState>,
    request_count: AtomicUsize,
    regions: Mutex<Vec<R>>,
    failure: Mutex<Option<String>>,
}

impl<R: MonitoredRegion> InMemoryRegionMonitor<R> {
    pub fn new() -> Self {
        Self {
            access: Mutex::new(AccessState::Unknown),
            request_outcome: Mutex::new(AccessState::Available),
            request_count: AtomicUsize::new(0),
            regions: Mutex::new(Vec::new()),
            failure: Mutex::new(None),
        }
    }

    pub fn with_access(self, access: AccessState) -> Self {
        *lock(&self.access) = access;
        self
    }

    pub fn with_request_outcome(self, access: AccessState) -> Self {
        *lock(&self.request_outcome) = access;
        self
    }

    pub fn with_regions(self, regions: Vec<R>) -> Self {
        *lock(&self.regions) = regions;
        self
    }

    /// Make every subsequent registry change fail with `message`, or clear it.
    pub fn set_failure(&self, message: Option<String>) {
        *lock(&self.failure) = message;
    }

    pub fn request_count(&self) -> usize {
        self.request_count.load(Ordering::SeqCst)
    }

    fn check_failure(&self) -> Result<()> {
        match lock(&self.failure).clone() {
            Some(message) => Err(BridgeError::OperationFailed(message)),
            None => Ok(()),
        }
    }
}

impl<R: MonitoredRegion> Default for InMemoryRegionMonitor<R> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<R: MonitoredRegion> RegionMonitor<R> for InMemoryRegionMonitor<R> {
    async fn check_access(&self) -> AccessState {
        *lock(&self.access)
    }

    async fn request_access(&self) -> AccessState {
        self.request_count.fetch_add(1, Ordering::SeqCst);
        let outcome = *lock(&self.request_outcome);
        *lock(&self.access) = outcome;
        info!(access = %outcome, "Region monitoring access requested");
        outcome
    }

    async fn monitored_regions(&self) -> Result<Vec<R>> {
        Ok(lock(&self.regions).clone())
    }

    async fn start_monitoring(&self, region: R) -> Result<()> {
        self.check_failure()?;
        let access = *lock(&self.access);
        if !access.is_available() {
            return Err(BridgeError::NotAvailable(format!(
                "Region monitoring access is {}",
                access
            )));
        }

        let mut regions = lock(&self.regions);
        regions.retain(|existing| existing.identifier() != region.identifier());
        debug!(identifier = region.identifier(), "Monitoring region");
        regions.push(region);
        Ok(())
    }

    async fn stop_monitoring(&self, region: &R) -> Result<()> {
        self.check_failure()?;
        lock(&self.regions).retain(|existing| existing.identifier() != region.identifier());
        debug!(identifier = region.identifier(), "Stopped monitoring region");
        Ok(())
    }

    async fn stop_all_monitoring(&self) -> Result<()> {
        self.check_failure()?;
        let mut regions = lock(&self.regions);
        debug!(count = regions.len(), "Stopping all monitored regions");
        regions.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_traits::region::BeaconRegion;
    use uuid::Uuid;

    fn monitor() -> InMemoryRegionMonitor<BeaconRegion> {
        InMemoryRegionMonitor::new().with_access(AccessState::Available)
    }

    #[tokio::test]
    async fn test_start_replaces_same_identifier() {
        let monitor = monitor();
        let uuid = Uuid::new_v4();
        monitor
            .start_monitoring(BeaconRegion::new("lobby", uuid))
            .await
            .unwrap();
        monitor
            .start_monitoring(BeaconRegion::new("lobby", uuid).with_major(2))
            .await
            .unwrap();

        let regions = monitor.monitored_regions().await.unwrap();
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].major, Some(2));
    }

    #[tokio::test]
    async fn test_stop_and_stop_all() {
        let monitor = monitor();
        let a = BeaconRegion::new("a", Uuid::new_v4());
        let b = BeaconRegion::new("b", Uuid::new_v4());
        monitor.start_monitoring(a.clone()).await.unwrap();
        monitor.start_monitoring(b).await.unwrap();

        monitor.stop_monitoring(&a).await.unwrap();
        assert_eq!(monitor.monitored_regions().await.unwrap().len(), 1);

        monitor.stop_all_monitoring().await.unwrap();
        assert!(monitor.monitored_regions().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_start_without_access_fails() {
        let monitor = InMemoryRegionMonitor::<BeaconRegion>::new();
        let result = monitor
            .start_monitoring(BeaconRegion::new("a", Uuid::new_v4()))
            .await;
        assert!(matches!(result, Err(BridgeError::NotAvailable(_))));

        assert_eq!(monitor.request_access().await, AccessState::Available);
        assert_eq!(monitor.request_count(), 1);
    }
}
