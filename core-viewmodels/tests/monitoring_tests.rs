//! Region monitoring ViewModel tests

mod common;

use std::sync::Arc;

use bridge_desktop::{InMemoryRegionMonitor, ScriptedDialogs};
use bridge_traits::{
    AccessState, BeaconRegion, GeofenceRegion, MonitoredRegion, NavigationParameters, Navigator,
    Position, RegionMonitor, UserDialogs,
};
use common::{config_with, fixture, MockNav};
use core_viewmodels::gps::INSUFFICIENT_PERMISSIONS;
use core_viewmodels::monitoring::{MONITORING_PARAMETER, STOP_ALL_MESSAGE};
use core_viewmodels::{BeaconMonitoringViewModel, GeofenceMonitoringViewModel};
use uuid::Uuid;

fn beacon(identifier: &str) -> BeaconRegion {
    BeaconRegion::new(identifier, Uuid::new_v4())
}

fn beacon_monitor(regions: Vec<BeaconRegion>) -> Arc<InMemoryRegionMonitor<BeaconRegion>> {
    Arc::new(
        InMemoryRegionMonitor::new()
            .with_access(AccessState::Available)
            .with_regions(regions),
    )
}

#[tokio::test]
async fn test_load_projects_regions_into_items() {
    let fx = fixture();
    let office = beacon("Office").with_major(7);
    let monitor = beacon_monitor(vec![office.clone(), beacon("Lobby")]);
    let vm = BeaconMonitoringViewModel::new(monitor, &fx.config);

    vm.on_appearing().await;

    let items = vm.regions();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0].text, "Office");
    assert_eq!(items[0].detail, format!("{}/7/0", office.uuid));
    assert_eq!(items[1].text, "Lobby");
}

#[tokio::test]
async fn test_item_action_stops_region_and_reloads() {
    let fx = fixture();
    let monitor = beacon_monitor(vec![beacon("Office"), beacon("Lobby")]);
    let vm = BeaconMonitoringViewModel::new(monitor.clone(), &fx.config);
    vm.load().await.unwrap();

    vm.regions()[0].execute().await;

    let remaining = monitor.monitored_regions().await.unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].identifier(), "Lobby");
    let items = vm.regions();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].text, "Lobby");
}

#[tokio::test]
async fn test_item_action_failure_alerts() {
    let fx = fixture();
    let monitor = beacon_monitor(vec![beacon("Office")]);
    let vm = BeaconMonitoringViewModel::new(monitor.clone(), &fx.config);
    vm.load().await.unwrap();

    monitor.set_failure(Some("Bluetooth off".to_string()));
    vm.regions()[0].execute().await;

    assert_eq!(vm.regions().len(), 1);
    let alerts = fx.dialogs.alerts();
    assert_eq!(alerts.len(), 1);
    assert!(alerts[0].contains("Bluetooth off"));
}

#[tokio::test]
async fn test_stop_all_requires_confirmation() {
    let fx = fixture();
    let monitor = beacon_monitor(vec![beacon("Office"), beacon("Lobby")]);
    let vm = BeaconMonitoringViewModel::new(monitor.clone(), &fx.config);
    vm.load().await.unwrap();

    fx.dialogs.push_confirm(false);
    assert!(!vm.stop_all_monitoring().await.unwrap());
    assert_eq!(monitor.monitored_regions().await.unwrap().len(), 2);

    fx.dialogs.push_confirm(true);
    assert!(vm.stop_all_monitoring().await.unwrap());
    assert!(monitor.monitored_regions().await.unwrap().is_empty());
    assert!(vm.regions().is_empty());

    let confirms = fx.dialogs.confirms();
    assert_eq!(confirms.len(), 2);
    assert_eq!(confirms[0].message, STOP_ALL_MESSAGE);
}

#[tokio::test]
async fn test_add_navigates_to_create_page() {
    let fx = fixture();
    let vm = BeaconMonitoringViewModel::new(beacon_monitor(Vec::new()), &fx.config);

    vm.add().await.unwrap();

    let (route, parameters) = fx.navigator.last().unwrap();
    assert_eq!(route, "CreateBeacon");
    assert_eq!(parameters.get::<bool>(MONITORING_PARAMETER).unwrap(), Some(true));
}

#[tokio::test]
async fn test_geofence_add_uses_its_own_route() {
    let mut navigator = MockNav::new();
    navigator
        .expect_navigate()
        .withf(|route: &str, parameters: &NavigationParameters| {
            route == "CreateGeofence" && parameters.contains(MONITORING_PARAMETER)
        })
        .times(1)
        .returning(|_, _| Ok(()));

    let config = config_with(
        Arc::new(ScriptedDialogs::new()) as Arc<dyn UserDialogs>,
        Arc::new(navigator) as Arc<dyn Navigator>,
    );
    let monitor: Arc<InMemoryRegionMonitor<GeofenceRegion>> = Arc::new(InMemoryRegionMonitor::new());
    let vm = GeofenceMonitoringViewModel::new(monitor, &config);

    vm.add().await.unwrap();
}

#[tokio::test]
async fn test_navigated_region_starts_monitoring() {
    let fx = fixture();
    let monitor = Arc::new(InMemoryRegionMonitor::<BeaconRegion>::new());
    let vm = BeaconMonitoringViewModel::new(monitor.clone(), &fx.config);

    let region = beacon("Garage").with_major(1).with_minor(2);
    let parameters = NavigationParameters::new()
        .add(BeaconRegion::PARAMETER_NAME, &region)
        .unwrap();
    vm.on_navigating_to(&parameters).await;

    assert_eq!(monitor.request_count(), 1);
    assert_eq!(monitor.monitored_regions().await.unwrap(), vec![region]);
    assert_eq!(vm.regions()[0].text, "Garage");
    assert!(fx.dialogs.alerts().is_empty());
}

#[tokio::test]
async fn test_navigation_without_region_does_nothing() {
    let fx = fixture();
    let monitor = beacon_monitor(Vec::new());
    let vm = BeaconMonitoringViewModel::new(monitor.clone(), &fx.config);

    vm.on_navigating_to(&NavigationParameters::new()).await;

    assert!(monitor.monitored_regions().await.unwrap().is_empty());
    assert!(fx.dialogs.alerts().is_empty());
}

#[tokio::test]
async fn test_start_failure_alerts() {
    let fx = fixture();
    let monitor = beacon_monitor(Vec::new());
    monitor.set_failure(Some("Region limit reached".to_string()));
    let vm = BeaconMonitoringViewModel::new(monitor, &fx.config);

    let parameters = NavigationParameters::new()
        .add(BeaconRegion::PARAMETER_NAME, beacon("Office"))
        .unwrap();
    vm.on_navigating_to(&parameters).await;

    let alerts = fx.dialogs.alerts();
    assert_eq!(alerts.len(), 1);
    assert!(alerts[0].contains("Region limit reached"));
    assert!(vm.regions().is_empty());
}

#[tokio::test]
async fn test_denied_monitoring_alerts() {
    let fx = fixture();
    let monitor = Arc::new(
        InMemoryRegionMonitor::<GeofenceRegion>::new().with_request_outcome(AccessState::Denied),
    );
    let vm = GeofenceMonitoringViewModel::new(monitor.clone(), &fx.config);

    let home = GeofenceRegion::new("Home", Position::new(-33.86, 151.21), 150.0);
    let parameters = NavigationParameters::new()
        .add(GeofenceRegion::PARAMETER_NAME, home)
        .unwrap();
    vm.on_navigating_to(&parameters).await;

    assert_eq!(fx.dialogs.alerts(), vec![INSUFFICIENT_PERMISSIONS.to_string()]);
    assert!(monitor.monitored_regions().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_restricted_monitoring_alerts_without_prompt() {
    let fx = fixture();
    let monitor = Arc::new(
        InMemoryRegionMonitor::<BeaconRegion>::new().with_access(AccessState::Restricted),
    );
    let vm = BeaconMonitoringViewModel::new(monitor.clone(), &fx.config);

    let parameters = NavigationParameters::new()
        .add(BeaconRegion::PARAMETER_NAME, beacon("Office"))
        .unwrap();
    vm.on_navigating_to(&parameters).await;

    assert_eq!(monitor.request_count(), 0);
    assert_eq!(fx.dialogs.alerts(), vec![INSUFFICIENT_PERMISSIONS.to_string()]);
    assert!(monitor.monitored_regions().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_wrong_parameter_type_alerts() {
    let fx = fixture();
    let vm = BeaconMonitoringViewModel::new(beacon_monitor(Vec::new()), &fx.config);

    let parameters = NavigationParameters::new()
        .add(BeaconRegion::PARAMETER_NAME, "not a region")
        .unwrap();
    vm.on_navigating_to(&parameters).await;

    assert_eq!(fx.dialogs.alerts().len(), 1);
}
