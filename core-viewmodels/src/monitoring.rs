//! # Region Monitoring ViewModel
//!
//! Lists monitored regions as [`CommandItem`]s. Selecting an item stops
//! monitoring that region. The same ViewModel serves beacon regions and
//! geofences; the region type picks the creation route and the navigation
//! parameter it arrives under.

use std::sync::{Arc, Weak};

use bridge_traits::{
    BeaconRegion, ConfirmConfig, GeofenceRegion, MonitoredRegion, NavigationParameters, Navigator,
    RegionMonitor, UserDialogs,
};
use core_runtime::config::SamplesConfig;
use futures::future::{BoxFuture, FutureExt};
use tracing::{debug, error, info, instrument, warn};

use crate::command::CommandItem;
use crate::dispatcher::UiDispatcher;
use crate::error::Result;
use crate::gps::INSUFFICIENT_PERMISSIONS;
use crate::observable::Observable;

/// Parameter telling the creation page to start monitoring on save
pub const MONITORING_PARAMETER: &str = "Monitoring";
pub const STOP_ALL_MESSAGE: &str = "Are you sure you wish to stop all monitoring";

/// A region type with its own creation page
pub trait MonitoringTarget: MonitoredRegion {
    const CREATE_ROUTE: &'static str;
}

impl MonitoringTarget for BeaconRegion {
    const CREATE_ROUTE: &'static str = "CreateBeacon";
}

impl MonitoringTarget for GeofenceRegion {
    const CREATE_ROUTE: &'static str = "CreateGeofence";
}

pub type BeaconMonitoringViewModel = MonitoringViewModel<BeaconRegion>;
pub type GeofenceMonitoringViewModel = MonitoringViewModel<GeofenceRegion>;

struct Shared<R: MonitoringTarget> {
    monitor: Arc<dyn RegionMonitor<R>>,
    dialogs: Arc<dyn UserDialogs>,
    dispatcher: UiDispatcher,
    regions: Observable<Vec<CommandItem>>,
}

impl<R: MonitoringTarget> Shared<R> {
    fn load(self: &Arc<Self>) -> BoxFuture<'static, Result<()>> {
        let shared = Arc::clone(self);
        async move {
            let regions = shared.monitor.monitored_regions().await?;
            let items: Vec<CommandItem> = regions
                .into_iter()
                .map(|region| shared.item(region))
                .collect();
            debug!(count = items.len(), "Monitored regions loaded");

            let observable = shared.regions.clone();
            shared
                .dispatcher
                .post(move || observable.update(|list| *list = items));
            Ok(())
        }
        .boxed()
    }

    // Items hold a weak reference; the list lives inside `Shared`
    fn item(self: &Arc<Self>, region: R) -> CommandItem {
        let weak: Weak<Self> = Arc::downgrade(self);
        let (text, detail) = (region.identifier().to_string(), region.detail());
        CommandItem::new(text, detail, move || {
            let weak = weak.clone();
            let region = region.clone();
            async move {
                if let Some(shared) = weak.upgrade() {
                    shared.stop_region(region).await;
                }
            }
            .boxed()
        })
    }

    async fn stop_region(self: Arc<Self>, region: R) {
        if let Err(e) = self.monitor.stop_monitoring(&region).await {
            error!(region = region.identifier(), error = %e, "Stop monitoring failed");
            self.dialogs.alert(&e.to_string());
            return;
        }
        info!(region = region.identifier(), "Stopped monitoring region");
        self.reload().await;
    }

    async fn reload(self: &Arc<Self>) {
        if let Err(e) = self.load().await {
            error!(error = %e, "Loading monitored regions failed");
            self.dialogs.alert(&e.to_string());
        }
    }
}

pub struct MonitoringViewModel<R: MonitoringTarget> {
    shared: Arc<Shared<R>>,
    navigator: Arc<dyn Navigator>,
}

impl<R: MonitoringTarget> MonitoringViewModel<R> {
    pub fn new(monitor: Arc<dyn RegionMonitor<R>>, config: &SamplesConfig) -> Self {
        Self {
            shared: Arc::new(Shared {
                monitor,
                dialogs: Arc::clone(&config.dialogs),
                dispatcher: UiDispatcher::default(),
                regions: Observable::default(),
            }),
            navigator: Arc::clone(&config.navigator),
        }
    }

    pub fn with_dispatcher(self, dispatcher: UiDispatcher) -> Self {
        Self {
            shared: Arc::new(Shared {
                monitor: Arc::clone(&self.shared.monitor),
                dialogs: Arc::clone(&self.shared.dialogs),
                dispatcher,
                regions: self.shared.regions.clone(),
            }),
            navigator: self.navigator,
        }
    }

    pub fn observable(&self) -> &Observable<Vec<CommandItem>> {
        &self.shared.regions
    }

    pub fn regions(&self) -> Vec<CommandItem> {
        self.shared.regions.get()
    }

    /// Replace the list with the regions currently monitored.
    pub async fn load(&self) -> Result<()> {
        self.shared.load().await
    }

    pub async fn on_appearing(&self) {
        self.shared.reload().await;
    }

    /// Open the creation page for a new region.
    #[instrument(skip(self), fields(route = R::CREATE_ROUTE))]
    pub async fn add(&self) -> Result<()> {
        let parameters = NavigationParameters::new().add(MONITORING_PARAMETER, true)?;
        if let Err(e) = self.navigator.navigate(R::CREATE_ROUTE, parameters).await {
            error!(error = %e, "Navigation failed");
            self.shared.dialogs.alert(&e.to_string());
        }
        Ok(())
    }

    /// Stop every region after confirmation. Returns whether it was confirmed.
    #[instrument(skip(self))]
    pub async fn stop_all_monitoring(&self) -> Result<bool> {
        let confirmed = self
            .shared
            .dialogs
            .confirm(ConfirmConfig::new(STOP_ALL_MESSAGE))
            .await;
        if !confirmed {
            debug!("Stop all declined");
            return Ok(false);
        }

        if let Err(e) = self.shared.monitor.stop_all_monitoring().await {
            error!(error = %e, "Stop all monitoring failed");
            self.shared.dialogs.alert(&e.to_string());
        } else {
            info!("Stopped all monitoring");
        }
        self.shared.reload().await;
        Ok(true)
    }

    /// Start monitoring a region handed over by the creation page.
    #[instrument(skip(self, parameters))]
    pub async fn on_navigating_to(&self, parameters: &NavigationParameters) {
        let region = match parameters.get::<R>(R::PARAMETER_NAME) {
            Ok(Some(region)) => region,
            Ok(None) => return,
            Err(e) => {
                error!(error = %e, "Unreadable region parameter");
                self.shared.dialogs.alert(&e.to_string());
                return;
            }
        };

        let access = match self.shared.monitor.check_access().await {
            access if access.can_prompt() => self.shared.monitor.request_access().await,
            access => access,
        };
        if !access.is_available() {
            warn!(access = %access, "Region monitoring not permitted");
            self.shared.dialogs.alert(INSUFFICIENT_PERMISSIONS);
            return;
        }

        let identifier = region.identifier().to_string();
        if let Err(e) = self.shared.monitor.start_monitoring(region).await {
            error!(region = %identifier, error = %e, "Start monitoring failed");
            self.shared.dialogs.alert(&e.to_string());
            return;
        }
        info!(region = %identifier, "Started monitoring region");
        self.shared.reload().await;
    }
}

impl<R: MonitoringTarget> std::fmt::Debug for MonitoringViewModel<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MonitoringViewModel")
            .field("route", &R::CREATE_ROUTE)
            .field("regions", &self.shared.regions.with(Vec::len))
            .finish()
    }
}
