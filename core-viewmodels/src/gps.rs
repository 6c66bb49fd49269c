//! # GPS ViewModel
//!
//! Access status, listener settings and the latest reading for the GPS
//! screen. Listening goes through a [`SessionController`], so the screen
//! never holds more than one live subscription.

use std::sync::Arc;
use std::time::Duration;

use bridge_traits::{
    AccessState, ActionSheetConfig, Distance, GpsManager, GpsPriority, GpsReading, GpsRequest,
    UserDialogs,
};
use chrono::{DateTime, Utc};
use core_runtime::config::SamplesConfig;
use core_session::{SessionController, SessionError, SessionSignal};
use tracing::{debug, error, info, instrument, warn};

use crate::dispatcher::UiDispatcher;
use crate::error::Result;
use crate::observable::Observable;

pub const PRIORITY_SHEET_TITLE: &str = "Select Priority/Desired Accuracy";
pub const NO_READING_MESSAGE: &str = "Could not getting GPS coordinates";
pub const INSUFFICIENT_PERMISSIONS: &str = "Insufficient permissions";

const START_TEXT: &str = "Start Updating";
const STOP_TEXT: &str = "Stop Listening";

/// Parse a deferred-setting text box.
///
/// Empty text means "not deferred" (0); anything that is not an integer
/// yields -1, which disables the toggle command.
pub fn parse_deferred(text: &str) -> i64 {
    let text = text.trim();
    if text.is_empty() {
        return 0;
    }
    text.parse().unwrap_or(-1)
}

/// Reading fields shown on screen
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GpsValues {
    pub latitude: f64,
    pub longitude: f64,
    pub altitude: f64,
    pub position_accuracy: f64,
    pub heading: f64,
    pub heading_accuracy: f64,
    pub speed: f64,
    pub timestamp: Option<DateTime<Utc>>,
}

impl From<&GpsReading> for GpsValues {
    fn from(reading: &GpsReading) -> Self {
        Self {
            latitude: reading.position.latitude,
            longitude: reading.position.longitude,
            altitude: reading.altitude,
            position_accuracy: reading.position_accuracy,
            heading: reading.heading,
            heading_accuracy: reading.heading_accuracy,
            speed: reading.speed,
            timestamp: Some(reading.timestamp),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GpsState {
    /// Last known access status, as display text
    pub access: String,
    pub use_background: bool,
    pub priority: GpsPriority,
    pub deferred_meters: String,
    pub deferred_seconds: String,
    pub is_updating: bool,
    pub listener_text: String,
    pub values: GpsValues,
    pub is_busy: bool,
}

impl Default for GpsState {
    fn default() -> Self {
        Self {
            access: AccessState::Unknown.to_string(),
            use_background: true,
            priority: GpsPriority::Normal,
            deferred_meters: String::new(),
            deferred_seconds: String::new(),
            is_updating: false,
            listener_text: START_TEXT.to_string(),
            values: GpsValues::default(),
            is_busy: false,
        }
    }
}

impl GpsState {
    /// Stopping is always allowed; starting needs valid deferred settings.
    pub fn can_toggle_updates(&self) -> bool {
        self.is_updating
            || (parse_deferred(&self.deferred_meters) >= 0
                && parse_deferred(&self.deferred_seconds) >= 0)
    }

    fn set_updating(&mut self, updating: bool) {
        self.is_updating = updating;
        self.listener_text = if updating { STOP_TEXT } else { START_TEXT }.to_string();
    }

    fn request(&self) -> GpsRequest {
        let meters = parse_deferred(&self.deferred_meters);
        let seconds = parse_deferred(&self.deferred_seconds);
        GpsRequest {
            use_background: self.use_background,
            priority: self.priority,
            deferred_distance: (meters > 0).then(|| Distance::from_meters(meters as f64)),
            deferred_time: (seconds > 0).then(|| Duration::from_secs(seconds as u64)),
        }
    }
}

pub struct GpsViewModel<M: GpsManager + 'static> {
    controller: SessionController<M>,
    dialogs: Arc<dyn UserDialogs>,
    dispatcher: UiDispatcher,
    state: Observable<GpsState>,
}

impl<M: GpsManager + 'static> GpsViewModel<M> {
    pub fn new(manager: Arc<M>, config: &SamplesConfig) -> Self {
        let controller = match &config.event_bus {
            Some(bus) => SessionController::with_event_bus(manager, bus.clone()),
            None => SessionController::new(manager),
        };
        Self {
            controller,
            dialogs: Arc::clone(&config.dialogs),
            dispatcher: UiDispatcher::default(),
            state: Observable::default(),
        }
    }

    pub fn with_dispatcher(mut self, dispatcher: UiDispatcher) -> Self {
        self.dispatcher = dispatcher;
        self
    }

    pub fn observable(&self) -> &Observable<GpsState> {
        &self.state
    }

    pub fn state(&self) -> GpsState {
        self.state.get()
    }

    pub fn controller(&self) -> &SessionController<M> {
        &self.controller
    }

    /// Refresh access text and listener state when the screen is shown.
    pub async fn on_appearing(&self) {
        self.refresh_access().await;
        self.sync_listening();
    }

    // User input is applied in place; the next command reads it straight back.

    /// Changing the background flag re-reads the access status for it.
    pub async fn set_use_background(&self, use_background: bool) {
        self.state.update(|s| s.use_background = use_background);
        self.refresh_access().await;
    }

    pub fn set_deferred_meters(&self, text: impl Into<String>) {
        let text = text.into();
        self.state.update(|s| s.deferred_meters = text);
    }

    pub fn set_deferred_seconds(&self, text: impl Into<String>) {
        let text = text.into();
        self.state.update(|s| s.deferred_seconds = text);
    }

    /// Query access for the current background flag without prompting.
    pub async fn refresh_access(&self) {
        let use_background = self.state.with(|s| s.use_background);
        let access = self.controller.check_access(use_background).await;
        self.set_access_text(access);
    }

    /// Pick the listener priority from an action sheet.
    pub async fn select_priority(&self) -> Option<GpsPriority> {
        let sheet = GpsPriority::ALL
            .iter()
            .fold(
                ActionSheetConfig::new().with_title(PRIORITY_SHEET_TITLE),
                |sheet, priority| sheet.add(priority.label()),
            )
            .with_cancel();

        let priority = self
            .dialogs
            .action_sheet(sheet)
            .await
            .and_then(|index| GpsPriority::ALL.get(index).copied())?;
        debug!(priority = priority.label(), "Priority selected");
        self.state.update(|s| s.priority = priority);
        Some(priority)
    }

    /// Prompt for access with the current background flag.
    #[instrument(skip(self))]
    pub async fn request_access(&self) -> Result<AccessState> {
        let use_background = self.state.with(|s| s.use_background);
        let access = self.controller.request_access(use_background).await?;
        self.set_access_text(access);
        Ok(access)
    }

    /// Show the last known position once.
    #[instrument(skip(self))]
    pub async fn get_current_position(&self) -> Result<()> {
        self.post(|s| s.is_busy = true);
        let result = self.current_position().await;
        self.post(|s| s.is_busy = false);
        result
    }

    async fn current_position(&self) -> Result<()> {
        let access = match self.controller.request_access(true).await {
            Ok(access) => access,
            Err(e) => return self.report(e),
        };
        self.set_access_text(access);
        if !access.is_available() {
            warn!(access = %access, "No access for current position");
            return Ok(());
        }

        match self.controller.manager().last_reading().await {
            Ok(Some(reading)) => {
                self.post(move |s| s.values = GpsValues::from(&reading));
            }
            Ok(None) => self.dialogs.alert(NO_READING_MESSAGE),
            Err(e) => {
                error!(error = %e, "Last reading failed");
                self.dialogs.alert(&e.to_string());
            }
        }
        Ok(())
    }

    /// Start listening with the current settings, or stop.
    #[instrument(skip(self))]
    pub async fn toggle_updates(&self) -> Result<()> {
        let state = self.state.get();
        if !state.can_toggle_updates() {
            warn!(
                meters = %state.deferred_meters,
                seconds = %state.deferred_seconds,
                "Deferred settings invalid, not starting"
            );
            return Ok(());
        }

        let manager = self.controller.manager();
        let result: Result<()> = if self.controller.is_active().await {
            self.controller.stop().await.or_else(|e| self.report(e))
        } else if manager.is_listening() {
            // Listener left running by an earlier screen
            if let Err(e) = manager.stop().await {
                error!(error = %e, "Stopping GPS listener failed");
                self.dialogs.alert(&e.to_string());
            }
            Ok(())
        } else {
            self.start_updates(&state).await
        };

        self.sync_listening();
        result
    }

    async fn start_updates(&self, state: &GpsState) -> Result<()> {
        let access = match self.controller.request_access(state.use_background).await {
            Ok(access) => access,
            Err(e) => return self.report(e),
        };
        self.set_access_text(access);
        if !access.is_available() {
            self.dialogs.alert(INSUFFICIENT_PERMISSIONS);
            return Ok(());
        }

        let observable = self.state.clone();
        let dispatcher = self.dispatcher.clone();
        let dialogs = Arc::clone(&self.dialogs);
        let sink = move |signal: SessionSignal<GpsReading>| {
            let observable = observable.clone();
            match signal {
                SessionSignal::Reading(reading) => dispatcher.post(move || {
                    observable.update(|s| s.values = GpsValues::from(&reading));
                }),
                SessionSignal::Ended { reason } => {
                    let dialogs = Arc::clone(&dialogs);
                    dispatcher.post(move || {
                        observable.update(|s| s.set_updating(false));
                        dialogs.alert(&reason);
                    });
                }
            }
        };

        match self.controller.start(state.request(), sink).await {
            Ok(session_id) => {
                info!(session_id = %session_id, "GPS updates started");
                Ok(())
            }
            Err(e) => self.report(e),
        }
    }

    /// Stop listening and release the controller.
    pub async fn dispose(&self) {
        self.controller.shutdown().await;
        self.sync_listening();
    }

    /// Alert for recoverable errors; `Disposed` is a caller bug and is returned.
    fn report(&self, e: SessionError) -> Result<()> {
        match e {
            SessionError::Disposed => {
                error!("GPS command used after dispose");
                Err(e.into())
            }
            other => {
                warn!(error = %other, "GPS command failed");
                self.dialogs.alert(&other.to_string());
                Ok(())
            }
        }
    }

    fn sync_listening(&self) {
        let listening = self.controller.manager().is_listening();
        self.post(move |s| s.set_updating(listening));
    }

    fn set_access_text(&self, access: AccessState) {
        self.post(move |s| s.access = access.to_string());
    }

    fn post(&self, mutate: impl FnOnce(&mut GpsState) + Send + 'static) {
        let observable = self.state.clone();
        self.dispatcher.post(move || observable.update(mutate));
    }
}

impl<M: GpsManager + 'static> std::fmt::Debug for GpsViewModel<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GpsViewModel")
            .field("state", &self.state.get())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_deferred() {
        assert_eq!(parse_deferred(""), 0);
        assert_eq!(parse_deferred("  "), 0);
        assert_eq!(parse_deferred("25"), 25);
        assert_eq!(parse_deferred("abc"), -1);
        assert_eq!(parse_deferred("2.5"), -1);
    }

    #[test]
    fn test_can_toggle_updates() {
        let mut state = GpsState::default();
        assert!(state.can_toggle_updates());

        state.deferred_meters = "ten".to_string();
        assert!(!state.can_toggle_updates());

        state.set_updating(true);
        assert!(state.can_toggle_updates());
        assert_eq!(state.listener_text, "Stop Listening");
    }

    #[test]
    fn test_request_only_sets_positive_deferrals() {
        let state = GpsState {
            deferred_meters: "0".to_string(),
            deferred_seconds: "30".to_string(),
            priority: GpsPriority::Highest,
            ..Default::default()
        };
        let request = state.request();

        assert!(request.use_background);
        assert_eq!(request.priority, GpsPriority::Highest);
        assert!(request.deferred_distance.is_none());
        assert_eq!(request.deferred_time, Some(Duration::from_secs(30)));
    }
}
