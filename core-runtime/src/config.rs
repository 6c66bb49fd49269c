//! # Core Configuration Module
//!
//! Explicit composition of the collaborators every ViewModel needs.
//!
//! ## Overview
//!
//! Instead of resolving dialogs and navigation from a global container, the
//! host builds one [`SamplesConfig`] and passes it (or the pieces of it) into
//! constructors. The builder validates eagerly and fails fast with an
//! actionable message when a required collaborator is missing.
//!
//! ## Required Dependencies
//!
//! - `UserDialogs` - confirmation, prompts, toasts, loading dialogs
//! - `Navigator` - page navigation
//!
//! ## Optional Dependencies (with defaults)
//!
//! - `Clock` - defaults to [`SystemClock`]
//! - `EventBus` - lifecycle events are not published when absent
//!
//! When the `desktop-shims` feature is enabled, desktop defaults for
//! `UserDialogs` and `Navigator` are injected automatically if not provided.
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::{OperationTimeouts, SamplesConfig};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! let config = SamplesConfig::builder()
//!     .dialogs(Arc::new(MyDialogs))
//!     .navigator(Arc::new(MyNavigator))
//!     .timeouts(OperationTimeouts::default().with_read(Duration::from_secs(5)))
//!     .build()?;
//! ```

use crate::error::{Error, Result};
use crate::events::{EventBus, DEFAULT_EVENT_BUFFER_SIZE};
use bridge_traits::{Clock, Navigator, SystemClock, UserDialogs};
use std::sync::Arc;
use std::time::Duration;

/// Default bound for single-shot characteristic reads and writes.
pub const DEFAULT_OPERATION_TIMEOUT: Duration = Duration::from_secs(2);

/// Longest timeout the builder accepts.
pub const MAX_OPERATION_TIMEOUT: Duration = Duration::from_secs(60);

/// Bounds applied to single-shot operations.
///
/// BLOB writes are not bounded; they run until completion or cancellation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperationTimeouts {
    pub read: Duration,
    pub write: Duration,
}

impl Default for OperationTimeouts {
    fn default() -> Self {
        Self {
            read: DEFAULT_OPERATION_TIMEOUT,
            write: DEFAULT_OPERATION_TIMEOUT,
        }
    }
}

impl OperationTimeouts {
    pub fn with_read(mut self, timeout: Duration) -> Self {
        self.read = timeout;
        self
    }

    pub fn with_write(mut self, timeout: Duration) -> Self {
        self.write = timeout;
        self
    }

    pub fn validate(&self) -> Result<()> {
        for (name, value) in [("read", self.read), ("write", self.write)] {
            if value.is_zero() {
                return Err(Error::Config(format!(
                    "{} timeout must be greater than 0ms",
                    name
                )));
            }
            if value > MAX_OPERATION_TIMEOUT {
                return Err(Error::Config(format!(
                    "{} timeout exceeds maximum of {} seconds",
                    name,
                    MAX_OPERATION_TIMEOUT.as_secs()
                )));
            }
        }
        Ok(())
    }
}

/// Collaborators and settings shared by the ViewModels.
#[derive(Clone)]
pub struct SamplesConfig {
    pub dialogs: Arc<dyn UserDialogs>,
    pub navigator: Arc<dyn Navigator>,
    pub clock: Arc<dyn Clock>,
    pub event_bus: Option<EventBus>,
    pub timeouts: OperationTimeouts,
}

impl std::fmt::Debug for SamplesConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SamplesConfig")
            .field("dialogs", &"UserDialogs { ... }")
            .field("navigator", &"Navigator { ... }")
            .field("clock", &"Clock { ... }")
            .field("event_bus", &self.event_bus)
            .field("timeouts", &self.timeouts)
            .finish()
    }
}

impl SamplesConfig {
    pub fn builder() -> SamplesConfigBuilder {
        SamplesConfigBuilder::default()
    }
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_dialogs() -> Result<Arc<dyn UserDialogs>> {
    Err(Error::CapabilityMissing {
        capability: "UserDialogs".to_string(),
        message: "UserDialogs implementation is required for confirmations and progress. \
                  Desktop: enable the 'desktop-shims' feature to use ScriptedDialogs. \
                  Mobile: inject the platform dialog adapter."
            .to_string(),
    })
}

#[cfg(feature = "desktop-shims")]
fn provide_default_dialogs() -> Result<Arc<dyn UserDialogs>> {
    Ok(Arc::new(bridge_desktop::ScriptedDialogs::new()))
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_navigator() -> Result<Arc<dyn Navigator>> {
    Err(Error::CapabilityMissing {
        capability: "Navigator".to_string(),
        message: "Navigator implementation is required for page navigation. \
                  Desktop: enable the 'desktop-shims' feature to use RecordingNavigator. \
                  Mobile: inject the platform navigation adapter."
            .to_string(),
    })
}

#[cfg(feature = "desktop-shims")]
fn provide_default_navigator() -> Result<Arc<dyn Navigator>> {
    Ok(Arc::new(bridge_desktop::RecordingNavigator::new()))
}

/// Builder for [`SamplesConfig`].
#[derive(Default)]
pub struct SamplesConfigBuilder {
    dialogs: Option<Arc<dyn UserDialogs>>,
    navigator: Option<Arc<dyn Navigator>>,
    clock: Option<Arc<dyn Clock>>,
    event_bus: Option<EventBus>,
    event_buffer_size: Option<usize>,
    timeouts: Option<OperationTimeouts>,
}

impl SamplesConfigBuilder {
    pub fn dialogs(mut self, dialogs: Arc<dyn UserDialogs>) -> Self {
        self.dialogs = Some(dialogs);
        self
    }

    pub fn navigator(mut self, navigator: Arc<dyn Navigator>) -> Self {
        self.navigator = Some(navigator);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Publish lifecycle events to an existing bus.
    pub fn event_bus(mut self, bus: EventBus) -> Self {
        self.event_bus = Some(bus);
        self
    }

    /// Create a fresh bus with the given capacity.
    ///
    /// Ignored when [`event_bus`](Self::event_bus) is also set.
    pub fn event_buffer_size(mut self, capacity: usize) -> Self {
        self.event_buffer_size = Some(capacity);
        self
    }

    pub fn timeouts(mut self, timeouts: OperationTimeouts) -> Self {
        self.timeouts = Some(timeouts);
        self
    }

    /// Validate and assemble the configuration.
    ///
    /// # Errors
    ///
    /// - [`Error::CapabilityMissing`] when dialogs or navigator are absent and
    ///   no desktop default is compiled in
    /// - [`Error::Config`] for invalid timeouts or a zero event buffer
    pub fn build(self) -> Result<SamplesConfig> {
        let dialogs = match self.dialogs {
            Some(dialogs) => dialogs,
            None => provide_default_dialogs()?,
        };
        let navigator = match self.navigator {
            Some(navigator) => navigator,
            None => provide_default_navigator()?,
        };

        let timeouts = self.timeouts.unwrap_or_default();
        timeouts.validate()?;

        let event_bus = match (self.event_bus, self.event_buffer_size) {
            (Some(bus), _) => Some(bus),
            (None, Some(0)) => {
                return Err(Error::Config(
                    "Event buffer size must be greater than 0".to_string(),
                ))
            }
            (None, Some(capacity)) => Some(EventBus::new(capacity)),
            (None, None) => None,
        };

        Ok(SamplesConfig {
            dialogs,
            navigator,
            clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
            event_bus,
            timeouts,
        })
    }
}

/// Convenience used by hosts that want events without picking a size.
pub fn default_event_bus() -> EventBus {
    EventBus::new(DEFAULT_EVENT_BUFFER_SIZE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_traits::{
        ActionSheetConfig, CancelAction, ConfirmConfig, LoadingDialog, NavigationParameters,
        PromptConfig, PromptResult,
    };

    struct SilentDialogs;

    struct NoopLoading;

    impl LoadingDialog for NoopLoading {
        fn set_title(&self, _title: &str) {}
        fn dismiss(&self) {}
    }

    #[async_trait::async_trait]
    impl UserDialogs for SilentDialogs {
        async fn confirm(&self, _config: ConfirmConfig) -> bool {
            false
        }
        async fn prompt(&self, _config: PromptConfig) -> PromptResult {
            PromptResult::default()
        }
        async fn action_sheet(&self, _config: ActionSheetConfig) -> Option<usize> {
            None
        }
        fn toast(&self, _message: &str) {}
        fn alert(&self, _message: &str) {}
        fn loading(&self, _title: &str, _on_cancel: Option<CancelAction>) -> Box<dyn LoadingDialog> {
            Box::new(NoopLoading)
        }
    }

    struct SilentNavigator;

    #[async_trait::async_trait]
    impl Navigator for SilentNavigator {
        async fn navigate(
            &self,
            _route: &str,
            _parameters: NavigationParameters,
        ) -> bridge_traits::error::Result<()> {
            Ok(())
        }
    }

    fn builder() -> SamplesConfigBuilder {
        SamplesConfig::builder()
            .dialogs(Arc::new(SilentDialogs))
            .navigator(Arc::new(SilentNavigator))
    }

    #[test]
    fn test_build_with_defaults() {
        let config = builder().build().unwrap();
        assert_eq!(config.timeouts, OperationTimeouts::default());
        assert_eq!(config.timeouts.read, Duration::from_secs(2));
        assert!(config.event_bus.is_none());
    }

    #[test]
    fn test_event_buffer_size_creates_bus() {
        let config = builder().event_buffer_size(8).build().unwrap();
        assert!(config.event_bus.is_some());
    }

    #[test]
    fn test_zero_event_buffer_rejected() {
        let err = builder().event_buffer_size(0).build().unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_invalid_timeouts_rejected() {
        let zero = OperationTimeouts::default().with_read(Duration::ZERO);
        assert!(builder().timeouts(zero).build().is_err());

        let huge = OperationTimeouts::default().with_write(Duration::from_secs(61));
        let err = builder().timeouts(huge).build().unwrap_err();
        assert!(err.to_string().contains("write timeout exceeds"));
    }

    #[cfg(not(feature = "desktop-shims"))]
    #[test]
    fn test_missing_dialogs_fails_fast() {
        let err = SamplesConfig::builder()
            .navigator(Arc::new(SilentNavigator))
            .build()
            .unwrap_err();
        assert!(matches!(
            err,
            Error::CapabilityMissing { ref capability, .. } if capability == "UserDialogs"
        ));
    }
}
