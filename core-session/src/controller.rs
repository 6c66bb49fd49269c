//! # Session Controller
//!
//! Drives one [`CapabilityManager`] through the access-and-session state
//! machine.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use core_session::{SessionController, SessionSignal};
//!
//! let controller = SessionController::new(Arc::new(gps_manager));
//!
//! if controller.request_access(false).await?.is_available() {
//!     controller
//!         .start(GpsRequest::default(), |signal| match signal {
//!             SessionSignal::Reading(reading) => println!("{:?}", reading),
//!             SessionSignal::Ended { reason } => eprintln!("ended: {}", reason),
//!         })
//!         .await?;
//! }
//!
//! controller.stop().await?;
//! ```
//!
//! ## Guarantees
//!
//! - Zero or one session at any time; a second `start` is rejected with
//!   [`SessionError::AlreadyActive`]
//! - `request_access` does not prompt again once access covering the asked
//!   background level has been granted
//! - `stop` on an idle controller does nothing
//! - teardown (`shutdown` or `Drop`) stops the running session

use std::sync::Arc;

use bridge_traits::{
    capability::{CapabilityKind, CapabilityManager, SessionConfig},
    AccessState,
};
use core_runtime::events::{CoreEvent, EventBus, SessionEvent};
use tokio::sync::Mutex;
use tracing::{debug, error, info, instrument, warn};

use crate::error::{Result, SessionError};
use crate::session::{drive_stream, Session, SessionId, SessionSignal, SubscriptionHandle};
use crate::state::SessionState;

struct ControllerState<C> {
    state: SessionState,
    /// Strongest background level access has been granted for
    granted_background: Option<bool>,
    last_access: AccessState,
    session: Option<Session<C>>,
    disposed: bool,
}

impl<C> ControllerState<C> {
    fn covers(&self, require_background: bool) -> bool {
        matches!(self.granted_background, Some(bg) if bg || !require_background)
    }

    fn advance(&mut self, to: SessionState) -> Result<()> {
        self.state = self.state.transition(to)?;
        debug!(state = %self.state, "Session state changed");
        Ok(())
    }
}

struct Shared<M: CapabilityManager> {
    manager: Arc<M>,
    inner: Mutex<ControllerState<M::Config>>,
    event_bus: Option<EventBus>,
}

impl<M: CapabilityManager + 'static> Shared<M> {
    fn emit(&self, event: SessionEvent) {
        if let Some(bus) = &self.event_bus {
            bus.emit(CoreEvent::Session(event)).ok();
        }
    }

    /// The pump for `session_id` exited without being asked to.
    async fn session_ended(&self, session_id: SessionId, reason: &str) -> bool {
        let mut inner = self.inner.lock().await;
        let is_current = inner
            .session
            .as_ref()
            .is_some_and(|session| session.id() == session_id);
        if !is_current {
            return false;
        }

        if let Some(session) = inner.session.take() {
            session.dispose();
        }
        if let Err(e) = inner.advance(SessionState::Idle) {
            error!(error = %e, "Failed to return to idle after stream failure");
        }
        if let Err(e) = self.manager.stop().await {
            warn!(error = %e, "Manager stop after stream failure reported an error");
        }

        warn!(session_id = %session_id, reason, "Session ended by the platform");
        self.emit(SessionEvent::Failed {
            session_id: session_id.to_string(),
            capability: self.manager.kind(),
            message: reason.to_string(),
        });
        true
    }

    async fn teardown(&self) {
        let mut inner = self.inner.lock().await;
        inner.disposed = true;
        if let Some(session) = inner.session.take() {
            session.dispose();
            if let Err(e) = self.manager.stop().await {
                warn!(error = %e, "Manager stop during teardown reported an error");
            }
            inner.state = SessionState::Idle;
            self.emit(SessionEvent::Stopped {
                session_id: session.id().to_string(),
                capability: self.manager.kind(),
            });
            info!(session_id = %session.id(), "Session stopped on teardown");
        }
    }
}

/// Access-and-session state machine for one capability manager
pub struct SessionController<M: CapabilityManager + 'static> {
    shared: Arc<Shared<M>>,
}

impl<M: CapabilityManager + 'static> SessionController<M> {
    pub fn new(manager: Arc<M>) -> Self {
        Self::build(manager, None)
    }

    /// Publish access and lifecycle events to `bus`.
    pub fn with_event_bus(manager: Arc<M>, bus: EventBus) -> Self {
        Self::build(manager, Some(bus))
    }

    fn build(manager: Arc<M>, event_bus: Option<EventBus>) -> Self {
        Self {
            shared: Arc::new(Shared {
                manager,
                inner: Mutex::new(ControllerState {
                    state: SessionState::Idle,
                    granted_background: None,
                    last_access: AccessState::Unknown,
                    session: None,
                    disposed: false,
                }),
                event_bus,
            }),
        }
    }

    pub fn capability(&self) -> CapabilityKind {
        self.shared.manager.kind()
    }

    pub fn manager(&self) -> &Arc<M> {
        &self.shared.manager
    }

    pub async fn state(&self) -> SessionState {
        self.shared.inner.lock().await.state
    }

    pub async fn is_active(&self) -> bool {
        self.shared.inner.lock().await.session.is_some()
    }

    /// Number of live sessions; always 0 or 1.
    pub async fn session_count(&self) -> usize {
        usize::from(self.shared.inner.lock().await.session.is_some())
    }

    pub async fn current_session_id(&self) -> Option<SessionId> {
        self.shared.inner.lock().await.session.as_ref().map(Session::id)
    }

    /// Configuration of the running session.
    pub async fn current_config(&self) -> Option<M::Config> {
        self.shared
            .inner
            .lock()
            .await
            .session
            .as_ref()
            .map(|session| session.config().clone())
    }

    /// Query access without prompting. Never changes controller state.
    pub async fn check_access(&self, require_background: bool) -> AccessState {
        self.shared.manager.check_access(require_background).await
    }

    /// Ask for access, prompting through the platform if needed.
    ///
    /// Returns `Available` without prompting when access covering
    /// `require_background` was already granted.
    ///
    /// # Errors
    ///
    /// - [`SessionError::Disposed`] after shutdown
    #[instrument(skip(self), fields(capability = %self.capability()))]
    pub async fn request_access(&self, require_background: bool) -> Result<AccessState> {
        let was_active = {
            let mut inner = self.shared.inner.lock().await;
            if inner.disposed {
                return Err(SessionError::Disposed);
            }
            if inner.covers(require_background) {
                debug!("Access already granted, not prompting");
                return Ok(AccessState::Available);
            }
            if inner.state == SessionState::AccessPending {
                warn!("Access request already in flight");
                return Ok(inner.last_access);
            }
            let was_active = inner.state.is_active();
            if !was_active {
                inner.advance(SessionState::AccessPending)?;
            }
            was_active
        };

        let access = self.shared.manager.request_access(require_background).await;

        let mut inner = self.shared.inner.lock().await;
        inner.last_access = access;
        if access.is_available() {
            inner.granted_background = Some(
                require_background || inner.granted_background.unwrap_or(false),
            );
            if !was_active && inner.state == SessionState::AccessPending {
                inner.advance(SessionState::AccessGranted)?;
            }
            info!(access = %access, "Access granted");
        } else {
            inner.granted_background = None;
            if !was_active && inner.state == SessionState::AccessPending {
                inner.advance(SessionState::Denied)?;
            }
            warn!(access = %access, "Access not granted");
        }
        drop(inner);

        self.shared.emit(SessionEvent::AccessChanged {
            capability: self.capability(),
            access,
        });
        Ok(access)
    }

    /// Start a session and forward its readings to `sink`.
    ///
    /// `sink` runs on the pump task; it receives every reading in order and
    /// a final [`SessionSignal::Ended`] if the platform stream fails or
    /// closes.
    ///
    /// # Errors
    ///
    /// - [`SessionError::AlreadyActive`] when a session is running
    /// - [`SessionError::AccessDenied`] without available access
    /// - [`SessionError::Disposed`] after shutdown
    /// - [`SessionError::Bridge`] when the manager fails to start
    #[instrument(skip(self, config, sink), fields(capability = %self.capability()))]
    pub async fn start<F>(&self, config: M::Config, sink: F) -> Result<SessionId>
    where
        F: Fn(SessionSignal<M::Reading>) + Send + Sync + 'static,
    {
        let mut inner = self.shared.inner.lock().await;
        if inner.disposed {
            error!("Start requested on a disposed session controller");
            return Err(SessionError::Disposed);
        }
        if inner.session.is_some() {
            warn!("Start requested while a session is active");
            return Err(SessionError::AlreadyActive(self.capability()));
        }

        let require_background = config.requires_background();
        match inner.state {
            SessionState::Denied => return Err(SessionError::AccessDenied(inner.last_access)),
            SessionState::AccessPending => {
                return Err(SessionError::AccessDenied(AccessState::Unknown))
            }
            _ => {}
        }

        if !inner.covers(require_background) {
            let access = self.shared.manager.check_access(require_background).await;
            inner.last_access = access;
            if !access.is_available() {
                warn!(access = %access, "Start refused without access");
                return Err(SessionError::AccessDenied(access));
            }
            inner.granted_background =
                Some(require_background || inner.granted_background.unwrap_or(false));
        }
        if inner.state == SessionState::Idle {
            inner.advance(SessionState::AccessGranted)?;
        }

        // Subscribe before starting so no early reading is missed
        let stream = self.shared.manager.subscribe().await?;
        self.shared.manager.start(config.clone()).await?;

        let session_id = SessionId::new();
        let shared = Arc::clone(&self.shared);
        let handle = SubscriptionHandle::spawn(move |token| async move {
            let exit = drive_stream(stream, &token, |reading| sink(SessionSignal::Reading(reading)))
                .await;
            if let Some(reason) = exit.reason() {
                if shared.session_ended(session_id, &reason).await {
                    sink(SessionSignal::Ended { reason });
                }
            }
        });

        inner.session = Some(Session::new(
            session_id,
            self.capability(),
            config,
            handle,
        ));
        inner.advance(SessionState::Active)?;
        drop(inner);

        info!(session_id = %session_id, "Session started");
        self.shared.emit(SessionEvent::Started {
            session_id: session_id.to_string(),
            capability: self.capability(),
        });
        Ok(session_id)
    }

    /// Stop the running session. Does nothing when idle.
    ///
    /// The controller is `Idle` afterwards even if the manager reports an
    /// error, which is returned.
    #[instrument(skip(self), fields(capability = %self.capability()))]
    pub async fn stop(&self) -> Result<()> {
        let mut inner = self.shared.inner.lock().await;
        let Some(session) = inner.session.take() else {
            debug!("Stop requested with no active session");
            return Ok(());
        };

        session.dispose();
        inner.advance(SessionState::Idle)?;
        let stopped = self.shared.manager.stop().await;
        drop(inner);

        info!(session_id = %session.id(), "Session stopped");
        self.shared.emit(SessionEvent::Stopped {
            session_id: session.id().to_string(),
            capability: self.capability(),
        });
        stopped.map_err(SessionError::from)
    }

    /// Stop any session and refuse further starts.
    pub async fn shutdown(&self) {
        self.shared.teardown().await;
    }
}

impl<M: CapabilityManager + 'static> Drop for SessionController<M> {
    fn drop(&mut self) {
        let shared = Arc::clone(&self.shared);
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move { shared.teardown().await });
            }
            Err(_) => {
                // No runtime to stop the manager on; at least cancel the pump
                if let Ok(mut inner) = shared.inner.try_lock() {
                    inner.disposed = true;
                    if let Some(session) = inner.session.take() {
                        session.dispose();
                    }
                }
            }
        }
    }
}

impl<M: CapabilityManager + 'static> std::fmt::Debug for SessionController<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionController")
            .field("capability", &self.capability())
            .finish()
    }
}
