//! Simulated GPS Implementation

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use bridge_traits::{
    capability::{CapabilityKind, CapabilityManager, ReadingStream},
    error::Result,
    gps::{GpsManager, GpsReading, GpsRequest},
    AccessState, BridgeError,
};
use tokio::sync::broadcast;
use tracing::{debug, info};

use crate::lock;
use crate::stream::{BroadcastReadingStream, SimulatedItem};

const READING_BUFFER: usize = 64;

/// GPS manager driven by the host instead of a receiver
///
/// Readings are pushed with [`emit`](Self::emit); subscription failures with
/// [`fail`](Self::fail); [`close`](Self::close) ends every open stream.
///
/// Foreground and background access are tracked separately. A request
/// resolves to the configured outcome for the level asked for.
pub struct SimulatedGpsManager {
    foreground: Mutex<AccessState>,
    background: Mutex<AccessState>,
    request_outcome: Mutex<AccessState>,
    request_count: AtomicUsize,
    listening: AtomicBool,
    config: Mutex<Option<GpsRequest>>,
    last: Mutex<Option<GpsReading>>,
    sender: Mutex<Option<broadcast::Sender<SimulatedItem<GpsReading>>>>,
}

impl SimulatedGpsManager {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(READING_BUFFER);
        Self {
            foreground: Mutex::new(AccessState::Unknown),
            background: Mutex::new(AccessState::Unknown),
            request_outcome: Mutex::new(AccessState::Available),
            request_count: AtomicUsize::new(0),
            listening: AtomicBool::new(false),
            config: Mutex::new(None),
            last: Mutex::new(None),
            sender: Mutex::new(Some(sender)),
        }
    }

    /// Current state for both foreground and background access.
    pub fn with_access(self, access: AccessState) -> Self {
        *lock(&self.foreground) = access;
        *lock(&self.background) = access;
        self
    }

    /// State granted when access is requested.
    pub fn with_request_outcome(self, access: AccessState) -> Self {
        *lock(&self.request_outcome) = access;
        self
    }

    pub fn with_last_reading(self, reading: GpsReading) -> Self {
        *lock(&self.last) = Some(reading);
        self
    }

    pub fn set_access(&self, require_background: bool, access: AccessState) {
        if require_background {
            *lock(&self.background) = access;
        } else {
            *lock(&self.foreground) = access;
        }
    }

    /// Number of times [`request_access`](CapabilityManager::request_access) was called.
    pub fn request_count(&self) -> usize {
        self.request_count.load(Ordering::SeqCst)
    }

    /// Configuration passed to the most recent start.
    pub fn current_config(&self) -> Option<GpsRequest> {
        lock(&self.config).clone()
    }

    /// Deliver a reading to every subscriber. Returns the number reached.
    pub fn emit(&self, reading: GpsReading) -> usize {
        *lock(&self.last) = Some(reading.clone());
        self.send(Ok(reading))
    }

    /// Report a subscription failure to every subscriber.
    pub fn fail(&self, message: impl Into<String>) -> usize {
        self.send(Err(message.into()))
    }

    /// End every open stream, as when the platform tears the listener down.
    pub fn close(&self) {
        lock(&self.sender).take();
        self.listening.store(false, Ordering::SeqCst);
    }

    fn send(&self, item: SimulatedItem<GpsReading>) -> usize {
        lock(&self.sender)
            .as_ref()
            .and_then(|sender| sender.send(item).ok())
            .unwrap_or(0)
    }
}

impl Default for SimulatedGpsManager {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CapabilityManager for SimulatedGpsManager {
    type Config = GpsRequest;
    type Reading = GpsReading;

    fn kind(&self) -> CapabilityKind {
        CapabilityKind::Gps
    }

    async fn check_access(&self, require_background: bool) -> AccessState {
        if require_background {
            *lock(&self.background)
        } else {
            *lock(&self.foreground)
        }
    }

    async fn request_access(&self, require_background: bool) -> AccessState {
        self.request_count.fetch_add(1, Ordering::SeqCst);
        let outcome = *lock(&self.request_outcome);
        self.set_access(require_background, outcome);
        if require_background && outcome.is_available() {
            // Background access implies foreground access
            *lock(&self.foreground) = outcome;
        }
        info!(require_background, access = %outcome, "Simulated GPS access requested");
        outcome
    }

    async fn start(&self, config: GpsRequest) -> Result<()> {
        let access = self.check_access(config.use_background).await;
        if !access.is_available() {
            return Err(BridgeError::NotAvailable(format!(
                "GPS access is {}",
                access
            )));
        }

        {
            let mut sender = lock(&self.sender);
            if sender.is_none() {
                let (fresh, _) = broadcast::channel(READING_BUFFER);
                *sender = Some(fresh);
            }
        }

        debug!(priority = config.priority.label(), "Simulated GPS listener started");
        *lock(&self.config) = Some(config);
        self.listening.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        if self.listening.swap(false, Ordering::SeqCst) {
            debug!("Simulated GPS listener stopped");
        }
        Ok(())
    }

    fn is_listening(&self) -> bool {
        self.listening.load(Ordering::SeqCst)
    }

    async fn subscribe(&self) -> Result<Box<dyn ReadingStream<GpsReading>>> {
        let mut sender = lock(&self.sender);
        let sender = sender.get_or_insert_with(|| broadcast::channel(READING_BUFFER).0);
        Ok(Box::new(BroadcastReadingStream::new(sender.subscribe())))
    }
}

#[async_trait]
impl GpsManager for SimulatedGpsManager {
    async fn last_reading(&self) -> Result<Option<GpsReading>> {
        Ok(lock(&self.last).clone())
    }
}
