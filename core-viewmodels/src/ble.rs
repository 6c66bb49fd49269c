//! # GATT Characteristic ViewModel
//!
//! Exposes one BLE characteristic: read, write with or without response,
//! notification toggling and a test BLOB transfer with a cancellable
//! progress dialog.
//!
//! Reads and writes run through [`OperationRunner`] with the configured
//! timeouts; the BLOB write runs without a timeout and is cancelled from the
//! loading dialog.

use std::sync::{Arc, Mutex};

use bridge_traits::{
    ActionSheetConfig, CharacteristicResult, Clock, ConfirmConfig, GattCharacteristic,
    LoadingDialog, PromptConfig, UserDialogs,
};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use core_operation::{
    blob_progress, single, CallbackObserver, OperationError, OperationOutcome, OperationRunner,
    RunOptions,
};
use core_runtime::config::{OperationTimeouts, SamplesConfig};
use core_runtime::logging::redact_if_sensitive;
use core_session::{drive_stream, SubscriptionHandle};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::dispatcher::UiDispatcher;
use crate::error::{Result, ViewModelError};
use crate::lock;
use crate::observable::Observable;

/// Shown when a read or notification carries no data
pub const EMPTY_VALUE: &str = "EMPTY";
/// Size of the test BLOB in bytes
pub const BLOB_LENGTH: usize = 5000;

const WRITE_ENCODING_MESSAGE: &str = "Write value from UTF8 or HEX?";
const DISPLAY_ENCODING_MESSAGE: &str = "Display Value as UTF8 or HEX?";
const SENDING_BLOB: &str = "Sending Blob";

const ALPHANUMERIC: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

/// What the user can do with a characteristic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CharacteristicAction {
    WriteWithResponse,
    WriteWithoutResponse,
    SendBlob,
    Read,
    Notify,
    StopNotifying,
}

impl CharacteristicAction {
    pub fn label(&self) -> &'static str {
        match self {
            CharacteristicAction::WriteWithResponse => "Write With Response",
            CharacteristicAction::WriteWithoutResponse => "Write Without Response",
            CharacteristicAction::SendBlob => "Send Test BLOB",
            CharacteristicAction::Read => "Read",
            CharacteristicAction::Notify => "Notify",
            CharacteristicAction::StopNotifying => "Stop Notifying",
        }
    }
}

/// How values are typed in and shown
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueEncoding {
    Utf8,
    Hex,
}

/// Render characteristic data for display.
///
/// HEX is upper-case byte pairs joined by dashes, e.g. `0A-FF-10`.
pub fn format_value(data: Option<&[u8]>, encoding: ValueEncoding) -> String {
    match data {
        None => EMPTY_VALUE.to_string(),
        Some(data) => match encoding {
            ValueEncoding::Utf8 => String::from_utf8_lossy(data).into_owned(),
            ValueEncoding::Hex => data
                .iter()
                .map(|b| hex::encode_upper([*b]))
                .collect::<Vec<_>>()
                .join("-"),
        },
    }
}

/// Parse user input into bytes. HEX input may use `-`, `:` or spaces
/// between pairs.
pub fn parse_value(text: &str, encoding: ValueEncoding) -> Result<Bytes> {
    match encoding {
        ValueEncoding::Utf8 => Ok(Bytes::copy_from_slice(text.as_bytes())),
        ValueEncoding::Hex => {
            let digits: String = text
                .chars()
                .filter(|c| !matches!(c, '-' | ':') && !c.is_whitespace())
                .collect();
            hex::decode(&digits)
                .map(Bytes::from)
                .map_err(|e| ViewModelError::InvalidInput {
                    field: "value".to_string(),
                    message: e.to_string(),
                })
        }
    }
}

/// `length` random alphanumeric characters.
pub fn random_blob(length: usize) -> Result<Bytes> {
    // Largest multiple of the alphabet size that fits in a byte
    let limit = 256 - (256 % ALPHANUMERIC.len());
    let mut blob = Vec::with_capacity(length);
    let mut buf = [0u8; 256];

    while blob.len() < length {
        getrandom::getrandom(&mut buf)
            .map_err(|e| ViewModelError::Internal(format!("Random source failed: {}", e)))?;
        let remaining = length - blob.len();
        blob.extend(
            buf.iter()
                .filter(|b| (**b as usize) < limit)
                .map(|b| ALPHANUMERIC[*b as usize % ALPHANUMERIC.len()])
                .take(remaining),
        );
    }
    Ok(Bytes::from(blob))
}

/// `HH:MM:SS.mmm`
fn format_elapsed(elapsed: chrono::Duration) -> String {
    let elapsed = elapsed.to_std().unwrap_or_default();
    let secs = elapsed.as_secs();
    format!(
        "{:02}:{:02}:{:02}.{:03}",
        secs / 3600,
        (secs / 60) % 60,
        secs % 60,
        elapsed.subsec_millis()
    )
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CharacteristicState {
    pub value: String,
    pub is_notifying: bool,
    pub is_value_available: bool,
    pub last_value: Option<DateTime<Utc>>,
}

pub struct GattCharacteristicViewModel {
    characteristic: Arc<dyn GattCharacteristic>,
    dialogs: Arc<dyn UserDialogs>,
    clock: Arc<dyn Clock>,
    timeouts: OperationTimeouts,
    runner: OperationRunner,
    dispatcher: UiDispatcher,
    state: Observable<CharacteristicState>,
    watcher: Mutex<Option<SubscriptionHandle>>,
}

impl GattCharacteristicViewModel {
    pub fn new(characteristic: Arc<dyn GattCharacteristic>, config: &SamplesConfig) -> Self {
        let runner = match &config.event_bus {
            Some(bus) => OperationRunner::with_event_bus(bus.clone()),
            None => OperationRunner::new(),
        };
        Self {
            characteristic,
            dialogs: Arc::clone(&config.dialogs),
            clock: Arc::clone(&config.clock),
            timeouts: config.timeouts,
            runner,
            dispatcher: UiDispatcher::default(),
            state: Observable::default(),
            watcher: Mutex::new(None),
        }
    }

    pub fn with_dispatcher(mut self, dispatcher: UiDispatcher) -> Self {
        self.dispatcher = dispatcher;
        self
    }

    pub fn observable(&self) -> &Observable<CharacteristicState> {
        &self.state
    }

    pub fn state(&self) -> CharacteristicState {
        self.state.get()
    }

    pub fn uuid(&self) -> Uuid {
        self.characteristic.uuid()
    }

    pub fn service_uuid(&self) -> Uuid {
        self.characteristic.service_uuid()
    }

    pub fn description(&self) -> String {
        self.characteristic.description()
    }

    /// Properties as display text
    pub fn properties(&self) -> String {
        self.characteristic.properties().to_string()
    }

    fn is_watching(&self) -> bool {
        lock(&self.watcher)
            .as_ref()
            .map_or(false, |watcher| !watcher.is_finished())
    }

    /// Actions offered in the selection sheet, in display order.
    pub fn available_actions(&self) -> Vec<CharacteristicAction> {
        let properties = self.characteristic.properties();
        let mut actions = Vec::new();
        if properties.can_write_with_response() {
            actions.push(CharacteristicAction::WriteWithResponse);
        }
        if properties.can_write_without_response() {
            actions.push(CharacteristicAction::WriteWithoutResponse);
        }
        if properties.can_write() {
            actions.push(CharacteristicAction::SendBlob);
        }
        if properties.can_read() {
            actions.push(CharacteristicAction::Read);
        }
        if properties.can_notify() {
            actions.push(if self.is_watching() {
                CharacteristicAction::StopNotifying
            } else {
                CharacteristicAction::Notify
            });
        }
        actions
    }

    /// Show the action sheet and run the chosen action.
    ///
    /// Returns the action that ran, or `None` when nothing is offered or the
    /// sheet was cancelled.
    pub async fn select(&self) -> Result<Option<CharacteristicAction>> {
        let actions = self.available_actions();
        if actions.is_empty() {
            debug!(uuid = %self.uuid(), "No actions for characteristic");
            return Ok(None);
        }

        let sheet = actions
            .iter()
            .fold(
                ActionSheetConfig::new()
                    .with_title(format!("{} - {}", self.description(), self.uuid())),
                |sheet, action| sheet.add(action.label()),
            )
            .with_cancel();

        let Some(action) = self
            .dialogs
            .action_sheet(sheet)
            .await
            .and_then(|index| actions.get(index).copied())
        else {
            return Ok(None);
        };

        self.perform(action).await?;
        Ok(Some(action))
    }

    pub async fn perform(&self, action: CharacteristicAction) -> Result<()> {
        match action {
            CharacteristicAction::WriteWithResponse => self.write(true).await,
            CharacteristicAction::WriteWithoutResponse => self.write(false).await,
            CharacteristicAction::SendBlob => self.send_blob().await.map(|_| ()),
            CharacteristicAction::Read => self.read().await,
            CharacteristicAction::Notify | CharacteristicAction::StopNotifying => {
                self.toggle_notify().await
            }
        }
    }

    async fn ask_encoding(&self, message: &str) -> ValueEncoding {
        let utf8 = self
            .dialogs
            .confirm(
                ConfirmConfig::new(message)
                    .with_ok_text("UTF8")
                    .with_cancel_text("HEX"),
            )
            .await;
        if utf8 {
            ValueEncoding::Utf8
        } else {
            ValueEncoding::Hex
        }
    }

    /// Prompt for a value and write it.
    #[instrument(skip(self), fields(uuid = %self.uuid()))]
    pub async fn write(&self, with_response: bool) -> Result<()> {
        let encoding = self.ask_encoding(WRITE_ENCODING_MESSAGE).await;
        let input = self
            .dialogs
            .prompt(PromptConfig::new("Please enter a write value").with_title(self.description()))
            .await;

        let text = input.text.trim();
        if !input.ok || text.is_empty() {
            debug!("Write cancelled");
            return Ok(());
        }
        debug!(value = %redact_if_sensitive("prompt", text), ?encoding, "Writing value");

        let data = match parse_value(text, encoding) {
            Ok(data) => data,
            Err(e) => {
                warn!(error = %e, "Write value rejected");
                self.dialogs.alert(&e.to_string());
                return Ok(());
            }
        };

        let characteristic = Arc::clone(&self.characteristic);
        let stream = single(async move {
            if with_response {
                characteristic.write(data).await
            } else {
                characteristic.write_without_response(data).await
            }
        });

        let done = if with_response {
            "Write Complete"
        } else {
            "Write Without Response Complete"
        };
        let (toast, alert) = (Arc::clone(&self.dialogs), Arc::clone(&self.dialogs));
        let observer = CallbackObserver::new()
            .on_complete(move |()| toast.toast(done))
            .on_error(move |e| alert.alert(&e.to_string()));

        let name = if with_response {
            "write"
        } else {
            "write_without_response"
        };
        self.runner
            .run(
                stream,
                Arc::new(observer),
                CancellationToken::new(),
                RunOptions::new(name).with_timeout(self.timeouts.write),
            )
            .await;
        Ok(())
    }

    /// Read the value once and display it.
    #[instrument(skip(self), fields(uuid = %self.uuid()))]
    pub async fn read(&self) -> Result<()> {
        let encoding = self.ask_encoding(DISPLAY_ENCODING_MESSAGE).await;

        let characteristic = Arc::clone(&self.characteristic);
        let stream = single(async move { characteristic.read().await });

        let show = self.value_setter(encoding);
        let alert = Arc::clone(&self.dialogs);
        let observer = CallbackObserver::new()
            .on_complete(move |result: CharacteristicResult| show(result.data))
            .on_error(move |e| alert.alert(&e.to_string()));

        self.runner
            .run(
                stream,
                Arc::new(observer),
                CancellationToken::new(),
                RunOptions::new("read").with_timeout(self.timeouts.read),
            )
            .await;
        Ok(())
    }

    /// Start or stop displaying notifications.
    #[instrument(skip(self), fields(uuid = %self.uuid()))]
    pub async fn toggle_notify(&self) -> Result<()> {
        let existing = lock(&self.watcher).take();
        if let Some(watcher) = existing {
            let running = !watcher.is_finished();
            watcher.dispose();
            if running {
                info!("Notifications stopped");
                self.post(|s| s.is_notifying = false);
                return Ok(());
            }
        }

        self.post(|s| s.is_notifying = true);
        let encoding = self.ask_encoding(DISPLAY_ENCODING_MESSAGE).await;

        let stream = match self.characteristic.notify().await {
            Ok(stream) => stream,
            Err(e) => {
                warn!(error = %e, "Notify failed");
                self.post(|s| s.is_notifying = false);
                self.dialogs.alert(&e.to_string());
                return Ok(());
            }
        };

        let show = self.value_setter(encoding);
        let observable = self.state.clone();
        let dispatcher = self.dispatcher.clone();
        let dialogs = Arc::clone(&self.dialogs);
        let watcher = SubscriptionHandle::spawn(move |token| async move {
            let exit = drive_stream(stream, &token, |result| show(result.data)).await;
            if let Some(reason) = exit.reason() {
                warn!(reason = %reason, "Notification stream ended");
                dispatcher.post(move || {
                    observable.update(|s| s.is_notifying = false);
                    dialogs.alert(&reason);
                });
            }
        });

        info!("Notifications started");
        *lock(&self.watcher) = Some(watcher);
        Ok(())
    }

    /// Write a random BLOB, showing progress in a cancellable dialog.
    #[instrument(skip(self), fields(uuid = %self.uuid()))]
    pub async fn send_blob(&self) -> Result<OperationOutcome> {
        let reliable = self
            .dialogs
            .confirm(
                ConfirmConfig::new("Use reliable write transaction?")
                    .with_title("Confirm")
                    .use_yes_no(),
            )
            .await;
        let data = random_blob(BLOB_LENGTH)?;

        let token = CancellationToken::new();
        let cancel = token.clone();
        let loading: Arc<dyn LoadingDialog> = Arc::from(self.dialogs.loading(
            SENDING_BLOB,
            Some(Box::new(move || cancel.cancel())),
        ));

        let started = self.clock.now();
        let kind = if reliable { "reliable write" } else { "write" };
        let observer = CallbackObserver::new()
            .on_progress({
                let loading = Arc::clone(&loading);
                move |p| {
                    loading.set_title(&format!(
                        "{} - Sent {} of {} bytes",
                        SENDING_BLOB, p.position, p.total
                    ))
                }
            })
            .on_complete({
                let (loading, dialogs, clock) = (
                    Arc::clone(&loading),
                    Arc::clone(&self.dialogs),
                    Arc::clone(&self.clock),
                );
                move |_written: u64| {
                    loading.dismiss();
                    let elapsed = format_elapsed(clock.now() - started);
                    dialogs.toast(&format!("BLOB {} took {}", kind, elapsed));
                }
            })
            .on_error({
                let dialogs = Arc::clone(&self.dialogs);
                move |e| {
                    loading.dismiss();
                    match e {
                        OperationError::Cancelled => info!("BLOB write cancelled"),
                        other => dialogs.toast(&format!("Failed writing blob - {}", other)),
                    }
                }
            });

        let stream = blob_progress(self.characteristic.blob_write(data, reliable));
        let outcome = self
            .runner
            .run(stream, Arc::new(observer), token, RunOptions::new("blob_write"))
            .await;
        Ok(outcome)
    }

    /// Stop notifications, if any.
    pub fn dispose(&self) {
        if let Some(watcher) = lock(&self.watcher).take() {
            watcher.dispose();
            self.post(|s| s.is_notifying = false);
        }
    }

    /// Callback that displays a value through the dispatcher.
    fn value_setter(
        &self,
        encoding: ValueEncoding,
    ) -> impl Fn(Option<Bytes>) + Send + Sync + 'static {
        let observable = self.state.clone();
        let dispatcher = self.dispatcher.clone();
        let clock = Arc::clone(&self.clock);
        move |data| {
            let observable = observable.clone();
            let now = clock.now();
            dispatcher.post(move || {
                observable.update(|s| {
                    s.is_value_available = true;
                    s.last_value = Some(now);
                    s.value = format_value(data.as_deref(), encoding);
                })
            });
        }
    }

    fn post(&self, mutate: impl FnOnce(&mut CharacteristicState) + Send + 'static) {
        let observable = self.state.clone();
        self.dispatcher.post(move || observable.update(mutate));
    }
}

impl std::fmt::Debug for GattCharacteristicViewModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GattCharacteristicViewModel")
            .field("uuid", &self.uuid())
            .field("state", &self.state.get())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_value() {
        assert_eq!(format_value(None, ValueEncoding::Utf8), "EMPTY");
        assert_eq!(format_value(Some(b"hi"), ValueEncoding::Utf8), "hi");
        assert_eq!(
            format_value(Some(&[0x0a, 0xff, 0x10]), ValueEncoding::Hex),
            "0A-FF-10"
        );
        assert_eq!(format_value(Some(&[]), ValueEncoding::Hex), "");
    }

    #[test]
    fn test_parse_value() {
        assert_eq!(
            parse_value("0A-ff 10", ValueEncoding::Hex).unwrap(),
            Bytes::from_static(&[0x0a, 0xff, 0x10])
        );
        assert_eq!(
            parse_value("abc", ValueEncoding::Utf8).unwrap(),
            Bytes::from_static(b"abc")
        );
        assert!(matches!(
            parse_value("xyz", ValueEncoding::Hex),
            Err(ViewModelError::InvalidInput { .. })
        ));
    }

    #[test]
    fn test_random_blob_is_alphanumeric() {
        let blob = random_blob(BLOB_LENGTH).unwrap();
        assert_eq!(blob.len(), BLOB_LENGTH);
        assert!(blob.iter().all(|b| b.is_ascii_alphanumeric()));
        assert_ne!(blob, random_blob(BLOB_LENGTH).unwrap());
    }

    #[test]
    fn test_format_elapsed() {
        let elapsed = chrono::Duration::milliseconds(3_723_045);
        assert_eq!(format_elapsed(elapsed), "01:02:03.045");
        assert_eq!(format_elapsed(chrono::Duration::milliseconds(-5)), "00:00:00.000");
    }
}
