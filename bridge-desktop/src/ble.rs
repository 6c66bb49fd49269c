//! Simulated GATT Characteristic

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bridge_traits::{
    ble::{BlobWriteProgress, CharacteristicProperties, CharacteristicResult, GattCharacteristic},
    capability::ReadingStream,
    error::Result,
    BridgeError,
};
use bytes::Bytes;
use futures::stream::{self, BoxStream, StreamExt};
use tokio::sync::broadcast;
use tracing::debug;
use uuid::Uuid;

use crate::lock;
use crate::stream::{BroadcastReadingStream, SimulatedItem};

const NOTIFY_BUFFER: usize = 32;
const DEFAULT_CHUNK_SIZE: usize = 512;

/// In-memory characteristic with a configurable link
///
/// Reads return the last written value. BLOB writes are split into chunks of
/// `chunk_size` bytes with `chunk_delay` between acknowledgements, which lets
/// tests observe progress and cancel mid-transfer.
pub struct SimulatedCharacteristic {
    uuid: Uuid,
    service_uuid: Uuid,
    description: String,
    properties: CharacteristicProperties,
    value: Arc<Mutex<Option<Bytes>>>,
    writes: Mutex<Vec<Bytes>>,
    response_delay: Duration,
    chunk_size: usize,
    chunk_delay: Duration,
    failure: Mutex<Option<String>>,
    notifying: Arc<AtomicBool>,
    notifications: broadcast::Sender<SimulatedItem<CharacteristicResult>>,
}

impl SimulatedCharacteristic {
    pub fn new(uuid: Uuid, service_uuid: Uuid, properties: CharacteristicProperties) -> Self {
        let (notifications, _) = broadcast::channel(NOTIFY_BUFFER);
        Self {
            uuid,
            service_uuid,
            description: String::new(),
            properties,
            value: Arc::new(Mutex::new(None)),
            writes: Mutex::new(Vec::new()),
            response_delay: Duration::ZERO,
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_delay: Duration::ZERO,
            failure: Mutex::new(None),
            notifying: Arc::new(AtomicBool::new(false)),
            notifications,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_value(self, value: impl Into<Bytes>) -> Self {
        *lock(&self.value) = Some(value.into());
        self
    }

    /// Delay before a read or write is acknowledged.
    pub fn with_response_delay(mut self, delay: Duration) -> Self {
        self.response_delay = delay;
        self
    }

    pub fn with_chunk_size(mut self, size: usize) -> Self {
        self.chunk_size = size.max(1);
        self
    }

    pub fn with_chunk_delay(mut self, delay: Duration) -> Self {
        self.chunk_delay = delay;
        self
    }

    /// Make every subsequent operation fail with `message`, or clear it.
    pub fn set_failure(&self, message: Option<String>) {
        *lock(&self.failure) = message;
    }

    /// Payloads received by `write` and `write_without_response`, in order.
    pub fn writes(&self) -> Vec<Bytes> {
        lock(&self.writes).clone()
    }

    pub fn value(&self) -> Option<Bytes> {
        lock(&self.value).clone()
    }

    /// Push a notification to the active subscriber. Returns the number reached.
    pub fn notify_value(&self, data: impl Into<Bytes>) -> usize {
        self.notifications
            .send(Ok(CharacteristicResult::new(data)))
            .unwrap_or(0)
    }

    fn check_failure(&self) -> Result<()> {
        match lock(&self.failure).clone() {
            Some(message) => Err(BridgeError::OperationFailed(message)),
            None => Ok(()),
        }
    }

    async fn respond(&self) -> Result<()> {
        if !self.response_delay.is_zero() {
            tokio::time::sleep(self.response_delay).await;
        }
        self.check_failure()
    }

    fn record_write(&self, data: Bytes) {
        lock(&self.writes).push(data.clone());
        *lock(&self.value) = Some(data);
    }
}

#[async_trait]
impl GattCharacteristic for SimulatedCharacteristic {
    fn uuid(&self) -> Uuid {
        self.uuid
    }

    fn service_uuid(&self) -> Uuid {
        self.service_uuid
    }

    fn description(&self) -> String {
        self.description.clone()
    }

    fn properties(&self) -> CharacteristicProperties {
        self.properties
    }

    fn is_notifying(&self) -> bool {
        self.notifying.load(Ordering::SeqCst)
    }

    async fn read(&self) -> Result<CharacteristicResult> {
        if !self.properties.can_read() {
            return Err(BridgeError::NotAvailable(
                "Characteristic does not support read".to_string(),
            ));
        }
        self.respond().await?;
        Ok(CharacteristicResult {
            data: lock(&self.value).clone(),
        })
    }

    async fn write(&self, data: Bytes) -> Result<()> {
        if !self.properties.can_write_with_response() {
            return Err(BridgeError::NotAvailable(
                "Characteristic does not support write".to_string(),
            ));
        }
        self.respond().await?;
        debug!(bytes = data.len(), "Simulated write acknowledged");
        self.record_write(data);
        Ok(())
    }

    async fn write_without_response(&self, data: Bytes) -> Result<()> {
        if !self.properties.can_write_without_response() {
            return Err(BridgeError::NotAvailable(
                "Characteristic does not support write without response".to_string(),
            ));
        }
        self.check_failure()?;
        self.record_write(data);
        Ok(())
    }

    fn blob_write(&self, data: Bytes, reliable: bool) -> BoxStream<'static, Result<BlobWriteProgress>> {
        let total = data.len() as u64;
        let chunk = self.chunk_size as u64;
        let delay = self.chunk_delay;
        let failure = lock(&self.failure).clone();
        let value = Arc::clone(&self.value);

        debug!(total, reliable, "Simulated blob write starting");

        stream::unfold(Some(0u64), move |state| {
            let data = data.clone();
            let value = Arc::clone(&value);
            let failure = failure.clone();
            async move {
                let sent = state?;
                if let Some(message) = failure {
                    return Some((Err(BridgeError::OperationFailed(message)), None));
                }
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }

                let position = (sent + chunk).min(total);
                let progress = BlobWriteProgress {
                    position,
                    total_length: total,
                };
                if position >= total {
                    *lock(&value) = Some(data);
                    Some((Ok(progress), None))
                } else {
                    Some((Ok(progress), Some(position)))
                }
            }
        })
        .boxed()
    }

    async fn notify(&self) -> Result<Box<dyn ReadingStream<CharacteristicResult>>> {
        if !self.properties.can_notify() {
            return Err(BridgeError::NotAvailable(
                "Characteristic does not support notifications".to_string(),
            ));
        }
        self.check_failure()?;
        self.notifying.store(true, Ordering::SeqCst);
        Ok(Box::new(NotificationStream {
            inner: BroadcastReadingStream::new(self.notifications.subscribe()),
            notifying: Arc::clone(&self.notifying),
        }))
    }
}

/// Notification subscription; dropping it unregisters.
struct NotificationStream {
    inner: BroadcastReadingStream<CharacteristicResult>,
    notifying: Arc<AtomicBool>,
}

#[async_trait]
impl ReadingStream<CharacteristicResult> for NotificationStream {
    async fn next(&mut self) -> Option<Result<CharacteristicResult>> {
        self.inner.next().await
    }
}

impl Drop for NotificationStream {
    fn drop(&mut self) {
        self.notifying.store(false, Ordering::SeqCst);
        debug!("Simulated notification subscription dropped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_properties() -> CharacteristicProperties {
        CharacteristicProperties {
            read: true,
            write: true,
            write_without_response: true,
            notify: true,
            indicate: false,
        }
    }

    fn characteristic() -> SimulatedCharacteristic {
        SimulatedCharacteristic::new(Uuid::new_v4(), Uuid::new_v4(), all_properties())
    }

    #[tokio::test]
    async fn test_read_returns_last_write() {
        let c = characteristic();
        assert_eq!(c.read().await.unwrap(), CharacteristicResult::empty());

        c.write(Bytes::from_static(b"hi")).await.unwrap();
        assert_eq!(c.read().await.unwrap().data, Some(Bytes::from_static(b"hi")));
        assert_eq!(c.writes().len(), 1);
    }

    #[tokio::test]
    async fn test_unsupported_read_rejected() {
        let c = SimulatedCharacteristic::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            CharacteristicProperties::default(),
        );
        assert!(matches!(c.read().await, Err(BridgeError::NotAvailable(_))));
    }

    #[tokio::test]
    async fn test_blob_write_reports_chunks() {
        let c = characteristic().with_chunk_size(2000);
        let progress: Vec<_> = c
            .blob_write(Bytes::from(vec![b'a'; 5000]), false)
            .collect()
            .await;

        let positions: Vec<u64> = progress.into_iter().map(|p| p.unwrap().position).collect();
        assert_eq!(positions, vec![2000, 4000, 5000]);
        assert_eq!(c.value().map(|v| v.len()), Some(5000));
    }

    #[tokio::test]
    async fn test_blob_write_failure() {
        let c = characteristic();
        c.set_failure(Some("link lost".to_string()));
        let progress: Vec<_> = c.blob_write(Bytes::from_static(b"abc"), true).collect().await;
        assert_eq!(progress.len(), 1);
        assert!(progress[0].is_err());
    }

    #[tokio::test]
    async fn test_notify_toggles_flag() {
        let c = characteristic();
        let mut stream = c.notify().await.unwrap();
        assert!(c.is_notifying());

        assert_eq!(c.notify_value(Bytes::from_static(b"\x01")), 1);
        let value = stream.next().await.unwrap().unwrap();
        assert_eq!(value.data, Some(Bytes::from_static(b"\x01")));

        drop(stream);
        assert!(!c.is_notifying());
    }
}
