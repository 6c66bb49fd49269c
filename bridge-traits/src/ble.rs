//! Bluetooth LE GATT Characteristic Abstraction
//!
//! Read/write/notify access to a single GATT characteristic on a connected
//! peripheral. Protocol handling (MTU negotiation, long writes, reliable write
//! transactions) belongs to the platform implementation.

use bytes::Bytes;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{capability::ReadingStream, error::Result};

/// Operations a characteristic advertises
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CharacteristicProperties {
    pub read: bool,
    pub write: bool,
    pub write_without_response: bool,
    pub notify: bool,
    pub indicate: bool,
}

impl CharacteristicProperties {
    pub fn can_read(&self) -> bool {
        self.read
    }

    pub fn can_write_with_response(&self) -> bool {
        self.write
    }

    pub fn can_write_without_response(&self) -> bool {
        self.write_without_response
    }

    /// Any form of write is supported
    pub fn can_write(&self) -> bool {
        self.write || self.write_without_response
    }

    /// Notifications or indications are supported
    pub fn can_notify(&self) -> bool {
        self.notify || self.indicate
    }
}

impl std::fmt::Display for CharacteristicProperties {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let flags = [
            (self.read, "Read"),
            (self.write, "Write"),
            (self.write_without_response, "WriteWithoutResponse"),
            (self.notify, "Notify"),
            (self.indicate, "Indicate"),
        ];
        let names: Vec<&str> = flags
            .iter()
            .filter(|(set, _)| *set)
            .map(|(_, name)| *name)
            .collect();

        if names.is_empty() {
            f.write_str("None")
        } else {
            f.write_str(&names.join(", "))
        }
    }
}

/// Value delivered by a read or a notification
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CharacteristicResult {
    /// `None` when the peripheral returned no payload
    pub data: Option<Bytes>,
}

impl CharacteristicResult {
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self {
            data: Some(data.into()),
        }
    }

    pub fn empty() -> Self {
        Self { data: None }
    }
}

/// Progress of a long (BLOB) write
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlobWriteProgress {
    /// Bytes acknowledged so far
    pub position: u64,
    pub total_length: u64,
}

/// GATT characteristic trait
///
/// # Example
///
/// ```ignore
/// use bridge_traits::ble::GattCharacteristic;
/// use futures::StreamExt;
///
/// async fn send(characteristic: &dyn GattCharacteristic, data: bytes::Bytes) {
///     let mut progress = characteristic.blob_write(data, false);
///     while let Some(Ok(step)) = progress.next().await {
///         println!("{} / {}", step.position, step.total_length);
///     }
/// }
/// ```
#[async_trait::async_trait]
pub trait GattCharacteristic: Send + Sync {
    fn uuid(&self) -> Uuid;

    fn service_uuid(&self) -> Uuid;

    /// Human-readable name, if the platform knows one
    fn description(&self) -> String;

    fn properties(&self) -> CharacteristicProperties;

    /// Whether a notification subscription is currently registered
    fn is_notifying(&self) -> bool;

    async fn read(&self) -> Result<CharacteristicResult>;

    async fn write(&self, data: Bytes) -> Result<()>;

    async fn write_without_response(&self, data: Bytes) -> Result<()>;

    /// Write a payload larger than the MTU, reporting progress per chunk.
    ///
    /// The stream ends after the final chunk is acknowledged. Dropping the
    /// stream aborts the write.
    fn blob_write(&self, data: Bytes, reliable: bool) -> BoxStream<'static, Result<BlobWriteProgress>>;

    /// Register for notifications. Dropping the stream unregisters.
    async fn notify(&self) -> Result<Box<dyn ReadingStream<CharacteristicResult>>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_properties_display() {
        let props = CharacteristicProperties {
            read: true,
            notify: true,
            ..Default::default()
        };
        assert_eq!(props.to_string(), "Read, Notify");
        assert_eq!(CharacteristicProperties::default().to_string(), "None");
    }

    #[test]
    fn test_properties_capabilities() {
        let props = CharacteristicProperties {
            write_without_response: true,
            indicate: true,
            ..Default::default()
        };
        assert!(props.can_write());
        assert!(!props.can_write_with_response());
        assert!(props.can_notify());
        assert!(!props.can_read());
    }
}
