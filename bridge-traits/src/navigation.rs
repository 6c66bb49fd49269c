//! Navigation Abstraction

use std::collections::HashMap;

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

use crate::error::Result;

/// Parameters passed along with a navigation request.
///
/// Values are stored as JSON so any serde type can cross the bridge.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NavigationParameters {
    values: HashMap<String, Value>,
}

impl NavigationParameters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add<T: Serialize>(mut self, key: impl Into<String>, value: T) -> Result<Self> {
        self.values.insert(key.into(), serde_json::to_value(value)?);
        Ok(self)
    }

    /// Typed lookup. Returns `Ok(None)` when the key is absent.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.values.get(key) {
            Some(value) => Ok(Some(serde_json::from_value(value.clone())?)),
            None => Ok(None),
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Navigator trait
///
/// Fire-and-forget page navigation. Route names are host-defined.
#[async_trait::async_trait]
pub trait Navigator: Send + Sync {
    async fn navigate(&self, route: &str, parameters: NavigationParameters) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parameters_round_trip_value() {
        let params = NavigationParameters::new().add("Monitoring", true).unwrap();
        assert_eq!(params.get::<bool>("Monitoring").unwrap(), Some(true));
        assert_eq!(params.get::<bool>("Missing").unwrap(), None);
    }

    #[test]
    fn test_parameters_type_mismatch() {
        let params = NavigationParameters::new().add("Monitoring", "yes").unwrap();
        assert!(params.get::<bool>("Monitoring").is_err());
    }
}
