//! Recording Navigator

use std::sync::Mutex;

use async_trait::async_trait;
use bridge_traits::{
    error::Result,
    navigation::{NavigationParameters, Navigator},
};
use tracing::info;

use crate::lock;

/// Navigator that logs and records each request instead of changing pages
#[derive(Default)]
pub struct RecordingNavigator {
    history: Mutex<Vec<(String, NavigationParameters)>>,
}

impl RecordingNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Routes and parameters in request order.
    pub fn history(&self) -> Vec<(String, NavigationParameters)> {
        lock(&self.history).clone()
    }

    pub fn last(&self) -> Option<(String, NavigationParameters)> {
        lock(&self.history).last().cloned()
    }
}

#[async_trait]
impl Navigator for RecordingNavigator {
    async fn navigate(&self, route: &str, parameters: NavigationParameters) -> Result<()> {
        info!(route, "Navigating");
        lock(&self.history).push((route.to_string(), parameters));
        Ok(())
    }
}
