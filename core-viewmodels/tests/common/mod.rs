//! Shared fixtures for ViewModel tests
#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bridge_desktop::{RecordingNavigator, ScriptedDialogs};
use bridge_traits::{
    error::Result as BridgeResult, ActionSheetConfig, CancelAction, ConfirmConfig, LoadingDialog,
    NavigationParameters, Navigator, PromptConfig, PromptResult, UserDialogs,
};
use core_runtime::config::SamplesConfig;
use mockall::mock;

mock! {
    pub Dialogs {}

    #[async_trait]
    impl UserDialogs for Dialogs {
        async fn confirm(&self, config: ConfirmConfig) -> bool;
        async fn prompt(&self, config: PromptConfig) -> PromptResult;
        async fn action_sheet(&self, config: ActionSheetConfig) -> Option<usize>;
        fn toast(&self, message: &str);
        fn alert(&self, message: &str);
        fn loading(&self, title: &str, on_cancel: Option<CancelAction>) -> Box<dyn LoadingDialog>;
    }
}

mock! {
    pub Nav {}

    #[async_trait]
    impl Navigator for Nav {
        async fn navigate(&self, route: &str, parameters: NavigationParameters) -> BridgeResult<()>;
    }
}

/// Scripted dialogs and a recording navigator behind one config.
pub struct Fixture {
    pub config: SamplesConfig,
    pub dialogs: ScriptedDialogs,
    pub navigator: Arc<RecordingNavigator>,
}

pub fn fixture() -> Fixture {
    let dialogs = ScriptedDialogs::new();
    let navigator = Arc::new(RecordingNavigator::new());
    let config = SamplesConfig::builder()
        .dialogs(Arc::new(dialogs.clone()))
        .navigator(navigator.clone())
        .build()
        .unwrap();
    Fixture {
        config,
        dialogs,
        navigator,
    }
}

pub fn config_with(dialogs: Arc<dyn UserDialogs>, navigator: Arc<dyn Navigator>) -> SamplesConfig {
    SamplesConfig::builder()
        .dialogs(dialogs)
        .navigator(navigator)
        .build()
        .unwrap()
}

/// Poll `condition` for up to a second.
pub async fn eventually(condition: impl Fn() -> bool) -> bool {
    for _ in 0..200 {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    condition()
}
