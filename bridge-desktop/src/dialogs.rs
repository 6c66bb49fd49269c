//! Scripted User Dialogs
//!
//! Answers are queued before the interaction runs; everything shown is
//! recorded so callers can assert on it afterwards.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bridge_traits::dialogs::{
    ActionSheetConfig, CancelAction, ConfirmConfig, LoadingDialog, PromptConfig, PromptResult,
    UserDialogs,
};
use tracing::{debug, info};

use crate::lock;

/// One presentational event, in the order it was shown
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DialogRecord {
    Confirm(ConfirmConfig),
    Prompt(PromptConfig),
    ActionSheet(ActionSheetConfig),
    Toast(String),
    Alert(String),
    Loading(String),
    LoadingTitle(String),
    LoadingDismissed,
}

#[derive(Default)]
struct Script {
    confirms: VecDeque<bool>,
    prompts: VecDeque<PromptResult>,
    action_sheets: VecDeque<Option<usize>>,
    records: Vec<DialogRecord>,
    cancel: Option<Arc<CancelAction>>,
}

/// [`UserDialogs`] answering from a queue
///
/// When a queue runs dry the dialog behaves as if dismissed: confirm is
/// `false`, prompts are cancelled, action sheets pick nothing. Clones share
/// the same script.
#[derive(Clone, Default)]
pub struct ScriptedDialogs {
    script: Arc<Mutex<Script>>,
}

impl ScriptedDialogs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_confirm(&self, answer: bool) -> &Self {
        lock(&self.script).confirms.push_back(answer);
        self
    }

    /// Queue an accepted prompt with `text`.
    pub fn push_prompt(&self, text: impl Into<String>) -> &Self {
        lock(&self.script).prompts.push_back(PromptResult {
            ok: true,
            text: text.into(),
        });
        self
    }

    pub fn push_prompt_cancel(&self) -> &Self {
        lock(&self.script)
            .prompts
            .push_back(PromptResult::default());
        self
    }

    pub fn push_action(&self, choice: Option<usize>) -> &Self {
        lock(&self.script).action_sheets.push_back(choice);
        self
    }

    /// Everything shown so far.
    pub fn records(&self) -> Vec<DialogRecord> {
        lock(&self.script).records.clone()
    }

    pub fn toasts(&self) -> Vec<String> {
        self.collect(|record| match record {
            DialogRecord::Toast(message) => Some(message.clone()),
            _ => None,
        })
    }

    pub fn alerts(&self) -> Vec<String> {
        self.collect(|record| match record {
            DialogRecord::Alert(message) => Some(message.clone()),
            _ => None,
        })
    }

    /// Initial titles and title updates of loading dialogs.
    pub fn loading_titles(&self) -> Vec<String> {
        self.collect(|record| match record {
            DialogRecord::Loading(title) | DialogRecord::LoadingTitle(title) => {
                Some(title.clone())
            }
            _ => None,
        })
    }

    pub fn confirms(&self) -> Vec<ConfirmConfig> {
        self.collect(|record| match record {
            DialogRecord::Confirm(config) => Some(config.clone()),
            _ => None,
        })
    }

    pub fn action_sheets(&self) -> Vec<ActionSheetConfig> {
        self.collect(|record| match record {
            DialogRecord::ActionSheet(config) => Some(config.clone()),
            _ => None,
        })
    }

    /// Press Cancel on the most recent loading dialog.
    ///
    /// Returns `false` when no cancellable dialog has been shown.
    pub fn press_loading_cancel(&self) -> bool {
        let cancel = lock(&self.script).cancel.clone();
        match cancel {
            Some(cancel) => {
                info!("Loading dialog cancel pressed");
                (*cancel)();
                true
            }
            None => false,
        }
    }

    fn collect<T>(&self, pick: impl Fn(&DialogRecord) -> Option<T>) -> Vec<T> {
        lock(&self.script).records.iter().filter_map(pick).collect()
    }

    fn record(&self, record: DialogRecord) {
        lock(&self.script).records.push(record);
    }
}

#[async_trait]
impl UserDialogs for ScriptedDialogs {
    async fn confirm(&self, config: ConfirmConfig) -> bool {
        let mut script = lock(&self.script);
        let answer = script.confirms.pop_front().unwrap_or(false);
        debug!(message = %config.message, answer, "Confirm");
        script.records.push(DialogRecord::Confirm(config));
        answer
    }

    async fn prompt(&self, config: PromptConfig) -> PromptResult {
        let mut script = lock(&self.script);
        let result = script.prompts.pop_front().unwrap_or_default();
        debug!(message = %config.message, ok = result.ok, "Prompt");
        script.records.push(DialogRecord::Prompt(config));
        result
    }

    async fn action_sheet(&self, config: ActionSheetConfig) -> Option<usize> {
        let mut script = lock(&self.script);
        let choice = script
            .action_sheets
            .pop_front()
            .flatten()
            .filter(|index| *index < config.options.len());
        debug!(options = config.options.len(), ?choice, "Action sheet");
        script.records.push(DialogRecord::ActionSheet(config));
        choice
    }

    fn toast(&self, message: &str) {
        info!(message, "Toast");
        self.record(DialogRecord::Toast(message.to_string()));
    }

    fn alert(&self, message: &str) {
        info!(message, "Alert");
        self.record(DialogRecord::Alert(message.to_string()));
    }

    fn loading(&self, title: &str, on_cancel: Option<CancelAction>) -> Box<dyn LoadingDialog> {
        {
            let mut script = lock(&self.script);
            script.records.push(DialogRecord::Loading(title.to_string()));
            script.cancel = on_cancel.map(Arc::new);
        }
        debug!(title, "Loading dialog shown");
        Box::new(ScriptedLoading {
            script: Arc::clone(&self.script),
            dismissed: AtomicBool::new(false),
        })
    }
}

struct ScriptedLoading {
    script: Arc<Mutex<Script>>,
    dismissed: AtomicBool,
}

impl LoadingDialog for ScriptedLoading {
    fn set_title(&self, title: &str) {
        if self.dismissed.load(Ordering::SeqCst) {
            return;
        }
        lock(&self.script)
            .records
            .push(DialogRecord::LoadingTitle(title.to_string()));
    }

    fn dismiss(&self) {
        if self.dismissed.swap(true, Ordering::SeqCst) {
            return;
        }
        let mut script = lock(&self.script);
        script.cancel = None;
        script.records.push(DialogRecord::LoadingDismissed);
        debug!("Loading dialog dismissed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[tokio::test]
    async fn test_queued_answers_then_defaults() {
        let dialogs = ScriptedDialogs::new();
        dialogs.push_confirm(true).push_prompt("abc");

        assert!(dialogs.confirm(ConfirmConfig::new("first")).await);
        assert!(!dialogs.confirm(ConfirmConfig::new("second")).await);

        let prompt = dialogs.prompt(PromptConfig::new("value")).await;
        assert!(prompt.ok);
        assert_eq!(prompt.text, "abc");
        assert!(!dialogs.prompt(PromptConfig::new("again")).await.ok);

        assert_eq!(dialogs.confirms().len(), 2);
    }

    #[tokio::test]
    async fn test_action_sheet_out_of_range_is_cancel() {
        let dialogs = ScriptedDialogs::new();
        dialogs.push_action(Some(5));
        let sheet = ActionSheetConfig::new().add("Read");
        assert_eq!(dialogs.action_sheet(sheet).await, None);
    }

    #[test]
    fn test_loading_cancel_and_dismiss() {
        let dialogs = ScriptedDialogs::new();
        let pressed = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&pressed);

        let loading = dialogs.loading(
            "Sending Blob",
            Some(Box::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            })),
        );
        loading.set_title("Sending Blob - Sent 20 of 100 bytes");
        assert!(dialogs.press_loading_cancel());
        assert_eq!(pressed.load(Ordering::SeqCst), 1);

        loading.dismiss();
        loading.dismiss();
        loading.set_title("ignored");
        assert!(!dialogs.press_loading_cancel());

        assert_eq!(
            dialogs.loading_titles(),
            vec!["Sending Blob", "Sending Blob - Sent 20 of 100 bytes"]
        );
        let dismissed = dialogs
            .records()
            .into_iter()
            .filter(|r| *r == DialogRecord::LoadingDismissed)
            .count();
        assert_eq!(dismissed, 1);
    }

    #[test]
    fn test_toasts_and_alerts_recorded() {
        let dialogs = ScriptedDialogs::new();
        dialogs.toast("Write Complete");
        dialogs.alert("Insufficient permissions");
        assert_eq!(dialogs.toasts(), vec!["Write Complete"]);
        assert_eq!(dialogs.alerts(), vec!["Insufficient permissions"]);
    }
}
