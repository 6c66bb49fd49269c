//! User Dialog Abstraction
//!
//! Presentational prompts the core needs from the host UI. The core awaits
//! them like any other async call; it never renders anything itself.

/// Yes/no confirmation request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmConfig {
    pub title: Option<String>,
    pub message: String,
    pub ok_text: String,
    pub cancel_text: String,
}

impl ConfirmConfig {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            title: None,
            message: message.into(),
            ok_text: "OK".to_string(),
            cancel_text: "Cancel".to_string(),
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_ok_text(mut self, text: impl Into<String>) -> Self {
        self.ok_text = text.into();
        self
    }

    pub fn with_cancel_text(mut self, text: impl Into<String>) -> Self {
        self.cancel_text = text.into();
        self
    }

    /// Label the buttons "Yes" / "No"
    pub fn use_yes_no(self) -> Self {
        self.with_ok_text("Yes").with_cancel_text("No")
    }
}

/// Free-text prompt request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptConfig {
    pub message: String,
    pub title: Option<String>,
    pub placeholder: Option<String>,
}

impl PromptConfig {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            title: None,
            placeholder: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }
}

/// Outcome of a prompt
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PromptResult {
    /// The user pressed OK rather than Cancel
    pub ok: bool,
    pub text: String,
}

/// Action sheet listing selectable options
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ActionSheetConfig {
    pub title: Option<String>,
    pub options: Vec<String>,
    pub cancel_text: Option<String>,
}

impl ActionSheetConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn add(mut self, option: impl Into<String>) -> Self {
        self.options.push(option.into());
        self
    }

    pub fn with_cancel(mut self) -> Self {
        self.cancel_text = Some("Cancel".to_string());
        self
    }
}

/// Invoked when the user presses Cancel on a loading dialog
pub type CancelAction = Box<dyn Fn() + Send + Sync>;

/// Handle to a visible loading dialog
pub trait LoadingDialog: Send + Sync {
    fn set_title(&self, title: &str);

    /// Hide the dialog. Calling it twice has no further effect.
    fn dismiss(&self);
}

/// User dialogs trait
///
/// # Platform Support
///
/// - **iOS / Android**: native alert controllers and toasts
/// - **Desktop**: `bridge_desktop::ScriptedDialogs` (answers from a script,
///   logs presentational output)
///
/// # Example
///
/// ```ignore
/// use bridge_traits::dialogs::{ConfirmConfig, UserDialogs};
///
/// async fn confirm_stop(dialogs: &dyn UserDialogs) -> bool {
///     dialogs.confirm(ConfirmConfig::new("Stop all monitoring?")).await
/// }
/// ```
#[async_trait::async_trait]
pub trait UserDialogs: Send + Sync {
    async fn confirm(&self, config: ConfirmConfig) -> bool;

    async fn prompt(&self, config: PromptConfig) -> PromptResult;

    /// Returns the index of the chosen option, or `None` on cancel
    async fn action_sheet(&self, config: ActionSheetConfig) -> Option<usize>;

    fn toast(&self, message: &str);

    fn alert(&self, message: &str);

    /// Show a blocking progress dialog with an optional Cancel button.
    fn loading(&self, title: &str, on_cancel: Option<CancelAction>) -> Box<dyn LoadingDialog>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confirm_yes_no() {
        let config = ConfirmConfig::new("Use reliable write transaction?")
            .with_title("Confirm")
            .use_yes_no();
        assert_eq!(config.ok_text, "Yes");
        assert_eq!(config.cancel_text, "No");
        assert_eq!(config.title.as_deref(), Some("Confirm"));
    }

    #[test]
    fn test_action_sheet_builder() {
        let sheet = ActionSheetConfig::new().add("Read").add("Notify").with_cancel();
        assert_eq!(sheet.options, vec!["Read", "Notify"]);
        assert_eq!(sheet.cancel_text.as_deref(), Some("Cancel"));
    }
}
