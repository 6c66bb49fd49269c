//! List rows with an attached action

use std::sync::Arc;

use futures::future::BoxFuture;

type Action = Arc<dyn Fn() -> BoxFuture<'static, ()> + Send + Sync>;

/// Display projection of a domain item: two lines of text and what
/// selecting it does.
#[derive(Clone)]
pub struct CommandItem {
    pub text: String,
    pub detail: String,
    action: Action,
}

impl CommandItem {
    pub fn new<F>(text: impl Into<String>, detail: impl Into<String>, action: F) -> Self
    where
        F: Fn() -> BoxFuture<'static, ()> + Send + Sync + 'static,
    {
        Self {
            text: text.into(),
            detail: detail.into(),
            action: Arc::new(action),
        }
    }

    /// Run the attached action to completion.
    pub async fn execute(&self) {
        (self.action)().await
    }
}

impl std::fmt::Debug for CommandItem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandItem")
            .field("text", &self.text)
            .field("detail", &self.detail)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::FutureExt;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_execute_runs_action() {
        let runs = Arc::new(AtomicUsize::new(0));
        let r = Arc::clone(&runs);
        let item = CommandItem::new("Office", "uuid/0/0", move || {
            let r = Arc::clone(&r);
            async move {
                r.fetch_add(1, Ordering::SeqCst);
            }
            .boxed()
        });

        item.execute().await;
        item.clone().execute().await;

        assert_eq!(runs.load(Ordering::SeqCst), 2);
        assert_eq!(format!("{:?}", item), "CommandItem { text: \"Office\", detail: \"uuid/0/0\" }");
    }
}
