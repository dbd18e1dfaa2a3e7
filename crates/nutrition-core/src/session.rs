//! Chat session: a conversation store wired to a response provider.
//!
//! Each accepted submission spawns exactly one provider task. The task's
//! result is fed back into the store by [`ChatSession::poll`] (from the UI
//! loop) or [`ChatSession::wait`]. Every task runs under a timeout, so the
//! pending flag always clears eventually.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;

use crate::conversation::{Conversation, ConversationStore};
use crate::error::ProviderFailure;
use crate::provider::ResponseProvider;

type ProviderTask = JoinHandle<Result<String, ProviderFailure>>;

pub struct ChatSession {
    store: ConversationStore,
    provider: Arc<dyn ResponseProvider>,
    timeout: Duration,
    task: Option<ProviderTask>,
}

impl ChatSession {
    pub fn new(provider: Arc<dyn ResponseProvider>, timeout: Duration) -> Self {
        Self {
            store: ConversationStore::new(),
            provider,
            timeout,
            task: None,
        }
    }

    pub fn conversation(&self) -> &Conversation {
        self.store.conversation()
    }

    pub fn is_pending(&self) -> bool {
        self.store.is_pending()
    }

    pub fn provider_name(&self) -> String {
        self.provider.name()
    }

    /// Use `provider` for later submissions. A request already in flight
    /// finishes with the provider it started with.
    pub fn set_provider(&mut self, provider: Arc<dyn ResponseProvider>) {
        tracing::info!(provider = %provider.name(), "switching response provider");
        self.provider = provider;
    }

    /// Submit user text. Returns true if a provider request was started.
    ///
    /// Must be called from within a tokio runtime.
    pub fn submit(&mut self, text: &str) -> bool {
        let Some(request) = self.store.submit(text) else {
            return false;
        };

        let provider = Arc::clone(&self.provider);
        let timeout = self.timeout;
        self.task = Some(tokio::spawn(async move {
            match tokio::time::timeout(timeout, provider.respond(&request)).await {
                Ok(result) => result,
                Err(_) => Err(ProviderFailure::new(format!(
                    "no response after {timeout:?}"
                ))),
            }
        }));
        true
    }

    /// Settle the in-flight request if it has finished. Never blocks.
    ///
    /// Returns true if the conversation changed.
    pub async fn poll(&mut self) -> bool {
        if !self.task.as_ref().is_some_and(|task| task.is_finished()) {
            return false;
        }
        self.wait().await
    }

    /// Wait for the in-flight request, if any, and settle it.
    ///
    /// Returns true if the conversation changed.
    pub async fn wait(&mut self) -> bool {
        let Some(task) = self.task.take() else {
            return false;
        };

        let result = task.await.unwrap_or_else(|err| {
            tracing::error!(error = %err, "provider task did not complete");
            if err.is_panic() {
                Err(ProviderFailure::new("response provider crashed"))
            } else {
                Err(ProviderFailure::new("request was cancelled"))
            }
        });
        self.store.settle(result)
    }
}

impl Drop for ChatSession {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
