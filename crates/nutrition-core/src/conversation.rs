//! Conversation store
//!
//! Holds the append-only message history for a session plus the single
//! pending flag. The store never talks to a provider itself: `submit` hands
//! back a [`ProviderRequest`] and the caller reports the outcome through
//! [`ConversationStore::on_provider_resolved`] or
//! [`ConversationStore::on_provider_failed`].

use crate::error::ProviderFailure;
use crate::provider::ProviderRequest;
use crate::state::{Message, ERROR_PREFIX};

/// Ordered, append-only message history.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Conversation {
    messages: Vec<Message>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Message> {
        self.messages.iter()
    }

    // Only the store appends; nothing removes.
    fn push(&mut self, message: Message) {
        self.messages.push(message);
    }
}

impl<'a> IntoIterator for &'a Conversation {
    type Item = &'a Message;
    type IntoIter = std::slice::Iter<'a, Message>;

    fn into_iter(self) -> Self::IntoIter {
        self.messages.iter()
    }
}

#[derive(Debug, Default)]
pub struct ConversationStore {
    conversation: Conversation,
    pending: bool,
}

impl ConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub fn messages(&self) -> &[Message] {
        self.conversation.messages()
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }

    pub fn len(&self) -> usize {
        self.conversation.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conversation.is_empty()
    }

    pub fn last(&self) -> Option<&Message> {
        self.conversation.last()
    }

    /// Append a user message and mark a response as pending.
    ///
    /// Returns `None` without touching any state when `text` is blank after
    /// trimming or when a response is already pending. Otherwise returns the
    /// request the caller must send to the response provider, exactly once.
    pub fn submit(&mut self, text: &str) -> Option<ProviderRequest> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return None;
        }
        if self.pending {
            tracing::debug!("submit ignored: a response is already pending");
            return None;
        }

        let request = ProviderRequest {
            text: trimmed.to_string(),
            history: self.conversation.messages().to_vec(),
        };

        self.conversation.push(Message::user(trimmed));
        self.pending = true;
        tracing::info!(messages = self.conversation.len(), "user message submitted");

        Some(request)
    }

    /// Append the provider's reply. Ignored if nothing is pending.
    pub fn on_provider_resolved(&mut self, text: impl Into<String>) -> bool {
        if !self.pending {
            tracing::warn!("provider resolution arrived with nothing pending; ignored");
            return false;
        }
        self.conversation.push(Message::bot(text));
        self.pending = false;
        tracing::info!(messages = self.conversation.len(), "bot reply appended");
        true
    }

    /// Append an `"Error: ..."` placeholder. Ignored if nothing is pending.
    pub fn on_provider_failed(&mut self, description: &str) -> bool {
        if !self.pending {
            tracing::warn!("provider failure arrived with nothing pending; ignored");
            return false;
        }
        self.conversation
            .push(Message::bot(format!("{ERROR_PREFIX}{description}")));
        self.pending = false;
        tracing::warn!(error = description, "provider failed");
        true
    }

    pub fn settle(&mut self, result: Result<String, ProviderFailure>) -> bool {
        match result {
            Ok(text) => self.on_provider_resolved(text),
            Err(failure) => self.on_provider_failed(&failure.description),
        }
    }
}
