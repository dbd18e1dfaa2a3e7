//! UI-agnostic conversation types
//!
//! These are shared by every front end (the terminal UI, the one-shot `--ask`
//! mode) and don't depend on any specific UI framework.

use serde::{Deserialize, Serialize};

/// Prefix given to bot messages that stand in for a failed response.
pub const ERROR_PREFIX: &str = "Error: ";

/// One turn in the conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

/// Who wrote a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Bot,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn bot(content: impl Into<String>) -> Self {
        Self {
            role: Role::Bot,
            content: content.into(),
        }
    }

    /// Bot content is markdown, user content is plain text.
    pub fn is_markdown(&self) -> bool {
        self.role == Role::Bot
    }

    /// True for the synthetic bot message appended when a provider fails.
    pub fn is_error(&self) -> bool {
        self.role == Role::Bot && self.content.starts_with(ERROR_PREFIX)
    }
}
