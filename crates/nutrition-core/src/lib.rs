pub mod ai;
pub mod config;
pub mod conversation;
pub mod error;
pub mod provider;
pub mod session;
pub mod state;

// Re-export main types for convenience
pub use ai::{CannedProvider, ClaudeProvider, OllamaProvider, OpenAiProvider};
pub use config::Config;
pub use conversation::{Conversation, ConversationStore};
pub use error::{ConfigError, ProviderFailure};
pub use provider::{build_provider, build_provider_with, ProviderKind, ProviderRequest, ResponseProvider};
pub use session::ChatSession;
pub use state::{Message, Role};
