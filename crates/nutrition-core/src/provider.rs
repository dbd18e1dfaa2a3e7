use std::sync::Arc;

use async_trait::async_trait;

use crate::ai::{CannedProvider, ClaudeProvider, OllamaProvider, OpenAiProvider};
use crate::config::{env_var, Config};
use crate::error::{ConfigError, ProviderFailure};
use crate::state::{Message, Role};

pub const SYSTEM_PROMPT: &str = "You are a friendly nutrition assistant. \
Answer questions about food, diet and healthy eating in plain language. \
Format answers in markdown: short paragraphs, bullet lists, and **bold** for key foods.";

/// What a provider gets for one submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderRequest {
    /// The trimmed user text.
    pub text: String,
    /// Conversation before the new user message.
    pub history: Vec<Message>,
}

impl ProviderRequest {
    /// Prior turns worth sending as context. Error placeholders are dropped.
    pub fn context(&self) -> impl Iterator<Item = &Message> {
        self.history.iter().filter(|m| !m.is_error())
    }
}

/// Turns user text into a markdown reply.
#[async_trait]
pub trait ResponseProvider: Send + Sync {
    async fn respond(&self, request: &ProviderRequest) -> Result<String, ProviderFailure>;

    /// Short label for logs and the chat title
    fn name(&self) -> String;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    Canned,
    Ollama,
    Claude,
    OpenAI,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Canned => "canned",
            ProviderKind::Ollama => "ollama",
            ProviderKind::Claude => "claude",
            ProviderKind::OpenAI => "openai",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "canned" => Some(ProviderKind::Canned),
            "ollama" => Some(ProviderKind::Ollama),
            "claude" => Some(ProviderKind::Claude),
            "openai" => Some(ProviderKind::OpenAI),
            _ => None,
        }
    }

    pub fn all() -> Vec<ProviderKind> {
        vec![
            ProviderKind::Canned,
            ProviderKind::Ollama,
            ProviderKind::Claude,
            ProviderKind::OpenAI,
        ]
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            ProviderKind::Canned => "Canned (Offline demo)",
            ProviderKind::Ollama => "Ollama (Local)",
            ProviderKind::Claude => "Claude (Anthropic)",
            ProviderKind::OpenAI => "ChatGPT (OpenAI)",
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            ProviderKind::Canned => "canned",
            ProviderKind::Ollama => "gemma3:latest",
            ProviderKind::Claude => "claude-sonnet-4-20250514",
            ProviderKind::OpenAI => "gpt-4o-mini",
        }
    }

    /// Environment variable holding the API key, for providers that need one
    pub fn api_key_env(&self) -> Option<&'static str> {
        match self {
            ProviderKind::Claude => Some("ANTHROPIC_API_KEY"),
            ProviderKind::OpenAI => Some("OPENAI_API_KEY"),
            ProviderKind::Canned | ProviderKind::Ollama => None,
        }
    }

    pub fn needs_api_key(&self) -> bool {
        self.api_key_env().is_some()
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Build the provider for `kind` from the config.
pub fn build_provider(
    config: &Config,
    kind: ProviderKind,
) -> Result<Arc<dyn ResponseProvider>, ConfigError> {
    build_provider_with(config, kind, env_var)
}

/// Like [`build_provider`], with API keys looked up through `lookup_env`.
pub fn build_provider_with(
    config: &Config,
    kind: ProviderKind,
    lookup_env: impl Fn(&str) -> Option<String>,
) -> Result<Arc<dyn ResponseProvider>, ConfigError> {
    let model = config.model_for(kind);
    let provider: Arc<dyn ResponseProvider> = match kind {
        ProviderKind::Canned => Arc::new(CannedProvider::new(config.canned_delay())),
        ProviderKind::Ollama => Arc::new(OllamaProvider::new(config.ollama_url(), &model)),
        ProviderKind::Claude => {
            let key = config
                .api_key_with(kind, &lookup_env)
                .ok_or(ConfigError::MissingApiKey {
                    provider: "Claude",
                    env_var: "ANTHROPIC_API_KEY",
                })?;
            Arc::new(ClaudeProvider::new(&key, &model))
        }
        ProviderKind::OpenAI => {
            let key = config
                .api_key_with(kind, &lookup_env)
                .ok_or(ConfigError::MissingApiKey {
                    provider: "OpenAI",
                    env_var: "OPENAI_API_KEY",
                })?;
            Arc::new(OpenAiProvider::new(&key, &model))
        }
    };
    tracing::info!(provider = %kind, model = %model, "response provider ready");
    Ok(provider)
}

/// Stands in for a provider that couldn't be built, so the reason shows up
/// in the conversation instead of crashing the UI.
pub struct UnavailableProvider {
    kind: ProviderKind,
    reason: String,
}

impl UnavailableProvider {
    pub fn new(kind: ProviderKind, reason: impl Into<String>) -> Self {
        Self {
            kind,
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl ResponseProvider for UnavailableProvider {
    async fn respond(&self, _request: &ProviderRequest) -> Result<String, ProviderFailure> {
        Err(ProviderFailure::new(self.reason.clone()))
    }

    fn name(&self) -> String {
        format!("{} (unavailable)", self.kind.as_str())
    }
}

/// Single-string prompt for completion-style endpoints.
pub fn build_prompt(request: &ProviderRequest) -> String {
    let mut prompt = String::new();

    prompt.push_str(SYSTEM_PROMPT);
    prompt.push_str("\n\n");

    let mut context = request.context().peekable();
    if context.peek().is_some() {
        prompt.push_str("Conversation so far:\n");
        for msg in context {
            match msg.role {
                Role::User => prompt.push_str(&format!("User: {}\n", msg.content)),
                Role::Bot => prompt.push_str(&format!("Assistant: {}\n", msg.content)),
            }
        }
        prompt.push('\n');
    }

    prompt.push_str("Current question: ");
    prompt.push_str(&request.text);

    prompt
}

/// (role, content) turns for chat-style endpoints, ending with the new question.
pub fn chat_turns(request: &ProviderRequest) -> Vec<(&'static str, String)> {
    let mut turns: Vec<(&'static str, String)> = request
        .context()
        .map(|msg| {
            let role = match msg.role {
                Role::User => "user",
                Role::Bot => "assistant",
            };
            (role, msg.content.clone())
        })
        .collect();
    turns.push(("user", request.text.clone()));
    turns
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request_with_history() -> ProviderRequest {
        ProviderRequest {
            text: "And for breakfast?".to_string(),
            history: vec![
                Message::user("What foods boost energy?"),
                Message::bot("* Eggs\n* Bananas"),
                Message::user("Any drinks?"),
                Message::bot("Error: network unreachable"),
            ],
        }
    }

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!(ProviderKind::parse("Ollama"), Some(ProviderKind::Ollama));
        assert_eq!(ProviderKind::parse(" OPENAI "), Some(ProviderKind::OpenAI));
        assert_eq!(ProviderKind::parse("gemini"), None);
    }

    #[test]
    fn test_parse_round_trips_as_str() {
        for kind in ProviderKind::all() {
            assert_eq!(ProviderKind::parse(kind.as_str()), Some(kind));
        }
    }

    #[test]
    fn test_only_remote_apis_need_keys() {
        assert!(!ProviderKind::Canned.needs_api_key());
        assert!(!ProviderKind::Ollama.needs_api_key());
        assert_eq!(ProviderKind::Claude.api_key_env(), Some("ANTHROPIC_API_KEY"));
        assert_eq!(ProviderKind::OpenAI.api_key_env(), Some("OPENAI_API_KEY"));
    }

    #[test]
    fn test_build_prompt_includes_history_without_errors() {
        let prompt = build_prompt(&request_with_history());
        assert!(prompt.starts_with(SYSTEM_PROMPT));
        assert!(prompt.contains("User: What foods boost energy?"));
        assert!(prompt.contains("Assistant: * Eggs"));
        assert!(!prompt.contains("network unreachable"));
        assert!(prompt.ends_with("Current question: And for breakfast?"));
    }

    #[test]
    fn test_build_prompt_without_history() {
        let request = ProviderRequest {
            text: "Hi".to_string(),
            history: Vec::new(),
        };
        let prompt = build_prompt(&request);
        assert!(!prompt.contains("Conversation so far"));
    }

    #[test]
    fn test_chat_turns_end_with_question() {
        let turns = chat_turns(&request_with_history());
        let roles: Vec<&str> = turns.iter().map(|(r, _)| *r).collect();
        assert_eq!(roles, vec!["user", "assistant", "user", "user"]);
        assert_eq!(turns.last().unwrap().1, "And for breakfast?");
    }

    #[tokio::test]
    async fn test_unavailable_provider_always_fails() {
        let provider = UnavailableProvider::new(ProviderKind::Claude, "no key");
        let request = ProviderRequest {
            text: "x".to_string(),
            history: Vec::new(),
        };
        let err = provider.respond(&request).await.unwrap_err();
        assert_eq!(err.description, "no key");
    }

    #[test]
    fn test_build_provider_requires_key() {
        let config = Config::new();
        let no_env = |_: &str| -> Option<String> { None };

        let result = build_provider_with(&config, ProviderKind::Claude, no_env);
        assert!(matches!(
            result,
            Err(ConfigError::MissingApiKey { env_var: "ANTHROPIC_API_KEY", .. })
        ));
        let result = build_provider_with(&config, ProviderKind::OpenAI, no_env);
        assert!(matches!(
            result,
            Err(ConfigError::MissingApiKey { env_var: "OPENAI_API_KEY", .. })
        ));
    }

    #[test]
    fn test_build_provider_uses_env_or_stored_key() {
        let mut config = Config::new();
        let from_env = build_provider_with(&config, ProviderKind::Claude, |var| {
            (var == "ANTHROPIC_API_KEY").then(|| "sk-env".to_string())
        })
        .unwrap();
        assert_eq!(from_env.name(), "Claude: claude-sonnet-4-20250514");

        config.openai_api_key = Some("sk-stored".to_string());
        config.default_model = Some("gpt-4o".to_string());
        let stored = build_provider_with(&config, ProviderKind::OpenAI, |_| None).unwrap();
        assert_eq!(stored.name(), "OpenAI: gpt-4o");
    }

    #[test]
    fn test_build_provider_canned_and_ollama_need_nothing() {
        let config = Config::new();
        assert!(build_provider(&config, ProviderKind::Canned).is_ok());
        assert!(build_provider(&config, ProviderKind::Ollama).is_ok());
    }
}
