//! Error types for the nutrition assistant.
//!
//! `ProviderFailure` is the only error a conversation ever sees, and it never
//! reaches the caller of `submit`: the store turns it into an `"Error: ..."`
//! bot message. `ConfigError` covers misconfiguration found at startup.
//! Everything else (file I/O, terminal setup) goes through `anyhow`.

use thiserror::Error;

/// A response provider could not produce a reply.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{description}")]
pub struct ProviderFailure {
    pub description: String,
}

impl ProviderFailure {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
        }
    }
}

impl From<anyhow::Error> for ProviderFailure {
    fn from(err: anyhow::Error) -> Self {
        Self::new(err.to_string())
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Unknown provider '{0}' (expected one of: canned, ollama, claude, openai)")]
    UnknownProvider(String),

    #[error("{provider} API key not configured. Set {env_var} or add it to the config file.")]
    MissingApiKey {
        provider: &'static str,
        env_var: &'static str,
    },

    #[error("Could not determine {0} directory")]
    NoDirectory(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_failure_displays_description_only() {
        let failure = ProviderFailure::new("network unreachable");
        assert_eq!(failure.to_string(), "network unreachable");
    }

    #[test]
    fn test_provider_failure_from_anyhow() {
        let failure: ProviderFailure = anyhow::anyhow!("status 503").into();
        assert_eq!(failure.description, "status 503");
    }

    #[test]
    fn test_missing_api_key_names_env_var() {
        let err = ConfigError::MissingApiKey {
            provider: "Claude",
            env_var: "ANTHROPIC_API_KEY",
        };
        assert!(err.to_string().contains("ANTHROPIC_API_KEY"));
    }
}
