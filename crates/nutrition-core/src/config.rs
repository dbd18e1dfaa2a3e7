use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use anyhow::{Context, Result};

use crate::error::ConfigError;
use crate::provider::ProviderKind;

pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";
pub const DEFAULT_RESPONSE_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_CANNED_DELAY_MS: u64 = 800;

const APP_DIR: &str = "nutrition-assistant";

/// Process environment lookup used for API keys.
pub fn env_var(var: &str) -> Option<String> {
    std::env::var(var).ok()
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    pub provider: Option<String>,
    pub default_model: Option<String>,
    pub ollama_url: Option<String>,
    pub claude_api_key: Option<String>,
    pub openai_api_key: Option<String>,
    pub response_timeout_secs: u64,
    pub canned_delay_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    pub fn new() -> Self {
        Self {
            provider: Some(ProviderKind::Canned.as_str().to_string()),
            default_model: None,
            ollama_url: None,
            claude_api_key: None,
            openai_api_key: None,
            response_timeout_secs: DEFAULT_RESPONSE_TIMEOUT_SECS,
            canned_delay_ms: DEFAULT_CANNED_DELAY_MS,
        }
    }

    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load from `path`, falling back to defaults when the file doesn't exist.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::new());
        }

        let config_content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Config = serde_json::from_str(&config_content)
            .with_context(|| format!("Invalid config file: {}", path.display()))?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Create config directory if it doesn't exist
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        let config_content = serde_json::to_string_pretty(self)?;
        fs::write(path, config_content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        tracing::info!(path = %path.display(), "config saved");
        Ok(())
    }

    /// Remember the provider picked in the UI. The stored model belonged to
    /// the old provider, so it is dropped. A file that doesn't parse is left
    /// untouched and reported as an error.
    pub fn save_provider_to(path: &Path, kind: ProviderKind) -> Result<()> {
        let mut config = Self::load_from(path)?;
        config.provider = Some(kind.as_str().to_string());
        config.default_model = None;
        config.save_to(path)
    }

    pub fn provider_kind(&self) -> Result<ProviderKind, ConfigError> {
        match self.provider.as_deref() {
            None => Ok(ProviderKind::Canned),
            Some(name) => {
                ProviderKind::parse(name).ok_or_else(|| ConfigError::UnknownProvider(name.to_string()))
            }
        }
    }

    pub fn model_for(&self, kind: ProviderKind) -> String {
        self.default_model
            .clone()
            .unwrap_or_else(|| kind.default_model().to_string())
    }

    pub fn ollama_url(&self) -> &str {
        self.ollama_url.as_deref().unwrap_or(DEFAULT_OLLAMA_URL)
    }

    /// API key for `kind`: environment variable first, then the config file.
    pub fn api_key(&self, kind: ProviderKind) -> Option<String> {
        self.api_key_with(kind, env_var)
    }

    pub fn api_key_with(
        &self,
        kind: ProviderKind,
        lookup_env: impl Fn(&str) -> Option<String>,
    ) -> Option<String> {
        let stored = match kind {
            ProviderKind::Claude => self.claude_api_key.as_ref(),
            ProviderKind::OpenAI => self.openai_api_key.as_ref(),
            ProviderKind::Canned | ProviderKind::Ollama => return None,
        };
        kind.api_key_env()
            .and_then(lookup_env)
            .filter(|key| !key.trim().is_empty())
            .or_else(|| stored.filter(|key| !key.trim().is_empty()).cloned())
    }

    /// Where the key for `kind` comes from: "env", "config", "local", or None
    pub fn key_source(&self, kind: ProviderKind) -> Option<&'static str> {
        self.key_source_with(kind, env_var)
    }

    pub fn key_source_with(
        &self,
        kind: ProviderKind,
        lookup_env: impl Fn(&str) -> Option<String>,
    ) -> Option<&'static str> {
        let Some(var) = kind.api_key_env() else {
            return Some("local");
        };
        if lookup_env(var).is_some_and(|key| !key.trim().is_empty()) {
            Some("env")
        } else if self.api_key_with(kind, &lookup_env).is_some() {
            Some("config")
        } else {
            None
        }
    }

    pub fn response_timeout(&self) -> Duration {
        Duration::from_secs(self.response_timeout_secs.max(1))
    }

    pub fn canned_delay(&self) -> Duration {
        Duration::from_millis(self.canned_delay_ms)
    }

    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoDirectory("config"))?;

        Ok(config_dir.join(APP_DIR).join("config.json"))
    }

    pub fn log_path() -> Result<PathBuf> {
        let data_dir = dirs::data_local_dir().ok_or(ConfigError::NoDirectory("data"))?;

        Ok(data_dir.join(APP_DIR).join("nutrition-assistant.log"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults() {
        let config = Config::new();
        assert_eq!(config.provider_kind().unwrap(), ProviderKind::Canned);
        assert_eq!(config.ollama_url(), DEFAULT_OLLAMA_URL);
        assert_eq!(config.response_timeout(), Duration::from_secs(60));
        assert_eq!(config.canned_delay(), Duration::from_millis(800));
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("nope.json")).unwrap();
        assert_eq!(config, Config::new());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");

        let mut config = Config::new();
        config.provider = Some("ollama".to_string());
        config.default_model = Some("llama3.2:latest".to_string());
        config.response_timeout_secs = 15;
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded, config);
        assert_eq!(loaded.provider_kind().unwrap(), ProviderKind::Ollama);
        assert_eq!(loaded.model_for(ProviderKind::Ollama), "llama3.2:latest");
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"provider": "openai"}"#).unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.provider_kind().unwrap(), ProviderKind::OpenAI);
        assert_eq!(config.response_timeout_secs, DEFAULT_RESPONSE_TIMEOUT_SECS);
        assert_eq!(config.canned_delay_ms, DEFAULT_CANNED_DELAY_MS);
    }

    #[test]
    fn test_invalid_json_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{not json").unwrap();
        assert!(Config::load_from(&path).is_err());
    }

    #[test]
    fn test_unknown_provider_name() {
        let mut config = Config::new();
        config.provider = Some("gemini".to_string());
        assert!(matches!(
            config.provider_kind(),
            Err(ConfigError::UnknownProvider(name)) if name == "gemini"
        ));
    }

    #[test]
    fn test_model_falls_back_to_provider_default() {
        let config = Config::new();
        assert_eq!(config.model_for(ProviderKind::Ollama), "gemma3:latest");
    }

    #[test]
    fn test_zero_timeout_is_clamped() {
        let mut config = Config::new();
        config.response_timeout_secs = 0;
        assert_eq!(config.response_timeout(), Duration::from_secs(1));
    }

    #[test]
    fn test_local_providers_have_no_key() {
        let mut config = Config::new();
        config.claude_api_key = Some("sk-test".to_string());
        assert_eq!(config.api_key(ProviderKind::Ollama), None);
        assert_eq!(config.key_source(ProviderKind::Canned), Some("local"));
    }

    #[test]
    fn test_env_key_wins_over_stored_key() {
        let mut config = Config::new();
        config.claude_api_key = Some("sk-stored".to_string());

        let from_env = config.api_key_with(ProviderKind::Claude, |var| {
            (var == "ANTHROPIC_API_KEY").then(|| "sk-env".to_string())
        });
        assert_eq!(from_env.as_deref(), Some("sk-env"));

        let blank_env = config.api_key_with(ProviderKind::Claude, |_| Some("  ".to_string()));
        assert_eq!(blank_env.as_deref(), Some("sk-stored"));
    }

    #[test]
    fn test_stored_key_used_without_env() {
        let no_env = |_: &str| -> Option<String> { None };
        let mut config = Config::new();
        assert_eq!(config.key_source_with(ProviderKind::OpenAI, no_env), None);

        config.openai_api_key = Some("sk-stored".to_string());
        assert_eq!(
            config.api_key_with(ProviderKind::OpenAI, no_env).as_deref(),
            Some("sk-stored")
        );
        assert_eq!(config.key_source_with(ProviderKind::OpenAI, no_env), Some("config"));
    }

    #[test]
    fn test_blank_env_key_is_not_the_source() {
        let mut config = Config::new();
        config.openai_api_key = Some("sk-stored".to_string());
        let blank_env = |_: &str| Some("   ".to_string());

        assert_eq!(config.key_source_with(ProviderKind::OpenAI, blank_env), Some("config"));
        assert_eq!(
            config.api_key_with(ProviderKind::OpenAI, blank_env).as_deref(),
            Some("sk-stored")
        );

        let real_env = |_: &str| Some("sk-env".to_string());
        assert_eq!(config.key_source_with(ProviderKind::OpenAI, real_env), Some("env"));
    }

    #[test]
    fn test_save_provider_keeps_other_settings() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");

        let mut config = Config::new();
        config.provider = Some("claude".to_string());
        config.default_model = Some("claude-3-5-haiku-latest".to_string());
        config.claude_api_key = Some("sk-user-secret".to_string());
        config.ollama_url = Some("http://10.0.0.5:11434".to_string());
        config.response_timeout_secs = 30;
        config.save_to(&path).unwrap();

        Config::save_provider_to(&path, ProviderKind::Ollama).unwrap();

        let saved = Config::load_from(&path).unwrap();
        assert_eq!(saved.provider_kind().unwrap(), ProviderKind::Ollama);
        assert_eq!(saved.default_model, None);
        assert_eq!(saved.claude_api_key.as_deref(), Some("sk-user-secret"));
        assert_eq!(saved.ollama_url.as_deref(), Some("http://10.0.0.5:11434"));
        assert_eq!(saved.response_timeout_secs, 30);
    }

    #[test]
    fn test_save_provider_leaves_broken_file_alone() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        let original = r#"{"provider":"claude","claude_api_key":"sk-user-secret",}"#;
        fs::write(&path, original).unwrap();

        assert!(Config::save_provider_to(&path, ProviderKind::Ollama).is_err());
        assert_eq!(fs::read_to_string(&path).unwrap(), original);
    }

    #[test]
    fn test_save_provider_creates_missing_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");

        Config::save_provider_to(&path, ProviderKind::OpenAI).unwrap();
        let saved = Config::load_from(&path).unwrap();
        assert_eq!(saved.provider.as_deref(), Some("openai"));
        assert_eq!(saved.response_timeout_secs, DEFAULT_RESPONSE_TIMEOUT_SECS);
    }
}
