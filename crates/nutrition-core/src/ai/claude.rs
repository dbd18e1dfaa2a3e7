use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use anyhow::{Result, anyhow};

use crate::error::ProviderFailure;
use crate::provider::{chat_turns, ProviderRequest, ResponseProvider, SYSTEM_PROMPT};

const API_URL: &str = "https://api.anthropic.com/v1/messages";

#[derive(Serialize)]
struct ClaudeMessage {
    role: String,
    content: String,
}

#[derive(Serialize)]
struct ClaudeRequest {
    model: String,
    max_tokens: u32,
    system: String,
    messages: Vec<ClaudeMessage>,
}

#[derive(Deserialize)]
struct ClaudeContent {
    #[serde(default)]
    text: String,
}

#[derive(Deserialize)]
struct ClaudeResponse {
    content: Vec<ClaudeContent>,
}

#[derive(Clone)]
pub struct ClaudeProvider {
    client: Client,
    api_key: String,
    model: String,
}

impl ClaudeProvider {
    pub fn new(api_key: &str, model: &str) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.to_string(),
            model: model.to_string(),
        }
    }

    fn build_request(&self, request: &ProviderRequest) -> ClaudeRequest {
        ClaudeRequest {
            model: self.model.clone(),
            max_tokens: 4096,
            system: SYSTEM_PROMPT.to_string(),
            messages: chat_turns(request)
                .into_iter()
                .map(|(role, content)| ClaudeMessage {
                    role: role.to_string(),
                    content,
                })
                .collect(),
        }
    }

    async fn query(&self, request: &ClaudeRequest) -> Result<String> {
        let response = self.client
            .post(API_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
            .json(request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(anyhow!("Claude API error {}: {}", status, text));
        }

        let claude_response: ClaudeResponse = response.json().await?;
        Ok(claude_response.content.into_iter()
            .map(|c| c.text)
            .collect())
    }
}

#[async_trait]
impl ResponseProvider for ClaudeProvider {
    async fn respond(&self, request: &ProviderRequest) -> Result<String, ProviderFailure> {
        let body = self.build_request(request);
        tracing::debug!(model = %self.model, turns = body.messages.len(), "querying claude");
        Ok(self.query(&body).await?)
    }

    fn name(&self) -> String {
        format!("Claude: {}", self.model)
    }
}
