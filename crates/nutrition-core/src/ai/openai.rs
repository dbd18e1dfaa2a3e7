use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use anyhow::{Result, anyhow};

use crate::error::ProviderFailure;
use crate::provider::{chat_turns, ProviderRequest, ResponseProvider, SYSTEM_PROMPT};

const API_URL: &str = "https://api.openai.com/v1/chat/completions";

#[derive(Serialize)]
struct OpenAiMessage {
    role: String,
    content: String,
}

#[derive(Serialize)]
struct OpenAiRequest {
    model: String,
    messages: Vec<OpenAiMessage>,
}

#[derive(Deserialize)]
struct OpenAiChoice {
    message: OpenAiResponseMessage,
}

#[derive(Deserialize)]
struct OpenAiResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct OpenAiResponse {
    choices: Vec<OpenAiChoice>,
}

#[derive(Clone)]
pub struct OpenAiProvider {
    client: Client,
    api_key: String,
    model: String,
}

impl OpenAiProvider {
    pub fn new(api_key: &str, model: &str) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.to_string(),
            model: model.to_string(),
        }
    }

    fn build_request(&self, request: &ProviderRequest) -> OpenAiRequest {
        let mut messages = vec![OpenAiMessage {
            role: "system".to_string(),
            content: SYSTEM_PROMPT.to_string(),
        }];
        messages.extend(chat_turns(request).into_iter().map(|(role, content)| OpenAiMessage {
            role: role.to_string(),
            content,
        }));

        OpenAiRequest {
            model: self.model.clone(),
            messages,
        }
    }

    async fn query(&self, request: &OpenAiRequest) -> Result<String> {
        let response = self.client
            .post(API_URL)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(anyhow!("OpenAI API error {}: {}", status, text));
        }

        let openai_response: OpenAiResponse = response.json().await?;
        openai_response.choices.into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| anyhow!("OpenAI returned an empty response"))
    }
}

#[async_trait]
impl ResponseProvider for OpenAiProvider {
    async fn respond(&self, request: &ProviderRequest) -> Result<String, ProviderFailure> {
        let body = self.build_request(request);
        tracing::debug!(model = %self.model, turns = body.messages.len(), "querying openai");
        Ok(self.query(&body).await?)
    }

    fn name(&self) -> String {
        format!("OpenAI: {}", self.model)
    }
}
