use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use anyhow::{Result, anyhow};

use crate::error::ProviderFailure;
use crate::provider::{build_prompt, ProviderRequest, ResponseProvider};

#[derive(Serialize)]
struct OllamaRequest {
    model: String,
    prompt: String,
    stream: bool,
}

#[derive(Deserialize)]
struct OllamaResponse {
    response: String,
    #[allow(dead_code)]
    done: bool,
}

#[derive(Clone)]
pub struct OllamaProvider {
    client: Client,
    base_url: String,
    model: String,
}

impl OllamaProvider {
    pub fn new(base_url: &str, model: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
        }
    }

    pub async fn query(&self, prompt: &str) -> Result<String> {
        let url = format!("{}/api/generate", self.base_url);

        let request = OllamaRequest {
            model: self.model.clone(),
            prompt: prompt.to_string(),
            stream: false,
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "Ollama request failed with status: {}. Make sure Ollama is running with: ollama serve",
                response.status()
            ));
        }

        let ollama_response: OllamaResponse = response.json().await?;
        Ok(ollama_response.response)
    }
}

#[async_trait]
impl ResponseProvider for OllamaProvider {
    async fn respond(&self, request: &ProviderRequest) -> Result<String, ProviderFailure> {
        let prompt = build_prompt(request);
        tracing::debug!(model = %self.model, prompt_len = prompt.len(), "querying ollama");
        Ok(self.query(&prompt).await?)
    }

    fn name(&self) -> String {
        format!("Ollama: {}", self.model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let provider = OllamaProvider::new("http://localhost:11434/", "gemma3:latest");
        assert_eq!(provider.base_url, "http://localhost:11434");
        assert_eq!(provider.name(), "Ollama: gemma3:latest");
    }

    #[test]
    fn test_response_parses() {
        let body = r#"{"model":"gemma3","response":"* Eggs","done":true}"#;
        let parsed: OllamaResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.response, "* Eggs");
    }

    /// Serve one HTTP request on a local port with a fixed status and body.
    /// Returns the base URL and a handle yielding the raw request.
    async fn serve_once(status: &'static str, body: &'static str) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());

        let handle = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut raw = Vec::new();
            let mut buf = [0u8; 4096];
            // Headers, then as much body as Content-Length says
            loop {
                let n = stream.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                raw.extend_from_slice(&buf[..n]);
                let text = String::from_utf8_lossy(&raw);
                if let Some(end) = text.find("\r\n\r\n") {
                    let content_length = text[..end]
                        .lines()
                        .find_map(|line| {
                            let (name, value) = line.split_once(':')?;
                            name.eq_ignore_ascii_case("content-length")
                                .then(|| value.trim().parse::<usize>().ok())
                                .flatten()
                        })
                        .unwrap_or(0);
                    if raw.len() >= end + 4 + content_length {
                        break;
                    }
                }
            }

            let response = format!(
                "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            stream.write_all(response.as_bytes()).await.unwrap();
            let _ = stream.shutdown().await;
            String::from_utf8_lossy(&raw).into_owned()
        });

        (url, handle)
    }

    fn local_provider(url: &str) -> OllamaProvider {
        // Talk to the test server directly, whatever proxy the environment sets
        OllamaProvider {
            client: Client::builder().no_proxy().build().unwrap(),
            ..OllamaProvider::new(url, "gemma3:latest")
        }
    }

    fn request(text: &str) -> ProviderRequest {
        ProviderRequest {
            text: text.to_string(),
            history: Vec::new(),
        }
    }

    #[tokio::test]
    async fn test_reply_from_server() {
        let (url, server) =
            serve_once("200 OK", r#"{"model":"gemma3","response":"* Eggs\n* Bananas","done":true}"#).await;
        let provider = local_provider(&url);

        let reply = provider.respond(&request("What foods boost energy?")).await.unwrap();
        assert_eq!(reply, "* Eggs\n* Bananas");

        let raw = server.await.unwrap();
        assert!(raw.starts_with("POST /api/generate"));
        assert!(raw.contains(r#""model":"gemma3:latest""#));
        assert!(raw.contains("Current question: What foods boost energy?"));
    }

    #[tokio::test]
    async fn test_error_status_is_a_failure() {
        let (url, server) = serve_once("500 Internal Server Error", "{}").await;
        let provider = local_provider(&url);

        let failure = provider.respond(&request("hi")).await.unwrap_err();
        assert!(failure.description.contains("500"));
        assert!(failure.description.contains("ollama serve"));
        server.await.unwrap();
    }
}
