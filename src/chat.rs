//! Chat client abstraction and providers.
//!
//! [`ChatClient`] is the text-in, text-out seam the diagnostic agents sit on:
//! `complete(system, user) -> text`. Providers:
//!
//! - **[`OpenAiChat`]** — `POST /v1/chat/completions`, needs `OPENAI_API_KEY`.
//! - **[`OllamaChat`]** — `POST /api/chat` on a local Ollama instance.
//!
//! Retry policy matches the embedding providers: exponential backoff for
//! 429/5xx/network errors, immediate failure for other client errors.

use anyhow::{bail, Result};
use async_trait::async_trait;
use std::time::Duration;

use crate::config::ChatConfig;

/// Completes a structured prompt into free text.
#[async_trait]
pub trait ChatClient: Send + Sync {
    fn model_name(&self) -> &str;

    /// Send a system + user message pair and return the assistant text.
    async fn complete(&self, system: &str, user: &str) -> Result<String>;
}

/// Build the configured chat client.
pub fn create_chat_client(config: &ChatConfig) -> Result<Box<dyn ChatClient>> {
    match config.provider.as_str() {
        "openai" => Ok(Box::new(OpenAiChat::new(config)?)),
        "ollama" => Ok(Box::new(OllamaChat::new(config)?)),
        other => bail!("Unknown chat provider: {}", other),
    }
}

// ============ OpenAI ============

pub struct OpenAiChat {
    client: reqwest::Client,
    model: String,
    api_key: String,
    temperature: f64,
    max_retries: u32,
}

impl OpenAiChat {
    pub fn new(config: &ChatConfig) -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| anyhow::anyhow!("OPENAI_API_KEY environment variable not set"))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            model: config.model.clone(),
            api_key,
            temperature: config.temperature,
            max_retries: config.max_retries,
        })
    }
}

#[async_trait]
impl ChatClient for OpenAiChat {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, system: &str, user: &str) -> Result<String> {
        let body = serde_json::json!({
            "model": self.model,
            "temperature": self.temperature,
            "messages": [
                { "role": "system", "content": system },
                { "role": "user", "content": user }
            ],
        });

        let mut last_err = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = Duration::from_secs(1 << (attempt - 1).min(5));
                tokio::time::sleep(delay).await;
            }

            let resp = self
                .client
                .post("https://api.openai.com/v1/chat/completions")
                .header("Authorization", format!("Bearer {}", self.api_key))
                .header("Content-Type", "application/json")
                .json(&body)
                .send()
                .await;

            match resp {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        let json: serde_json::Value = response.json().await?;
                        return parse_openai_completion(&json);
                    }

                    if status.as_u16() == 429 || status.is_server_error() {
                        let body_text = response.text().await.unwrap_or_default();
                        last_err =
                            Some(anyhow::anyhow!("OpenAI API error {}: {}", status, body_text));
                        continue;
                    }

                    let body_text = response.text().await.unwrap_or_default();
                    bail!("OpenAI API error {}: {}", status, body_text);
                }
                Err(e) => {
                    last_err = Some(e.into());
                    continue;
                }
            }
        }

        Err(last_err.unwrap_or_else(|| anyhow::anyhow!("Chat completion failed after retries")))
    }
}

fn parse_openai_completion(json: &serde_json::Value) -> Result<String> {
    json.get("choices")
        .and_then(|c| c.as_array())
        .and_then(|c| c.first())
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(|t| t.as_str())
        .map(|t| t.to_string())
        .ok_or_else(|| anyhow::anyhow!("Invalid OpenAI response: missing choices[0].message.content"))
}

// ============ Ollama ============

pub struct OllamaChat {
    client: reqwest::Client,
    model: String,
    url: String,
    temperature: f64,
    max_retries: u32,
}

impl OllamaChat {
    pub fn new(config: &ChatConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            model: config.model.clone(),
            url: config
                .url
                .clone()
                .unwrap_or_else(|| "http://localhost:11434".to_string()),
            temperature: config.temperature,
            max_retries: config.max_retries,
        })
    }
}

#[async_trait]
impl ChatClient for OllamaChat {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, system: &str, user: &str) -> Result<String> {
        let body = serde_json::json!({
            "model": self.model,
            "stream": false,
            "options": { "temperature": self.temperature },
            "messages": [
                { "role": "system", "content": system },
                { "role": "user", "content": user }
            ],
        });

        let mut last_err = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = Duration::from_secs(1 << (attempt - 1).min(5));
                tokio::time::sleep(delay).await;
            }

            let resp = self
                .client
                .post(format!("{}/api/chat", self.url))
                .header("Content-Type", "application/json")
                .json(&body)
                .send()
                .await;

            match resp {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        let json: serde_json::Value = response.json().await?;
                        return parse_ollama_completion(&json);
                    }

                    if status.as_u16() == 429 || status.is_server_error() {
                        let body_text = response.text().await.unwrap_or_default();
                        last_err =
                            Some(anyhow::anyhow!("Ollama API error {}: {}", status, body_text));
                        continue;
                    }

                    let body_text = response.text().await.unwrap_or_default();
                    bail!("Ollama API error {}: {}", status, body_text);
                }
                Err(e) => {
                    last_err = Some(anyhow::anyhow!(
                        "Ollama connection error (is Ollama running at {}?): {}",
                        self.url,
                        e
                    ));
                    continue;
                }
            }
        }

        Err(last_err.unwrap_or_else(|| anyhow::anyhow!("Ollama chat failed after retries")))
    }
}

fn parse_ollama_completion(json: &serde_json::Value) -> Result<String> {
    json.get("message")
        .and_then(|m| m.get("content"))
        .and_then(|t| t.as_str())
        .map(|t| t.to_string())
        .ok_or_else(|| anyhow::anyhow!("Invalid Ollama response: missing message.content"))
}
