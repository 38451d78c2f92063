//! OpenAI-compatible chat-completions wire types.
//!
//! Shared by the LiteLLM proxy handler and the HTTP Copilot connector.

use anyhow::{Context, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

#[derive(Debug, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning_effort: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

/// POST `{base_url}/chat/completions` and return the first choice's text.
///
/// A response without choices or content yields `None`.
pub async fn post_chat(
    client: &Client,
    base_url: &str,
    bearer: Option<&str>,
    body: &ChatRequest,
) -> Result<Option<String>> {
    debug!(model = %body.model, base_url, "Sending chat completion request");

    let mut request = client
        .post(format!("{}/chat/completions", base_url.trim_end_matches('/')))
        .header("Content-Type", "application/json")
        .json(body);
    if let Some(token) = bearer {
        request = request.header("Authorization", format!("Bearer {token}"));
    }

    let response = request
        .send()
        .await
        .context("Chat completion HTTP request failed")?;

    let status = response.status();
    if !status.is_success() {
        let error_body = response.text().await.unwrap_or_default();
        anyhow::bail!("{} returned {}: {}", base_url, status, error_body);
    }

    let chat_response: ChatResponse = response
        .json()
        .await
        .context("Failed to parse chat completion response")?;

    Ok(chat_response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content))
}

/// GET `{base_url}/models` and return the raw entries.
///
/// Accepts both `{"data": [...]}` and a bare array.
pub async fn get_models(client: &Client, base_url: &str, bearer: Option<&str>) -> Result<Vec<Value>> {
    let mut request = client.get(format!("{}/models", base_url.trim_end_matches('/')));
    if let Some(token) = bearer {
        request = request.header("Authorization", format!("Bearer {token}"));
    }

    let response = request.send().await.context("Model list HTTP request failed")?;
    let status = response.status();
    if !status.is_success() {
        let error_body = response.text().await.unwrap_or_default();
        anyhow::bail!("{} returned {}: {}", base_url, status, error_body);
    }

    let body: Value = response
        .json()
        .await
        .context("Failed to parse model list response")?;
    Ok(models_from_body(body))
}

fn models_from_body(body: Value) -> Vec<Value> {
    match body {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("data") {
            Some(Value::Array(items)) => items,
            _ => Vec::new(),
        },
        _ => Vec::new(),
    }
}

/// Append an image reference to the prompt as external context.
pub fn prompt_with_image(user: &str, image_url: Option<&str>) -> String {
    match image_url.map(str::trim).filter(|u| !u.is_empty()) {
        Some(url) => format!(
            "{user}\n\nImage URL context (external): {url}\n\
             If you cannot access this URL, continue based on code context only."
        ),
        None => user.to_string(),
    }
}
