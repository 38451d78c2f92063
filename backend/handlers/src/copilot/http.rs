//! HTTP connector speaking the OpenAI-compatible surface of a Copilot
//! endpoint (`/models`, `/chat/completions`).

use std::sync::Arc;

use anyhow::{bail, Result};
use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, warn};

use super::client::{BackendClient, ClientConnector, ClientSession, RemoteModel};
use super::options::{ClientOptions, SessionConfig};
use crate::providers::wire::{get_models, post_chat, ChatMessage, ChatRequest};

/// Hosted endpoint used when no `cli_url` is configured.
pub const DEFAULT_COPILOT_API: &str = "https://api.githubcopilot.com";

#[derive(Default)]
pub struct HttpConnector {
    http: Client,
}

impl HttpConnector {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ClientConnector for HttpConnector {
    async fn connect(&self, options: &ClientOptions) -> Result<Arc<dyn BackendClient>> {
        let base_url = match &options.cli_url {
            Some(url) => normalize_url(url),
            None => {
                if options.github_token.is_none() {
                    bail!(
                        "no Copilot endpoint available: set copilot.cli_url or provide \
                         a token via copilot.github_token, COPILOT_GITHUB_TOKEN or GITHUB_TOKEN"
                    );
                }
                if let Some(path) = &options.cli_path {
                    debug!(cli_path = %path, "Local Copilot CLI is not spawned by the HTTP connector");
                }
                DEFAULT_COPILOT_API.to_string()
            }
        };

        debug!(base_url = %base_url, "Connected Copilot HTTP client");
        Ok(Arc::new(HttpClient {
            http: self.http.clone(),
            base_url,
            token: options.github_token.clone(),
        }))
    }
}

fn normalize_url(url: &str) -> String {
    let url = url.trim().trim_end_matches('/');
    if url.starts_with("http://") || url.starts_with("https://") {
        url.to_string()
    } else {
        format!("http://{url}")
    }
}

struct HttpClient {
    http: Client,
    base_url: String,
    token: Option<String>,
}

#[async_trait]
impl BackendClient for HttpClient {
    async fn list_models(&self) -> Result<Vec<RemoteModel>> {
        let raw = get_models(&self.http, &self.base_url, self.token.as_deref()).await?;
        Ok(raw
            .into_iter()
            .filter_map(|entry| match serde_json::from_value::<RemoteModel>(entry) {
                Ok(model) => Some(model),
                Err(e) => {
                    warn!(error = %e, "Skipping malformed catalog entry");
                    None
                }
            })
            .collect())
    }

    async fn create_session(&self, config: &SessionConfig) -> Result<Box<dyn ClientSession>> {
        let (base_url, bearer) = match &config.provider {
            Some(provider) => (
                normalize_url(&provider.base_url),
                provider
                    .bearer_token
                    .clone()
                    .or_else(|| provider.api_key.clone()),
            ),
            None => (self.base_url.clone(), self.token.clone()),
        };
        Ok(Box::new(HttpSession {
            http: self.http.clone(),
            base_url,
            bearer,
            config: config.clone(),
            history: Vec::new(),
        }))
    }
}

/// Conversation state lives client-side; destroying the session drops it.
struct HttpSession {
    http: Client,
    base_url: String,
    bearer: Option<String>,
    config: SessionConfig,
    history: Vec<ChatMessage>,
}

#[async_trait]
impl ClientSession for HttpSession {
    async fn send_and_wait(&mut self, prompt: &str) -> Result<Option<String>> {
        let mut messages = Vec::with_capacity(self.history.len() + 2);
        if let Some(system) = &self.config.system_message {
            messages.push(ChatMessage::system(system.content.clone()));
        }
        messages.extend(self.history.iter().cloned());
        messages.push(ChatMessage::user(prompt));

        let body = ChatRequest {
            model: self.config.model.clone(),
            messages,
            temperature: None,
            reasoning_effort: self.config.reasoning_effort.clone(),
        };
        let reply = post_chat(&self.http, &self.base_url, self.bearer.as_deref(), &body).await?;

        self.history.push(ChatMessage::user(prompt));
        if let Some(text) = &reply {
            self.history.push(ChatMessage {
                role: "assistant".to_string(),
                content: text.clone(),
            });
        }
        Ok(reply)
    }

    async fn destroy(&mut self) -> Result<()> {
        self.history.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_host_gets_http_scheme() {
        assert_eq!(normalize_url("localhost:4321"), "http://localhost:4321");
        assert_eq!(normalize_url("https://proxy.local/"), "https://proxy.local");
    }

    #[tokio::test]
    async fn connect_without_endpoint_or_token_fails() {
        let err = HttpConnector::new()
            .connect(&ClientOptions::default())
            .await
            .err()
            .unwrap();
        assert!(err.to_string().contains("copilot.cli_url"));
    }
}
