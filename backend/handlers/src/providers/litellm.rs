use async_trait::async_trait;
use reqwest::Client;
use tracing::warn;

use prforge_config::defaults::{duration_from_secs, DEFAULT_AI_TIMEOUT_SECS};
use prforge_config::Settings;
use prforge_core::{AiHandler, Completion, CompletionRequest, GenerationError};

use super::wire::{post_chat, prompt_with_image, ChatMessage, ChatRequest};

const BACKEND: &str = "litellm";

/// Default LiteLLM proxy address.
pub const DEFAULT_API_BASE: &str = "http://localhost:4000";

/// Baseline handler talking to a LiteLLM (OpenAI-compatible) proxy.
///
/// `litellm.api_base`, `litellm.api_key` and `config.ai_timeout` are read
/// from each request's settings.
#[derive(Default)]
pub struct LiteLlmHandler {
    client: Client,
}

impl LiteLlmHandler {
    pub fn new() -> Self {
        Self::default()
    }
}

struct Endpoint {
    api_base: String,
    api_key: Option<String>,
    timeout_secs: f64,
}

impl Endpoint {
    fn from_settings(settings: &Settings) -> Self {
        Self {
            api_base: settings
                .litellm
                .api_base
                .clone()
                .filter(|b| !b.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
            api_key: settings.litellm.api_key.clone().filter(|k| !k.trim().is_empty()),
            timeout_secs: settings
                .config
                .ai_timeout
                .filter(|t| *t > 0.0)
                .unwrap_or(DEFAULT_AI_TIMEOUT_SECS),
        }
    }
}

#[async_trait]
impl AiHandler for LiteLlmHandler {
    fn name(&self) -> &str {
        BACKEND
    }

    async fn chat_completion(
        &self,
        request: &CompletionRequest,
    ) -> Result<Completion, GenerationError> {
        if request.model.trim().is_empty() {
            return Err(GenerationError::NoModel);
        }

        let Endpoint {
            api_base,
            api_key,
            timeout_secs,
        } = Endpoint::from_settings(&request.settings);

        let mut messages = Vec::new();
        if !request.system.is_empty() {
            messages.push(ChatMessage::system(request.system.clone()));
        }
        messages.push(ChatMessage::user(prompt_with_image(
            &request.user,
            request.image_url.as_deref(),
        )));

        let body = ChatRequest {
            model: request.model.clone(),
            messages,
            temperature: Some(request.temperature),
            reasoning_effort: request.reasoning_effort.clone(),
        };

        let call = post_chat(&self.client, &api_base, api_key.as_deref(), &body);
        match tokio::time::timeout(duration_from_secs(timeout_secs), call).await {
            Ok(Ok(text)) => Ok(Completion::from_text(text.unwrap_or_default())),
            Ok(Err(e)) => {
                warn!(model = %request.model, error = %e, "LiteLLM inference failed");
                Err(GenerationError::failed(BACKEND, format!("{e:#}")))
            }
            Err(_) => {
                warn!(model = %request.model, timeout_secs, "LiteLLM inference timed out");
                Err(GenerationError::Timeout {
                    backend: BACKEND.to_string(),
                    secs: timeout_secs as u64,
                })
            }
        }
    }
}
