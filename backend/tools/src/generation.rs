//! Model selection and generation with fallback models.

use prforge_commands::{max_tokens_for, ToolContext};
use prforge_config::defaults::DEFAULT_TEMPERATURE;
use prforge_config::Settings;
use prforge_core::{Completion, CompletionRequest, FinishReason, GenerationError};
use tracing::{info, warn};

/// Budget assumed for models missing from the token table.
const DEFAULT_MAX_TOKENS: usize = 32_000;

/// `config.model` followed by `config.fallback_models`, blanks and repeats
/// removed.
pub fn model_chain(settings: &Settings) -> Vec<String> {
    let mut chain: Vec<String> = Vec::new();
    let candidates = settings
        .config
        .model
        .iter()
        .chain(settings.config.fallback_models.iter().flatten());
    for model in candidates {
        let model = model.trim();
        if !model.is_empty() && !chain.iter().any(|m| m == model) {
            chain.push(model.to_string());
        }
    }
    chain
}

/// Try each model of the chain in order; the first non-empty reply wins.
pub async fn generate(
    ctx: &ToolContext,
    system: &str,
    user: &str,
) -> Result<Completion, GenerationError> {
    let temperature = ctx.settings.config.temperature.unwrap_or(DEFAULT_TEMPERATURE) as f32;
    let mut last_error = None;

    for model in model_chain(&ctx.settings) {
        let request = CompletionRequest {
            model: model.clone(),
            system: system.to_string(),
            user: user.to_string(),
            temperature,
            image_url: None,
            reasoning_effort: ctx.settings.config.reasoning_effort.clone(),
            settings: ctx.settings.clone(),
        };
        match ctx.handler.chat_completion(&request).await {
            Ok(completion) if completion.finish_reason == FinishReason::Error => {
                warn!(model = %model, "Empty response, trying next model");
                last_error = Some(GenerationError::EmptyResponse {
                    backend: ctx.handler.name().to_string(),
                });
            }
            Ok(completion) => {
                info!(model = %model, handler = ctx.handler.name(), finish_reason = %completion.finish_reason, "Generation finished");
                return Ok(completion);
            }
            Err(e) => {
                warn!(model = %model, error = %e, "Generation failed, trying next model");
                last_error = Some(e);
            }
        }
    }
    Err(last_error.unwrap_or(GenerationError::NoModel))
}

/// Clip `text` so it fits the primary model's context budget.
pub fn clip_to_budget(text: &str, settings: &Settings) -> String {
    let budget = settings
        .config
        .model
        .as_deref()
        .and_then(max_tokens_for)
        .unwrap_or(DEFAULT_MAX_TOKENS);
    // ~3 chars per token
    let max_chars = budget.saturating_mul(3);
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let clipped: String = text.chars().take(max_chars).collect();
    format!("{clipped}\n... (diff truncated)")
}
