/// Context-window budgets for well-known model identifiers.
use std::collections::HashMap;

use once_cell::sync::Lazy;

/// Model id -> max context tokens.
pub static MAX_TOKENS: Lazy<HashMap<&'static str, usize>> = Lazy::new(|| {
    [
        ("gpt-4o", 128_000),
        ("gpt-4o-mini", 128_000),
        ("gpt-4o-2024-08-06", 128_000),
        ("gpt-4o-2024-11-20", 128_000),
        ("gpt-4.1", 1_047_576),
        ("gpt-4.1-mini", 1_047_576),
        ("gpt-4.1-nano", 1_047_576),
        ("gpt-5", 200_000),
        ("gpt-5-mini", 200_000),
        ("gpt-5-nano", 200_000),
        ("gpt-5.1", 200_000),
        ("gpt-5.1-codex", 200_000),
        ("gpt-5.2", 400_000),
        ("gpt-5.2-2025-12-11", 400_000),
        ("gpt-5.2-codex", 400_000),
        ("o1", 200_000),
        ("o1-mini", 128_000),
        ("o3", 200_000),
        ("o3-mini", 200_000),
        ("o4-mini", 200_000),
        ("claude-3-7-sonnet-20250219", 200_000),
        ("claude-sonnet-4-20250514", 200_000),
        ("claude-opus-4-20250514", 200_000),
        ("claude-sonnet-4.5", 200_000),
        ("claude-opus-4.5", 200_000),
        ("claude-opus-4.6", 200_000),
        ("claude-haiku-4.5", 200_000),
        ("anthropic/claude-sonnet-4-20250514", 200_000),
        ("gemini-2.5-pro", 1_048_576),
        ("gemini-2.5-flash", 1_048_576),
        ("gemini-3-pro-preview", 1_048_576),
        ("gemini/gemini-2.5-pro", 1_048_576),
        ("gemini/gemini-2.5-flash", 1_048_576),
        ("vertex_ai/gemini-2.5-pro", 1_048_576),
        ("grok-3", 131_072),
        ("grok-4", 256_000),
        ("xai/grok-4", 256_000),
        ("deepseek/deepseek-chat", 128_000),
        ("deepseek/deepseek-reasoner", 64_000),
        ("mistral/mistral-large-latest", 128_000),
        ("codestral/codestral-latest", 256_000),
        ("groq/llama-3.3-70b-versatile", 128_000),
        ("ollama/qwen2.5-coder:32b", 32_768),
    ]
    .into_iter()
    .collect()
});

/// Budget for `model`, matched case-insensitively.
pub fn max_tokens_for(model: &str) -> Option<usize> {
    MAX_TOKENS.get(model.trim().to_lowercase().as_str()).copied()
}

pub fn is_known_model(model: &str) -> bool {
    max_tokens_for(model).is_some()
}
