use std::fmt;
use std::sync::Arc;

use prforge_config::Settings;
use serde::{Deserialize, Serialize};

/// A parsed command line: name plus ordered raw arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub name: String,
    pub args: Vec<String>,
}

impl Command {
    /// Lowercase the name and strip the leading `/` marker.
    pub fn normalized_name(&self) -> String {
        self.name.trim_start_matches('/').to_lowercase()
    }
}

#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub model: String,
    pub system: String,
    pub user: String,
    pub temperature: f32,
    pub image_url: Option<String>,
    /// Request-scoped reasoning effort; backends ignore it when unsupported.
    pub reasoning_effort: Option<String>,
    /// The settings this request runs with: target layer, request arguments
    /// and inline model already applied. Backends read timeouts and session
    /// options from here, never from the process-wide store.
    pub settings: Arc<Settings>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    Completed,
    Error,
}

impl fmt::Display for FinishReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FinishReason::Completed => write!(f, "completed"),
            FinishReason::Error => write!(f, "error"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub text: String,
    pub finish_reason: FinishReason,
}

impl Completion {
    /// Non-empty text completes; empty text is reported as an error outcome.
    pub fn from_text(text: impl Into<String>) -> Self {
        let text = text.into();
        let finish_reason = if text.is_empty() {
            FinishReason::Error
        } else {
            FinishReason::Completed
        };
        Self { text, finish_reason }
    }
}

/// A normalized backend catalog entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelInfo {
    pub id: String,
    pub name: String,
    pub policy_state: String,
    pub billing_multiplier: Option<f64>,
    pub supports_vision: Option<bool>,
    pub supports_reasoning_effort: Option<bool>,
    pub max_prompt_tokens: Option<u64>,
    pub max_context_window_tokens: Option<u64>,
    pub supported_reasoning_efforts: Option<Vec<String>>,
    pub default_reasoning_effort: Option<String>,
}

/// What a tool run produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolOutput {
    Text(String),
    Done(bool),
}
