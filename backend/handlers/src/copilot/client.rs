//! Transport seam for the Copilot backend.
//!
//! A [`ClientConnector`] starts a [`BackendClient`]; the client lists models
//! and opens short-lived [`ClientSession`]s, one per generation call.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde::Deserialize;

use prforge_core::ModelInfo;

use super::options::{ClientOptions, SessionConfig};

#[async_trait]
pub trait ClientConnector: Send + Sync {
    /// Start a client. Called at most once per successful initialisation.
    async fn connect(&self, options: &ClientOptions) -> Result<Arc<dyn BackendClient>>;
}

#[async_trait]
pub trait BackendClient: Send + Sync {
    async fn list_models(&self) -> Result<Vec<RemoteModel>>;

    async fn create_session(&self, config: &SessionConfig) -> Result<Box<dyn ClientSession>>;
}

#[async_trait]
pub trait ClientSession: Send {
    /// Send one prompt and wait for the final assistant message.
    ///
    /// `None` when the backend answered without content.
    async fn send_and_wait(&mut self, prompt: &str) -> Result<Option<String>>;

    async fn destroy(&mut self) -> Result<()>;
}

/// A catalog entry as the backend reports it. Every field is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RemoteModel {
    pub id: Option<String>,
    pub name: Option<String>,
    pub capabilities: Option<RemoteCapabilities>,
    pub policy: Option<RemotePolicy>,
    pub billing: Option<RemoteBilling>,
    pub supported_reasoning_efforts: Option<Vec<String>>,
    pub default_reasoning_effort: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RemoteCapabilities {
    pub supports: Option<RemoteSupports>,
    pub limits: Option<RemoteLimits>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RemoteSupports {
    pub vision: Option<bool>,
    pub reasoning_effort: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RemoteLimits {
    pub max_prompt_tokens: Option<u64>,
    pub max_context_window_tokens: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RemotePolicy {
    pub state: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RemoteBilling {
    pub multiplier: Option<f64>,
}

impl From<RemoteModel> for ModelInfo {
    fn from(model: RemoteModel) -> Self {
        let capabilities = model.capabilities.unwrap_or_default();
        let supports = capabilities.supports.unwrap_or_default();
        let limits = capabilities.limits.unwrap_or_default();
        ModelInfo {
            id: model.id.unwrap_or_default(),
            name: model.name.unwrap_or_default(),
            policy_state: model.policy.and_then(|p| p.state).unwrap_or_default(),
            billing_multiplier: model.billing.and_then(|b| b.multiplier),
            supports_vision: supports.vision,
            supports_reasoning_effort: supports.reasoning_effort,
            max_prompt_tokens: limits.max_prompt_tokens,
            max_context_window_tokens: limits.max_context_window_tokens,
            supported_reasoning_efforts: model.supported_reasoning_efforts,
            default_reasoning_effort: model.default_reasoning_effort,
        }
    }
}
