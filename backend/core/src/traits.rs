use anyhow::Result;
use async_trait::async_trait;

use crate::error::GenerationError;
use crate::types::{Completion, CompletionRequest, ModelInfo, ToolOutput};

/// A pluggable text-generation backend.
#[async_trait]
pub trait AiHandler: Send + Sync {
    /// Handler name (e.g., "litellm", "copilot_sdk").
    fn name(&self) -> &str;

    /// Run one completion and return its text with a finish reason.
    async fn chat_completion(
        &self,
        request: &CompletionRequest,
    ) -> std::result::Result<Completion, GenerationError>;
}

/// A backend that can enumerate the models it currently serves.
#[async_trait]
pub trait ModelCatalogSource: Send + Sync {
    /// Normalized catalog entries, sorted by id.
    async fn models(&self, force_refresh: bool) -> Result<Vec<ModelInfo>>;

    /// Model identifiers only, empty ids dropped.
    async fn model_ids(&self, force_refresh: bool) -> Result<Vec<String>> {
        let models = self.models(force_refresh).await?;
        Ok(models
            .into_iter()
            .map(|m| m.id)
            .filter(|id| !id.is_empty())
            .collect())
    }
}

/// The git-hosting side of a target (a pull request).
#[async_trait]
pub trait TargetProvider: Send + Sync {
    async fn publish_comment(&self, body: &str) -> Result<()>;

    /// Remove the "preparing..." placeholder comment, if one was posted.
    async fn remove_initial_comment(&self) -> Result<()>;

    async fn title(&self) -> Result<String>;

    async fn diff(&self) -> Result<String>;
}

/// A command handler constructed once per request.
#[async_trait]
pub trait Tool: Send {
    async fn run(&mut self) -> Result<ToolOutput>;
}
