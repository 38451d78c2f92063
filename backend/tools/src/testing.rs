//! Hand-written fakes shared by the tool tests.

use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;

use prforge_commands::{ToolContext, ToolFlags};
use prforge_config::Settings;
use prforge_core::{
    AiHandler, Completion, CompletionRequest, GenerationError, ModelCatalogSource, ModelInfo,
    TargetProvider,
};

#[derive(Default)]
pub struct FakeProvider {
    pub comments: Mutex<Vec<String>>,
    pub removed_initial: Mutex<usize>,
    pub diff: String,
}

impl FakeProvider {
    pub fn with_diff(diff: &str) -> Arc<Self> {
        Arc::new(Self {
            diff: diff.to_string(),
            ..Default::default()
        })
    }

    pub fn comments(&self) -> Vec<String> {
        self.comments.lock().unwrap().clone()
    }
}

#[async_trait]
impl TargetProvider for FakeProvider {
    async fn publish_comment(&self, body: &str) -> Result<()> {
        self.comments.lock().unwrap().push(body.to_string());
        Ok(())
    }

    async fn remove_initial_comment(&self) -> Result<()> {
        *self.removed_initial.lock().unwrap() += 1;
        Ok(())
    }

    async fn title(&self) -> Result<String> {
        Ok("Add retry to uploader".to_string())
    }

    async fn diff(&self) -> Result<String> {
        Ok(self.diff.clone())
    }
}

/// Replies `reply from <model>` unless the model is scripted to fail or to
/// answer with nothing.
pub struct ScriptedHandler {
    failing: Vec<String>,
    empty: Vec<String>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedHandler {
    pub fn failing_for(models: &[&str]) -> Arc<Self> {
        Self::scripted(models, &[])
    }

    pub fn scripted(failing: &[&str], empty: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            failing: owned(failing),
            empty: owned(empty),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn models_called(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.model.clone())
            .collect()
    }

    pub fn last_request(&self) -> Option<CompletionRequest> {
        self.requests.lock().unwrap().last().cloned()
    }
}

fn owned(models: &[&str]) -> Vec<String> {
    models.iter().map(|m| m.to_string()).collect()
}

#[async_trait]
impl AiHandler for ScriptedHandler {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn chat_completion(
        &self,
        request: &CompletionRequest,
    ) -> std::result::Result<Completion, GenerationError> {
        self.requests.lock().unwrap().push(request.clone());
        if self.failing.contains(&request.model) {
            return Err(GenerationError::failed("scripted", "upstream 503"));
        }
        if self.empty.contains(&request.model) {
            return Ok(Completion::from_text(""));
        }
        Ok(Completion::from_text(format!("reply from {}", request.model)))
    }
}

pub struct StaticCatalog {
    pub models: Option<Vec<ModelInfo>>,
    pub refreshes: Mutex<Vec<bool>>,
}

impl StaticCatalog {
    pub fn new(models: Option<Vec<ModelInfo>>) -> Arc<Self> {
        Arc::new(Self {
            models,
            refreshes: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl ModelCatalogSource for StaticCatalog {
    async fn models(&self, force_refresh: bool) -> Result<Vec<ModelInfo>> {
        self.refreshes.lock().unwrap().push(force_refresh);
        match &self.models {
            Some(models) => Ok(models.clone()),
            None => anyhow::bail!("Not authenticated"),
        }
    }
}

pub fn context(settings: Settings, handler: Arc<ScriptedHandler>, args: Vec<String>) -> ToolContext {
    context_for(FakeProvider::with_diff(""), settings, handler, args)
}

pub fn context_for(
    provider: Arc<FakeProvider>,
    settings: Settings,
    handler: Arc<ScriptedHandler>,
    args: Vec<String>,
) -> ToolContext {
    ToolContext {
        target: "https://example.com/pr/1".to_string(),
        handler,
        catalog: None,
        provider,
        args,
        settings: Arc::new(settings),
        flags: ToolFlags::default(),
    }
}
