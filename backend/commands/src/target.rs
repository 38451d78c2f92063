/// Per-target collaborators: settings layering and the git-hosting provider.
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;

use prforge_core::TargetProvider;

/// Target-specific settings (for example a repository's own settings file),
/// expressed as a JSON merge patch over the global settings.
#[async_trait]
pub trait TargetSettingsSource: Send + Sync {
    async fn settings_patch(&self, target: &str) -> Result<Option<Value>>;
}

/// No target-specific settings.
pub struct NoTargetSettings;

#[async_trait]
impl TargetSettingsSource for NoTargetSettings {
    async fn settings_patch(&self, _target: &str) -> Result<Option<Value>> {
        Ok(None)
    }
}

pub trait TargetProviderFactory: Send + Sync {
    fn provider_for(&self, target: &str) -> Result<Arc<dyn TargetProvider>>;
}
