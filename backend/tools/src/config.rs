//! `config`: show the settings this request runs with.

use anyhow::{Context, Result};
use async_trait::async_trait;

use prforge_commands::ToolContext;
use prforge_config::{redact, Settings};
use prforge_core::{Tool, ToolOutput};

use crate::output::publish;

pub struct ConfigTool {
    ctx: ToolContext,
}

impl ConfigTool {
    pub fn build(ctx: ToolContext) -> Result<Box<dyn Tool>> {
        Ok(Box::new(Self { ctx }))
    }
}

/// YAML rendering of `settings` with credentials masked.
pub fn render_settings(settings: &Settings) -> Result<String> {
    let value = serde_json::to_value(settings).context("Failed to serialize settings")?;
    let yaml = serde_yaml::to_string(&redact(&value)).context("Failed to render settings")?;
    Ok(format!("## Configuration\n\n```yaml\n{}```", yaml))
}

#[async_trait]
impl Tool for ConfigTool {
    async fn run(&mut self) -> Result<ToolOutput> {
        let comment = render_settings(&self.ctx.settings)?;
        publish(&self.ctx, &comment).await?;
        Ok(ToolOutput::Text(comment))
    }
}
