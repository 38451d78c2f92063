//! `models`: list the models the live catalog offers this account.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::{error, info};

use prforge_commands::ToolContext;
use prforge_core::{ModelInfo, Tool, ToolOutput};

use crate::output::publish;

const HEADING: &str = "## Available Copilot Models";

const FAILURE_HINTS: &str = "Failed to fetch models from Copilot API.\n\n\
Ensure:\n\
- `config.ai_handler=\"copilot_sdk\"`\n\
- `COPILOT_GITHUB_TOKEN` is configured\n\
- `copilot.github_token` is set (or allow fallback from `COPILOT_GITHUB_TOKEN`)\n\
- Copilot access is active for this account";

pub struct ModelsTool {
    ctx: ToolContext,
    force_refresh: bool,
}

impl ModelsTool {
    pub fn build(ctx: ToolContext) -> Result<Box<dyn Tool>> {
        let force_refresh = ctx.args.iter().any(|arg| {
            matches!(
                arg.trim().to_lowercase().as_str(),
                "--refresh" | "-r" | "refresh"
            )
        });
        Ok(Box::new(Self { ctx, force_refresh }))
    }
}

/// Markdown listing of `models`, stamped with `fetched_at`.
pub fn format_models_comment(models: &[ModelInfo], fetched_at: DateTime<Utc>) -> String {
    let mut lines = vec![
        HEADING.to_string(),
        String::new(),
        format!(
            "Fetched live from Copilot API at `{}`.",
            fetched_at.format("%Y-%m-%d %H:%M:%S UTC")
        ),
        String::new(),
        "Use them inline in any command:".to_string(),
        "- `/review gpt-5.2-codex`".to_string(),
        "- `/ask gpt-5.2-codex Why was this design chosen?`".to_string(),
        String::new(),
    ];
    if models.is_empty() {
        lines.push("No models were returned by Copilot API for this account.".to_string());
        return lines.join("\n");
    }
    lines.extend(models.iter().map(model_line));
    lines.join("\n")
}

fn model_line(model: &ModelInfo) -> String {
    let policy = if model.policy_state.is_empty() {
        "unknown"
    } else {
        model.policy_state.as_str()
    };

    let mut capabilities = Vec::new();
    if model.supports_vision == Some(true) {
        capabilities.push("vision");
    }
    if model.supports_reasoning_effort == Some(true) {
        capabilities.push("reasoning");
    }
    let capabilities = if capabilities.is_empty() {
        "standard".to_string()
    } else {
        capabilities.join(", ")
    };

    let context = match model.max_context_window_tokens {
        Some(tokens) if tokens > 0 => format!(", ctx={tokens}"),
        _ => String::new(),
    };
    let name = if !model.name.is_empty() && model.name != model.id {
        format!(" - {}", model.name)
    } else {
        String::new()
    };
    format!(
        "- `{}`{name} (policy={policy}, {capabilities}{context})",
        model.id
    )
}

#[async_trait]
impl Tool for ModelsTool {
    async fn run(&mut self) -> Result<ToolOutput> {
        info!(force_refresh = self.force_refresh, "Listing Copilot models");
        let listing = match &self.ctx.catalog {
            Some(catalog) => catalog.models(self.force_refresh).await,
            None => Err(anyhow::anyhow!("no live model catalog is configured")),
        };
        let comment = match listing {
            Ok(models) => format_models_comment(&models, Utc::now()),
            Err(e) => {
                error!(error = %format!("{e:#}"), "Failed to list Copilot models");
                format!("{HEADING}\n\n{FAILURE_HINTS}")
            }
        };

        publish(&self.ctx, &comment).await?;
        Ok(ToolOutput::Text(comment))
    }
}
