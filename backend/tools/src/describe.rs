//! `describe`: a title and summary for the pull request.

use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::info;

use prforge_commands::ToolContext;
use prforge_core::{Tool, ToolOutput};

use crate::generation::{clip_to_budget, generate};
use crate::output::{generation_failure, publish, system_prompt};

const HEADING: &str = "## PR Description";

const SYSTEM: &str = "You write pull request descriptions. \
Give a one-line title, a short summary of what changed and why, \
and a list of the touched files with one sentence each.";

pub struct DescribeTool {
    ctx: ToolContext,
}

impl DescribeTool {
    pub fn build(ctx: ToolContext) -> Result<Box<dyn Tool>> {
        Ok(Box::new(Self { ctx }))
    }
}

#[async_trait]
impl Tool for DescribeTool {
    async fn run(&mut self) -> Result<ToolOutput> {
        info!("Generating PR description");
        let title = self.ctx.provider.title().await.context("Failed to read PR title")?;
        let diff = self.ctx.provider.diff().await.context("Failed to read PR diff")?;

        let system = system_prompt(
            SYSTEM,
            self.ctx.settings.pr_description.extra_instructions.as_deref(),
        );
        let user = format!(
            "Current title: {title}\n\nDiff:\n```diff\n{}\n```",
            clip_to_budget(&diff, &self.ctx.settings)
        );

        let comment = match generate(&self.ctx, &system, &user).await {
            Ok(completion) => format!("{HEADING}\n\n{}", completion.text),
            Err(e) => generation_failure(HEADING, &e),
        };
        publish(&self.ctx, &comment).await?;
        Ok(ToolOutput::Text(comment))
    }
}
