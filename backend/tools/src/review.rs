//! `review`: a review of the pull request diff.
//!
//! Also backs `answer` (the author replied to earlier review questions) and
//! `auto_review` (triggered by an event rather than a person).

use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::info;

use prforge_commands::ToolContext;
use prforge_core::{Tool, ToolOutput};

use crate::generation::{clip_to_budget, generate};
use crate::output::{generation_failure, publish, system_prompt};

const HEADING: &str = "## PR Reviewer Guide";

const SYSTEM: &str = "You are a senior engineer reviewing a pull request. \
Identify bugs, security issues and missing tests in the changed code. \
Reference file names and keep each finding short.";

pub struct ReviewTool {
    ctx: ToolContext,
}

impl ReviewTool {
    pub fn build(ctx: ToolContext) -> Result<Box<dyn Tool>> {
        Ok(Box::new(Self { ctx }))
    }

    fn user_prompt(&self, title: &str, diff: &str) -> String {
        let mut prompt = format!(
            "PR title: {title}\n\nDiff:\n```diff\n{}\n```",
            clip_to_budget(diff, &self.ctx.settings)
        );
        let notes = self.ctx.args.join(" ");
        if !notes.trim().is_empty() {
            if self.ctx.flags.is_answer {
                prompt.push_str(&format!(
                    "\n\nThe author answered earlier review questions:\n{notes}"
                ));
            } else {
                prompt.push_str(&format!("\n\nReviewer request: {notes}"));
            }
        }
        prompt
    }
}

#[async_trait]
impl Tool for ReviewTool {
    async fn run(&mut self) -> Result<ToolOutput> {
        info!(
            answer = self.ctx.flags.is_answer,
            auto = self.ctx.flags.is_auto,
            "Reviewing PR"
        );
        let title = self.ctx.provider.title().await.context("Failed to read PR title")?;
        let diff = self.ctx.provider.diff().await.context("Failed to read PR diff")?;

        let system = system_prompt(
            SYSTEM,
            self.ctx.settings.pr_reviewer.extra_instructions.as_deref(),
        );
        let comment = match generate(&self.ctx, &system, &self.user_prompt(&title, &diff)).await {
            Ok(completion) => format!("{HEADING}\n\n{}", completion.text),
            Err(e) => generation_failure(HEADING, &e),
        };

        publish(&self.ctx, &comment).await?;
        Ok(ToolOutput::Text(comment))
    }
}
