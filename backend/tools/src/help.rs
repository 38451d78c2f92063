//! `help`: the commands this assistant understands.

use anyhow::Result;
use async_trait::async_trait;

use prforge_commands::ToolContext;
use prforge_core::{Tool, ToolOutput};

use crate::output::publish;

/// Commands listed in the help comment, in display order.
pub const COMMAND_HELP: &[(&str, &str)] = &[
    ("review", "Review the changes: bugs, security issues, missing tests."),
    ("describe", "Write a title and summary for the pull request."),
    ("ask", "Answer a free-form question about the changes."),
    ("models", "List the models available to this account (`--refresh` skips the cache)."),
    ("config", "Show the effective configuration, credentials masked."),
    ("help", "Show this message."),
];

pub struct HelpTool {
    ctx: ToolContext,
}

impl HelpTool {
    pub fn build(ctx: ToolContext) -> Result<Box<dyn Tool>> {
        Ok(Box::new(Self { ctx }))
    }
}

pub fn help_comment() -> String {
    let mut lines = vec![
        "## Available commands".to_string(),
        String::new(),
        "| Command | Description |".to_string(),
        "|---|---|".to_string(),
    ];
    lines.extend(
        COMMAND_HELP
            .iter()
            .map(|(name, description)| format!("| `/{name}` | {description} |")),
    );
    lines.push(String::new());
    lines.push(
        "Any command accepts a model name as its first argument, e.g. `/review gpt-5.2-codex`, \
         and `--section.key=value` overrides for a single run."
            .to_string(),
    );
    lines.join("\n")
}

#[async_trait]
impl Tool for HelpTool {
    async fn run(&mut self) -> Result<ToolOutput> {
        let comment = help_comment();
        publish(&self.ctx, &comment).await?;
        Ok(ToolOutput::Text(comment))
    }
}
