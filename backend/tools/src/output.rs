//! Shared prompt and comment plumbing for the tools.

use anyhow::{Context, Result};
use prforge_commands::ToolContext;
use prforge_core::GenerationError;
use tracing::info;

/// Publish `body` on the target and drop the placeholder comment, unless
/// `config.publish_output` is off.
pub async fn publish(ctx: &ToolContext, body: &str) -> Result<()> {
    if !ctx.settings.config.publish_output.unwrap_or(true) {
        info!(target_url = %ctx.target, "publish_output disabled, comment not published");
        return Ok(());
    }
    ctx.provider
        .publish_comment(body)
        .await
        .context("Failed to publish comment")?;
    ctx.provider
        .remove_initial_comment()
        .await
        .context("Failed to remove initial comment")?;
    Ok(())
}

pub fn system_prompt(base: &str, extra_instructions: Option<&str>) -> String {
    match extra_instructions.map(str::trim).filter(|e| !e.is_empty()) {
        Some(extra) => format!("{base}\n\nExtra instructions from the user:\n{extra}"),
        None => base.to_string(),
    }
}

/// User-visible text for a failed generation.
pub fn generation_failure(heading: &str, err: &GenerationError) -> String {
    format!("{heading}\n\nFailed to generate a response: {err}")
}
