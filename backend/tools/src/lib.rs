//! `prforge-tools` — the tools behind each command.

pub mod ask;
pub mod config;
pub mod describe;
pub mod generation;
pub mod help;
pub mod models;
pub mod output;
pub mod review;

#[cfg(test)]
mod testing;

use std::sync::Arc;

use prforge_commands::{CommandTable, ToolFactory, ToolFlags};

pub use ask::AskTool;
pub use config::ConfigTool;
pub use describe::DescribeTool;
pub use help::HelpTool;
pub use models::ModelsTool;
pub use review::ReviewTool;

/// Command names and the tools they build.
pub fn default_command_table() -> CommandTable {
    let review: Arc<dyn ToolFactory> = Arc::new(ReviewTool::build);
    let describe: Arc<dyn ToolFactory> = Arc::new(DescribeTool::build);
    let ask: Arc<dyn ToolFactory> = Arc::new(AskTool::build);
    let config: Arc<dyn ToolFactory> = Arc::new(ConfigTool::build);

    let mut table = CommandTable::new();
    table.register_with_flags(
        "auto_review",
        review.clone(),
        ToolFlags {
            is_auto: true,
            ..Default::default()
        },
    );
    table.register_with_flags(
        "answer",
        review.clone(),
        ToolFlags {
            is_answer: true,
            ..Default::default()
        },
    );
    table.register("review", review.clone());
    table.register("review_pr", review);
    table.register("describe", describe.clone());
    table.register("describe_pr", describe);
    table.register("ask", ask.clone());
    table.register("ask_question", ask);
    table.register("config", config.clone());
    table.register("settings", config);
    table.register("help", Arc::new(HelpTool::build));
    table.register("models", Arc::new(ModelsTool::build));
    table
}
