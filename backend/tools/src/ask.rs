//! `ask`: answer a free-form question about the pull request.

use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::info;

use prforge_commands::ToolContext;
use prforge_core::{Tool, ToolOutput};

use crate::generation::{clip_to_budget, generate};
use crate::output::{generation_failure, publish, system_prompt};

const SYSTEM: &str = "You answer questions about a pull request. \
Base the answer on the diff; say so when the diff does not contain the answer.";

pub struct AskTool {
    ctx: ToolContext,
}

impl AskTool {
    pub fn build(ctx: ToolContext) -> Result<Box<dyn Tool>> {
        Ok(Box::new(Self { ctx }))
    }

    fn question(&self) -> String {
        self.ctx.args.join(" ").trim().to_string()
    }
}

#[async_trait]
impl Tool for AskTool {
    async fn run(&mut self) -> Result<ToolOutput> {
        let question = self.question();
        if question.is_empty() {
            let comment = "Please provide a question, for example `/ask What does this change fix?`";
            publish(&self.ctx, comment).await?;
            return Ok(ToolOutput::Text(comment.to_string()));
        }
        info!(question = %question, "Answering question");

        let title = self.ctx.provider.title().await.context("Failed to read PR title")?;
        let diff = self.ctx.provider.diff().await.context("Failed to read PR diff")?;
        let system = system_prompt(
            SYSTEM,
            self.ctx.settings.pr_questions.extra_instructions.as_deref(),
        );
        let user = format!(
            "PR title: {title}\n\nDiff:\n```diff\n{}\n```\n\nQuestion: {question}",
            clip_to_budget(&diff, &self.ctx.settings)
        );

        let heading = format!("### Question\n\n{question}\n\n### Answer");
        let comment = match generate(&self.ctx, &system, &user).await {
            Ok(completion) => format!("{heading}\n\n{}", completion.text),
            Err(e) => generation_failure(&heading, &e),
        };
        publish(&self.ctx, &comment).await?;
        Ok(ToolOutput::Text(comment))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{context_for, FakeProvider, ScriptedHandler};
    use prforge_config::Settings;

    fn settings() -> Settings {
        let mut settings = Settings::default();
        settings.config.model = Some("gpt-4.1".into());
        settings
    }

    #[tokio::test]
    async fn answers_joined_question() {
        let provider = FakeProvider::with_diff("+retry(3)");
        let handler = ScriptedHandler::failing_for(&[]);
        let ctx = context_for(
            provider.clone(),
            settings(),
            handler.clone(),
            vec!["why is this failing?".into()],
        );

        AskTool::build(ctx).unwrap().run().await.unwrap();
        assert!(handler
            .last_request()
            .unwrap()
            .user
            .ends_with("Question: why is this failing?"));
        let comment = &provider.comments()[0];
        assert!(comment.starts_with("### Question\n\nwhy is this failing?"));
        assert!(comment.ends_with("reply from gpt-4.1"));
    }

    #[tokio::test]
    async fn empty_question_asks_for_one() {
        let provider = FakeProvider::with_diff("");
        let handler = ScriptedHandler::failing_for(&[]);
        let ctx = context_for(provider.clone(), settings(), handler.clone(), vec![]);

        AskTool::build(ctx).unwrap().run().await.unwrap();
        assert!(handler.models_called().is_empty());
        assert!(provider.comments()[0].starts_with("Please provide a question"));
    }
}
