//! Local pull-request target: comments go to stdout, the diff and title
//! come from the command line.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::Value;
use tokio::fs;
use tokio::io::{AsyncWriteExt, Stdout};
use tokio::sync::Mutex;
use tracing::debug;

use prforge_commands::{TargetProviderFactory, TargetSettingsSource};
use prforge_core::TargetProvider;

/// Where comment bodies are written.
pub type CommentSink = Arc<Mutex<dyn tokio::io::AsyncWrite + Send + Unpin>>;

pub fn stdout_sink() -> CommentSink {
    let out: Arc<Mutex<Stdout>> = Arc::new(Mutex::new(tokio::io::stdout()));
    out
}

pub struct LocalTarget {
    url: String,
    title: Option<String>,
    diff_file: Option<PathBuf>,
    sink: CommentSink,
}

#[async_trait]
impl TargetProvider for LocalTarget {
    async fn publish_comment(&self, body: &str) -> Result<()> {
        let mut sink = self.sink.lock().await;
        sink.write_all(body.as_bytes()).await?;
        sink.write_all(b"\n").await?;
        sink.flush().await?;
        Ok(())
    }

    async fn remove_initial_comment(&self) -> Result<()> {
        Ok(())
    }

    async fn title(&self) -> Result<String> {
        Ok(self.title.clone().unwrap_or_else(|| self.url.clone()))
    }

    async fn diff(&self) -> Result<String> {
        match &self.diff_file {
            Some(path) => fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read diff file: {}", path.display())),
            None => Ok(String::new()),
        }
    }
}

/// Builds a [`LocalTarget`] for whichever URL a request names.
pub struct LocalTargetFactory {
    pub title: Option<String>,
    pub diff_file: Option<PathBuf>,
    pub sink: CommentSink,
}

impl TargetProviderFactory for LocalTargetFactory {
    fn provider_for(&self, target: &str) -> Result<Arc<dyn TargetProvider>> {
        Ok(Arc::new(LocalTarget {
            url: target.to_string(),
            title: self.title.clone(),
            diff_file: self.diff_file.clone(),
            sink: self.sink.clone(),
        }))
    }
}

/// A repository-level settings file layered over the global settings.
pub struct RepoSettingsFile {
    pub path: PathBuf,
}

#[async_trait]
impl TargetSettingsSource for RepoSettingsFile {
    async fn settings_patch(&self, target: &str) -> Result<Option<Value>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let raw = fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("Failed to read repo settings: {}", self.path.display()))?;
        let patch: Value = serde_yaml::from_str(&raw)
            .with_context(|| format!("Failed to parse repo settings: {}", self.path.display()))?;
        debug!(path = %self.path.display(), url = %target, "Loaded repo settings");
        Ok((!patch.is_null()).then_some(patch))
    }
}
