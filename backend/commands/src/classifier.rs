/// Inline model override detection.
///
/// `/review gpt-5.2-codex` carries a model name as its first argument. The
/// name is confirmed against the live catalog when the configured backend
/// has one, and otherwise recognised by shape.
use std::time::Duration;

use tracing::debug;

use prforge_config::defaults::{duration_from_secs, DEFAULT_MODEL_LOOKUP_TIMEOUT_SECS};
use prforge_core::{ModelCatalogSource, ModelOverride};
use prforge_handlers::BackendHandlers;

use crate::model_limits::is_known_model;

/// Identifier prefixes of recognised model families.
pub const KNOWN_MODEL_PREFIXES: &[&str] = &[
    "gpt-", "claude-", "o1", "o3", "o4", "gemini-", "grok-", "deepseek", "mistral", "llama",
    "qwen", "codestral",
];

/// Shape check used when no catalog confirmed the candidate.
pub fn looks_like_model_name(value: &str) -> bool {
    let candidate = value.trim().to_lowercase();
    if candidate.is_empty() || candidate.starts_with("--") || candidate.contains(char::is_whitespace) {
        return false;
    }
    if is_known_model(&candidate) {
        return true;
    }
    if KNOWN_MODEL_PREFIXES.iter().any(|p| candidate.starts_with(p)) {
        return true;
    }
    candidate.contains('/') && candidate.contains('-')
}

pub struct ModelNameClassifier {
    handlers: BackendHandlers,
    lookup_timeout: Duration,
}

impl ModelNameClassifier {
    pub fn new(handlers: BackendHandlers) -> Self {
        Self {
            handlers,
            lookup_timeout: duration_from_secs(DEFAULT_MODEL_LOOKUP_TIMEOUT_SECS),
        }
    }

    pub fn with_lookup_timeout(mut self, timeout: Duration) -> Self {
        self.lookup_timeout = timeout;
        self
    }

    /// Split a leading model name off `args`.
    ///
    /// Never fails: catalog errors and timeouts fall through to the shape
    /// check.
    pub async fn extract_override(
        &self,
        args: &[String],
        configured_key: &str,
    ) -> (Option<ModelOverride>, Vec<String>) {
        let Some(first) = args.first() else {
            return (None, Vec::new());
        };
        let candidate = first.trim();
        if candidate.is_empty() || candidate.starts_with("--") {
            return (None, args.to_vec());
        }

        if self.is_in_live_catalog(candidate, configured_key).await {
            return (
                Some(ModelOverride {
                    id: candidate.to_string(),
                    verified: true,
                }),
                args[1..].to_vec(),
            );
        }

        if looks_like_model_name(candidate) {
            return (
                Some(ModelOverride {
                    id: candidate.to_string(),
                    verified: false,
                }),
                args[1..].to_vec(),
            );
        }
        (None, args.to_vec())
    }

    async fn is_in_live_catalog(&self, candidate: &str, configured_key: &str) -> bool {
        let Some(kind) = self.handlers.registry().lookup(configured_key) else {
            return false;
        };
        let Some(catalog) = self.handlers.catalog_for(kind) else {
            return false;
        };

        match tokio::time::timeout(self.lookup_timeout, catalog.model_ids(false)).await {
            Ok(Ok(ids)) => ids.iter().any(|id| id == candidate),
            Ok(Err(e)) => {
                debug!(error = %e, "Failed to fetch models for inline model override detection");
                false
            }
            Err(_) => {
                debug!(
                    timeout_ms = self.lookup_timeout.as_millis() as u64,
                    "Model lookup for inline override detection timed out"
                );
                false
            }
        }
    }
}
