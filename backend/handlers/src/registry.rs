//! Configured backend key to handler resolution.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::warn;

use prforge_config::Settings;
use prforge_core::{AiHandler, ModelCatalogSource};

/// The family a configured backend key belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandlerKind {
    LiteLlm,
    CopilotSdk,
}

impl HandlerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            HandlerKind::LiteLlm => "litellm",
            HandlerKind::CopilotSdk => "copilot_sdk",
        }
    }

    /// Whether the backend exposes a live model catalog that inline model
    /// names can be verified against.
    pub fn supports_live_catalog(&self) -> bool {
        matches!(self, HandlerKind::CopilotSdk)
    }
}

/// Immutable table of accepted `config.ai_handler` keys.
#[derive(Debug, Clone)]
pub struct BackendRegistry {
    bindings: HashMap<&'static str, HandlerKind>,
}

impl BackendRegistry {
    pub fn new() -> Self {
        let bindings = [
            ("litellm", HandlerKind::LiteLlm),
            ("copilot", HandlerKind::CopilotSdk),
            ("copilot_sdk", HandlerKind::CopilotSdk),
        ]
        .into_iter()
        .collect();
        Self { bindings }
    }

    /// Exact lookup of a normalized key.
    pub fn lookup(&self, key: &str) -> Option<HandlerKind> {
        self.bindings.get(key.trim().to_lowercase().as_str()).copied()
    }

    /// Resolve a configured key; unknown keys fall back to LiteLLM.
    pub fn resolve(&self, configured_key: &str) -> HandlerKind {
        let key = configured_key.trim().to_lowercase();
        let key = if key.is_empty() { "litellm".to_string() } else { key };
        match self.bindings.get(key.as_str()) {
            Some(kind) => *kind,
            None => {
                warn!(
                    ai_handler = %key,
                    "Unknown ai_handler, falling back to litellm"
                );
                HandlerKind::LiteLlm
            }
        }
    }
}

impl Default for BackendRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Live handler instances, one per kind, selected through the registry.
#[derive(Clone)]
pub struct BackendHandlers {
    registry: BackendRegistry,
    handlers: HashMap<HandlerKind, Arc<dyn AiHandler>>,
    catalogs: HashMap<HandlerKind, Arc<dyn ModelCatalogSource>>,
}

impl BackendHandlers {
    pub fn new(registry: BackendRegistry) -> Self {
        Self {
            registry,
            handlers: HashMap::new(),
            catalogs: HashMap::new(),
        }
    }

    pub fn with_handler(mut self, kind: HandlerKind, handler: Arc<dyn AiHandler>) -> Self {
        self.handlers.insert(kind, handler);
        self
    }

    pub fn with_catalog(mut self, kind: HandlerKind, catalog: Arc<dyn ModelCatalogSource>) -> Self {
        self.catalogs.insert(kind, catalog);
        self
    }

    pub fn registry(&self) -> &BackendRegistry {
        &self.registry
    }

    /// Kind selected by `config.ai_handler`.
    pub fn kind_for(&self, settings: &Settings) -> HandlerKind {
        self.registry.resolve(&settings.ai_handler_key())
    }

    /// Handler for `kind`, or the LiteLLM handler when that kind has no
    /// instance.
    pub fn handler_for_kind(&self, kind: HandlerKind) -> Option<Arc<dyn AiHandler>> {
        self.handlers
            .get(&kind)
            .or_else(|| self.handlers.get(&HandlerKind::LiteLlm))
            .cloned()
    }

    /// Live catalog for `kind`, only for verifiable backends.
    pub fn catalog_for(&self, kind: HandlerKind) -> Option<Arc<dyn ModelCatalogSource>> {
        if !kind.supports_live_catalog() {
            return None;
        }
        self.catalogs.get(&kind).cloned()
    }
}
