/// Command table: command names to tool factories.
///
/// Two names may share a tool with different behaviour flags
/// (`answer` and `auto_review` both build the reviewer).
use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;

use prforge_config::Settings;
use prforge_core::{AiHandler, ModelCatalogSource, TargetProvider, Tool};

/// Behaviour variants of a shared tool.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ToolFlags {
    pub is_answer: bool,
    pub is_auto: bool,
}

/// Everything a tool is constructed with.
#[derive(Clone)]
pub struct ToolContext {
    pub target: String,
    pub handler: Arc<dyn AiHandler>,
    /// Live model catalog, when a backend with one is configured.
    pub catalog: Option<Arc<dyn ModelCatalogSource>>,
    pub provider: Arc<dyn TargetProvider>,
    pub args: Vec<String>,
    /// Request-scoped settings: global settings with the target layer,
    /// request arguments and the inline model applied.
    pub settings: Arc<Settings>,
    pub flags: ToolFlags,
}

pub trait ToolFactory: Send + Sync {
    fn build(&self, ctx: ToolContext) -> Result<Box<dyn Tool>>;
}

impl<F> ToolFactory for F
where
    F: Fn(ToolContext) -> Result<Box<dyn Tool>> + Send + Sync,
{
    fn build(&self, ctx: ToolContext) -> Result<Box<dyn Tool>> {
        self(ctx)
    }
}

#[derive(Clone)]
pub struct CommandEntry {
    pub factory: Arc<dyn ToolFactory>,
    pub flags: ToolFlags,
}

#[derive(Clone, Default)]
pub struct CommandTable {
    entries: HashMap<String, CommandEntry>,
}

impl CommandTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: impl Into<String>, factory: Arc<dyn ToolFactory>) {
        self.register_with_flags(name, factory, ToolFlags::default());
    }

    pub fn register_with_flags(
        &mut self,
        name: impl Into<String>,
        factory: Arc<dyn ToolFactory>,
        flags: ToolFlags,
    ) {
        self.entries.insert(name.into().to_lowercase(), CommandEntry { factory, flags });
    }

    /// Lookup by normalized name (no `/`, lowercase).
    pub fn get(&self, name: &str) -> Option<&CommandEntry> {
        self.entries.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}
