//! `prforge-handlers` — text-generation backends.
//!
//! - [`BackendRegistry`] maps `config.ai_handler` to a [`HandlerKind`]
//! - [`LiteLlmHandler`] talks to a LiteLLM proxy
//! - [`SessionManager`] owns the Copilot client, catalog and sessions

pub mod copilot;
pub mod providers;
pub mod registry;

pub use copilot::{HttpConnector, SessionManager};
pub use providers::LiteLlmHandler;
pub use registry::{BackendHandlers, BackendRegistry, HandlerKind};
