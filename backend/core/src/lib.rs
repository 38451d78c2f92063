pub mod error;
pub mod traits;
pub mod types;

pub use error::{GenerationError, PrForgeError};
pub use prforge_config::ModelOverride;
pub use traits::{AiHandler, ModelCatalogSource, TargetProvider, Tool};
pub use types::{Command, Completion, CompletionRequest, FinishReason, ModelInfo, ToolOutput};
