pub mod classifier;
pub mod dispatch;
pub mod model_limits;
pub mod registry;
pub mod target;
pub mod tokenize;

pub use classifier::{KNOWN_MODEL_PREFIXES, ModelNameClassifier, looks_like_model_name};
pub use dispatch::{Dispatcher, Notify};
pub use model_limits::{MAX_TOKENS, max_tokens_for};
pub use registry::{CommandEntry, CommandTable, ToolContext, ToolFactory, ToolFlags};
pub use target::{NoTargetSettings, TargetProviderFactory, TargetSettingsSource};
pub use tokenize::{Request, tokenize};
