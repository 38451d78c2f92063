use thiserror::Error;

/// Top-level error type for the prforge pipeline.
#[derive(Debug, Error)]
pub enum PrForgeError {
    #[error("backend startup failed: {0}")]
    BackendStartup(String),

    #[error("CLI argument for param '{0}' is forbidden")]
    ForbiddenArgument(String),

    #[error("unknown command: {0}")]
    UnknownCommand(String),
}

/// Failure of a single generation call, surfaced to the tool layer.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("{backend} inference failed: {message}")]
    Failed { backend: String, message: String },

    #[error("{backend} inference timed out after {secs}s")]
    Timeout { backend: String, secs: u64 },

    #[error("{backend} returned an empty response")]
    EmptyResponse { backend: String },

    #[error("no model configured")]
    NoModel,
}

impl GenerationError {
    pub fn failed(backend: impl Into<String>, message: impl ToString) -> Self {
        Self::Failed {
            backend: backend.into(),
            message: message.to_string(),
        }
    }
}
