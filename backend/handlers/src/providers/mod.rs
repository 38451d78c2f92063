pub mod litellm;
pub mod wire;

pub use litellm::LiteLlmHandler;
