//! Structured logging for prforge.
//!
//! Console output plus an optional rolling NDJSON file, and secret scrubbing
//! for values that end up in log fields.

pub mod logger;
pub mod redact;

pub use logger::{init_logger, LogOptions};
pub use redact::redact_sensitive_data;
