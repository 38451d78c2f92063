//! Settings defaults: fills the keys the dispatch pipeline relies on.

use std::time::Duration;

use crate::schema::Settings;

/// Backend key used when `config.ai_handler` is unset.
pub const DEFAULT_AI_HANDLER: &str = "litellm";

/// Locale that never triggers response-language injection.
pub const DEFAULT_RESPONSE_LANGUAGE: &str = "en-us";

/// Default generation timeout (seconds).
pub const DEFAULT_AI_TIMEOUT_SECS: f64 = 120.0;

/// Default bound on the catalog lookup used for override detection (seconds).
pub const DEFAULT_MODEL_LOOKUP_TIMEOUT_SECS: f64 = 10.0;

pub const DEFAULT_MODEL: &str = "gpt-5.2-2025-12-11";

pub const DEFAULT_FALLBACK_MODELS: &[&str] = &["o4-mini"];

pub const DEFAULT_TEMPERATURE: f64 = 0.2;

/// A timeout setting in seconds as a [`Duration`]. Negative and NaN values
/// become zero; values too large for a `Duration` saturate.
pub fn duration_from_secs(secs: f64) -> Duration {
    if secs.is_nan() || secs <= 0.0 {
        return Duration::ZERO;
    }
    Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX)
}

/// Apply all defaults to freshly loaded settings.
pub fn apply_all_defaults(settings: Settings) -> Settings {
    let settings = apply_core_defaults(settings);
    apply_logging_defaults(settings)
}

fn apply_core_defaults(mut settings: Settings) -> Settings {
    let core = &mut settings.config;
    if core.model.is_none() {
        core.model = Some(DEFAULT_MODEL.to_string());
    }
    if core.fallback_models.is_none() {
        core.fallback_models = Some(DEFAULT_FALLBACK_MODELS.iter().map(|m| m.to_string()).collect());
    }
    if core.ai_handler.is_none() {
        core.ai_handler = Some(DEFAULT_AI_HANDLER.to_string());
    }
    if core.ai_timeout.is_none() {
        core.ai_timeout = Some(DEFAULT_AI_TIMEOUT_SECS);
    }
    if core.response_language.is_none() {
        core.response_language = Some(DEFAULT_RESPONSE_LANGUAGE.to_string());
    }
    if core.publish_output.is_none() {
        core.publish_output = Some(true);
    }
    if core.temperature.is_none() {
        core.temperature = Some(DEFAULT_TEMPERATURE);
    }
    settings
}

fn apply_logging_defaults(mut settings: Settings) -> Settings {
    if settings.logging.level.is_none() {
        settings.logging.level = Some("info".to_string());
    }
    settings
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fill_unset_keys_only() {
        let mut settings = Settings::default();
        settings.config.model = Some("claude-opus-4.6".into());
        let settings = apply_all_defaults(settings);
        assert_eq!(settings.config.model.as_deref(), Some("claude-opus-4.6"));
        assert_eq!(settings.config.ai_handler.as_deref(), Some("litellm"));
        assert_eq!(settings.config.fallback_models, Some(vec!["o4-mini".to_string()]));
        assert_eq!(settings.config.publish_output, Some(true));
    }

    #[test]
    fn oversized_timeouts_saturate_instead_of_panicking() {
        assert_eq!(duration_from_secs(1e20), Duration::MAX);
        assert_eq!(duration_from_secs(f64::INFINITY), Duration::MAX);
        assert_eq!(duration_from_secs(-3.0), Duration::ZERO);
        assert_eq!(duration_from_secs(f64::NAN), Duration::ZERO);
        assert_eq!(duration_from_secs(1.5), Duration::from_millis(1500));
    }
}
