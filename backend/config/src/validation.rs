//! Settings validation: cross-field checks reported as warnings or errors.

use crate::schema::Settings;
use thiserror::Error;

const KNOWN_HANDLERS: &[&str] = &["litellm", "copilot", "copilot_sdk"];

#[derive(Debug, Error)]
#[error("settings validation error at '{path}': {message}")]
pub struct SettingsValidationError {
    pub path: String,
    pub message: String,
}

#[derive(Debug, Default)]
pub struct ValidationReport {
    pub errors: Vec<SettingsValidationError>,
    pub warnings: Vec<SettingsValidationError>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    fn error(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.errors.push(SettingsValidationError {
            path: path.into(),
            message: message.into(),
        });
    }

    fn warn(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(SettingsValidationError {
            path: path.into(),
            message: message.into(),
        });
    }
}

pub fn validate(settings: &Settings) -> ValidationReport {
    let mut report = ValidationReport::default();
    validate_core(settings, &mut report);
    validate_copilot(settings, &mut report);
    report
}

fn validate_core(settings: &Settings, report: &mut ValidationReport) {
    let key = settings.ai_handler_key();
    if !KNOWN_HANDLERS.contains(&key.as_str()) {
        report.warn(
            "config.ai_handler",
            format!("Unknown handler '{key}'; requests will use 'litellm'"),
        );
    }
    if let Some(t) = settings.config.ai_timeout {
        if t <= 0.0 {
            report.error("config.ai_timeout", "ai_timeout must be > 0");
        }
    }
    if settings.config.model.as_deref().is_some_and(|m| m.trim().is_empty()) {
        report.error("config.model", "model cannot be empty");
    }
}

fn validate_copilot(settings: &Settings, report: &mut ValidationReport) {
    let c = &settings.copilot;
    if c.timeout.is_some_and(|t| t <= 0.0) {
        report.error("copilot.timeout", "timeout must be > 0");
    }
    if c.cli_url.is_some() && c.cli_path.is_some() {
        report.warn("copilot.cli_path", "Ignored because copilot.cli_url is set");
    }
    if c.provider_type.is_some() != c.provider_base_url.is_some() {
        report.warn(
            "copilot.provider_type",
            "provider_type and provider_base_url must both be set for a provider override",
        );
    }
    let has_available = c.available_tools.as_ref().is_some_and(|t| !t.is_empty());
    let has_excluded = c.excluded_tools.as_ref().is_some_and(|t| !t.is_empty());
    if has_available && has_excluded {
        report.warn("copilot.excluded_tools", "Ignored because available_tools is set");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_settings_are_valid() {
        let report = validate(&Settings::default());
        assert!(report.is_valid(), "errors: {:?}", report.errors);
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn half_configured_provider_override_warns() {
        let mut settings = Settings::default();
        settings.copilot.provider_type = Some("openai".into());
        let report = validate(&settings);
        assert!(report.is_valid());
        assert_eq!(report.warnings[0].path, "copilot.provider_type");
    }

    #[test]
    fn unknown_handler_warns() {
        let mut settings = Settings::default();
        settings.config.ai_handler = Some("does-not-exist".into());
        let report = validate(&settings);
        assert!(report.warnings.iter().any(|w| w.path == "config.ai_handler"));
    }
}
