//! `prforge-config` — runtime settings for the prforge pipeline.
//!
//! Provides:
//! - Typed settings schema with lenient value coercion
//! - YAML loading with `${ENV_VAR}` substitution and defaults
//! - The process-wide settings store and the scoped model overlay
//! - Response-language injection into tool instructions
//! - Request-argument validation and `--section.key=value` overrides
//! - Redaction for safe display

pub mod cli_args;
pub mod defaults;
pub mod env;
pub mod io;
pub mod language;
pub mod overlay;
pub mod redact;
pub mod schema;
pub mod store;
pub mod validation;

pub use cli_args::{update_settings_from_args, ArgValidator, ForbiddenArgsValidator};
pub use defaults::apply_all_defaults;
pub use env::{first_env_var, resolve_env_vars, resolve_env_vars_with, MissingEnvVarError, TOKEN_ENV_VARS};
pub use io::{apply_merge_patch, config_dir, config_file_path, load_raw_settings, patch_for_path};
pub use language::{inject_response_language, language_directive};
pub use overlay::{apply_model_override, ModelOverride, OverlayGuard, SettingsOverlay};
pub use redact::redact;
pub use schema::{coerce_bool, coerce_list, ExtraInstructions, Settings};
pub use store::SettingsStore;
pub use validation::{validate, SettingsValidationError, ValidationReport};

use anyhow::{Context, Result};
use std::path::Path;

/// Load, apply env substitution and defaults, and validate a settings file.
///
/// This is the main entry point for loading settings at startup.
pub async fn load_and_prepare(path: &Path) -> Result<Settings> {
    let raw = load_raw_settings(path).await?;
    let value = resolve_env_vars(&raw).context("Failed to resolve env vars in settings")?;

    let settings: Settings =
        serde_json::from_value(value).context("Failed to deserialize settings")?;
    let settings = apply_all_defaults(settings);

    let report = validate(&settings);
    for warning in &report.warnings {
        tracing::warn!(path = %warning.path, message = %warning.message, "Settings warning");
    }
    for error in &report.errors {
        tracing::error!(path = %error.path, message = %error.message, "Settings error");
    }
    if !report.is_valid() {
        anyhow::bail!("{} invalid setting(s) in {}", report.errors.len(), path.display());
    }

    Ok(settings)
}
