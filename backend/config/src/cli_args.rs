//! Command-line style arguments attached to a request.
//!
//! `--section.key=value` arguments override settings for one request; a
//! fixed set of sensitive keys may never be set this way.

use serde_json::Value;
use tracing::{info, warn};

use crate::io::{apply_merge_patch, patch_for_path};
use crate::schema::Settings;

/// Accept/reject decision over a request's remaining arguments.
pub trait ArgValidator: Send + Sync {
    /// `Err(name)` carries the forbidden parameter that was matched.
    fn validate(&self, args: &[String]) -> Result<(), String>;
}

/// Settings that may only come from configuration files, never from a comment.
const FORBIDDEN_CLI_ARGS: &[&str] = &[
    "enable_auto_approval",
    "approve_pr_on_self_review",
    "base_url",
    "url",
    "app_name",
    "secret_provider",
    "git_provider",
    "skip_keys",
    "openai.key",
    "analytics_folder",
    "uri",
    "app_id",
    "webhook_secret",
    "bearer_token",
    "personal_access_token",
    "override_deployment_type",
    "private_key",
    "local_cache_path",
    "enable_local_cache",
    "api_base",
    "api_type",
    "api_version",
    "api_key",
    "github_token",
    "cli_path",
    "cli_url",
    "provider_api_key",
    "provider_bearer_token",
    "mcp_servers",
    "skill_directories",
];

/// Rejects `--` arguments naming any forbidden setting.
#[derive(Debug, Clone)]
pub struct ForbiddenArgsValidator {
    forbidden: Vec<String>,
}

impl ForbiddenArgsValidator {
    pub fn new(forbidden: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            forbidden: forbidden.into_iter().map(Into::into).collect(),
        }
    }
}

impl Default for ForbiddenArgsValidator {
    fn default() -> Self {
        Self::new(FORBIDDEN_CLI_ARGS.iter().copied())
    }
}

impl ArgValidator for ForbiddenArgsValidator {
    fn validate(&self, args: &[String]) -> Result<(), String> {
        for arg in args.iter().filter(|a| a.starts_with("--")) {
            let word = arg.to_lowercase().replace("__", ".");
            for forbidden in &self.forbidden {
                let mut needle = forbidden.to_lowercase();
                if !needle.contains('.') {
                    needle.insert(0, '.');
                }
                if word.contains(&needle) {
                    return Err(forbidden.clone());
                }
            }
        }
        Ok(())
    }
}

/// Apply `--section.key=value` arguments to `settings`; return the rest.
///
/// Values are parsed as YAML scalars (`true`, `3`, `[a, b]`), falling back to
/// the raw string. Flags without `=` are kept as ordinary arguments.
pub fn update_settings_from_args(settings: &mut Settings, args: &[String]) -> Vec<String> {
    let mut remaining = Vec::new();
    for arg in args {
        let trimmed = arg.trim();
        let Some(body) = trimmed.strip_prefix("--") else {
            remaining.push(trimmed.to_string());
            continue;
        };
        let Some((key, raw_value)) = body.split_once('=') else {
            remaining.push(trimmed.to_string());
            continue;
        };
        let key = key.trim().to_lowercase().replace("__", ".");
        let value = parse_value(raw_value.trim());
        match apply_merge_patch(settings, &patch_for_path(&key, value.clone())) {
            Ok(updated) => {
                *settings = updated;
                info!(key = %key, value = %value, "Updated setting from request argument");
            }
            Err(e) => {
                warn!(key = %key, error = %e, "Ignoring request argument with invalid value");
            }
        }
    }
    remaining
}

fn parse_value(raw: &str) -> Value {
    serde_yaml::from_str::<Value>(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}
