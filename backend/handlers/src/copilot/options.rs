//! Client start-up options and per-call session configuration, both derived
//! from the `copilot` settings section.

use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::warn;

use prforge_config::schema::CopilotSection;
use prforge_config::{first_env_var, Settings, TOKEN_ENV_VARS};

const DEFAULT_SYSTEM_MESSAGE_MODE: &str = "append";

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ClientOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cli_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cli_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cwd: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub github_token: Option<String>,
    pub auto_start: bool,
    pub auto_restart: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub use_stdio: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub use_logged_in_user: Option<bool>,
}

impl ClientOptions {
    /// Resolve options from settings and the process environment.
    pub fn from_settings(section: &CopilotSection) -> Self {
        Self::from_settings_with(section, first_env_var)
    }

    /// Same as [`ClientOptions::from_settings`] with an injectable token lookup.
    pub fn from_settings_with(
        section: &CopilotSection,
        token_lookup: impl Fn(&[&str]) -> Option<String>,
    ) -> Self {
        let mut options = ClientOptions {
            cli_path: non_empty(&section.cli_path).and_then(|p| {
                let resolved = resolve_cli_path(&p);
                if resolved.is_none() {
                    warn!(
                        cli_path = %p,
                        "Configured copilot.cli_path was not found; using the bundled CLI"
                    );
                }
                resolved.map(|r| r.display().to_string())
            }),
            cli_url: non_empty(&section.cli_url),
            cwd: non_empty(&section.cwd),
            log_level: non_empty(&section.log_level),
            github_token: non_empty(&section.github_token).or_else(|| token_lookup(TOKEN_ENV_VARS)),
            auto_start: section.auto_start.unwrap_or(true),
            auto_restart: section.auto_restart.unwrap_or(true),
            ..Default::default()
        };

        if options.cli_url.is_some() {
            options.cli_path = None;
            options.github_token = None;
        } else {
            options.port = section.port;
            options.use_stdio = Some(section.use_stdio.unwrap_or(true));
            options.use_logged_in_user = Some(section.use_logged_in_user.unwrap_or(true));
        }
        options
    }
}

/// Absolute paths must exist; bare names are looked up on `PATH`.
pub fn resolve_cli_path(cli_path: &str) -> Option<PathBuf> {
    let path = Path::new(cli_path);
    if path.is_absolute() || path.components().count() > 1 {
        return path.exists().then(|| path.to_path_buf());
    }
    let search = std::env::var_os("PATH")?;
    std::env::split_paths(&search)
        .map(|dir| dir.join(path))
        .find(|candidate| candidate.is_file())
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn non_empty_list(value: &Option<Vec<String>>) -> Option<Vec<String>> {
    let items: Vec<String> = value
        .iter()
        .flatten()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .collect();
    (!items.is_empty()).then_some(items)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SystemMessage {
    pub mode: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InfiniteSessions {
    pub enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub background_compaction_threshold: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub buffer_exhaustion_threshold: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AzureOptions {
    pub api_version: String,
}

/// Upstream model provider used instead of Copilot's own.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProviderOverride {
    #[serde(rename = "type")]
    pub kind: String,
    pub base_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bearer_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wire_api: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub azure: Option<AzureOptions>,
}

/// Configuration for one generation session. Unset optional settings are
/// left out entirely.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionConfig {
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning_effort: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_message: Option<SystemMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub available_tools: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub excluded_tools: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub working_directory: Option<String>,
    pub infinite_sessions: InfiniteSessions,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<ProviderOverride>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mcp_servers: Option<Map<String, Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skill_directories: Option<Vec<String>>,
}

impl SessionConfig {
    /// `reasoning_effort` from the request wins over `config.reasoning_effort`.
    pub fn build(
        settings: &Settings,
        model: &str,
        system: &str,
        reasoning_effort: Option<&str>,
    ) -> Self {
        let copilot = &settings.copilot;

        let reasoning_effort = reasoning_effort
            .map(str::to_string)
            .or_else(|| settings.config.reasoning_effort.clone())
            .filter(|r| !r.trim().is_empty());

        let system_message = (!system.is_empty()).then(|| SystemMessage {
            mode: non_empty(&copilot.system_message_mode)
                .unwrap_or_else(|| DEFAULT_SYSTEM_MESSAGE_MODE.to_string()),
            content: system.to_string(),
        });

        let available_tools = non_empty_list(&copilot.available_tools);
        let excluded_tools = if available_tools.is_some() {
            None
        } else {
            non_empty_list(&copilot.excluded_tools)
        };

        let enabled = copilot.infinite_sessions_enabled.unwrap_or(false);
        let infinite_sessions = InfiniteSessions {
            enabled,
            background_compaction_threshold: copilot
                .background_compaction_threshold
                .filter(|_| enabled),
            buffer_exhaustion_threshold: copilot.buffer_exhaustion_threshold.filter(|_| enabled),
        };

        let provider = match (
            non_empty(&copilot.provider_type),
            non_empty(&copilot.provider_base_url),
        ) {
            (Some(kind), Some(base_url)) => Some(ProviderOverride {
                kind,
                base_url,
                api_key: non_empty(&copilot.provider_api_key),
                bearer_token: non_empty(&copilot.provider_bearer_token),
                wire_api: non_empty(&copilot.provider_wire_api),
                azure: non_empty(&copilot.provider_azure_api_version)
                    .map(|api_version| AzureOptions { api_version }),
            }),
            _ => None,
        };

        SessionConfig {
            model: model.to_string(),
            reasoning_effort,
            system_message,
            available_tools,
            excluded_tools,
            working_directory: non_empty(&copilot.working_directory),
            infinite_sessions,
            provider,
            mcp_servers: copilot.mcp_servers.clone().filter(|m| !m.is_empty()),
            skill_directories: non_empty_list(&copilot.skill_directories),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn no_token(_: &[&str]) -> Option<String> {
        None
    }

    #[test]
    fn defaults_without_cli_url() {
        let options = ClientOptions::from_settings_with(&CopilotSection::default(), no_token);
        assert!(options.auto_start);
        assert!(options.auto_restart);
        assert_eq!(options.use_stdio, Some(true));
        assert_eq!(options.use_logged_in_user, Some(true));
        assert!(options.cli_path.is_none());
        assert!(options.github_token.is_none());
    }

    #[test]
    fn token_falls_back_to_environment() {
        let options = ClientOptions::from_settings_with(&CopilotSection::default(), |names| {
            assert_eq!(names, TOKEN_ENV_VARS);
            Some("ghu_env".to_string())
        });
        assert_eq!(options.github_token.as_deref(), Some("ghu_env"));

        let section = CopilotSection {
            github_token: Some("ghu_cfg".into()),
            ..Default::default()
        };
        let options = ClientOptions::from_settings_with(&section, |_| Some("ghu_env".into()));
        assert_eq!(options.github_token.as_deref(), Some("ghu_cfg"));
    }

    #[test]
    fn cli_url_drops_local_process_options() {
        let exe = std::env::current_exe().unwrap().display().to_string();
        let section = CopilotSection {
            cli_url: Some("localhost:4321".into()),
            cli_path: Some(exe),
            github_token: Some("ghu_cfg".into()),
            port: Some(9000),
            auto_restart: Some(false),
            ..Default::default()
        };
        let options = ClientOptions::from_settings_with(&section, no_token);
        assert_eq!(options.cli_url.as_deref(), Some("localhost:4321"));
        assert!(options.cli_path.is_none());
        assert!(options.github_token.is_none());
        assert!(options.port.is_none());
        assert!(options.use_stdio.is_none());
        assert!(!options.auto_restart);
    }

    #[test]
    fn cli_path_must_exist() {
        let exe = std::env::current_exe().unwrap();
        let section = CopilotSection {
            cli_path: Some(exe.display().to_string()),
            ..Default::default()
        };
        let options = ClientOptions::from_settings_with(&section, no_token);
        assert_eq!(options.cli_path, Some(exe.display().to_string()));

        let section = CopilotSection {
            cli_path: Some("/definitely/not/here/copilot".into()),
            ..Default::default()
        };
        assert!(ClientOptions::from_settings_with(&section, no_token).cli_path.is_none());
    }

    #[test]
    fn minimal_session_config() {
        let config = SessionConfig::build(&Settings::default(), "gpt-4.1", "", None);
        assert_eq!(
            serde_json::to_value(&config).unwrap(),
            json!({"model": "gpt-4.1", "infinite_sessions": {"enabled": false}})
        );
    }

    #[test]
    fn full_session_config() {
        let mut settings = Settings::default();
        settings.config.reasoning_effort = Some("medium".into());
        let copilot = &mut settings.copilot;
        copilot.available_tools = Some(vec!["read".into()]);
        copilot.excluded_tools = Some(vec!["shell".into()]);
        copilot.working_directory = Some("/repo".into());
        copilot.infinite_sessions_enabled = Some(true);
        copilot.background_compaction_threshold = Some(0.8);
        copilot.provider_type = Some("azure".into());
        copilot.provider_base_url = Some("https://example.openai.azure.com".into());
        copilot.provider_azure_api_version = Some("2024-10-21".into());
        copilot.mcp_servers = Some(
            json!({"fs": {"command": "mcp-fs"}})
                .as_object()
                .cloned()
                .unwrap(),
        );
        copilot.skill_directories = Some(vec!["skills".into()]);

        let config = SessionConfig::build(&settings, "gpt-5", "be brief", Some("high"));
        let value = serde_json::to_value(&config).unwrap();
        assert_eq!(value["reasoning_effort"], "high");
        assert_eq!(value["system_message"], json!({"mode": "append", "content": "be brief"}));
        assert_eq!(value["available_tools"], json!(["read"]));
        assert!(value.get("excluded_tools").is_none());
        assert_eq!(
            value["infinite_sessions"],
            json!({"enabled": true, "background_compaction_threshold": 0.8})
        );
        assert_eq!(
            value["provider"],
            json!({
                "type": "azure",
                "base_url": "https://example.openai.azure.com",
                "azure": {"api_version": "2024-10-21"}
            })
        );
        assert_eq!(value["mcp_servers"]["fs"]["command"], "mcp-fs");
        assert_eq!(value["skill_directories"], json!(["skills"]));
    }

    #[test]
    fn provider_needs_type_and_base_url() {
        let mut settings = Settings::default();
        settings.copilot.provider_type = Some("openai".into());
        settings.copilot.infinite_sessions_enabled = Some(false);
        settings.copilot.buffer_exhaustion_threshold = Some(0.95);
        let config = SessionConfig::build(&settings, "m", "", None);
        assert!(config.provider.is_none());
        assert!(config.infinite_sessions.buffer_exhaustion_threshold.is_none());
    }
}
