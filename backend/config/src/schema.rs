//! prforge runtime settings schema.
//!
//! One struct per configuration section, typed for serde YAML/JSON. Every
//! key is optional; `defaults.rs` fills the ones the pipeline relies on.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

// ---------------------------------------------------------------------------
// Top-level settings
// ---------------------------------------------------------------------------

/// Root settings document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Model selection, backend key, timeouts, language.
    pub config: CoreSection,

    /// Copilot client and session settings.
    pub copilot: CopilotSection,

    /// LiteLLM-compatible proxy settings.
    pub litellm: LiteLlmSection,

    pub pr_reviewer: ToolSection,
    pub pr_description: ToolSection,
    pub pr_questions: ToolSection,
    pub pr_code_suggestions: ToolSection,

    pub logging: LoggingSection,
}

impl Settings {
    /// Every section that accepts free-form extra instructions, by name.
    pub fn instruction_sections_mut(&mut self) -> Vec<(&'static str, &mut dyn ExtraInstructions)> {
        let sections: [(&'static str, &mut dyn ExtraInstructions); 4] = [
            ("pr_reviewer", &mut self.pr_reviewer),
            ("pr_description", &mut self.pr_description),
            ("pr_questions", &mut self.pr_questions),
            ("pr_code_suggestions", &mut self.pr_code_suggestions),
        ];
        sections.into_iter().collect()
    }

    /// Configured backend key, trimmed and lowercased.
    pub fn ai_handler_key(&self) -> String {
        self.config
            .ai_handler
            .as_deref()
            .unwrap_or(crate::defaults::DEFAULT_AI_HANDLER)
            .trim()
            .to_lowercase()
    }
}

/// Capability of a section to carry appended instructions for the model.
pub trait ExtraInstructions {
    fn extra_instructions(&self) -> Option<&str>;
    fn set_extra_instructions(&mut self, value: String);
}

// ---------------------------------------------------------------------------
// [config]
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreSection {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    #[serde(deserialize_with = "flex_list", skip_serializing_if = "Option::is_none")]
    pub fallback_models: Option<Vec<String>>,

    /// Backend key: "litellm" | "copilot" | "copilot_sdk"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ai_handler: Option<String>,

    /// Seconds.
    #[serde(deserialize_with = "flex_f64", skip_serializing_if = "Option::is_none")]
    pub ai_timeout: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_language: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning_effort: Option<String>,

    #[serde(deserialize_with = "flex_bool", skip_serializing_if = "Option::is_none")]
    pub publish_output: Option<bool>,

    #[serde(deserialize_with = "flex_f64", skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
}

// ---------------------------------------------------------------------------
// [copilot]
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CopilotSection {
    // Client connection
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
    #[serde(deserialize_with = "flex_bool", skip_serializing_if = "Option::is_none")]
    pub auto_start: Option<bool>,
    #[serde(deserialize_with = "flex_bool", skip_serializing_if = "Option::is_none")]
    pub auto_restart: Option<bool>,
    #[serde(deserialize_with = "flex_u64", skip_serializing_if = "Option::is_none")]
    pub port: Option<u64>,
    #[serde(deserialize_with = "flex_bool", skip_serializing_if = "Option::is_none")]
    pub use_stdio: Option<bool>,
    #[serde(deserialize_with = "flex_bool", skip_serializing_if = "Option::is_none")]
    pub use_logged_in_user: Option<bool>,

    /// Per-call generation timeout in seconds; falls back to `config.ai_timeout`.
    #[serde(deserialize_with = "flex_f64", skip_serializing_if = "Option::is_none")]
    pub timeout: Option<f64>,
    /// Bound on the catalog lookup done while detecting inline model overrides.
    #[serde(deserialize_with = "flex_f64", skip_serializing_if = "Option::is_none")]
    pub model_lookup_timeout: Option<f64>,

    // Session
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_message_mode: Option<String>,
    #[serde(deserialize_with = "flex_list", skip_serializing_if = "Option::is_none")]
    pub available_tools: Option<Vec<String>>,
    #[serde(deserialize_with = "flex_list", skip_serializing_if = "Option::is_none")]
    pub excluded_tools: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub working_directory: Option<String>,
    #[serde(deserialize_with = "flex_bool", skip_serializing_if = "Option::is_none")]
    pub infinite_sessions_enabled: Option<bool>,
    #[serde(deserialize_with = "flex_f64", skip_serializing_if = "Option::is_none")]
    pub background_compaction_threshold: Option<f64>,
    #[serde(deserialize_with = "flex_f64", skip_serializing_if = "Option::is_none")]
    pub buffer_exhaustion_threshold: Option<f64>,

    // Upstream provider override
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider_base_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider_api_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider_bearer_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider_wire_api: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider_azure_api_version: Option<String>,

    /// MCP server descriptors keyed by server name, passed through as-is.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mcp_servers: Option<Map<String, Value>>,
    #[serde(deserialize_with = "flex_list", skip_serializing_if = "Option::is_none")]
    pub skill_directories: Option<Vec<String>>,
}

// ---------------------------------------------------------------------------
// [litellm]
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LiteLlmSection {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_base: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

// ---------------------------------------------------------------------------
// Tool sections
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolSection {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extra_instructions: Option<String>,
}

impl ExtraInstructions for ToolSection {
    fn extra_instructions(&self) -> Option<&str> {
        self.extra_instructions.as_deref()
    }

    fn set_extra_instructions(&mut self, value: String) {
        self.extra_instructions = Some(value);
    }
}

// ---------------------------------------------------------------------------
// [logging]
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
    /// Directory for the rolling NDJSON log; console only when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_dir: Option<String>,
    #[serde(deserialize_with = "flex_bool", skip_serializing_if = "Option::is_none")]
    pub json: Option<bool>,
}

// ---------------------------------------------------------------------------
// Lenient value coercion
// ---------------------------------------------------------------------------

/// Interpret a loosely typed value as a bool ("1", "true", "yes", "on").
pub fn coerce_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Null => None,
        Value::Bool(b) => Some(*b),
        Value::String(s) => Some(matches!(
            s.trim().to_lowercase().as_str(),
            "1" | "true" | "yes" | "on"
        )),
        Value::Number(n) => Some(n.as_f64().is_some_and(|f| f != 0.0)),
        Value::Array(items) => Some(!items.is_empty()),
        Value::Object(map) => Some(!map.is_empty()),
    }
}

/// Interpret a loosely typed value as a list of non-empty trimmed strings.
///
/// Accepts real lists, JSON-array strings and comma-separated strings.
pub fn coerce_list(value: &Value) -> Vec<String> {
    match value {
        Value::Null => Vec::new(),
        Value::Array(items) => items.iter().filter_map(non_empty_string).collect(),
        Value::String(s) => {
            let stripped = s.trim();
            if stripped.is_empty() {
                return Vec::new();
            }
            if stripped.starts_with('[') {
                if let Ok(Value::Array(items)) = serde_json::from_str::<Value>(stripped) {
                    return items.iter().filter_map(non_empty_string).collect();
                }
            }
            stripped
                .split(',')
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
                .collect()
        }
        other => non_empty_string(other).into_iter().collect(),
    }
}

fn non_empty_string(value: &Value) -> Option<String> {
    let s = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Null => return None,
        other => other.to_string(),
    };
    (!s.is_empty()).then_some(s)
}

fn coerce_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn flex_bool<'de, D: Deserializer<'de>>(d: D) -> Result<Option<bool>, D::Error> {
    let value = Option::<Value>::deserialize(d)?;
    Ok(value.as_ref().and_then(coerce_bool))
}

fn flex_list<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Vec<String>>, D::Error> {
    let value = Option::<Value>::deserialize(d)?;
    Ok(value.filter(|v| !v.is_null()).map(|v| coerce_list(&v)))
}

fn flex_f64<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
    let value = Option::<Value>::deserialize(d)?;
    Ok(value.as_ref().and_then(coerce_f64))
}

fn flex_u64<'de, D: Deserializer<'de>>(d: D) -> Result<Option<u64>, D::Error> {
    let value = Option::<Value>::deserialize(d)?;
    Ok(value
        .as_ref()
        .and_then(coerce_f64)
        .filter(|f| *f >= 0.0)
        .map(|f| f as u64))
}
