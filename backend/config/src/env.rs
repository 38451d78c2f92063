//! Environment lookups for settings.
//!
//! `${VAR_NAME}` references in string values are resolved at load time.
//! Only uppercase `[A-Z_][A-Z0-9_]*` names are matched; `$${VAR}` escapes to
//! a literal `${VAR}`.

use anyhow::{bail, Result};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde_json::Value;
use std::collections::HashMap;

static ENV_VAR_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\$?)\$\{([A-Z_][A-Z0-9_]*)\}").unwrap());

/// Credential variables consulted, in order, when no token is configured.
pub const TOKEN_ENV_VARS: &[&str] = &["COPILOT_GITHUB_TOKEN", "GITHUB_TOKEN"];

#[derive(Debug, thiserror::Error)]
#[error("missing env var \"{var_name}\" referenced at settings path: {path}")]
pub struct MissingEnvVarError {
    pub var_name: String,
    pub path: String,
}

/// First non-empty value among `names`, in order.
pub fn first_env_var(names: &[&str]) -> Option<String> {
    first_env_var_with(names, |name| std::env::var(name).ok())
}

/// Same as [`first_env_var`] with an injectable lookup.
pub fn first_env_var_with(
    names: &[&str],
    lookup: impl Fn(&str) -> Option<String>,
) -> Option<String> {
    names
        .iter()
        .filter_map(|name| lookup(name))
        .find(|value| !value.trim().is_empty())
}

/// Substitute `${VAR}` references across a settings value tree.
pub fn resolve_env_vars(value: &Value) -> Result<Value> {
    resolve_env_vars_with(value, &std::env::vars().collect())
}

pub fn resolve_env_vars_with(value: &Value, env: &HashMap<String, String>) -> Result<Value> {
    substitute(value, env, "")
}

fn substitute(value: &Value, env: &HashMap<String, String>, path: &str) -> Result<Value> {
    match value {
        Value::String(s) => Ok(Value::String(substitute_string(s, env, path)?)),
        Value::Array(items) => items
            .iter()
            .enumerate()
            .map(|(i, v)| substitute(v, env, &format!("{path}[{i}]")))
            .collect::<Result<Vec<_>>>()
            .map(Value::Array),
        Value::Object(map) => {
            let mut out = serde_json::Map::new();
            for (key, child) in map {
                let child_path = if path.is_empty() {
                    key.clone()
                } else {
                    format!("{path}.{key}")
                };
                out.insert(key.clone(), substitute(child, env, &child_path)?);
            }
            Ok(Value::Object(out))
        }
        other => Ok(other.clone()),
    }
}

fn substitute_string(s: &str, env: &HashMap<String, String>, path: &str) -> Result<String> {
    if !s.contains("${") {
        return Ok(s.to_string());
    }
    let mut missing: Option<MissingEnvVarError> = None;
    let out = ENV_VAR_PATTERN.replace_all(s, |caps: &Captures| {
        let name = &caps[2];
        if !caps[1].is_empty() {
            return format!("${{{name}}}");
        }
        match env.get(name) {
            Some(v) if !v.is_empty() => v.clone(),
            _ => {
                missing.get_or_insert_with(|| MissingEnvVarError {
                    var_name: name.to_string(),
                    path: path.to_string(),
                });
                String::new()
            }
        }
    });
    if let Some(err) = missing {
        bail!(err);
    }
    Ok(out.into_owned())
}
