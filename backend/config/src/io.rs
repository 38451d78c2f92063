//! Settings file reading and JSON merge patching.

use crate::schema::Settings;
use anyhow::{Context, Result};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

const SETTINGS_FILE_NAME: &str = "config.yaml";

/// Resolve the prforge settings directory.
/// Priority: `PRFORGE_CONFIG_DIR` env > `~/.prforge/` > `./.prforge`
pub fn config_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("PRFORGE_CONFIG_DIR") {
        return PathBuf::from(dir);
    }
    dirs::home_dir()
        .map(|home| home.join(".prforge"))
        .unwrap_or_else(|| PathBuf::from(".prforge"))
}

pub fn config_file_path(config_dir: &Path) -> PathBuf {
    config_dir.join(SETTINGS_FILE_NAME)
}

/// Read the settings file as an untyped value tree.
///
/// A missing file yields an empty object (first run).
pub async fn load_raw_settings(path: &Path) -> Result<Value> {
    if !path.exists() {
        debug!(path = %path.display(), "Settings file does not exist; using defaults");
        return Ok(Value::Object(Default::default()));
    }

    let raw = fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read settings file: {}", path.display()))?;

    let value: Value = serde_yaml::from_str(&raw)
        .with_context(|| format!("Failed to parse settings YAML at: {}", path.display()))?;

    info!(path = %path.display(), "Loaded settings");
    Ok(if value.is_null() {
        Value::Object(Default::default())
    } else {
        value
    })
}

/// Patch settings with a JSON Merge Patch (RFC 7396).
pub fn apply_merge_patch(settings: &Settings, patch: &Value) -> Result<Settings> {
    let mut value =
        serde_json::to_value(settings).context("Failed to serialize settings for merge patch")?;
    json_merge_patch(&mut value, patch);
    serde_json::from_value(value).context("Failed to deserialize settings after merge patch")
}

/// Build a merge patch that sets one dotted key (`section.key`) to `value`.
pub fn patch_for_path(dotted_key: &str, value: Value) -> Value {
    dotted_key
        .split('.')
        .rev()
        .fold(value, |inner, segment| {
            let mut map = serde_json::Map::new();
            map.insert(segment.to_string(), inner);
            Value::Object(map)
        })
}

fn json_merge_patch(target: &mut Value, patch: &Value) {
    let Value::Object(patch_map) = patch else {
        *target = patch.clone();
        return;
    };
    if !target.is_object() {
        *target = Value::Object(Default::default());
    }
    if let Value::Object(target_map) = target {
        for (key, patch_val) in patch_map {
            if patch_val.is_null() {
                target_map.remove(key);
            } else {
                let entry = target_map.entry(key.clone()).or_insert(Value::Null);
                json_merge_patch(entry, patch_val);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn merge_patch_sets_nested_key() {
        let base = Settings::default();
        let patched = apply_merge_patch(&base, &patch_for_path("config.model", json!("o3"))).unwrap();
        assert_eq!(patched.config.model.as_deref(), Some("o3"));
    }

    #[test]
    fn merge_patch_null_removes_key() {
        let mut base = Settings::default();
        base.config.reasoning_effort = Some("high".into());
        let patched =
            apply_merge_patch(&base, &json!({"config": {"reasoning_effort": null}})).unwrap();
        assert!(patched.config.reasoning_effort.is_none());
    }

    #[tokio::test]
    async fn missing_file_loads_as_empty_object() {
        let dir = tempfile::tempdir().unwrap();
        let value = load_raw_settings(&dir.path().join("config.yaml")).await.unwrap();
        assert_eq!(value, json!({}));
    }
}
