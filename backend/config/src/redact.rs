//! Settings redaction: safe-to-display snapshots with secrets masked.

use serde_json::Value;

/// Keys whose string values are credentials.
static SECRET_KEYS: &[&str] = &[
    "api_key",
    "github_token",
    "provider_api_key",
    "provider_bearer_token",
    "bearer_token",
    "token",
    "secret",
    "password",
    "private_key",
];

/// Redact a settings value tree, masking every credential field.
///
/// The first four characters are kept as a hint for keys longer than that.
pub fn redact(value: &Value) -> Value {
    redact_recursive(value, "")
}

fn is_secret_key(key: &str) -> bool {
    SECRET_KEYS.iter().any(|k| k.eq_ignore_ascii_case(key))
}

fn redact_recursive(value: &Value, key: &str) -> Value {
    match value {
        Value::String(s) if is_secret_key(key) && !s.is_empty() => {
            let hint: String = if s.chars().count() > 4 {
                s.chars().take(4).collect()
            } else {
                String::new()
            };
            Value::String(format!("{hint}***"))
        }
        Value::Array(items) => Value::Array(items.iter().map(|v| redact_recursive(v, key)).collect()),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), redact_recursive(v, k)))
                .collect(),
        ),
        other => other.clone(),
    }
}
