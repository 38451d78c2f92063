//! Response-language injection into tool instructions.
//!
//! Standing effect: once a non-default locale is observed, every section with
//! extra instructions carries the locale directive for the rest of the
//! process lifetime. Not rolled back with the model overlay.

use tracing::info;

use crate::defaults::DEFAULT_RESPONSE_LANGUAGE;
use crate::schema::Settings;

pub const INSTRUCTION_SEPARATOR: &str = "\n======\n\nIn addition, ";

pub fn language_directive(locale: &str) -> String {
    format!(
        "Your response MUST be written in the language corresponding to locale code: '{locale}'. This is crucial."
    )
}

/// Append the locale directive to each extra-instructions section.
///
/// Returns the names of the sections that changed. Idempotent: a section
/// already containing the directive is skipped.
pub fn inject_response_language(settings: &mut Settings) -> Vec<&'static str> {
    let locale = settings
        .config
        .response_language
        .clone()
        .unwrap_or_else(|| DEFAULT_RESPONSE_LANGUAGE.to_string());
    if locale.trim().eq_ignore_ascii_case(DEFAULT_RESPONSE_LANGUAGE) {
        return Vec::new();
    }

    let directive = language_directive(&locale);
    let mut changed = Vec::new();
    for (name, section) in settings.instruction_sections_mut() {
        let current = section.extra_instructions().unwrap_or_default().to_string();
        if current.contains(&directive) {
            continue;
        }
        let updated = if current.is_empty() {
            directive.clone()
        } else {
            format!("{current}{INSTRUCTION_SEPARATOR}{directive}")
        };
        section.set_extra_instructions(updated);
        changed.push(name);
    }
    if !changed.is_empty() {
        info!(locale = %locale, sections = ?changed, "Response language set; instructions updated");
    }
    changed
}
