//! `{{name}}` placeholder substitution.
//!
//! Placeholders may carry surrounding spaces (`{{ name }}`). Unknown names
//! are left verbatim so a missing field is visible on the printed label.

use std::collections::HashMap;

/// Names produced by [`builtin_variables`].
const BUILTIN_NAMES: &[&str] = &[
    "date",
    "date_short",
    "day",
    "time",
    "time_12h",
    "datetime",
    "year",
    "iso_date",
];

/// Date and time variables available to every template.
pub fn builtin_variables() -> HashMap<String, String> {
    use chrono::Local;

    let now = Local::now();
    let mut vars = HashMap::new();

    vars.insert("date".into(), now.format("%B %-d, %Y").to_string()); // January 27, 2026
    vars.insert("date_short".into(), now.format("%b %-d").to_string()); // Jan 27
    vars.insert("day".into(), now.format("%A").to_string()); // Monday
    vars.insert("time".into(), now.format("%H:%M").to_string()); // 09:30
    vars.insert("time_12h".into(), now.format("%-I:%M %p").to_string()); // 9:30 AM
    vars.insert("datetime".into(), now.format("%a, %b %-d %H:%M").to_string());
    vars.insert("year".into(), now.format("%Y").to_string());
    vars.insert("iso_date".into(), now.format("%Y-%m-%d").to_string()); // 2026-01-27

    vars
}

pub fn is_builtin_variable(name: &str) -> bool {
    BUILTIN_NAMES.contains(&name)
}

/// Placeholder names in first-use order, without duplicates.
pub fn placeholders(text: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    scan(text, |name| {
        if !names.iter().any(|n| n == name) {
            names.push(name.to_string());
        }
        None
    });
    names
}

/// Replace placeholders using `lookup`; unresolved ones stay as written.
pub fn interpolate(text: &str, lookup: impl FnMut(&str) -> Option<String>) -> String {
    scan(text, lookup)
}

/// Walk `text`, calling `lookup` for each placeholder and splicing in the
/// replacement when there is one.
fn scan(text: &str, mut lookup: impl FnMut(&str) -> Option<String>) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(start) = rest.find("{{") {
        let after = &rest[start + 2..];
        let Some(end) = after.find("}}") else {
            break;
        };
        out.push_str(&rest[..start]);

        let raw = &after[..end];
        let name = raw.trim();
        let valid = !name.is_empty()
            && name
                .chars()
                .all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.'));

        match valid.then(|| lookup(name)).flatten() {
            Some(value) => out.push_str(&value),
            None => {
                out.push_str("{{");
                out.push_str(raw);
                out.push_str("}}");
            }
        }
        rest = &after[end + 2..];
    }

    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup(name: &str) -> Option<String> {
        match name {
            "name" => Some("Milk".to_string()),
            "qty" => Some("2".to_string()),
            _ => None,
        }
    }

    #[test]
    fn test_interpolate_known_and_unknown() {
        assert_eq!(
            interpolate("{{name}} x{{ qty }} ({{missing}})", lookup),
            "Milk x2 ({{missing}})"
        );
        assert_eq!(interpolate("no placeholders", lookup), "no placeholders");
        assert_eq!(interpolate("dangling {{name", lookup), "dangling {{name");
    }

    #[test]
    fn test_placeholders_dedup_in_order() {
        assert_eq!(
            placeholders("{{b}} {{a}} {{ b }} {{}}"),
            vec!["b".to_string(), "a".to_string()]
        );
    }

    #[test]
    fn test_builtin_variables() {
        let vars = builtin_variables();
        for name in BUILTIN_NAMES {
            assert!(vars.contains_key(*name), "missing builtin {}", name);
        }
        assert_eq!(vars["year"].len(), 4);
        assert!(is_builtin_variable("iso_date"));
        assert!(!is_builtin_variable("name"));
    }
}
