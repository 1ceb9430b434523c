//! `{{name}}` placeholder substitution.
//!
//! Every placeholder is looked up once against the store. Unknown names are
//! left exactly as written, and substituted text is never scanned again, so a
//! value that itself contains `{{...}}` comes through verbatim.

use crate::store::Lookup;
use regex::{Captures, Regex};
use std::sync::LazyLock;

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{(.*?)\}\}").expect("Invalid placeholder pattern"));

/// Render `template` against `values`.
pub fn render<L: Lookup + ?Sized>(template: &str, values: &L) -> String {
    PLACEHOLDER
        .replace_all(template, |caps: &Captures<'_>| {
            values
                .lookup(&caps[1])
                .unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

/// Names referenced by `template`, in order of appearance.
pub fn placeholders(template: &str) -> Vec<&str> {
    PLACEHOLDER
        .captures_iter(template)
        .filter_map(|caps| caps.get(1).map(|m| m.as_str()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::ValueStore;

    #[test]
    fn test_render_known_placeholder() {
        let store = ValueStore::seed([("name", "Bob")]);
        assert_eq!(render("hi {{name}}", &store), "hi Bob");
    }

    #[test]
    fn test_render_unknown_placeholder_is_kept() {
        let store = ValueStore::new();
        assert_eq!(render("hi {{name}}!", &store), "hi {{name}}!");
    }

    #[test]
    fn test_render_is_not_recursive() {
        let store = ValueStore::seed([("a", "{{b}}"), ("b", "nope")]);
        assert_eq!(render("{{a}}", &store), "{{b}}");
    }

    #[test]
    fn test_render_non_greedy_and_repeated() {
        let store = ValueStore::seed([("x", "1"), ("y", "2")]);
        assert_eq!(render("{{x}}-{{y}}-{{x}}", &store), "1-2-1");
    }

    #[test]
    fn test_render_uses_latest_value() {
        let mut store = ValueStore::seed([("x", "old")]);
        store.append("x", "new");
        assert_eq!(render("{{x}}", &store), "new");
    }

    #[test]
    fn test_render_key_with_spaces_is_literal() {
        let store = ValueStore::seed([(" padded ", "yes")]);
        assert_eq!(render("{{ padded }}", &store), "yes");
        assert_eq!(render("{{padded}}", &store), "{{padded}}");
    }

    #[test]
    fn test_placeholders() {
        assert_eq!(placeholders("{{a}} and {{b}}"), ["a", "b"]);
        assert!(placeholders("plain").is_empty());
    }
}
