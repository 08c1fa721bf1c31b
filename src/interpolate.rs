//! Template interpolation for author-visible text.
//!
//! Substitutes `{$moduleData.<path>}` / `{$screenData.<path>}` tokens (and
//! their double-brace aliases) with stringified state values. Unresolved
//! references are left verbatim: partially-populated state must not silently
//! corrupt author-visible text. Idempotent on its own output.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use crate::state::{StateScope, StateStore};

static TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{?\$(moduleData|screenData)\.([^{}]+)\}\}?").expect("valid token pattern")
});

/// Interpolate all state references in `input` against the store.
pub fn interpolate(input: &str, store: &StateStore) -> String {
    TOKEN
        .replace_all(input, |caps: &regex::Captures<'_>| {
            let scope = match &caps[1] {
                "moduleData" => StateScope::Module,
                _ => StateScope::Screen,
            };
            let path = caps[2].trim();
            match store.get(scope, path) {
                Some(value) => stringify(value),
                // Missing reference: keep the token verbatim
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

/// Interpolate every string leaf of a JSON value, in place of the original.
/// Used for outbound tool/service parameters.
pub fn interpolate_value(value: &Value, store: &StateStore) -> Value {
    match value {
        Value::String(s) => Value::String(interpolate(s, store)),
        Value::Array(items) => {
            Value::Array(items.iter().map(|v| interpolate_value(v, store)).collect())
        }
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), interpolate_value(v, store)))
                .collect(),
        ),
        other => other.clone(),
    }
}

fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
