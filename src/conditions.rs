//! Event condition evaluation.
//!
//! A condition list is a strict AND with short-circuit; the empty list is
//! true. Any failure during resolution or evaluation is caught, logged and
//! treated as false: conditions fail closed, never throw to the caller.

use serde_json::{Map, Value};
use tracing::warn;

use crate::document::EventConditions;
use crate::rules;
use crate::state::{StateScope, StateStore};

const MODULE_REF: &str = "$moduleData.";
const SCREEN_REF: &str = "$screenData.";

/// Evaluate a condition list against the current state.
pub fn evaluate(conditions: &[EventConditions], store: &StateStore) -> bool {
    conditions.iter().all(|condition| {
        let bindings = resolve_bindings(&condition.state, store);
        match rules::eval_truthy(&condition.rules, &bindings) {
            Ok(result) => result,
            Err(e) => {
                warn!(error = %e, "Condition evaluation failed; treating as false");
                false
            }
        }
    })
}

/// Resolve a condition's variable map: `$moduleData.` / `$screenData.`
/// string values become state lookups (missing paths resolve to null),
/// everything else is used literally.
fn resolve_bindings(declared: &Map<String, Value>, store: &StateStore) -> Map<String, Value> {
    declared
        .iter()
        .map(|(name, value)| (name.clone(), resolve_value(value, store)))
        .collect()
}

fn resolve_value(value: &Value, store: &StateStore) -> Value {
    let Some(s) = value.as_str() else {
        return value.clone();
    };
    let (scope, path) = if let Some(path) = s.strip_prefix(MODULE_REF) {
        (StateScope::Module, path)
    } else if let Some(path) = s.strip_prefix(SCREEN_REF) {
        (StateScope::Screen, path)
    } else {
        return value.clone();
    };
    store.get(scope, path.trim()).cloned().unwrap_or(Value::Null)
}
