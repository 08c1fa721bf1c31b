//! Scoped key/value state for a module session.
//!
//! Two independent scopes: `screen` resets to the incoming screen's declared
//! initial state on every navigation; `module` persists for the life of the
//! session and is never implicitly cleared.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Which state scope a read or write targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StateScope {
    Screen,
    Module,
}

impl Default for StateScope {
    fn default() -> Self {
        Self::Screen
    }
}

impl std::fmt::Display for StateScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Screen => write!(f, "screen"),
            Self::Module => write!(f, "module"),
        }
    }
}

/// Two scoped JSON maps. No transactions; every write is immediately visible
/// to subsequent reads. Callers are responsible for ordering.
#[derive(Debug, Default, Clone)]
pub struct StateStore {
    screen: HashMap<String, Value>,
    module: HashMap<String, Value>,
}

impl StateStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn scope_map(&self, scope: StateScope) -> &HashMap<String, Value> {
        match scope {
            StateScope::Screen => &self.screen,
            StateScope::Module => &self.module,
        }
    }

    fn scope_map_mut(&mut self, scope: StateScope) -> &mut HashMap<String, Value> {
        match scope {
            StateScope::Screen => &mut self.screen,
            StateScope::Module => &mut self.module,
        }
    }

    /// Resolve a dotted path against a scope. Returns `None` if any segment
    /// is missing or the value at an intermediate segment is not an object.
    pub fn get(&self, scope: StateScope, path: &str) -> Option<&Value> {
        let mut segments = path.split('.');
        let first = segments.next()?;
        let mut current = self.scope_map(scope).get(first)?;
        for segment in segments {
            current = current.as_object()?.get(segment)?;
        }
        Some(current)
    }

    /// Shallow-merge top-level keys into a scope. Non-recursive: an existing
    /// nested object is overwritten wholesale, not merged into.
    pub fn merge(&mut self, scope: StateScope, updates: &Value) {
        let Some(map) = updates.as_object() else {
            tracing::warn!(scope = %scope, "Ignoring non-object state update");
            return;
        };
        let target = self.scope_map_mut(scope);
        for (key, value) in map {
            target.insert(key.clone(), value.clone());
        }
    }

    /// Set a single top-level key in a scope.
    pub fn set(&mut self, scope: StateScope, key: &str, value: Value) {
        self.scope_map_mut(scope).insert(key.to_string(), value);
    }

    /// Replace a scope's contents with an initial snapshot. Used for the
    /// `screen` scope on every screen activation.
    pub fn reset(&mut self, scope: StateScope, initial: &Value) {
        let target = self.scope_map_mut(scope);
        target.clear();
        if let Some(map) = initial.as_object() {
            for (key, value) in map {
                target.insert(key.clone(), value.clone());
            }
        }
    }

    /// Snapshot a scope as a JSON object (for renderers).
    pub fn snapshot(&self, scope: StateScope) -> Value {
        Value::Object(
            self.scope_map(scope)
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        )
    }
}
