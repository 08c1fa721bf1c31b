//! Document data model.
//!
//! Consumed, not authored, by the engine: the builder UI produces these
//! structures as JSON. Optional fields are materialized to concrete defaults
//! by serde so the runtime never does conditional defaulting.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::state::StateScope;

fn empty_object() -> Value {
    Value::Object(Map::new())
}

/// A full screen document as published by the authoring tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScreenDocument {
    pub screens: Vec<Screen>,
}

impl ScreenDocument {
    /// Find a screen by id.
    pub fn screen(&self, id: &str) -> Option<&Screen> {
        self.screens.iter().find(|s| s.id == id)
    }

    /// Position of a screen in document order.
    pub fn position(&self, id: &str) -> Option<usize> {
        self.screens.iter().position(|s| s.id == id)
    }
}

/// One screen: the unit of navigation. Its declared `state` re-seeds the
/// screen scope on every activation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Screen {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default = "empty_object")]
    pub state: Value,
    #[serde(default)]
    pub sections: Vec<Section>,
    #[serde(default)]
    pub events: Vec<ScreenEvent>,
}

impl Screen {
    /// Look up an event by id: the screen's own list first, then all
    /// elements' events flattened in section order then element order.
    /// First match wins; screen scope shadows element scope.
    pub fn find_event(&self, id: &str) -> Option<&ScreenEvent> {
        self.events
            .iter()
            .find(|e| e.id == id)
            .or_else(|| self.element_events().find(|e| e.id == id))
    }

    /// All element-level events in flatten order.
    pub fn element_events(&self) -> impl Iterator<Item = &ScreenEvent> {
        self.sections
            .iter()
            .flat_map(|s| s.elements.iter())
            .flat_map(|e| e.events.iter())
    }
}

/// Where a section sits on the screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SectionPosition {
    Top,
    Body,
    Bottom,
}

impl Default for SectionPosition {
    fn default() -> Self {
        Self::Body
    }
}

/// Structural grouping of elements. Not interpreted by the engine except
/// when flattening element events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Section {
    pub id: String,
    #[serde(default)]
    pub position: SectionPosition,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layout: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direction: Option<String>,
    #[serde(default)]
    pub elements: Vec<Element>,
}

/// A renderable element. `state` and `style` are opaque to the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Element {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default = "empty_object")]
    pub state: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<Value>,
    #[serde(default)]
    pub events: Vec<ScreenEvent>,
}

/// A named, conditionally-gated, ordered list of actions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScreenEvent {
    pub id: String,
    /// Trigger-type tag (tap, voice, …). Bookkeeping only; the engine does
    /// not interpret it.
    #[serde(rename = "type", default)]
    pub trigger: String,
    #[serde(default)]
    pub conditions: Vec<EventConditions>,
    #[serde(rename = "action", default)]
    pub actions: Vec<EventAction>,
}

/// A rule expression plus the variable bindings it is evaluated against.
/// Binding values are literals or `$moduleData.<path>` / `$screenData.<path>`
/// state references.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventConditions {
    pub rules: Value,
    #[serde(default)]
    pub state: Map<String, Value>,
}

/// One executable action. Every variant carries its own optional condition
/// list, evaluated independently of the event-level conditions.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum EventAction {
    #[serde(rename_all = "camelCase")]
    Navigation {
        deeplink: String,
        #[serde(default)]
        conditions: Vec<EventConditions>,
    },
    #[serde(rename_all = "camelCase")]
    StateUpdate {
        #[serde(default)]
        scope: StateScope,
        #[serde(default = "empty_object")]
        updates: Value,
        #[serde(default)]
        conditions: Vec<EventConditions>,
    },
    #[serde(rename_all = "camelCase")]
    ToolCall {
        tool: String,
        #[serde(default = "empty_object")]
        params: Value,
        #[serde(default)]
        conditions: Vec<EventConditions>,
    },
    #[serde(rename_all = "camelCase")]
    ServiceCall {
        service_name: String,
        function_name: String,
        #[serde(default = "empty_object")]
        parameters: Value,
        /// Map of state key → dotted path into the service response.
        #[serde(default)]
        response_mapping: Map<String, Value>,
        #[serde(default)]
        on_success: Vec<EventAction>,
        #[serde(default)]
        on_error: Vec<EventAction>,
        #[serde(default)]
        conditions: Vec<EventConditions>,
    },
    #[serde(rename_all = "camelCase")]
    CloseModule {
        #[serde(default)]
        flow_completed: bool,
        #[serde(default = "empty_object")]
        parameters: Value,
        #[serde(default)]
        conditions: Vec<EventConditions>,
    },
    #[serde(rename_all = "camelCase")]
    Custom {
        name: String,
        #[serde(default = "empty_object")]
        parameters: Value,
        #[serde(default)]
        conditions: Vec<EventConditions>,
    },
}

impl EventAction {
    /// The action's own condition list.
    pub fn conditions(&self) -> &[EventConditions] {
        match self {
            Self::Navigation { conditions, .. }
            | Self::StateUpdate { conditions, .. }
            | Self::ToolCall { conditions, .. }
            | Self::ServiceCall { conditions, .. }
            | Self::CloseModule { conditions, .. }
            | Self::Custom { conditions, .. } => conditions,
        }
    }

    /// Variant tag, for diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Navigation { .. } => "navigation",
            Self::StateUpdate { .. } => "stateUpdate",
            Self::ToolCall { .. } => "toolCall",
            Self::ServiceCall { .. } => "serviceCall",
            Self::CloseModule { .. } => "closeModule",
            Self::Custom { .. } => "custom",
        }
    }
}
