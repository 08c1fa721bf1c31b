//! Tool bridge between the engine and the voice/tool layer.
//!
//! `toolCall` actions are published over a broadcast channel so any number
//! of subscribers (the voice layer, loggers, tests) can observe them.
//! Gesture-sensitive tools additionally invoke a registered synchronous
//! callback inside the dispatch call stack: some host platforms only grant
//! privileged capabilities when requested within the same synchronous stack
//! as the originating user gesture, and a channel hop loses that context.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tokio::sync::broadcast;
use tracing::debug;

/// A published tool call.
#[derive(Debug, Clone, Serialize)]
pub struct ToolCallMessage {
    pub tool: String,
    pub params: Value,
    pub published_at: DateTime<Utc>,
}

type GestureCallback = Box<dyn Fn(&str, &Value) + Send + Sync>;

/// Broadcast hub for tool calls, with synchronous overrides for
/// gesture-sensitive tools.
pub struct ToolBridge {
    tx: broadcast::Sender<ToolCallMessage>,
    gesture_callbacks: HashMap<String, GestureCallback>,
}

impl std::fmt::Debug for ToolBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolBridge")
            .field("subscribers", &self.tx.receiver_count())
            .field(
                "gesture_tools",
                &self.gesture_callbacks.keys().collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl ToolBridge {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self {
            tx,
            gesture_callbacks: HashMap::new(),
        }
    }

    /// Subscribe to tool-call publications.
    pub fn subscribe(&self) -> broadcast::Receiver<ToolCallMessage> {
        self.tx.subscribe()
    }

    /// Register a synchronous callback for a gesture-sensitive tool. The
    /// callback runs inside the dispatch call stack and must not call back
    /// into the engine.
    pub fn register_gesture_callback<F>(&mut self, tool: &str, callback: F)
    where
        F: Fn(&str, &Value) + Send + Sync + 'static,
    {
        self.gesture_callbacks
            .insert(tool.to_string(), Box::new(callback));
    }

    /// Dispatch a tool call: run the gesture callback if one is registered
    /// for this tool, then publish to subscribers. Publishing to zero
    /// subscribers is not an error.
    pub fn dispatch(&self, tool: &str, params: &Value) {
        if let Some(callback) = self.gesture_callbacks.get(tool) {
            debug!(tool = %tool, "Invoking synchronous gesture callback");
            callback(tool, params);
        }
        let message = ToolCallMessage {
            tool: tool.to_string(),
            params: params.clone(),
            published_at: Utc::now(),
        };
        if self.tx.send(message).is_err() {
            debug!(tool = %tool, "No tool bridge subscribers for publication");
        }
    }
}
