//! Host-facing surfaces: service extension point, terminal signals and the
//! shared wrapper that serializes concurrent trigger sources.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use crate::config::TriggerPolicy;
use crate::engine::dispatcher::{DispatchOutcome, Engine};
use crate::error::ServiceError;

/// Extension point for `serviceCall` actions. The engine has no built-in
/// service implementation; a host wires one up, or service calls degrade to
/// recorded no-ops.
///
/// Synchronous by design: dispatch runs to completion before control returns
/// to the caller, so handlers must resolve inline (hosts bridge to async
/// work themselves, replying via a later trigger or state update).
pub trait ServiceHandler: Send + Sync {
    fn call(
        &self,
        service: &str,
        function: &str,
        parameters: &Value,
    ) -> Result<Value, ServiceError>;
}

/// A terminal signal surfaced to the host application, which is responsible
/// for actually ending the session.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ModuleSignal {
    #[serde(rename_all = "camelCase")]
    CloseModule {
        flow_completed: bool,
        parameters: Value,
        raised_at: DateTime<Utc>,
    },
    #[serde(rename_all = "camelCase")]
    Custom {
        name: String,
        parameters: Value,
        raised_at: DateTime<Utc>,
    },
}

/// Mutex-serialized engine for hosts with two independent asynchronous
/// trigger sources (UI interaction and the voice/tool channel). The engine
/// itself assumes single-writer semantics; this wrapper provides them.
#[derive(Clone)]
pub struct SharedEngine {
    inner: Arc<Mutex<Engine>>,
    policy: TriggerPolicy,
}

impl SharedEngine {
    pub fn new(engine: Engine) -> Self {
        let policy = engine.config().trigger_policy;
        Self {
            inner: Arc::new(Mutex::new(engine)),
            policy,
        }
    }

    /// Trigger an event, serialized against other callers. Under
    /// [`TriggerPolicy::Drop`], a trigger arriving while a dispatch is in
    /// flight is discarded with a diagnostic and `None` is returned.
    pub fn trigger_event(&self, event_id: &str) -> Option<DispatchOutcome> {
        match self.policy {
            TriggerPolicy::Queue => {
                let mut engine = self.inner.lock().unwrap_or_else(|e| e.into_inner());
                Some(engine.trigger_event(event_id))
            }
            TriggerPolicy::Drop => match self.inner.try_lock() {
                Ok(mut engine) => Some(engine.trigger_event(event_id)),
                Err(_) => {
                    warn!(event = %event_id, "Dropping trigger: dispatch already in flight");
                    None
                }
            },
        }
    }

    /// Run a closure against the engine under the lock (activation, renderer
    /// reads, wiring).
    pub fn with<R>(&self, f: impl FnOnce(&mut Engine) -> R) -> R {
        let mut engine = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut engine)
    }
}
