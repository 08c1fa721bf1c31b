//! Event dispatch and action execution.
//!
//! A two-state machine (idle/dispatching) with no persistent per-event state
//! beyond the state store. Dispatch is synchronous and single-writer: an
//! action list runs to completion before control returns to the caller, and
//! failures never escape `trigger_event` — every internal failure is caught
//! at the smallest possible scope and converted to a diagnostic so one bad
//! action cannot abort an otherwise-valid sequence or crash the host.

use chrono::Utc;
use serde_json::Value;
use tokio::sync::broadcast;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::conditions;
use crate::config::EngineConfig;
use crate::document::{self, EventAction, Screen, ScreenDocument};
use crate::engine::bridge::{ToolBridge, ToolCallMessage};
use crate::engine::host::{ModuleSignal, ServiceHandler};
use crate::error::{Error, Result};
use crate::interpolate;
use crate::navigation::{self, NEXT_SCREEN, NavigationStack, PREV_SCREEN};
use crate::state::{StateScope, StateStore};

/// Built-in tool: writes a module-scope answer key derived from a question
/// id, so the voice layer and later screens can read it back.
pub const TOOL_STORE_ANSWER: &str = "store_answer";
/// Built-in tool: marks the flow completed in module scope.
pub const TOOL_COMPLETE_FLOW: &str = "complete_flow";
/// Gesture-sensitive tool: hosts register a synchronous callback for it via
/// [`Engine::register_gesture_callback`].
pub const TOOL_ENABLE_MICROPHONE: &str = "enable_microphone";

const ANSWER_KEY_PREFIX: &str = "answer_";
const FLOW_COMPLETED_KEY: &str = "flowCompleted";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DispatchState {
    Idle,
    Dispatching,
}

/// What a single `trigger_event` call did.
#[derive(Debug, Clone, Default)]
pub struct DispatchOutcome {
    /// An event with the triggered id was found on the active screen.
    pub matched: bool,
    /// Actions whose conditions passed and whose effect was applied.
    pub actions_run: usize,
    /// Actions skipped by their own conditions, or unwired service calls.
    pub actions_skipped: usize,
    /// Actions that degraded to a no-op (unresolvable navigation, failed
    /// service call).
    pub actions_failed: usize,
    /// Terminal signals for the host (closeModule / custom).
    pub signals: Vec<ModuleSignal>,
}

/// The screen interaction engine for one module session.
pub struct Engine {
    session_id: Uuid,
    document: ScreenDocument,
    config: EngineConfig,
    store: StateStore,
    nav: NavigationStack,
    active: Option<usize>,
    bridge: ToolBridge,
    service_handler: Option<Box<dyn ServiceHandler>>,
    dispatch_state: DispatchState,
}

impl Engine {
    /// Build an engine over a document. Validation is fatal here: a session
    /// must never activate over a partially-valid document.
    pub fn new(document: ScreenDocument, config: EngineConfig) -> Result<Self> {
        document::normalize(&document)?;
        let bridge = ToolBridge::new(config.bridge_capacity);
        Ok(Self {
            session_id: Uuid::new_v4(),
            document,
            config,
            store: StateStore::new(),
            nav: NavigationStack::new(),
            active: None,
            bridge,
            service_handler: None,
            dispatch_state: DispatchState::Idle,
        })
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn document(&self) -> &ScreenDocument {
        &self.document
    }

    /// Activate a screen by id: the first stack entry and screen-state seed.
    pub fn activate(&mut self, screen_id: &str) -> Result<()> {
        let index = self
            .document
            .position(screen_id)
            .ok_or_else(|| Error::UnknownScreen {
                id: screen_id.to_string(),
            })?;
        let initial = self.document.screens[index].state.clone();
        self.nav.push(screen_id);
        self.active = Some(index);
        self.store.reset(StateScope::Screen, &initial);
        debug!(session = %self.session_id, screen = %screen_id, "Activated screen");
        Ok(())
    }

    /// The active screen, if a session has been activated.
    pub fn active_screen(&self) -> Option<&Screen> {
        self.active.map(|i| &self.document.screens[i])
    }

    /// Renderer snapshot of the screen scope.
    pub fn screen_state(&self) -> Value {
        self.store.snapshot(StateScope::Screen)
    }

    /// Renderer snapshot of the module scope.
    pub fn module_state(&self) -> Value {
        self.store.snapshot(StateScope::Module)
    }

    /// Direct state access for host wiring (seeding module state, tests).
    pub fn store(&self) -> &StateStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut StateStore {
        &mut self.store
    }

    /// Interpolate state references in display text for the renderer.
    pub fn interpolate(&self, text: &str) -> String {
        interpolate::interpolate(text, &self.store)
    }

    /// Navigation history, oldest first.
    pub fn history(&self) -> &[String] {
        self.nav.entries()
    }

    /// Host back-navigation: pop the stack and re-activate the revealed
    /// screen, re-seeding screen state. A no-op on the first-activated
    /// screen; returns whether anything changed.
    pub fn go_back(&mut self) -> bool {
        if self.nav.pop().is_none() {
            return false;
        }
        let Some(index) = self
            .nav
            .current()
            .and_then(|id| self.document.position(id))
        else {
            warn!("Navigation history entry missing from document; staying put");
            return false;
        };
        let initial = self.document.screens[index].state.clone();
        self.active = Some(index);
        self.store.reset(StateScope::Screen, &initial);
        debug!(depth = self.nav.len(), "Navigated back");
        true
    }

    /// Subscribe to tool-call publications.
    pub fn subscribe_tools(&self) -> broadcast::Receiver<ToolCallMessage> {
        self.bridge.subscribe()
    }

    /// Register a synchronous callback for a gesture-sensitive tool. The
    /// callback must not call back into the engine.
    pub fn register_gesture_callback<F>(&mut self, tool: &str, callback: F)
    where
        F: Fn(&str, &Value) + Send + Sync + 'static,
    {
        self.bridge.register_gesture_callback(tool, callback);
    }

    /// Wire the `serviceCall` extension point.
    pub fn set_service_handler(&mut self, handler: Box<dyn ServiceHandler>) {
        self.service_handler = Some(handler);
    }

    /// Trigger an event by id, from either the UI or the voice/tool channel.
    ///
    /// Lookup order: the active screen's own events, then all elements'
    /// events flattened in section order then element order; first match by
    /// id wins, so a screen-level event shadows an element-level one with
    /// the same id. Unknown ids, false conditions and individual action
    /// failures all degrade to logged no-ops; this never panics and never
    /// returns an error.
    pub fn trigger_event(&mut self, event_id: &str) -> DispatchOutcome {
        let mut outcome = DispatchOutcome::default();

        let Some(active) = self.active else {
            warn!(event = %event_id, "Trigger before activation; ignoring");
            return outcome;
        };
        if self.dispatch_state == DispatchState::Dispatching {
            warn!(event = %event_id, "Re-entrant trigger during dispatch; ignoring");
            return outcome;
        }

        let screen = &self.document.screens[active];
        let Some(event) = screen.find_event(event_id) else {
            warn!(screen = %screen.id, event = %event_id, "No event matches trigger; ignoring");
            return outcome;
        };
        outcome.matched = true;

        if !conditions::evaluate(&event.conditions, &self.store) {
            debug!(
                screen = %screen.id,
                event = %event_id,
                "Event conditions false; skipping all actions"
            );
            return outcome;
        }

        // Actions mutate the engine (navigation replaces the active screen),
        // so they run against a clone of the event's action list.
        let actions = event.actions.clone();
        debug!(
            session = %self.session_id,
            screen = %screen.id,
            event = %event_id,
            actions = actions.len(),
            "Dispatching event"
        );

        self.dispatch_state = DispatchState::Dispatching;
        self.run_actions(&actions, &mut outcome);
        self.dispatch_state = DispatchState::Idle;
        outcome
    }

    /// Run an action list in document order. Not transactional: one action's
    /// failure does not prevent later actions, and nothing rolls back.
    fn run_actions(&mut self, actions: &[EventAction], outcome: &mut DispatchOutcome) {
        for action in actions {
            if !conditions::evaluate(action.conditions(), &self.store) {
                debug!(action = action.kind(), "Action conditions false; skipping");
                outcome.actions_skipped += 1;
                continue;
            }
            self.run_action(action, outcome);
        }
    }

    fn run_action(&mut self, action: &EventAction, outcome: &mut DispatchOutcome) {
        match action {
            EventAction::Navigation { deeplink, .. } => self.run_navigation(deeplink, outcome),
            EventAction::StateUpdate { scope, updates, .. } => {
                self.store.merge(*scope, updates);
                outcome.actions_run += 1;
            }
            EventAction::ToolCall { tool, params, .. } => {
                self.run_tool_call(tool, params, outcome);
            }
            EventAction::ServiceCall {
                service_name,
                function_name,
                parameters,
                response_mapping,
                on_success,
                on_error,
                ..
            } => {
                self.run_service_call(
                    service_name,
                    function_name,
                    parameters,
                    response_mapping,
                    on_success,
                    on_error,
                    outcome,
                );
            }
            EventAction::CloseModule {
                flow_completed,
                parameters,
                ..
            } => {
                outcome.signals.push(ModuleSignal::CloseModule {
                    flow_completed: *flow_completed,
                    parameters: parameters.clone(),
                    raised_at: Utc::now(),
                });
                outcome.actions_run += 1;
            }
            EventAction::Custom {
                name, parameters, ..
            } => {
                outcome.signals.push(ModuleSignal::Custom {
                    name: name.clone(),
                    parameters: parameters.clone(),
                    raised_at: Utc::now(),
                });
                outcome.actions_run += 1;
            }
        }
    }

    fn run_navigation(&mut self, deeplink: &str, outcome: &mut DispatchOutcome) {
        let target = navigation::resolve_deeplink(deeplink);
        if target == NEXT_SCREEN || target == PREV_SCREEN {
            warn!(
                deeplink = %deeplink,
                "Placeholder deeplink at runtime; run the build-time rewrite"
            );
            outcome.actions_failed += 1;
            return;
        }
        let Some(index) = self.document.position(&target) else {
            warn!(deeplink = %deeplink, target = %target, "Unknown navigation target; ignoring");
            outcome.actions_failed += 1;
            return;
        };

        let initial = self.document.screens[index].state.clone();
        self.nav.push(target.clone());
        self.active = Some(index);
        self.store.reset(StateScope::Screen, &initial);
        debug!(target = %target, depth = self.nav.len(), "Navigated");
        outcome.actions_run += 1;
    }

    fn run_tool_call(&mut self, tool: &str, params: &Value, outcome: &mut DispatchOutcome) {
        let params = self.outbound_params(params);

        // Built-in tools carry inline side effects, executed synchronously
        // whether or not a bridge listener exists.
        match tool {
            TOOL_STORE_ANSWER => match params.get("questionId").and_then(Value::as_str) {
                Some(question_id) => {
                    let answer = params.get("answer").cloned().unwrap_or(Value::Null);
                    let key = format!("{ANSWER_KEY_PREFIX}{question_id}");
                    self.store.set(StateScope::Module, &key, answer);
                }
                None => {
                    warn!(tool = %tool, "store_answer without questionId; nothing recorded");
                }
            },
            TOOL_COMPLETE_FLOW => {
                self.store
                    .set(StateScope::Module, FLOW_COMPLETED_KEY, Value::Bool(true));
            }
            _ => {}
        }

        self.bridge.dispatch(tool, &params);
        outcome.actions_run += 1;
    }

    #[allow(clippy::too_many_arguments)]
    fn run_service_call(
        &mut self,
        service: &str,
        function: &str,
        parameters: &Value,
        response_mapping: &serde_json::Map<String, Value>,
        on_success: &[EventAction],
        on_error: &[EventAction],
        outcome: &mut DispatchOutcome,
    ) {
        let Some(handler) = self.service_handler.as_ref() else {
            warn!(
                service = %service,
                function = %function,
                "No service handler wired; recording serviceCall as a no-op"
            );
            outcome.actions_skipped += 1;
            return;
        };

        let parameters = self.outbound_params(parameters);
        match handler.call(service, function, &parameters) {
            Ok(response) => {
                self.apply_response_mapping(response_mapping, &response);
                outcome.actions_run += 1;
                self.run_actions(on_success, outcome);
            }
            Err(e) => {
                warn!(service = %service, function = %function, error = %e, "Service call failed");
                outcome.actions_failed += 1;
                self.run_actions(on_error, outcome);
            }
        }
    }

    /// Map response paths into module state: `state key → dotted response
    /// path`. Missing paths are skipped with a diagnostic, not written as
    /// null.
    fn apply_response_mapping(
        &mut self,
        mapping: &serde_json::Map<String, Value>,
        response: &Value,
    ) {
        for (state_key, path) in mapping {
            let Some(path) = path.as_str() else {
                warn!(key = %state_key, "Non-string response mapping path; skipping");
                continue;
            };
            match value_at_path(response, path) {
                Some(value) => {
                    self.store.set(StateScope::Module, state_key, value.clone());
                }
                None => {
                    warn!(key = %state_key, path = %path, "Response path missing; skipping");
                }
            }
        }
    }

    fn outbound_params(&self, params: &Value) -> Value {
        if self.config.interpolate_outbound {
            interpolate::interpolate_value(params, &self.store)
        } else {
            params.clone()
        }
    }
}

fn value_at_path<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    let mut segments = path.split('.');
    let mut current = value.as_object()?.get(segments.next()?)?;
    for segment in segments {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::load_document;
    use crate::error::ServiceError;
    use serde_json::json;

    fn engine_from(doc: Value) -> Engine {
        Engine::new(load_document(doc).unwrap(), EngineConfig::default()).unwrap()
    }

    fn survey_engine() -> Engine {
        let mut engine = engine_from(json!({"screens": [
            {"id": "welcome", "title": "Welcome",
             "events": [
                {"id": "continue_event", "type": "tap", "action": [
                    {"type": "navigation", "deeplink": "question"}
                ]},
                {"id": "bad_nav_then_update", "type": "tap", "action": [
                    {"type": "navigation", "deeplink": "totally-unknown"},
                    {"type": "stateUpdate", "scope": "module", "updates": {"after": true}}
                ]}
             ]},
            {"id": "question", "state": {"attempts": 0},
             "events": [
                {"id": "answer_event", "type": "voice", "action": [
                    {"type": "toolCall", "tool": "store_answer",
                     "params": {"questionId": "q1", "answer": "yes"}}
                ]}
             ]}
        ]}));
        engine.activate("welcome").unwrap();
        engine
    }

    #[test]
    fn trigger_before_activation_is_a_noop() {
        let mut engine = engine_from(json!({"screens": [{"id": "s"}]}));
        let outcome = engine.trigger_event("anything");
        assert!(!outcome.matched);
        assert!(engine.history().is_empty());
    }

    #[test]
    fn activate_unknown_screen_is_an_error() {
        let mut engine = engine_from(json!({"screens": [{"id": "s"}]}));
        assert!(matches!(
            engine.activate("nope"),
            Err(Error::UnknownScreen { .. })
        ));
    }

    #[test]
    fn unknown_event_is_a_noop() {
        let mut engine = survey_engine();
        let outcome = engine.trigger_event("does_not_exist");
        assert!(!outcome.matched);
        assert_eq!(outcome.actions_run, 0);
        assert_eq!(engine.history(), ["welcome"]);
    }

    #[test]
    fn navigation_pushes_and_reseeds_screen_state() {
        let mut engine = survey_engine();
        engine.store_mut().set(StateScope::Screen, "leftover", json!(1));

        let outcome = engine.trigger_event("continue_event");

        assert!(outcome.matched);
        assert_eq!(outcome.actions_run, 1);
        assert_eq!(engine.history(), ["welcome", "question"]);
        assert_eq!(engine.active_screen().unwrap().id, "question");
        // Screen scope reset to the new screen's declared initial state
        assert_eq!(engine.screen_state(), json!({"attempts": 0}));
    }

    #[test]
    fn unresolvable_navigation_degrades_and_later_actions_still_run() {
        let mut engine = survey_engine();
        let outcome = engine.trigger_event("bad_nav_then_update");

        assert_eq!(outcome.actions_failed, 1);
        assert_eq!(outcome.actions_run, 1);
        // Navigation stack and active screen unchanged
        assert_eq!(engine.history(), ["welcome"]);
        assert_eq!(engine.active_screen().unwrap().id, "welcome");
        // The subsequent stateUpdate still applied
        assert_eq!(engine.module_state()["after"], json!(true));
    }

    #[test]
    fn placeholder_deeplink_at_runtime_is_a_failure() {
        let mut engine = engine_from(json!({"screens": [
            {"id": "a", "events": [{"id": "e", "type": "tap", "action": [
                {"type": "navigation", "deeplink": "next-screen"}
            ]}]},
            {"id": "b"}
        ]}));
        engine.activate("a").unwrap();

        let outcome = engine.trigger_event("e");
        assert_eq!(outcome.actions_failed, 1);
        assert_eq!(engine.history(), ["a"]);
    }

    #[test]
    fn event_conditions_gate_all_actions() {
        let mut engine = engine_from(json!({"screens": [{
            "id": "s",
            "events": [{
                "id": "gated", "type": "tap",
                "conditions": [{
                    "rules": {"==": [{"var": "flag"}, true]},
                    "state": {"flag": "$moduleData.done"}
                }],
                "action": [
                    {"type": "stateUpdate", "scope": "module", "updates": {"ran": true}}
                ]
            }]
        }]}));
        engine.activate("s").unwrap();

        // moduleState.done unset: conditions false, no actions run
        let outcome = engine.trigger_event("gated");
        assert!(outcome.matched);
        assert_eq!(outcome.actions_run, 0);
        assert_eq!(engine.module_state(), json!({}));

        // Set the flag and trigger again
        engine.store_mut().set(StateScope::Module, "done", json!(true));
        let outcome = engine.trigger_event("gated");
        assert_eq!(outcome.actions_run, 1);
        assert_eq!(engine.module_state()["ran"], json!(true));
    }

    #[test]
    fn action_conditions_skip_only_that_action() {
        let mut engine = engine_from(json!({"screens": [{
            "id": "s",
            "events": [{"id": "e", "type": "tap", "action": [
                {"type": "stateUpdate", "updates": {"skipped": true},
                 "conditions": [{"rules": false, "state": {}}]},
                {"type": "stateUpdate", "updates": {"ran": true}}
            ]}]
        }]}));
        engine.activate("s").unwrap();

        let outcome = engine.trigger_event("e");
        assert_eq!(outcome.actions_skipped, 1);
        assert_eq!(outcome.actions_run, 1);
        assert_eq!(engine.screen_state(), json!({"ran": true}));
    }

    #[test]
    fn screen_event_shadows_element_event() {
        let mut engine = engine_from(json!({"screens": [{
            "id": "s",
            "events": [{"id": "x", "type": "tap", "action": [
                {"type": "stateUpdate", "updates": {"source": "screen"}}
            ]}],
            "sections": [{"id": "sec", "elements": [{
                "type": "button",
                "events": [{"id": "x", "type": "tap", "action": [
                    {"type": "stateUpdate", "updates": {"source": "element"}}
                ]}]
            }]}]
        }]}));
        engine.activate("s").unwrap();

        engine.trigger_event("x");
        assert_eq!(engine.screen_state()["source"], json!("screen"));
    }

    #[test]
    fn element_event_found_when_screen_has_none() {
        let mut engine = engine_from(json!({"screens": [{
            "id": "s",
            "sections": [{"id": "sec", "elements": [{
                "type": "button",
                "events": [{"id": "elem_only", "type": "tap", "action": [
                    {"type": "stateUpdate", "updates": {"ok": true}}
                ]}]
            }]}]
        }]}));
        engine.activate("s").unwrap();

        let outcome = engine.trigger_event("elem_only");
        assert!(outcome.matched);
        assert_eq!(engine.screen_state()["ok"], json!(true));
    }

    #[test]
    fn store_answer_builtin_writes_module_key_and_publishes() {
        let mut engine = survey_engine();
        engine.trigger_event("continue_event");
        let mut rx = engine.subscribe_tools();

        let outcome = engine.trigger_event("answer_event");

        assert_eq!(outcome.actions_run, 1);
        assert_eq!(engine.module_state()["answer_q1"], json!("yes"));
        let message = rx.try_recv().unwrap();
        assert_eq!(message.tool, "store_answer");
        assert_eq!(message.params, json!({"questionId": "q1", "answer": "yes"}));
    }

    #[test]
    fn store_answer_without_listener_still_takes_effect() {
        let mut engine = survey_engine();
        engine.trigger_event("continue_event");
        // No subscriber: the inline side effect still happens
        engine.trigger_event("answer_event");
        assert_eq!(engine.module_state()["answer_q1"], json!("yes"));
    }

    #[test]
    fn complete_flow_builtin_sets_completion_flag() {
        let mut engine = engine_from(json!({"screens": [{
            "id": "s",
            "events": [{"id": "finish", "type": "tap", "action": [
                {"type": "toolCall", "tool": "complete_flow"}
            ]}]
        }]}));
        engine.activate("s").unwrap();

        engine.trigger_event("finish");
        assert_eq!(engine.module_state()["flowCompleted"], json!(true));
    }

    #[test]
    fn tool_params_are_interpolated_before_publication() {
        let mut engine = engine_from(json!({"screens": [{
            "id": "s",
            "events": [{"id": "say", "type": "tap", "action": [
                {"type": "toolCall", "tool": "speak",
                 "params": {"text": "Hello {$moduleData.name}"}}
            ]}]
        }]}));
        engine.activate("s").unwrap();
        engine.store_mut().set(StateScope::Module, "name", json!("Ada"));
        let mut rx = engine.subscribe_tools();

        engine.trigger_event("say");
        assert_eq!(rx.try_recv().unwrap().params, json!({"text": "Hello Ada"}));
    }

    #[test]
    fn gesture_callback_runs_inside_dispatch() {
        use std::sync::Arc;
        use std::sync::atomic::{AtomicBool, Ordering};

        let mut engine = engine_from(json!({"screens": [{
            "id": "s",
            "events": [{"id": "mic", "type": "tap", "action": [
                {"type": "toolCall", "tool": "enable_microphone"}
            ]}]
        }]}));
        engine.activate("s").unwrap();

        let fired = Arc::new(AtomicBool::new(false));
        let seen = Arc::clone(&fired);
        engine.register_gesture_callback(TOOL_ENABLE_MICROPHONE, move |_, _| {
            seen.store(true, Ordering::SeqCst);
        });

        engine.trigger_event("mic");
        assert!(fired.load(Ordering::SeqCst));
    }

    #[test]
    fn close_module_and_custom_are_surfaced_as_signals() {
        let mut engine = engine_from(json!({"screens": [{
            "id": "s",
            "events": [{"id": "end", "type": "tap", "action": [
                {"type": "custom", "name": "confetti", "parameters": {"count": 3}},
                {"type": "closeModule", "flowCompleted": true}
            ]}]
        }]}));
        engine.activate("s").unwrap();

        let outcome = engine.trigger_event("end");
        assert_eq!(outcome.signals.len(), 2);
        assert!(matches!(&outcome.signals[0], ModuleSignal::Custom { name, .. }
            if name == "confetti"));
        assert!(matches!(
            &outcome.signals[1],
            ModuleSignal::CloseModule { flow_completed: true, .. }
        ));
    }

    struct FakeCrm;

    impl ServiceHandler for FakeCrm {
        fn call(
            &self,
            service: &str,
            function: &str,
            _parameters: &Value,
        ) -> std::result::Result<Value, ServiceError> {
            match function {
                "lookup" => Ok(json!({"customer": {"name": "Ada", "tier": "gold"}})),
                other => Err(ServiceError::UnknownFunction {
                    service: service.to_string(),
                    function: other.to_string(),
                }),
            }
        }
    }

    fn service_doc(function: &str) -> Value {
        json!({"screens": [{
            "id": "s",
            "events": [{"id": "fetch", "type": "tap", "action": [{
                "type": "serviceCall",
                "serviceName": "crm", "functionName": function,
                "responseMapping": {"customerName": "customer.name"},
                "onSuccess": [{"type": "stateUpdate", "scope": "module",
                               "updates": {"fetched": true}}],
                "onError": [{"type": "stateUpdate", "scope": "module",
                             "updates": {"fetchFailed": true}}]
            }]}]
        }]})
    }

    #[test]
    fn unwired_service_call_is_a_recorded_noop() {
        let mut engine = engine_from(service_doc("lookup"));
        engine.activate("s").unwrap();

        let outcome = engine.trigger_event("fetch");
        assert_eq!(outcome.actions_skipped, 1);
        assert_eq!(outcome.actions_run, 0);
        assert_eq!(engine.module_state(), json!({}));
    }

    #[test]
    fn wired_service_call_maps_response_and_runs_on_success() {
        let mut engine = engine_from(service_doc("lookup"));
        engine.set_service_handler(Box::new(FakeCrm));
        engine.activate("s").unwrap();

        let outcome = engine.trigger_event("fetch");
        assert_eq!(outcome.actions_run, 2); // the call + the onSuccess update
        assert_eq!(engine.module_state()["customerName"], json!("Ada"));
        assert_eq!(engine.module_state()["fetched"], json!(true));
    }

    #[test]
    fn failed_service_call_runs_on_error() {
        let mut engine = engine_from(service_doc("explode"));
        engine.set_service_handler(Box::new(FakeCrm));
        engine.activate("s").unwrap();

        let outcome = engine.trigger_event("fetch");
        assert_eq!(outcome.actions_failed, 1);
        assert_eq!(engine.module_state()["fetchFailed"], json!(true));
        assert!(engine.module_state().get("customerName").is_none());
    }

    #[test]
    fn go_back_pops_and_reseeds_but_never_empties() {
        let mut engine = survey_engine();
        engine.trigger_event("continue_event");
        assert_eq!(engine.history(), ["welcome", "question"]);

        assert!(engine.go_back());
        assert_eq!(engine.history(), ["welcome"]);
        assert_eq!(engine.active_screen().unwrap().id, "welcome");
        assert_eq!(engine.screen_state(), json!({}));

        // The first-activated screen can never be popped
        assert!(!engine.go_back());
        assert_eq!(engine.history(), ["welcome"]);
    }

    #[test]
    fn module_state_survives_navigation() {
        let mut engine = survey_engine();
        engine.store_mut().set(StateScope::Module, "kept", json!("yes"));

        engine.trigger_event("continue_event");
        assert_eq!(engine.module_state()["kept"], json!("yes"));
    }

    #[test]
    fn late_trigger_for_old_screen_fails_lookup_after_navigation() {
        let mut engine = survey_engine();
        engine.trigger_event("continue_event");

        // continue_event belonged to "welcome"; the active screen is now
        // "question" and the late-arriving trigger no-ops
        let outcome = engine.trigger_event("continue_event");
        assert!(!outcome.matched);
        assert_eq!(engine.history(), ["welcome", "question"]);
    }
}
