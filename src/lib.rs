//! Screenflow — screen interaction engine for voice-plus-screen flows.
//!
//! Interprets declarative screen documents: resolves state references,
//! evaluates conditional rules, executes event actions (navigation, state
//! mutation, tool dispatch, service calls) and maintains navigation history.
//! Rendering, authoring, persistence and the voice layer are external
//! collaborators.

pub mod conditions;
pub mod config;
pub mod document;
pub mod engine;
pub mod error;
pub mod interpolate;
pub mod navigation;
pub mod rules;
pub mod state;

pub use config::{EngineConfig, TriggerPolicy};
pub use document::{ScreenDocument, load_document, rewrite_placeholder_deeplinks};
pub use engine::{DispatchOutcome, Engine, ModuleSignal, SharedEngine, ToolBridge};
pub use error::{DocumentError, Error, Result};
pub use state::{StateScope, StateStore};
