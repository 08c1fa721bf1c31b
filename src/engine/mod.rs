//! The screen interaction engine: event dispatch and action execution.

pub mod bridge;
pub mod dispatcher;
pub mod host;

pub use bridge::{ToolBridge, ToolCallMessage};
pub use dispatcher::{DispatchOutcome, Engine};
pub use host::{ModuleSignal, ServiceHandler, SharedEngine};
