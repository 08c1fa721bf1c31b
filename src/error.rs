//! Error types for the screen interaction engine.

/// Top-level error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Document error: {0}")]
    Document(#[from] DocumentError),

    #[error("Unknown screen: {id}")]
    UnknownScreen { id: String },

    #[error("Engine has no active screen; call activate() first")]
    NotActivated,
}

/// Document load/validation errors. These are fatal: a session must never
/// activate over a partially-valid document.
#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    #[error("Document contains no screens")]
    Empty,

    #[error("Duplicate screen id: {id}")]
    DuplicateScreenId { id: String },

    #[error("Screen {screen} has an event with an empty id")]
    EmptyEventId { screen: String },

    #[error("Invalid rule expression in event {event} on screen {screen}: {reason}")]
    InvalidRule {
        screen: String,
        event: String,
        reason: String,
    },

    #[error("Failed to parse document: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Rule-expression evaluation errors. Never escape `trigger_event`:
/// the condition evaluator converts them to a fail-closed false.
#[derive(Debug, thiserror::Error)]
pub enum RuleError {
    #[error("Unknown operator: {0}")]
    UnknownOperator(String),

    #[error("Operator {op} expects {expected} operand(s), got {got}")]
    Arity {
        op: String,
        expected: String,
        got: usize,
    },

    #[error("Operator object must have exactly one key, got {0}")]
    NotAnOperator(usize),
}

/// Errors returned by a host-wired service handler.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Service {service} has no function {function}")]
    UnknownFunction { service: String, function: String },

    #[error("Service {service}.{function} failed: {reason}")]
    CallFailed {
        service: String,
        function: String,
        reason: String,
    },
}

/// Result type alias for the engine.
pub type Result<T> = std::result::Result<T, Error>;
