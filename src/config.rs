//! Configuration types.

/// Policy for triggers arriving while a dispatch is already in flight on a
/// [`SharedEngine`](crate::engine::SharedEngine).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerPolicy {
    /// Wait for the in-flight dispatch to finish, then run (serialized).
    Queue,
    /// Drop the trigger with a diagnostic.
    Drop,
}

/// Engine configuration.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Capacity of the tool-bridge broadcast channel.
    pub bridge_capacity: usize,
    /// What a `SharedEngine` does with a trigger that arrives mid-dispatch.
    pub trigger_policy: TriggerPolicy,
    /// Interpolate `{$scope.path}` tokens in outbound tool/service string
    /// parameters before dispatch.
    pub interpolate_outbound: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            bridge_capacity: 256,
            trigger_policy: TriggerPolicy::Queue,
            interpolate_outbound: true,
        }
    }
}
