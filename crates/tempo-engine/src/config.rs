//! Engine configuration, validation, and construction-time error types.

use std::error::Error;
use std::fmt;
use std::sync::Arc;

use tempo_core::{Handler, StateMap};

use crate::gate::TickGate;

/// Default tick interval applied when a clocked configuration omits one.
pub const DEFAULT_TICK_INTERVAL_MS: u64 = 20;

/// Default capacity of the clocked engine's operation-request channel.
pub const DEFAULT_REQUEST_QUEUE_CAPACITY: usize = 64;

// ── MiddlewareSet ───────────────────────────────────────────────

/// Ordered handler arrays per chain slot. Empty arrays are valid — the
/// resulting chain is a no-op.
#[derive(Default)]
pub struct MiddlewareSet {
    /// Run once on `start()`. Usually sets up the first scene/state.
    pub start: Vec<Arc<dyn Handler>>,
    /// Run on every `input(payload)`. Usually validate-then-interact.
    pub input: Vec<Arc<dyn Handler>>,
    /// Run on every accepted tick, after the built-in settings-sync
    /// handler. Usually render/heartbeat work.
    pub tick: Vec<Arc<dyn Handler>>,
}

impl fmt::Debug for MiddlewareSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MiddlewareSet")
            .field("start", &self.start.len())
            .field("input", &self.input.len())
            .field("tick", &self.tick.len())
            .finish()
    }
}

// ── ConfigError ─────────────────────────────────────────────────

/// Errors detected while constructing an engine from an [`EngineConfig`].
#[derive(Debug)]
pub enum ConfigError {
    /// A gated engine was constructed without a tick gate.
    MissingGate,
    /// A gated configuration also carried a tick interval. The two
    /// scheduling forms are alternatives, not composable.
    IntervalInGatedMode,
    /// A clocked configuration also carried a tick gate.
    GateInClockedMode,
    /// The operation-request channel capacity is zero.
    RequestQueueZero,
    /// The loop thread could not be spawned.
    ThreadSpawnFailed {
        /// Description of the spawn failure.
        reason: String,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingGate => write!(f, "gated engine requires a tick gate"),
            Self::IntervalInGatedMode => {
                write!(f, "tick_interval is not applicable in gated mode")
            }
            Self::GateInClockedMode => write!(f, "gate is not applicable in clocked mode"),
            Self::RequestQueueZero => write!(f, "request_queue_capacity must be at least 1"),
            Self::ThreadSpawnFailed { reason } => write!(f, "thread spawn failed: {reason}"),
        }
    }
}

impl Error for ConfigError {}

// ── EngineConfig ────────────────────────────────────────────────

/// Complete configuration for constructing an engine.
///
/// One config type serves both engine forms; each constructor rejects
/// the fields that belong to the other form
/// ([`GateInClockedMode`](ConfigError::GateInClockedMode),
/// [`IntervalInGatedMode`](ConfigError::IntervalInGatedMode)).
pub struct EngineConfig {
    /// Tick interval in milliseconds for the clocked engine. `None`
    /// means [`DEFAULT_TICK_INTERVAL_MS`]; `Some(0)` means "never tick
    /// automatically" — ticks then occur only on explicit operations.
    pub tick_interval: Option<u64>,
    /// Tick gate for the gated engine.
    pub gate: Option<Box<dyn TickGate>>,
    /// Initial contents of the context's `state_data`.
    pub start_state: Option<StateMap>,
    /// Handler arrays for the start/input/tick chains.
    pub middlewares: MiddlewareSet,
    /// Capacity of the clocked engine's operation-request channel.
    pub request_queue_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tick_interval: None,
            gate: None,
            start_state: None,
            middlewares: MiddlewareSet::default(),
            request_queue_capacity: DEFAULT_REQUEST_QUEUE_CAPACITY,
        }
    }
}

impl EngineConfig {
    /// The tick interval with the default applied.
    pub fn resolved_tick_interval(&self) -> u64 {
        self.tick_interval.unwrap_or(DEFAULT_TICK_INTERVAL_MS)
    }
}

impl fmt::Debug for EngineConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineConfig")
            .field("tick_interval", &self.tick_interval)
            .field("gate", &self.gate.is_some())
            .field(
                "start_state_keys",
                &self.start_state.as_ref().map_or(0, StateMap::len),
            )
            .field("middlewares", &self.middlewares)
            .field("request_queue_capacity", &self.request_queue_capacity)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_resolves_default_interval() {
        let config = EngineConfig::default();
        assert_eq!(config.resolved_tick_interval(), DEFAULT_TICK_INTERVAL_MS);
        assert_eq!(
            config.request_queue_capacity,
            DEFAULT_REQUEST_QUEUE_CAPACITY
        );
        assert!(config.gate.is_none());
    }

    #[test]
    fn explicit_interval_wins_over_default() {
        let config = EngineConfig {
            tick_interval: Some(1000),
            ..EngineConfig::default()
        };
        assert_eq!(config.resolved_tick_interval(), 1000);
    }

    #[test]
    fn thread_spawn_failed_error_display() {
        let err = ConfigError::ThreadSpawnFailed {
            reason: "loop thread: resource limit".to_string(),
        };
        let msg = format!("{err}");
        assert!(msg.contains("thread spawn failed"));
        assert!(msg.contains("loop thread"));
    }
}
