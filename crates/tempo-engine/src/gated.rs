//! Predicate-gated engine: caller-driven, no background threads.
//!
//! Every operation executes synchronously on the caller's thread and
//! performs one tick attempt, which the configured
//! [`TickGate`](crate::TickGate) accepts or declines. There is no timer:
//! the gate decides, the caller drives.

use serde_json::Value;

use tempo_core::{Context, Lifecycle};

use crate::config::{ConfigError, EngineConfig};
use crate::loop_core::{EngineError, LoopCore};

/// Predicate-gated loop engine.
///
/// Construction requires a tick gate in the config; a tick interval is
/// rejected — the two scheduling forms are alternatives, not composable.
#[derive(Debug)]
pub struct GatedEngine {
    core: LoopCore,
}

impl GatedEngine {
    /// Construct the engine from a gated configuration.
    ///
    /// # Errors
    ///
    /// [`ConfigError::MissingGate`] without a gate,
    /// [`ConfigError::IntervalInGatedMode`] if a tick interval is also
    /// set.
    pub fn new(config: EngineConfig) -> Result<Self, ConfigError> {
        if config.tick_interval.is_some() {
            return Err(ConfigError::IntervalInGatedMode);
        }
        let EngineConfig {
            gate,
            start_state,
            middlewares,
            ..
        } = config;
        let Some(gate) = gate else {
            return Err(ConfigError::MissingGate);
        };
        Ok(Self {
            core: LoopCore::new(start_state, middlewares, Some(gate)),
        })
    }

    /// First and only launch: runs the start chain and one tick attempt.
    pub fn start(&mut self) -> Result<(), EngineError> {
        self.core.start()
    }

    /// Deliver external input. Accepted only while `Running`; silently
    /// ignored in any other state.
    pub fn input(&mut self, payload: Value) -> Result<(), EngineError> {
        self.core.input(payload)
    }

    /// Pause the domain. Tick attempts continue while paused.
    pub fn pause(&mut self) -> Result<(), EngineError> {
        self.core.pause()
    }

    /// Resume from `Paused`.
    pub fn resume(&mut self) -> Result<(), EngineError> {
        self.core.resume()
    }

    /// Terminal shutdown.
    pub fn stop(&mut self) -> Result<(), EngineError> {
        self.core.stop()
    }

    /// Current lifecycle state.
    pub fn lifecycle(&self) -> Lifecycle {
        self.core.lifecycle()
    }

    /// Read-only view of the shared context.
    pub fn context(&self) -> &Context {
        self.core.context()
    }
}
