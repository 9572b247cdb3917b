//! Loop engine for the Tempo framework.
//!
//! Provides the lifecycle state machine ([`LoopCore`]), the two tick
//! scheduling forms — timer-driven [`ClockedEngine`] and predicate-gated
//! [`GatedEngine`] — and the built-in settings-sync handler through
//! which middlewares reconfigure the tick cadence at runtime.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod clocked;
pub mod config;
pub mod gate;
pub mod gated;
pub mod loop_core;
mod loop_thread;
pub mod settings;
pub mod timer;

pub use clocked::ClockedEngine;
pub use config::{
    ConfigError, EngineConfig, MiddlewareSet, DEFAULT_REQUEST_QUEUE_CAPACITY,
    DEFAULT_TICK_INTERVAL_MS,
};
pub use gate::{gate_fn, FnGate, TickGate};
pub use gated::GatedEngine;
pub use loop_core::{EngineError, LoopCore};
pub use settings::{IntervalCell, SettingsSync, TICK_INTERVAL_KEY};
pub use timer::{TickTimer, TimerError};
