//! Tempo: a middleware-driven game/simulation loop engine.
//!
//! This is the top-level facade crate that re-exports the public API
//! from the Tempo sub-crates. For most users, adding `tempo` as a single
//! dependency is sufficient.
//!
//! An engine drives a finite lifecycle (`uninitialized → running ⇄
//! paused → stopped`) and, on each lifecycle event, runs an ordered
//! chain of middlewares over a shared mutable [`Context`]. Ticks are
//! scheduled either by a timer with a live-reconfigurable interval
//! ([`ClockedEngine`]) or by a pluggable predicate ([`GatedEngine`]).
//!
//! # Quick start
//!
//! ```rust
//! use tempo::prelude::*;
//! use serde_json::json;
//!
//! // A gated engine ticks whenever an operation asks and the gate
//! // agrees; this one always agrees.
//! let config = EngineConfig {
//!     gate: Some(gate_fn(|| true)),
//!     middlewares: MiddlewareSet {
//!         input: vec![handler_fn(|ctx, chain| {
//!             let echo = ctx.last_input.clone().unwrap_or(serde_json::Value::Null);
//!             ctx.state_data.insert("echo".to_string(), echo);
//!             chain.handle(ctx)
//!         })],
//!         ..MiddlewareSet::default()
//!     },
//!     ..EngineConfig::default()
//! };
//!
//! let mut engine = GatedEngine::new(config).unwrap();
//! engine.start().unwrap();
//! engine.input(json!("ping")).unwrap();
//! assert_eq!(engine.context().state_data.get("echo"), Some(&json!("ping")));
//! engine.stop().unwrap();
//! assert_eq!(engine.lifecycle(), Lifecycle::Stopped);
//! ```

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub use tempo_core::{
    handler_fn, Chain, Context, EngineOp, FnHandler, Handler, HandlerError, Lifecycle,
    LifecycleError, NestedChain, StateMap,
};
pub use tempo_engine::{
    gate_fn, ClockedEngine, ConfigError, EngineConfig, EngineError, FnGate, GatedEngine,
    IntervalCell, LoopCore, MiddlewareSet, SettingsSync, TickGate, TickTimer, TimerError,
    DEFAULT_REQUEST_QUEUE_CAPACITY, DEFAULT_TICK_INTERVAL_MS, TICK_INTERVAL_KEY,
};

/// The most common imports in one place.
pub mod prelude {
    pub use tempo_core::{handler_fn, Chain, Context, Handler, HandlerError, Lifecycle, StateMap};
    pub use tempo_engine::{
        gate_fn, ClockedEngine, EngineConfig, EngineError, GatedEngine, MiddlewareSet, TickGate,
        TICK_INTERVAL_KEY,
    };
}
