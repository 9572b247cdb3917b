//! Core types and traits for the Tempo loop engine.
//!
//! This is the leaf crate with zero internal dependencies. It defines
//! the lifecycle state machine vocabulary, the shared [`Context`] record,
//! the [`Handler`] contract, and the [`Chain`] dispatcher that executes
//! handlers in order against the context.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod chain;
pub mod context;
pub mod error;
pub mod lifecycle;

pub use chain::{handler_fn, Chain, FnHandler, Handler, NestedChain};
pub use context::{Context, StateMap};
pub use error::{HandlerError, LifecycleError};
pub use lifecycle::{EngineOp, Lifecycle};
