//! Error types for lifecycle preconditions and handler failures.

use std::error::Error;
use std::fmt;

use crate::lifecycle::{EngineOp, Lifecycle};

/// An engine operation was invoked while the lifecycle state did not
/// satisfy its precondition (e.g. `start()` called twice, `resume()`
/// called when not paused).
///
/// Fatal to that call only: the engine's state is left unchanged and the
/// caller may retry with a valid operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LifecycleError {
    /// The operation that was attempted.
    pub op: EngineOp,
    /// The lifecycle state at the time of the attempt.
    pub current: Lifecycle,
}

impl fmt::Display for LifecycleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cannot {}: engine is {}", self.op, self.current)
    }
}

impl Error for LifecycleError {}

/// A failure produced by a handler during a chain run.
///
/// Aborts the remaining handlers in that run and propagates to the
/// engine operation that triggered the chain. The chain's cursor is left
/// wherever it stopped; the chain is dirty until
/// [`reset()`](crate::Chain::reset).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HandlerError {
    /// The handler's body failed.
    ExecutionFailed {
        /// Human-readable description of the failure.
        reason: String,
    },
    /// An input-processing handler rejected the current input payload.
    InvalidInput {
        /// What was wrong with the payload.
        reason: String,
    },
}

impl HandlerError {
    /// Shorthand for [`HandlerError::ExecutionFailed`].
    pub fn failed(reason: impl Into<String>) -> Self {
        Self::ExecutionFailed {
            reason: reason.into(),
        }
    }

    /// Shorthand for [`HandlerError::InvalidInput`].
    pub fn invalid_input(reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            reason: reason.into(),
        }
    }
}

impl fmt::Display for HandlerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ExecutionFailed { reason } => write!(f, "execution failed: {reason}"),
            Self::InvalidInput { reason } => write!(f, "invalid input: {reason}"),
        }
    }
}

impl Error for HandlerError {}
