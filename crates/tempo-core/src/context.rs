//! The shared mutable context threaded through every chain run.

use indexmap::IndexMap;
use serde_json::Value;

use crate::lifecycle::Lifecycle;

/// Open-ended, insertion-ordered mapping used for application state and
/// pending settings. Insertion order makes drains deterministic.
pub type StateMap = IndexMap<String, Value>;

/// The single mutable record shared by all handlers of one engine.
///
/// Created once at engine construction and reused for the engine's entire
/// lifetime — never replaced, only mutated in place or cleared field by
/// field. Field ownership is by convention: the engine owns the lifecycle
/// projection, `last_input`, and the clearing of `pending_settings`;
/// application handlers own the contents of `state_data`.
#[derive(Clone, Debug)]
pub struct Context {
    lifecycle: Lifecycle,
    stop_requested: bool,
    /// The most recent external input. Set by the engine before an
    /// input-chain run and cleared after the whole operation completes.
    pub last_input: Option<Value>,
    /// Application-owned storage. The engine seeds it from the configured
    /// start state and never reads or writes its contents afterwards.
    pub state_data: StateMap,
    /// Setting-name → new-value requests written by handlers (e.g. a new
    /// tick interval). Drained by the engine's settings-sync handler and
    /// cleared after each input operation.
    pub pending_settings: StateMap,
}

impl Context {
    /// Create a context in the `Uninitialized` state, optionally seeded
    /// with an initial `state_data` payload.
    pub fn new(start_state: Option<StateMap>) -> Self {
        Self {
            lifecycle: Lifecycle::Uninitialized,
            stop_requested: false,
            last_input: None,
            state_data: start_state.unwrap_or_default(),
            pending_settings: StateMap::new(),
        }
    }

    /// The engine's lifecycle state as of the last refresh.
    ///
    /// A read-only mirror for handlers that branch on it; the engine
    /// refreshes it immediately before each chain run.
    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    /// Refresh the lifecycle projection. Engine-facing: handlers must
    /// treat the projection as read-only.
    pub fn sync_lifecycle(&mut self, state: Lifecycle) {
        self.lifecycle = state;
    }

    /// Ask the engine to stop once the current chain run completes.
    ///
    /// Handlers cannot hold a reference to the engine, so a stop is
    /// communicated the same way as a settings change: recorded on the
    /// context and applied by the engine after the run. Requesting a stop
    /// on an already-stopped engine has no effect.
    pub fn request_stop(&mut self) {
        self.stop_requested = true;
    }

    /// Consume a pending stop request, if any. Engine-facing.
    pub fn take_stop_request(&mut self) -> bool {
        std::mem::take(&mut self.stop_requested)
    }

    /// Drain all pending settings, leaving the map empty.
    pub fn take_pending_settings(&mut self) -> StateMap {
        std::mem::take(&mut self.pending_settings)
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new(None)
    }
}
