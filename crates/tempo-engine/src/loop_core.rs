//! The engine core: lifecycle state machine, context, and the three
//! middleware chains.
//!
//! [`LoopCore`] is the single-threaded heart shared by both engine
//! forms. It owns the only writable copy of the lifecycle state, runs
//! the start/input/tick chains against the shared [`Context`], and
//! applies control requests (stop, settings) that handlers record on the
//! context. Mode layers wrap it: [`GatedEngine`](crate::GatedEngine)
//! calls it directly, the clocked loop thread owns it exclusively.

use std::error::Error;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use tempo_core::{Chain, Context, EngineOp, Handler, HandlerError, Lifecycle, LifecycleError, StateMap};

use crate::config::MiddlewareSet;
use crate::gate::TickGate;
use crate::settings::{IntervalCell, SettingsSync};
use crate::timer::TimerError;

// Compile-time assertion: LoopCore must be Send so the clocked engine
// can move it into the loop thread.
const _: () = {
    #[allow(dead_code)]
    fn assert_send<T: Send>() {}
    #[allow(dead_code)]
    fn check() {
        assert_send::<LoopCore>();
    }
};

// ── EngineError ─────────────────────────────────────────────────

/// Error returned from the public engine operations.
#[derive(Debug, PartialEq)]
pub enum EngineError {
    /// The operation's lifecycle precondition was violated.
    Lifecycle(LifecycleError),
    /// A handler failed during the operation's chain run.
    Handler(HandlerError),
    /// The tick timer was misused.
    Timer(TimerError),
    /// The clocked engine's loop thread is gone.
    Shutdown,
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Lifecycle(e) => write!(f, "{e}"),
            Self::Handler(e) => write!(f, "handler failed: {e}"),
            Self::Timer(e) => write!(f, "{e}"),
            Self::Shutdown => write!(f, "engine loop thread has shut down"),
        }
    }
}

impl Error for EngineError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Lifecycle(e) => Some(e),
            Self::Handler(e) => Some(e),
            Self::Timer(e) => Some(e),
            Self::Shutdown => None,
        }
    }
}

impl From<LifecycleError> for EngineError {
    fn from(e: LifecycleError) -> Self {
        Self::Lifecycle(e)
    }
}

impl From<HandlerError> for EngineError {
    fn from(e: HandlerError) -> Self {
        Self::Handler(e)
    }
}

impl From<TimerError> for EngineError {
    fn from(e: TimerError) -> Self {
        Self::Timer(e)
    }
}

// ── ChainSlot ───────────────────────────────────────────────────

/// Names one of the core's three chains.
#[derive(Clone, Copy, Debug)]
enum ChainSlot {
    Start,
    Input,
    Tick,
}

// ── LoopCore ────────────────────────────────────────────────────

/// Single-threaded engine core.
///
/// Owns the lifecycle state, the shared context, and the three chains.
/// The tick chain is always `[settings-sync, ...user handlers]` — the
/// settings-sync handler is injected at construction as a fixed,
/// documented contract.
///
/// Each operation resets the relevant chain before running it (so a
/// previous failed run never resumes mid-chain at the operation level)
/// and resets it again after a successful run.
pub struct LoopCore {
    lifecycle: Lifecycle,
    ctx: Context,
    start_chain: Chain,
    input_chain: Chain,
    tick_chain: Chain,
    gate: Option<Box<dyn TickGate>>,
    interval: Arc<IntervalCell>,
}

impl LoopCore {
    /// Build a core from the configured start state, handler arrays, and
    /// optional tick gate (`Some` = predicate form, `None` = timer form).
    pub fn new(
        start_state: Option<StateMap>,
        middlewares: MiddlewareSet,
        gate: Option<Box<dyn TickGate>>,
    ) -> Self {
        let interval = Arc::new(IntervalCell::new());

        let mut tick_handlers: Vec<Arc<dyn Handler>> =
            Vec::with_capacity(middlewares.tick.len() + 1);
        tick_handlers.push(Arc::new(SettingsSync::new(Arc::clone(&interval))));
        tick_handlers.extend(middlewares.tick);

        Self {
            lifecycle: Lifecycle::Uninitialized,
            ctx: Context::new(start_state),
            start_chain: Chain::new(middlewares.start),
            input_chain: Chain::new(middlewares.input),
            tick_chain: Chain::new(tick_handlers),
            gate,
            interval,
        }
    }

    /// The cell receiving interval requests drained from pending
    /// settings. The timer owner consumes it after each chain run.
    pub fn interval_cell(&self) -> Arc<IntervalCell> {
        Arc::clone(&self.interval)
    }

    /// First and only launch.
    ///
    /// Runs the start chain to completion, then performs one immediate
    /// tick. Timer arming (clocked form) is the mode layer's job,
    /// ordered around this call.
    ///
    /// # Errors
    ///
    /// [`EngineError::Lifecycle`] unless the engine is `Uninitialized`;
    /// [`EngineError::Handler`] if a start- or tick-chain handler fails.
    pub fn start(&mut self) -> Result<(), EngineError> {
        self.check(EngineOp::Start, self.lifecycle == Lifecycle::Uninitialized)?;
        self.transition(Lifecycle::Running);
        self.run_chain(ChainSlot::Start)?;
        self.tick()
    }

    /// Deliver external input.
    ///
    /// Sets `last_input`, runs the input chain, performs one tick, then
    /// clears `last_input` and `pending_settings`.
    ///
    /// Mode-dependent precondition: in predicate form input is accepted
    /// only while `Running` and silently ignored otherwise; in timer
    /// form it is accepted in any non-`Stopped` state.
    pub fn input(&mut self, payload: Value) -> Result<(), EngineError> {
        if self.gate.is_some() {
            if self.lifecycle != Lifecycle::Running {
                return Ok(());
            }
        } else {
            self.check(EngineOp::Input, self.lifecycle != Lifecycle::Stopped)?;
        }

        self.ctx.last_input = Some(payload);
        let result = self.run_chain(ChainSlot::Input).and_then(|()| self.tick());

        // Clear once the whole operation completes, successfully or not.
        self.ctx.pending_settings.clear();
        self.ctx.last_input = None;
        result
    }

    /// Suspend the domain. Ticking continues while paused, and one tick
    /// is performed immediately.
    pub fn pause(&mut self) -> Result<(), EngineError> {
        self.check(EngineOp::Pause, self.lifecycle != Lifecycle::Stopped)?;
        self.transition(Lifecycle::Paused);
        self.tick()
    }

    /// Return from `Paused` to `Running`, performing one tick.
    pub fn resume(&mut self) -> Result<(), EngineError> {
        self.check(EngineOp::Resume, self.lifecycle == Lifecycle::Paused)?;
        self.transition(Lifecycle::Running);
        self.tick()
    }

    /// Terminal shutdown. Scheduler disarm happens in the owning mode
    /// layer; afterwards every lifecycle call fails per its own
    /// precondition.
    pub fn stop(&mut self) -> Result<(), EngineError> {
        self.check(EngineOp::Stop, self.lifecycle != Lifecycle::Stopped)?;
        self.transition(Lifecycle::Stopped);
        Ok(())
    }

    /// One tick attempt.
    ///
    /// No-op when `Stopped`. Refreshes the context's lifecycle
    /// projection, asks the gate (predicate form) whether to run — a
    /// declined tick skips the chain but still succeeds — then runs the
    /// tick chain. Timer form accepts every explicitly requested tick.
    pub fn tick(&mut self) -> Result<(), EngineError> {
        if self.lifecycle == Lifecycle::Stopped {
            return Ok(());
        }
        self.ctx.sync_lifecycle(self.lifecycle);
        if let Some(gate) = &self.gate {
            if !gate.should_tick() {
                return Ok(());
            }
        }
        self.run_chain(ChainSlot::Tick)
    }

    /// Current lifecycle state.
    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    /// Read-only view of the shared context.
    pub fn context(&self) -> &Context {
        &self.ctx
    }

    /// Owned copy of the context, for cross-thread inspection.
    pub fn snapshot(&self) -> Context {
        self.ctx.clone()
    }

    /// Whether this core is gated (predicate form) rather than clocked.
    pub fn is_gated(&self) -> bool {
        self.gate.is_some()
    }

    fn check(&self, op: EngineOp, precondition: bool) -> Result<(), LifecycleError> {
        if precondition {
            Ok(())
        } else {
            Err(LifecycleError {
                op,
                current: self.lifecycle,
            })
        }
    }

    fn transition(&mut self, next: Lifecycle) {
        debug!(from = %self.lifecycle, to = %next, "lifecycle transition");
        self.lifecycle = next;
        self.ctx.sync_lifecycle(next);
    }

    /// Run one chain: refresh the lifecycle projection, reset the
    /// cursor, dispatch, reset again on success, then apply any stop
    /// request the handlers recorded.
    fn run_chain(&mut self, slot: ChainSlot) -> Result<(), EngineError> {
        self.ctx.sync_lifecycle(self.lifecycle);
        let chain = match slot {
            ChainSlot::Start => &mut self.start_chain,
            ChainSlot::Input => &mut self.input_chain,
            ChainSlot::Tick => &mut self.tick_chain,
        };
        chain.reset();
        chain.handle(&mut self.ctx)?;
        chain.reset();

        if self.ctx.take_stop_request() && self.lifecycle != Lifecycle::Stopped {
            self.transition(Lifecycle::Stopped);
        }
        Ok(())
    }
}

impl fmt::Debug for LoopCore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoopCore")
            .field("lifecycle", &self.lifecycle)
            .field("gated", &self.gate.is_some())
            .field("start_chain", &self.start_chain)
            .field("input_chain", &self.input_chain)
            .field("tick_chain", &self.tick_chain)
            .finish()
    }
}
