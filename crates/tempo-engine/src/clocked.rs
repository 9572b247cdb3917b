//! Timer-driven engine: the loop thread owns the core; operations
//! travel over a request channel.
//!
//! # Architecture
//!
//! ```text
//! Caller Thread                 Loop Thread
//!     |                             |
//!     |--start()/input()/...------>| req_rx.recv_timeout(deadline)
//!     |   [req_tx: bounded(cap)]   | core.start()/input()/...
//!     |<--Result via reply_tx------| apply interval requests
//!     |                            | on deadline: core.tick()
//!     |                            | rearm timer
//! ```
//!
//! Requests are served one at a time, so no two chain runs are ever in
//! flight concurrently. A successful `stop()` disarms the timer and ends
//! the thread; the handle recovers the core through the `JoinHandle` and
//! answers later operations locally with the correct lifecycle error.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use serde_json::Value;
use tracing::warn;

use tempo_core::{Context, EngineOp, Lifecycle, LifecycleError};

use crate::config::{ConfigError, EngineConfig};
use crate::loop_core::{EngineError, LoopCore};
use crate::loop_thread::{EngineRequest, LoopThreadState, OpPayload};
use crate::timer::TickTimer;

/// Timer-driven loop engine.
///
/// Created from an [`EngineConfig`]; the tick interval defaults to
/// [`DEFAULT_TICK_INTERVAL_MS`](crate::DEFAULT_TICK_INTERVAL_MS) and a
/// zero interval means ticks happen only on explicit operations.
/// Dropping the handle shuts the loop thread down.
pub struct ClockedEngine {
    req_tx: Option<crossbeam_channel::Sender<EngineRequest>>,
    thread: Option<JoinHandle<LoopCore>>,
    shutdown: Arc<AtomicBool>,
    recovered: Option<LoopCore>,
    stopped: bool,
}

impl ClockedEngine {
    /// Construct the engine and spawn its loop thread.
    ///
    /// # Errors
    ///
    /// [`ConfigError::GateInClockedMode`] if the config carries a tick
    /// gate, [`ConfigError::RequestQueueZero`] for a zero-capacity
    /// request channel, [`ConfigError::ThreadSpawnFailed`] if the loop
    /// thread cannot be spawned.
    pub fn new(config: EngineConfig) -> Result<Self, ConfigError> {
        if config.gate.is_some() {
            return Err(ConfigError::GateInClockedMode);
        }
        if config.request_queue_capacity == 0 {
            return Err(ConfigError::RequestQueueZero);
        }

        let interval_ms = config.resolved_tick_interval();
        let EngineConfig {
            start_state,
            middlewares,
            request_queue_capacity,
            ..
        } = config;

        let core = LoopCore::new(start_state, middlewares, None);
        let timer = TickTimer::new(interval_ms);

        let (req_tx, req_rx) = crossbeam_channel::bounded(request_queue_capacity);
        let shutdown = Arc::new(AtomicBool::new(false));
        let thread_shutdown = Arc::clone(&shutdown);

        let thread = thread::Builder::new()
            .name("tempo-loop".into())
            .spawn(move || LoopThreadState::new(core, timer, req_rx, thread_shutdown).run())
            .map_err(|e| ConfigError::ThreadSpawnFailed {
                reason: e.to_string(),
            })?;

        Ok(Self {
            req_tx: Some(req_tx),
            thread: Some(thread),
            shutdown,
            recovered: None,
            stopped: false,
        })
    }

    /// First and only launch: runs the start chain, arms the timer, and
    /// performs one immediate tick.
    pub fn start(&mut self) -> Result<(), EngineError> {
        self.op(OpPayload::Start, EngineOp::Start)
    }

    /// Deliver external input: runs the input chain and one tick.
    /// Accepted in any non-`Stopped` state.
    pub fn input(&mut self, payload: Value) -> Result<(), EngineError> {
        self.op(OpPayload::Input(payload), EngineOp::Input)
    }

    /// Pause the domain. Timer ticks continue while paused.
    pub fn pause(&mut self) -> Result<(), EngineError> {
        self.op(OpPayload::Pause, EngineOp::Pause)
    }

    /// Resume from `Paused`.
    pub fn resume(&mut self) -> Result<(), EngineError> {
        self.op(OpPayload::Resume, EngineOp::Resume)
    }

    /// Terminal shutdown: disarms the timer and ends the loop thread.
    pub fn stop(&mut self) -> Result<(), EngineError> {
        self.op(OpPayload::Stop, EngineOp::Stop)
    }

    /// Current lifecycle state.
    ///
    /// Answered by the loop thread while it is alive, and from the
    /// recovered core afterwards. Reports `Stopped` if the thread died
    /// without recovery.
    pub fn lifecycle(&self) -> Lifecycle {
        if let Some(core) = &self.recovered {
            return core.lifecycle();
        }
        match self.query(|reply| EngineRequest::Lifecycle { reply }) {
            Some(state) => state,
            None => Lifecycle::Stopped,
        }
    }

    /// Owned copy of the shared context, for inspection.
    ///
    /// # Errors
    ///
    /// [`EngineError::Shutdown`] if the loop thread is gone and no core
    /// was recovered.
    pub fn snapshot(&self) -> Result<Context, EngineError> {
        if let Some(core) = &self.recovered {
            return Ok(core.snapshot());
        }
        self.query(|reply| EngineRequest::Snapshot { reply })
            .ok_or(EngineError::Shutdown)
    }

    /// Shut down the loop thread (if still alive) and take the core for
    /// post-mortem inspection.
    pub fn into_core(mut self) -> Option<LoopCore> {
        self.shutdown_now();
        self.recovered.take()
    }

    fn op(&mut self, op: OpPayload, kind: EngineOp) -> Result<(), EngineError> {
        if self.stopped {
            return Err(LifecycleError {
                op: kind,
                current: Lifecycle::Stopped,
            }
            .into());
        }
        let req_tx = self.req_tx.as_ref().ok_or(EngineError::Shutdown)?;

        let stopping = matches!(op, OpPayload::Stop);
        let (reply_tx, reply_rx) = crossbeam_channel::bounded(1);
        req_tx
            .send(EngineRequest::Op {
                op,
                reply: reply_tx,
            })
            .map_err(|_| EngineError::Shutdown)?;
        let result = reply_rx.recv().map_err(|_| EngineError::Shutdown)?;

        if stopping && result.is_ok() {
            // The loop thread exits after a successful stop; join it now
            // so the core is available for inspection.
            self.stopped = true;
            self.join_thread();
        }
        result
    }

    fn query<T>(
        &self,
        make: impl FnOnce(crossbeam_channel::Sender<T>) -> EngineRequest,
    ) -> Option<T> {
        let req_tx = self.req_tx.as_ref()?;
        let (reply_tx, reply_rx) = crossbeam_channel::bounded(1);
        req_tx.send(make(reply_tx)).ok()?;
        reply_rx.recv().ok()
    }

    fn shutdown_now(&mut self) {
        self.shutdown.store(true, Ordering::Release);
        self.join_thread();
    }

    /// Drop the request channel (waking a blocked `recv`) and join the
    /// loop thread, recovering the core.
    fn join_thread(&mut self) {
        self.req_tx.take();
        if let Some(handle) = self.thread.take() {
            match handle.join() {
                Ok(core) => self.recovered = Some(core),
                Err(_) => warn!("loop thread panicked; core not recovered"),
            }
        }
    }
}

impl Drop for ClockedEngine {
    fn drop(&mut self) {
        if self.thread.is_some() {
            self.shutdown_now();
        }
    }
}

impl std::fmt::Debug for ClockedEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClockedEngine")
            .field("stopped", &self.stopped)
            .field("thread_alive", &self.thread.is_some())
            .finish()
    }
}
