//! Loop thread for the clocked engine: request draining and timer-driven
//! ticks.
//!
//! The thread owns the [`LoopCore`] and [`TickTimer`] exclusively (moved
//! in via `thread::spawn`). Operations arrive over a bounded crossbeam
//! channel paired with per-request reply senders, so chain runs are
//! serialized by construction — no locks on the hot path. Between
//! requests the thread waits with `recv_timeout` until the next timer
//! deadline and runs a tick when it passes.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use serde_json::Value;
use tracing::{debug, warn};

use tempo_core::{Context, Lifecycle};

use crate::loop_core::{EngineError, LoopCore};
use crate::settings::IntervalCell;
use crate::timer::TickTimer;

/// Payload of one public engine operation.
pub(crate) enum OpPayload {
    Start,
    Input(Value),
    Pause,
    Resume,
    Stop,
}

/// A request submitted by the engine handle, paired with its reply
/// channel.
pub(crate) enum EngineRequest {
    /// Execute a lifecycle operation.
    Op {
        op: OpPayload,
        reply: Sender<Result<(), EngineError>>,
    },
    /// Report the current lifecycle state.
    Lifecycle { reply: Sender<Lifecycle> },
    /// Report an owned copy of the context.
    Snapshot { reply: Sender<Context> },
}

/// State held by the loop thread's main loop.
pub(crate) struct LoopThreadState {
    core: LoopCore,
    timer: TickTimer,
    interval: Arc<IntervalCell>,
    req_rx: Receiver<EngineRequest>,
    shutdown: Arc<AtomicBool>,
}

impl LoopThreadState {
    pub(crate) fn new(
        core: LoopCore,
        timer: TickTimer,
        req_rx: Receiver<EngineRequest>,
        shutdown: Arc<AtomicBool>,
    ) -> Self {
        let interval = core.interval_cell();
        Self {
            core,
            timer,
            interval,
            req_rx,
            shutdown,
        }
    }

    /// Main loop. Runs until a successful stop operation, channel
    /// disconnect (handle dropped), or the shutdown flag.
    ///
    /// Consumes self and returns the [`LoopCore`] so the handle can
    /// recover it through the `JoinHandle` for post-mortem inspection.
    pub(crate) fn run(mut self) -> LoopCore {
        loop {
            if self.shutdown.load(Ordering::Acquire) {
                break;
            }

            let exit = match self.timer.time_until_fire(Instant::now()) {
                Some(wait) => match self.req_rx.recv_timeout(wait) {
                    Ok(req) => self.serve(req),
                    Err(RecvTimeoutError::Timeout) => {
                        self.timer_tick();
                        false
                    }
                    Err(RecvTimeoutError::Disconnected) => true,
                },
                // Timer disarmed: nothing to do until the next request.
                None => match self.req_rx.recv() {
                    Ok(req) => self.serve(req),
                    Err(_) => true,
                },
            };

            self.apply_interval_requests();

            if exit {
                break;
            }
        }

        self.timer.stop();
        self.core
    }

    /// Serve one request. Returns `true` when the thread should exit
    /// (successful stop).
    fn serve(&mut self, req: EngineRequest) -> bool {
        match req {
            EngineRequest::Op { op, reply } => {
                let (result, exit) = self.execute(op);
                // Best-effort reply — the caller may have hung up.
                let _ = reply.send(result);
                exit
            }
            EngineRequest::Lifecycle { reply } => {
                let _ = reply.send(self.core.lifecycle());
                false
            }
            EngineRequest::Snapshot { reply } => {
                let _ = reply.send(self.core.snapshot());
                false
            }
        }
    }

    fn execute(&mut self, op: OpPayload) -> (Result<(), EngineError>, bool) {
        match op {
            OpPayload::Start => {
                let result = self.core.start().and_then(|()| {
                    self.timer.start()?;
                    Ok(())
                });
                (result, false)
            }
            OpPayload::Input(payload) => (self.core.input(payload), false),
            OpPayload::Pause => (self.core.pause(), false),
            OpPayload::Resume => (self.core.resume(), false),
            OpPayload::Stop => {
                let result = self.core.stop();
                let exit = result.is_ok();
                if exit {
                    self.timer.stop();
                    debug!("loop thread exiting after stop");
                }
                (result, exit)
            }
        }
    }

    /// Run one timer-driven tick.
    ///
    /// A timer fire has no caller to receive a failure, so a failing
    /// tick chain is logged and ticking continues. A handler may have
    /// requested a stop; the timer is disarmed when the core reports
    /// `Stopped`, and the thread then idles serving requests until the
    /// handle stops or drops it.
    fn timer_tick(&mut self) {
        let now = Instant::now();
        if let Err(err) = self.core.tick() {
            warn!(%err, "tick chain failed on timer fire");
        }
        self.timer.rearm_after_fire(now);
        if self.core.lifecycle() == Lifecycle::Stopped {
            self.timer.stop();
        }
    }

    /// Apply a pending interval request drained from the settings-sync
    /// handler. Rearming preserves armed/disarmed status, so no tick
    /// fires at the old interval once the update takes effect.
    fn apply_interval_requests(&mut self) {
        if let Some(interval_ms) = self.interval.take() {
            debug!(interval_ms, "applying tick interval from pending settings");
            self.timer.update_interval(interval_ms);
        }
    }
}
