//! Test handlers and fixtures for Tempo development.
//!
//! Provides handler implementations with observable side effects
//! (recording, counting, failing) for exercising chains and engines in
//! tests.

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tempo_core::{Chain, Context, Handler, HandlerError};

/// A shared, lockable event log for [`RecordingHandler`].
pub type SharedLog = Arc<Mutex<Vec<String>>>;

/// Create an empty shared log.
pub fn shared_log() -> SharedLog {
    Arc::new(Mutex::new(Vec::new()))
}

/// Handler that appends its label to a shared log, then continues the
/// chain (or not, when built with [`terminal`](RecordingHandler::terminal)).
pub struct RecordingHandler {
    label: String,
    log: SharedLog,
    continue_chain: bool,
}

impl RecordingHandler {
    /// Records its label and continues the chain.
    pub fn new(label: impl Into<String>, log: &SharedLog) -> Self {
        Self {
            label: label.into(),
            log: Arc::clone(log),
            continue_chain: true,
        }
    }

    /// Records its label and does NOT call onward — short-circuits.
    pub fn terminal(label: impl Into<String>, log: &SharedLog) -> Self {
        Self {
            label: label.into(),
            log: Arc::clone(log),
            continue_chain: false,
        }
    }
}

impl Handler for RecordingHandler {
    fn handle(&self, ctx: &mut Context, chain: &mut Chain) -> Result<(), HandlerError> {
        self.log.lock().unwrap().push(self.label.clone());
        if self.continue_chain {
            chain.handle(ctx)
        } else {
            Ok(())
        }
    }
}

/// Handler that bumps a shared counter and continues the chain. Handy
/// for counting tick-chain invocations.
pub struct CountingHandler {
    count: Arc<AtomicUsize>,
}

impl CountingHandler {
    pub fn new(count: &Arc<AtomicUsize>) -> Self {
        Self {
            count: Arc::clone(count),
        }
    }
}

impl Handler for CountingHandler {
    fn handle(&self, ctx: &mut Context, chain: &mut Chain) -> Result<(), HandlerError> {
        self.count.fetch_add(1, Ordering::SeqCst);
        chain.handle(ctx)
    }
}

/// Handler that always fails with [`HandlerError::ExecutionFailed`].
pub struct FailingHandler {
    reason: String,
}

impl FailingHandler {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl Handler for FailingHandler {
    fn handle(&self, _ctx: &mut Context, _chain: &mut Chain) -> Result<(), HandlerError> {
        Err(HandlerError::failed(self.reason.clone()))
    }
}

/// Handler that copies `last_input` into `state_data` under a fixed key,
/// then continues. Mirrors the canonical echo scenario.
pub struct EchoHandler {
    key: String,
}

impl EchoHandler {
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }
}

impl Handler for EchoHandler {
    fn handle(&self, ctx: &mut Context, chain: &mut Chain) -> Result<(), HandlerError> {
        let echo = ctx.last_input.clone().unwrap_or(serde_json::Value::Null);
        ctx.state_data.insert(self.key.clone(), echo);
        chain.handle(ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn recording_handler_logs_in_order() {
        let log = shared_log();
        let mut chain = Chain::new(vec![
            Arc::new(RecordingHandler::new("a", &log)) as Arc<dyn Handler>,
            Arc::new(RecordingHandler::new("b", &log)),
        ]);
        let mut ctx = Context::default();
        chain.handle(&mut ctx).unwrap();
        assert_eq!(*log.lock().unwrap(), vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn terminal_handler_short_circuits() {
        let log = shared_log();
        let mut chain = Chain::new(vec![
            Arc::new(RecordingHandler::terminal("a", &log)) as Arc<dyn Handler>,
            Arc::new(RecordingHandler::new("b", &log)),
        ]);
        let mut ctx = Context::default();
        chain.handle(&mut ctx).unwrap();
        assert_eq!(*log.lock().unwrap(), vec!["a".to_string()]);
    }

    #[test]
    fn failing_handler_carries_its_reason() {
        let mut chain =
            Chain::new(vec![Arc::new(FailingHandler::new("nope")) as Arc<dyn Handler>]);
        let mut ctx = Context::default();
        assert_eq!(
            chain.handle(&mut ctx),
            Err(HandlerError::failed("nope"))
        );
    }

    #[test]
    fn echo_handler_copies_input() {
        let mut chain = Chain::new(vec![Arc::new(EchoHandler::new("echo")) as Arc<dyn Handler>]);
        let mut ctx = Context::default();
        ctx.last_input = Some(serde_json::json!("ping"));
        chain.handle(&mut ctx).unwrap();
        assert_eq!(
            ctx.state_data.get("echo"),
            Some(&serde_json::json!("ping"))
        );
    }
}
