//! The built-in settings-sync handler and the interval request cell.
//!
//! Application middlewares change the cadence of future ticks by writing
//! `pending_settings["tickInterval"]` — the engine exposes no direct
//! interval-mutation API. The settings-sync handler is always the first
//! handler of the tick chain (a fixed contract, not a hidden side
//! effect): it drains the pending settings, pushes a recognized interval
//! into the shared [`IntervalCell`], and continues the chain.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use tempo_core::{Chain, Context, Handler, HandlerError};

/// The pending-settings key recognized by the settings-sync handler: a
/// numeric value in milliseconds for the tick interval.
pub const TICK_INTERVAL_KEY: &str = "tickInterval";

/// Sentinel stored in the cell when no request is pending.
const EMPTY: u64 = u64::MAX;

// ── IntervalCell ────────────────────────────────────────────────

/// Single-slot atomic carrying a requested tick interval from the
/// settings-sync handler to the scheduler side.
///
/// The handler runs inside a chain (possibly on the loop thread), the
/// consumer is whichever component owns the timer; an atomic slot keeps
/// the hand-off lock-free. A later request overwrites an unconsumed one.
pub struct IntervalCell(AtomicU64);

impl IntervalCell {
    /// Create an empty cell.
    pub fn new() -> Self {
        Self(AtomicU64::new(EMPTY))
    }

    /// Record a requested interval in milliseconds.
    pub fn request(&self, interval_ms: u64) {
        // u64::MAX is the empty sentinel; clamp just below it.
        self.0.store(interval_ms.min(EMPTY - 1), Ordering::Release);
    }

    /// Consume the pending request, if any.
    pub fn take(&self) -> Option<u64> {
        match self.0.swap(EMPTY, Ordering::AcqRel) {
            EMPTY => None,
            interval_ms => Some(interval_ms),
        }
    }
}

impl Default for IntervalCell {
    fn default() -> Self {
        Self::new()
    }
}

// ── SettingsSync ────────────────────────────────────────────────

/// The privileged first handler of every tick chain.
///
/// Drains `pending_settings` completely. The recognized key
/// [`TICK_INTERVAL_KEY`] is pushed into the interval cell; unrecognized
/// keys are ignored (forward-compatible). Always continues the chain.
pub struct SettingsSync {
    interval: Arc<IntervalCell>,
}

impl SettingsSync {
    /// Build a settings-sync handler feeding the given cell.
    pub fn new(interval: Arc<IntervalCell>) -> Self {
        Self { interval }
    }
}

impl Handler for SettingsSync {
    fn handle(&self, ctx: &mut Context, chain: &mut Chain) -> Result<(), HandlerError> {
        for (key, value) in ctx.take_pending_settings() {
            match key.as_str() {
                TICK_INTERVAL_KEY => match as_millis(&value) {
                    Some(interval_ms) => self.interval.request(interval_ms),
                    None => debug!(%value, "non-numeric tickInterval ignored"),
                },
                other => debug!(key = other, "unrecognized pending setting ignored"),
            }
        }
        chain.handle(ctx)
    }
}

/// Interpret a settings value as a millisecond count.
fn as_millis(value: &Value) -> Option<u64> {
    value.as_u64().or_else(|| {
        value
            .as_f64()
            .filter(|ms| ms.is_finite() && *ms >= 0.0)
            .map(|ms| ms as u64)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn run_sync(ctx: &mut Context, cell: &Arc<IntervalCell>) {
        let mut chain = Chain::new(vec![Arc::new(SettingsSync::new(Arc::clone(cell)))
            as Arc<dyn Handler>]);
        chain.handle(ctx).unwrap();
    }

    #[test]
    fn recognized_interval_lands_in_cell() {
        let cell = Arc::new(IntervalCell::new());
        let mut ctx = Context::default();
        ctx.pending_settings
            .insert(TICK_INTERVAL_KEY.to_string(), json!(500));

        run_sync(&mut ctx, &cell);
        assert_eq!(cell.take(), Some(500));
        assert!(ctx.pending_settings.is_empty(), "settings are drained");
    }

    #[test]
    fn float_intervals_are_accepted() {
        let cell = Arc::new(IntervalCell::new());
        let mut ctx = Context::default();
        ctx.pending_settings
            .insert(TICK_INTERVAL_KEY.to_string(), json!(250.0));

        run_sync(&mut ctx, &cell);
        assert_eq!(cell.take(), Some(250));
    }

    #[test]
    fn unrecognized_keys_are_drained_and_ignored() {
        let cell = Arc::new(IntervalCell::new());
        let mut ctx = Context::default();
        ctx.pending_settings.insert("volume".to_string(), json!(11));

        run_sync(&mut ctx, &cell);
        assert_eq!(cell.take(), None);
        assert!(ctx.pending_settings.is_empty());
    }

    #[test]
    fn non_numeric_interval_is_ignored() {
        let cell = Arc::new(IntervalCell::new());
        let mut ctx = Context::default();
        ctx.pending_settings
            .insert(TICK_INTERVAL_KEY.to_string(), json!("fast"));

        run_sync(&mut ctx, &cell);
        assert_eq!(cell.take(), None);
    }

    #[test]
    fn settings_sync_continues_the_chain() {
        let cell = Arc::new(IntervalCell::new());
        let mut chain = Chain::new(vec![
            Arc::new(SettingsSync::new(Arc::clone(&cell))) as Arc<dyn Handler>,
            tempo_core::handler_fn(|ctx, chain| {
                ctx.state_data.insert("ran".to_string(), json!(true));
                chain.handle(ctx)
            }),
        ]);
        let mut ctx = Context::default();
        chain.handle(&mut ctx).unwrap();
        assert_eq!(ctx.state_data.get("ran"), Some(&json!(true)));
    }

    #[test]
    fn cell_take_is_consume_once() {
        let cell = IntervalCell::new();
        cell.request(100);
        assert_eq!(cell.take(), Some(100));
        assert_eq!(cell.take(), None);
    }

    #[test]
    fn later_request_overwrites_unconsumed_one() {
        let cell = IntervalCell::new();
        cell.request(100);
        cell.request(200);
        assert_eq!(cell.take(), Some(200));
    }
}
