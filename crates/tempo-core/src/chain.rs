//! The middleware chain: an ordered, resettable, single-pass dispatcher.
//!
//! A [`Chain`] holds handlers in order plus a cursor marking the next one
//! to run. [`Chain::handle`] advances the cursor and delegates to the
//! handler it pointed at; that handler continues the chain by calling back
//! into the chain reference it was given, or short-circuits by simply not
//! calling onward. A chain must be [`reset()`](Chain::reset) before it can
//! run again.
//!
//! Concurrent or re-entrant runs of one chain instance are unsupported:
//! the cursor is a single shared field, so callers must serialize runs
//! externally (the engine does this by construction).

use std::fmt;
use std::sync::{Arc, Mutex};

use crate::context::Context;
use crate::error::HandlerError;

/// A unit of behavior invoked with the shared context and a reference to
/// the chain being run.
///
/// The `chain` argument is the chain that dispatched this handler. Calling
/// `chain.handle(ctx)` from inside the handler runs the next handler in
/// order; returning without calling onward ends the run after this
/// handler (short-circuit — e.g. to abort remaining processing on a fatal
/// input).
pub trait Handler: Send + Sync {
    /// Run this handler against the shared context.
    fn handle(&self, ctx: &mut Context, chain: &mut Chain) -> Result<(), HandlerError>;
}

// ── Chain ───────────────────────────────────────────────────────

/// Ordered collection of handlers with a cursor, executed one at a time,
/// in order, at most once per handler per run.
///
/// Invariant: `0 <= offset <= len`. A full run advances the cursor to
/// `len`; a failed run leaves it wherever the failure occurred, and the
/// chain is dirty until [`reset()`](Chain::reset).
pub struct Chain {
    handlers: Vec<Arc<dyn Handler>>,
    offset: usize,
}

impl Chain {
    /// Build a chain over an ordered handler list. Empty lists are valid:
    /// the resulting chain is a no-op.
    pub fn new(handlers: Vec<Arc<dyn Handler>>) -> Self {
        Self {
            handlers,
            offset: 0,
        }
    }

    /// Run the handler at the cursor, if any remains.
    ///
    /// The cursor advances by one *before* delegating, so the handler sees
    /// a chain whose next `handle` call dispatches its successor. With no
    /// handler remaining this resolves immediately with no effect.
    pub fn handle(&mut self, ctx: &mut Context) -> Result<(), HandlerError> {
        let Some(handler) = self.handlers.get(self.offset).cloned() else {
            return Ok(());
        };
        self.offset += 1;
        handler.handle(ctx, self)
    }

    /// Restore the cursor to the first handler so the chain can run again.
    pub fn reset(&mut self) {
        self.offset = 0;
    }

    /// Number of handlers in the chain.
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Whether the chain holds no handlers at all.
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Current cursor position (the index of the next handler to run).
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Whether every handler has been dispatched this run.
    pub fn is_exhausted(&self) -> bool {
        self.offset >= self.handlers.len()
    }
}

impl fmt::Debug for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Chain")
            .field("handlers", &self.handlers.len())
            .field("offset", &self.offset)
            .finish()
    }
}

// ── FnHandler ───────────────────────────────────────────────────

/// Adapter wrapping an arbitrary closure in the [`Handler`] contract.
///
/// The closure receives the same `(context, chain)` pair as a full
/// handler and decides itself whether to continue the chain.
pub struct FnHandler<F>(F);

impl<F> FnHandler<F>
where
    F: Fn(&mut Context, &mut Chain) -> Result<(), HandlerError> + Send + Sync,
{
    /// Wrap a closure as a handler.
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

impl<F> Handler for FnHandler<F>
where
    F: Fn(&mut Context, &mut Chain) -> Result<(), HandlerError> + Send + Sync,
{
    fn handle(&self, ctx: &mut Context, chain: &mut Chain) -> Result<(), HandlerError> {
        (self.0)(ctx, chain)
    }
}

/// Convenience: wrap a closure as a ready-to-register handler.
pub fn handler_fn<F>(f: F) -> Arc<dyn Handler>
where
    F: Fn(&mut Context, &mut Chain) -> Result<(), HandlerError> + Send + Sync + 'static,
{
    Arc::new(FnHandler::new(f))
}

// ── NestedChain ─────────────────────────────────────────────────

/// Adapter letting a whole chain act as one handler of a parent chain.
///
/// Running the nested chain runs its own handlers with its own cursor.
/// If the inner run completes (every inner handler dispatched), the
/// parent chain is continued; if the inner run short-circuited, the
/// parent short-circuits too. The inner cursor is reset after each
/// completed or short-circuited run, so the sub-chain is reusable; a
/// failed inner run propagates and leaves the inner cursor dirty.
pub struct NestedChain {
    inner: Mutex<Chain>,
}

impl NestedChain {
    /// Wrap a chain for use as a single handler.
    pub fn new(chain: Chain) -> Self {
        Self {
            inner: Mutex::new(chain),
        }
    }
}

impl Handler for NestedChain {
    fn handle(&self, ctx: &mut Context, parent: &mut Chain) -> Result<(), HandlerError> {
        let completed = {
            // Uncontended: chains have a single logical owner.
            let mut inner = self.inner.lock().expect("nested chain lock poisoned");
            inner.handle(ctx)?;
            let completed = inner.is_exhausted();
            inner.reset();
            completed
        };
        if completed {
            parent.handle(ctx)
        } else {
            Ok(())
        }
    }
}
