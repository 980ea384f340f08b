//! Change Batching - coalesce notifications from several sources.
//!
//! N synchronous writes to N watched attributes must not cause N re-render
//! passes. A [`ChangeBatch`] arms one deferred invocation on the first change
//! of any of its sources and ignores further changes until that invocation
//! runs. The callback takes no arguments; it re-reads its sources itself.
//!
//! ```text
//! set(a) ─┐
//! set(b) ─┼─> armed (pending) ──checkpoint──> callback() ──> idle
//! set(c) ─┘
//! ```
//!
//! A change that arrives after the callback ran opens a new window, including
//! a change made by the callback itself (no synchronous recursion).
//!
//! Once released, a batch never fires again, even if it was armed before the
//! release.

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use crate::types::{Cleanup, Microtask};

/// Something that notifies on change, e.g. an attribute binding.
pub trait ChangeSource {
    /// Call `listener` after every change. Returns the unsubscribe function.
    fn subscribe_change(&self, listener: Rc<dyn Fn()>) -> Cleanup;

    /// Identifies the source in logs.
    fn source_key(&self) -> &str;
}

/// Schedules a task for the next microtask checkpoint.
pub type Schedule = Rc<dyn Fn(Microtask)>;

struct BatchState {
    pending: Cell<bool>,
    released: Cell<bool>,
    fired: Cell<usize>,
    callback: Rc<dyn Fn()>,
    schedule: Schedule,
}

/// One batched multi-source subscription.
#[derive(Clone)]
pub struct ChangeBatch {
    state: Rc<BatchState>,
}

impl fmt::Debug for ChangeBatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangeBatch")
            .field("pending", &self.state.pending.get())
            .field("released", &self.state.released.get())
            .field("fired", &self.state.fired.get())
            .finish()
    }
}

impl ChangeBatch {
    pub fn new(schedule: Schedule, callback: impl Fn() + 'static) -> Self {
        Self {
            state: Rc::new(BatchState {
                pending: Cell::new(false),
                released: Cell::new(false),
                fired: Cell::new(0),
                callback: Rc::new(callback),
                schedule,
            }),
        }
    }

    /// Subscribe to `source`. Returns the unsubscribe function.
    pub fn watch(&self, source: &dyn ChangeSource) -> Cleanup {
        let state = self.state.clone();
        let key = source.source_key().to_string();
        source.subscribe_change(Rc::new(move || {
            tracing::trace!(source = %key, "batched source changed");
            arm(&state);
        }))
    }

    /// Subscribe to every source, returning one unsubscribe per source
    /// followed by the release of the batch itself.
    pub fn watch_all(&self, sources: &[&dyn ChangeSource]) -> Vec<Cleanup> {
        let mut cleanups: Vec<Cleanup> = sources.iter().map(|source| self.watch(*source)).collect();
        let state = self.state.clone();
        cleanups.push(Box::new(move || state.released.set(true)));
        cleanups
    }

    /// Stop firing. An invocation armed earlier is dropped.
    pub fn release(&self) {
        self.state.released.set(true);
    }

    pub fn is_pending(&self) -> bool {
        self.state.pending.get()
    }

    pub fn is_released(&self) -> bool {
        self.state.released.get()
    }

    /// How many times the callback has run.
    pub fn fire_count(&self) -> usize {
        self.state.fired.get()
    }
}

fn arm(state: &Rc<BatchState>) {
    if state.released.get() || state.pending.replace(true) {
        return;
    }
    tracing::trace!("change batch armed");

    let armed = state.clone();
    (state.schedule)(Box::new(move || {
        armed.pending.set(false);
        if armed.released.get() {
            tracing::trace!("released change batch dropped");
            return;
        }
        armed.fired.set(armed.fired.get() + 1);
        (armed.callback)();
    }));
}

// =============================================================================
// TESTS
// =============================================================================
