//! Microtask Scheduler - the single suspension point of the toolkit.
//!
//! Tasks queued here run at the next microtask checkpoint: after the current
//! synchronous work unwinds, in FIFO order, before the host's next externally
//! scheduled task. The host (or a test) reaches a checkpoint by calling
//! [`run_microtasks`].
//!
//! # Example
//!
//! ```ignore
//! use spark_elements::scheduler;
//!
//! scheduler::queue_microtask(|| println!("later"));
//! println!("now");
//! scheduler::run_microtasks(); // prints "later"
//! ```

use std::cell::RefCell;
use std::collections::VecDeque;

use crate::types::Microtask;

thread_local! {
    static MICROTASKS: RefCell<VecDeque<Microtask>> = RefCell::new(VecDeque::new());
}

/// Queue a task for the next microtask checkpoint.
pub fn queue_microtask(task: impl FnOnce() + 'static) {
    MICROTASKS.with(|queue| queue.borrow_mut().push_back(Box::new(task)));
}

/// Drain the queue, including tasks queued while draining.
///
/// Returns the number of tasks run.
pub fn run_microtasks() -> usize {
    let mut ran = 0;
    loop {
        // Pop before running so a task can queue more work.
        let next = MICROTASKS.with(|queue| queue.borrow_mut().pop_front());
        let Some(task) = next else { break };
        task();
        ran += 1;
    }
    if ran > 0 {
        tracing::trace!(ran, "microtask checkpoint");
    }
    ran
}

/// Number of tasks waiting for the next checkpoint.
pub fn pending_microtasks() -> usize {
    MICROTASKS.with(|queue| queue.borrow().len())
}

/// Drop all queued tasks without running them (for testing).
pub fn reset_scheduler() {
    MICROTASKS.with(|queue| queue.borrow_mut().clear());
}
