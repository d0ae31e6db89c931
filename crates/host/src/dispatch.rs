//! Deferred dispatch queue
//!
//! Work that must not run on the current stack (a state change reported from
//! inside a native callback, the teardown of an operation that a handler is
//! still executing) is posted here and retired on a later turn of the host
//! event loop.
//!
//! The queue is thread-local: the runtime is bound to the thread that drives
//! the event loop, and so is everything it posts.
//!
//! # Ordering
//!
//! Tasks run in FIFO order. Tasks posted while the queue is draining run in
//! the same drain, after everything that was already queued.

use std::cell::RefCell;
use std::collections::VecDeque;

/// One-shot unit of deferred work
pub type Task = Box<dyn FnOnce()>;

thread_local! {
    static QUEUE: RefCell<VecDeque<Task>> = RefCell::new(VecDeque::new());
}

/// Post a task to run on a later turn of the event loop
pub fn post<F>(task: F)
where
    F: FnOnce() + 'static,
{
    QUEUE.with(|queue| queue.borrow_mut().push_back(Box::new(task)));
}

/// Number of tasks waiting to run
pub fn pending_count() -> usize {
    QUEUE.with(|queue| queue.borrow().len())
}

/// Run queued tasks until the queue is empty
///
/// Returns the number of tasks that ran. The queue is never borrowed while a
/// task executes, so tasks may post further tasks.
pub fn drain() -> usize {
    let mut ran = 0;
    while let Some(task) = QUEUE.with(|queue| queue.borrow_mut().pop_front()) {
        task();
        ran += 1;
    }
    if ran > 0 {
        tracing::trace!(tasks = ran, "Drained deferred queue");
    }
    ran
}

/// Drop every queued task without running it
///
/// Returns the number of discarded tasks. Used when the host loop shuts down.
pub fn discard() -> usize {
    let tasks: Vec<Task> = QUEUE.with(|queue| queue.borrow_mut().drain(..).collect());
    let count = tasks.len();
    // Dropped outside the borrow: a task's captures may post on drop.
    drop(tasks);
    if count > 0 {
        tracing::debug!(tasks = count, "Discarded deferred tasks");
    }
    count
}
