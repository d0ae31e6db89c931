//! Runtime Test Suite
//!
//! End-to-end tests of the public `tether` API: chains, sequences, step
//! machines and the deferred host loop, driven the way an embedding
//! application drives them.
//!
//! ## Running Tests
//!
//! ```bash
//! # Run all runtime tests
//! cargo test --test runtime
//!
//! # Run sequence tests only
//! cargo test --test runtime sequence::
//! ```

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::sync::Once;

use tether::prelude::*;

// Test modules
pub mod config;
pub mod sequence;
pub mod step_machine;

// =============================================================================
// SHARED TEST UTILITIES
// =============================================================================

static INIT_LOGGING: Once = Once::new();

/// Install a test-writer tracing subscriber once per test binary
pub fn init_test_logging() {
    INIT_LOGGING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::TRACE)
            .with_test_writer()
            .with_target(true)
            .with_ansi(false)
            .try_init();
    });
}

/// Runtime with default policy and an empty deferred queue
pub fn fresh_runtime() -> Tether {
    init_test_logging();
    let tether = Tether::new();
    tether.shutdown();
    tether
}

/// Shared event log for ordering assertions
#[derive(Clone, Default)]
pub struct EventLog(Rc<RefCell<Vec<String>>>);

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, event: impl Into<String>) {
        self.0.borrow_mut().push(event.into());
    }

    pub fn events(&self) -> Vec<String> {
        self.0.borrow().clone()
    }
}

/// Leaf operation standing in for native work, plus a counter of cancel requests
pub fn native_work() -> (Operation, Rc<Cell<u32>>) {
    let cancels = Rc::new(Cell::new(0));
    let count = cancels.clone();
    let op = Operation::with_cancel(move |op| {
        count.set(count.get() + 1);
        op.set_state_deferred(AsyncState::Canceled);
    });
    (op, cancels)
}

/// Operation that settles in `state` with `result`
pub fn settled(state: AsyncState, result: impl Into<Value>) -> Operation {
    let op = Operation::new();
    op.set_result(result);
    op.set_state(state);
    op
}
