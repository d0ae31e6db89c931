//! Deferred calls
//!
//! A [`Call`] is "start the unit of work and hand back its operation". A
//! sequence invokes each call when its turn comes; a call may be invoked
//! again when a step is retried.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use tether_operation::Operation;

type Thunk = Box<dyn FnMut() -> Operation>;

/// Reusable thunk that starts work and returns its tracking operation
#[derive(Clone)]
pub struct Call(Rc<RefCell<Thunk>>);

impl Call {
    /// Wrap a closure
    pub fn new<F>(f: F) -> Self
    where
        F: FnMut() -> Operation + 'static,
    {
        Call(Rc::new(RefCell::new(Box::new(f))))
    }

    /// Start the work
    ///
    /// A call that is already running further up the stack cannot be
    /// re-entered; such an invocation yields a failed operation.
    pub fn invoke(&self) -> Operation {
        match self.0.try_borrow_mut() {
            Ok(mut thunk) => (&mut **thunk)(),
            Err(_) => {
                tracing::error!("Re-entrant call invocation; returning failed operation");
                Operation::failed()
            }
        }
    }
}

impl fmt::Debug for Call {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Call { .. }")
    }
}
