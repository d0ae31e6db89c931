//! Promise: fluent chain builder over one operation
//!
//! ```ignore
//! let done = Promise::from(fetch())
//!     .then(|op| cache(op.result()))
//!     .modify_state(|op| if op.result().is_null() { AsyncState::Failed } else { op.state() });
//! ```
//!
//! Every combinator consumes the promise and returns a new one over the
//! link it created. Cloning a promise shares the operation.

use crate::chain;
use crate::handler::{CompletionHandler, StateModifier};
use crate::operation::Operation;
use std::ops::Deref;
use std::rc::Rc;
use tether_core::AsyncState;

/// Chain-building wrapper around one operation; never empty
#[derive(Debug, Clone)]
pub struct Promise {
    operation: Operation,
}

impl Promise {
    /// Wrap an operation; a missing operation becomes an already-failed one
    pub fn new(operation: Option<Operation>) -> Self {
        let operation = operation.unwrap_or_else(|| {
            tracing::debug!("Promise over missing operation; substituting failed operation");
            Operation::failed()
        });
        Promise { operation }
    }

    /// Run `f` with the upstream once it settles; the new link then mirrors it
    pub fn then<F>(self, f: F) -> Promise
    where
        F: FnOnce(&Operation) + 'static,
    {
        self.then_handler(CompletionHandler::new(f))
    }

    /// Canonical form of [`Promise::then`]
    pub fn then_handler(self, handler: CompletionHandler) -> Promise {
        Promise {
            operation: chain::completion_link(&self.operation, Some(handler)),
        }
    }

    /// Call `method` on `target` (held weakly) once the upstream settles
    pub fn then_method<T: 'static>(self, target: &Rc<T>, method: fn(&T, &Operation)) -> Promise {
        self.then_handler(CompletionHandler::method(target, method))
    }

    /// Compute the terminal state of the new link from the settled upstream
    pub fn modify_state<F>(self, f: F) -> Promise
    where
        F: FnOnce(&Operation) -> AsyncState + 'static,
    {
        self.modify_state_with(StateModifier::new(f))
    }

    /// Canonical form of [`Promise::modify_state`]
    pub fn modify_state_with(self, modifier: StateModifier) -> Promise {
        Promise {
            operation: chain::state_change_link(&self.operation, modifier),
        }
    }

    /// Ask `method` on `target` (held weakly) for the new state
    pub fn modify_state_method<T: 'static>(
        self,
        target: &Rc<T>,
        method: fn(&T, &Operation) -> AsyncState,
    ) -> Promise {
        self.modify_state_with(StateModifier::method(target, method))
    }

    /// The operation at the end of the chain
    pub fn operation(&self) -> &Operation {
        &self.operation
    }

    /// Give up the promise, keeping its operation
    pub fn into_operation(self) -> Operation {
        self.operation
    }
}

impl From<Operation> for Promise {
    fn from(operation: Operation) -> Self {
        Promise { operation }
    }
}

impl From<Promise> for Operation {
    fn from(promise: Promise) -> Self {
        promise.operation
    }
}

impl Deref for Promise {
    type Target = Operation;

    fn deref(&self) -> &Operation {
        &self.operation
    }
}
