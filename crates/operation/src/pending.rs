//! Pending operation registry
//!
//! A leaf operation whose completion arrives through a native callback may
//! have no other owner while that callback is outstanding (the caller dropped
//! its promise, or handed it to a chain that is itself only owned by the leaf).
//! Registering the leaf here keeps it alive until it settles.
//!
//! Lifecycle:
//! - [`register`] when the native work starts
//! - deregistered exactly once, by the operation itself, on its terminal
//!   transition; the registry's handle is then released through
//!   [`Operation::defer_destruction`] so that handlers still running on the
//!   stack can finish with it

use crate::operation::Operation;
use std::cell::RefCell;
use std::collections::HashMap;
use tether_core::OperationId;

thread_local! {
    static PENDING: RefCell<HashMap<OperationId, Operation>> = RefCell::new(HashMap::new());
}

/// Keep `operation` alive until it settles
///
/// Registering a settled operation, or one that is already registered, does
/// nothing. Returns whether the operation was added.
pub fn register(operation: &Operation) -> bool {
    if operation.is_terminal() || !operation.mark_pending() {
        return false;
    }
    PENDING.with(|pending| {
        pending
            .borrow_mut()
            .insert(operation.id(), operation.clone())
    });
    tracing::debug!(operation = %operation.id(), "Registered pending operation");
    true
}

/// True while `id` is held by the registry
pub fn is_registered(id: OperationId) -> bool {
    PENDING.with(|pending| pending.borrow().contains_key(&id))
}

/// Number of operations held by the registry
pub fn count() -> usize {
    PENDING.with(|pending| pending.borrow().len())
}

pub(crate) fn release(operation: &Operation) {
    let held = PENDING.with(|pending| pending.borrow_mut().remove(&operation.id()));
    if let Some(held) = held {
        tracing::debug!(operation = %operation.id(), state = %operation.state(), "Released pending operation");
        Operation::defer_destruction(held);
    }
}
