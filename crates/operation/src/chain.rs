//! Chain links
//!
//! A chain link is an operation that is at the same time the completion
//! handler of its upstream. Each link observes its predecessor and is
//! observable by its successor, so a chain is a singly-linked list of
//! operations resolved front to back.
//!
//! ```text
//! upstream settles:
//!   1. link -> Started (running marker)
//!   2. completion link: run user handler with the upstream
//!      state-change link: copy result, ask the modifier for the new state
//!   3. completion link: copy upstream result and state
//!   4. release the upstream reference
//! ```
//!
//! A link's state is only ever set from inside this callback. Cancelling a
//! link forwards to the upstream; the outcome comes back through step 1–4.

use crate::handler::{CompletionHandler, StateModifier};
use crate::operation::{Operation, OperationKind};
use tether_core::{AsyncState, Error};

/// Create a completion link on `upstream`
pub(crate) fn completion_link(upstream: &Operation, handler: Option<CompletionHandler>) -> Operation {
    let link = Operation::link(OperationKind::Completion, upstream.clone());
    let downstream = link.clone();
    let attached = upstream.set_completion_handler(CompletionHandler::new(move |source| {
        downstream.set_state(AsyncState::Started);
        if let Some(handler) = handler {
            handler.invoke(source);
        }
        downstream.set_result(source.result());
        downstream.set_state(source.state());
        downstream.release_upstream();
    }));
    if let Err(e) = attached {
        reject(&link, e);
    }
    link
}

/// Create a state-change link on `upstream`
pub(crate) fn state_change_link(upstream: &Operation, modifier: StateModifier) -> Operation {
    let link = Operation::link(OperationKind::StateChange, upstream.clone());
    let downstream = link.clone();
    let attached = upstream.set_completion_handler(CompletionHandler::new(move |source| {
        downstream.set_state(AsyncState::Started);
        downstream.set_result(source.result());

        let state = modifier.apply(source);
        let state = if state.is_terminal() {
            state
        } else {
            tracing::warn!(
                operation = %downstream.id(),
                requested = %state,
                "State modifier returned a running state; resolving as failed"
            );
            AsyncState::Failed
        };
        downstream.set_state(state);
        downstream.release_upstream();
    }));
    if let Err(e) = attached {
        reject(&link, e);
    }
    link
}

fn reject(link: &Operation, error: Error) {
    tracing::error!(operation = %link.id(), error = %error, "Cannot chain link; resolving as failed");
    link.release_upstream();
    link.set_state(AsyncState::Failed);
}
