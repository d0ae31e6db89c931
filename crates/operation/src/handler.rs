//! Completion handlers, state modifiers and progress handlers
//!
//! Handlers are one-shot closures. The adapters for "call this method on
//! that object" hold the target weakly: a handler never keeps its target
//! alive, and a handler whose target is gone does nothing.

use crate::operation::Operation;
use std::fmt;
use std::rc::{Rc, Weak};
use tether_core::AsyncState;

/// Callback invoked exactly once when an operation reaches a terminal state
pub struct CompletionHandler(Box<dyn FnOnce(&Operation)>);

impl CompletionHandler {
    /// Wrap a closure
    pub fn new<F>(f: F) -> Self
    where
        F: FnOnce(&Operation) + 'static,
    {
        CompletionHandler(Box::new(f))
    }

    /// Call `method` on `target` if it is still alive at completion time
    pub fn method<T: 'static>(target: &Rc<T>, method: fn(&T, &Operation)) -> Self {
        let target: Weak<T> = Rc::downgrade(target);
        Self::new(move |operation| {
            if let Some(target) = target.upgrade() {
                method(&target, operation);
            }
        })
    }

    /// Handler that only observes completion
    pub fn noop() -> Self {
        Self::new(|_| {})
    }

    /// Run the handler with the settled operation
    pub fn invoke(self, operation: &Operation) {
        (self.0)(operation)
    }
}

impl fmt::Debug for CompletionHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CompletionHandler { .. }")
    }
}

/// Computes the terminal state of a chain link from its settled upstream
pub struct StateModifier(Box<dyn FnOnce(&Operation) -> AsyncState>);

impl StateModifier {
    /// Wrap a closure
    pub fn new<F>(f: F) -> Self
    where
        F: FnOnce(&Operation) -> AsyncState + 'static,
    {
        StateModifier(Box::new(f))
    }

    /// Ask `method` on `target`; if the target is gone the upstream state passes through
    pub fn method<T: 'static>(target: &Rc<T>, method: fn(&T, &Operation) -> AsyncState) -> Self {
        let target: Weak<T> = Rc::downgrade(target);
        Self::new(move |operation| match target.upgrade() {
            Some(target) => method(&target, operation),
            None => operation.state(),
        })
    }

    /// Compute the new state
    pub fn apply(self, operation: &Operation) -> AsyncState {
        (self.0)(operation)
    }
}

impl fmt::Debug for StateModifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("StateModifier { .. }")
    }
}

/// Progress update pushed by a long-running operation
#[derive(Debug, Clone, PartialEq)]
pub struct Progress {
    /// Completed fraction in `0.0..=1.0`
    pub fraction: f64,
    /// Optional status text
    pub message: Option<String>,
}

impl Progress {
    /// Progress without a message; the fraction is clamped to `0.0..=1.0`
    pub fn new(fraction: f64) -> Self {
        Progress {
            fraction: fraction.clamp(0.0, 1.0),
            message: None,
        }
    }

    /// Attach a status message
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

/// Receiver of progress updates
///
/// Orthogonal to completion: an operation reports progress any number of
/// times while it is `Started`.
pub trait ProgressHandler {
    /// Called for every progress update
    fn on_progress(&self, progress: &Progress);
}

impl<F> ProgressHandler for F
where
    F: Fn(&Progress),
{
    fn on_progress(&self, progress: &Progress) {
        self(progress)
    }
}
