//! Operation: the atomic unit of asynchronous work
//!
//! An [`Operation`] is a shared handle. Cloning it shares the same state,
//! result and handler slots; it never duplicates work.
//!
//! ## State Transitions
//!
//! ```text
//! set_state(s):
//!   s == current            -> no-op
//!   current is terminal     -> ignored (logged; caller error)
//!   s is None               -> ignored (logged; caller error)
//!   otherwise               -> state = s
//!   s is terminal           -> take completion handler, invoke it once,
//!                              release keep-alive attachments,
//!                              leave the pending registry
//! ```
//!
//! Handlers run synchronously on the thread that reported the transition.
//! Nothing is ever held borrowed while a handler runs, so handlers may freely
//! read the operation, set its result, attach further links or cancel other
//! operations.
//!
//! ## Ownership
//!
//! A chain link owns its upstream until the upstream settles; the upstream
//! owns the link (through its completion handler) for the same period. The
//! cycle is broken on the terminal transition.

use crate::handler::{CompletionHandler, Progress, ProgressHandler};
use crate::pending;
use std::any::Any;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;
use tether_core::{AsyncState, Error, OperationId, Result, Value};
use tether_host::dispatch;

/// What produced an operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    /// Backed directly by native or platform work
    Leaf,
    /// Chain link created by `Promise::then`
    Completion,
    /// Chain link created by `Promise::modify_state`
    StateChange,
    /// Summary of a sequence
    Aggregate,
}

/// Custom cancel action of an operation
pub type CancelHook = Rc<dyn Fn(&Operation)>;

#[derive(Clone)]
enum CancelBehavior {
    /// Transition to `Canceled`
    Transition,
    /// Delegate to the work's owner
    Hook(CancelHook),
    /// Forward upstream; `None` once the upstream has settled
    Upstream(Option<Operation>),
}

struct Inner {
    id: OperationId,
    kind: OperationKind,
    state: Cell<AsyncState>,
    result: RefCell<Value>,
    completion: RefCell<Option<CompletionHandler>>,
    progress: RefCell<Option<Rc<dyn ProgressHandler>>>,
    cancel: RefCell<CancelBehavior>,
    keep_alive: RefCell<Vec<Rc<dyn Any>>>,
    pending: Cell<bool>,
}

/// Trackable unit of asynchronous work
#[derive(Clone)]
pub struct Operation {
    inner: Rc<Inner>,
}

impl Operation {
    /// Create a running leaf operation whose `cancel()` transitions it to `Canceled`
    pub fn new() -> Self {
        Self::build(OperationKind::Leaf, CancelBehavior::Transition)
    }

    /// Create a running leaf operation whose `cancel()` calls `hook`
    ///
    /// The hook is a best-effort request to the underlying work; the work
    /// reports `Canceled` itself (or ignores the request).
    pub fn with_cancel<F>(hook: F) -> Self
    where
        F: Fn(&Operation) + 'static,
    {
        Self::build(OperationKind::Leaf, CancelBehavior::Hook(Rc::new(hook)))
    }

    /// Create a running operation of the given kind with a cancel hook
    pub fn with_kind<F>(kind: OperationKind, hook: F) -> Self
    where
        F: Fn(&Operation) + 'static,
    {
        Self::build(kind, CancelBehavior::Hook(Rc::new(hook)))
    }

    pub(crate) fn link(kind: OperationKind, upstream: Operation) -> Self {
        Self::build(kind, CancelBehavior::Upstream(Some(upstream)))
    }

    fn build(kind: OperationKind, cancel: CancelBehavior) -> Self {
        Operation {
            inner: Rc::new(Inner {
                id: OperationId::next(),
                kind,
                state: Cell::new(AsyncState::Started),
                result: RefCell::new(Value::Null),
                completion: RefCell::new(None),
                progress: RefCell::new(None),
                cancel: RefCell::new(cancel),
                keep_alive: RefCell::new(Vec::new()),
                pending: Cell::new(false),
            }),
        }
    }

    /// Already-completed operation carrying `value`
    pub fn completed(value: impl Into<Value>) -> Self {
        let operation = Self::new();
        operation.set_result(value.into());
        operation.set_state(AsyncState::Completed);
        operation
    }

    /// Already-failed operation
    pub fn failed() -> Self {
        let operation = Self::new();
        operation.set_state(AsyncState::Failed);
        operation
    }

    /// Operation that completes with `value` on the next turn of the event loop
    pub fn completed_deferred(value: impl Into<Value>) -> Self {
        let operation = Self::new();
        operation.set_result(value.into());
        operation.set_state_deferred(AsyncState::Completed);
        operation
    }

    /// Operation that fails on the next turn of the event loop
    pub fn failed_deferred() -> Self {
        let operation = Self::new();
        operation.set_state_deferred(AsyncState::Failed);
        operation
    }

    /// Release `operation` on a later turn of the event loop
    ///
    /// For handles that must outlive the handler currently running on them,
    /// so that late observers can still read the final result.
    pub fn defer_destruction(operation: Operation) {
        tracing::trace!(operation = %operation.id(), "Deferring destruction");
        dispatch::post(move || drop(operation));
    }

    /// Identifier of this operation
    pub fn id(&self) -> OperationId {
        self.inner.id
    }

    /// What produced this operation
    pub fn kind(&self) -> OperationKind {
        self.inner.kind
    }

    /// Current state
    pub fn state(&self) -> AsyncState {
        self.inner.state.get()
    }

    /// True once the state is `Completed`, `Failed` or `Canceled`
    pub fn is_terminal(&self) -> bool {
        self.state().is_terminal()
    }

    /// Copy of the result payload
    pub fn result(&self) -> Value {
        self.inner.result.borrow().clone()
    }

    /// Store the result payload; never changes the state
    pub fn set_result(&self, value: impl Into<Value>) {
        *self.inner.result.borrow_mut() = value.into();
    }

    /// True if both handles refer to the same operation
    pub fn ptr_eq(&self, other: &Operation) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Change the state
    ///
    /// Idempotent for the current state. Once terminal the state is frozen;
    /// a conflicting request is a caller error and is logged and ignored, as
    /// is a request to go back to `None`.
    pub fn set_state(&self, state: AsyncState) {
        let current = self.state();
        if current == state {
            return;
        }
        if current.is_terminal() {
            tracing::warn!(
                operation = %self.id(),
                current = %current,
                requested = %state,
                "Ignoring state change of a settled operation"
            );
            return;
        }
        if state == AsyncState::None {
            tracing::warn!(
                operation = %self.id(),
                current = %current,
                "Ignoring reset of a running operation to none"
            );
            return;
        }

        self.inner.state.set(state);
        tracing::trace!(operation = %self.id(), kind = ?self.kind(), state = %state, "State changed");

        if state.is_terminal() {
            self.settle();
        }
    }

    /// Change the state on the next turn of the event loop
    pub fn set_state_deferred(&self, state: AsyncState) {
        let operation = self.clone();
        dispatch::post(move || operation.set_state(state));
    }

    fn settle(&self) {
        let handler = self.inner.completion.borrow_mut().take();
        if let Some(handler) = handler {
            handler.invoke(self);
        }

        let retained = std::mem::take(&mut *self.inner.keep_alive.borrow_mut());
        drop(retained);

        if self.inner.pending.replace(false) {
            pending::release(self);
        }
    }

    /// Request cancellation
    ///
    /// Leaf: transitions to `Canceled` (or runs its cancel hook). Chain link:
    /// forwards to its upstream and derives its own state from the upstream's
    /// eventual outcome. No-op once terminal.
    pub fn cancel(&self) {
        if self.is_terminal() {
            return;
        }
        let behavior = self.inner.cancel.borrow().clone();
        match behavior {
            CancelBehavior::Transition => self.set_state(AsyncState::Canceled),
            CancelBehavior::Hook(hook) => hook(self),
            CancelBehavior::Upstream(Some(upstream)) => {
                tracing::trace!(operation = %self.id(), upstream = %upstream.id(), "Forwarding cancel");
                upstream.cancel();
            }
            CancelBehavior::Upstream(None) => {}
        }
    }

    pub(crate) fn release_upstream(&self) {
        let released = match &mut *self.inner.cancel.borrow_mut() {
            CancelBehavior::Upstream(upstream) => upstream.take(),
            _ => None,
        };
        drop(released);
    }

    /// True while a chain link still holds its upstream
    pub fn has_upstream(&self) -> bool {
        matches!(&*self.inner.cancel.borrow(), CancelBehavior::Upstream(Some(_)))
    }

    /// Release held resources without changing the state
    ///
    /// Drops the progress handler, the completion handler and keep-alive
    /// attachments. Used for operations the caller abandons.
    pub fn close(&self) {
        let progress = self.inner.progress.borrow_mut().take();
        let handler = self.inner.completion.borrow_mut().take();
        let retained = std::mem::take(&mut *self.inner.keep_alive.borrow_mut());
        tracing::trace!(operation = %self.id(), "Closed");
        drop((progress, handler, retained));
    }

    /// Attach the completion handler
    ///
    /// If the operation is already terminal the handler runs immediately.
    /// An operation accepts exactly one handler.
    pub fn set_completion_handler(&self, handler: CompletionHandler) -> Result<()> {
        if self.is_terminal() {
            handler.invoke(self);
            return Ok(());
        }
        let mut slot = self.inner.completion.borrow_mut();
        if slot.is_some() {
            return Err(Error::HandlerAlreadyAttached {
                operation: self.id(),
            });
        }
        *slot = Some(handler);
        Ok(())
    }

    /// True while a completion handler is waiting for this operation
    pub fn has_completion_handler(&self) -> bool {
        self.inner.completion.borrow().is_some()
    }

    /// Attach (or replace) the progress handler
    pub fn set_progress_handler(&self, handler: Option<Rc<dyn ProgressHandler>>) {
        *self.inner.progress.borrow_mut() = handler;
    }

    /// Current progress handler
    pub fn progress_handler(&self) -> Option<Rc<dyn ProgressHandler>> {
        self.inner.progress.borrow().clone()
    }

    /// Push a progress update to the progress handler, if any
    pub fn report_progress(&self, progress: Progress) {
        if let Some(handler) = self.progress_handler() {
            handler.on_progress(&progress);
        }
    }

    /// Keep `object` alive until this operation settles
    ///
    /// Attachments are released right after the completion handler ran. On
    /// an operation that already settled the object is dropped immediately.
    pub fn retain_until_settled(&self, object: Rc<dyn Any>) {
        if self.is_terminal() {
            return;
        }
        self.inner.keep_alive.borrow_mut().push(object);
    }

    pub(crate) fn mark_pending(&self) -> bool {
        !self.inner.pending.replace(true)
    }
}

impl Default for Operation {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Operation")
            .field("id", &self.id())
            .field("kind", &self.kind())
            .field("state", &self.state())
            .finish()
    }
}
