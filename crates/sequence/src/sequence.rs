//! Ordered, serial execution of calls
//!
//! A [`Sequence`] runs its calls one at a time, in insertion order, and
//! exposes the whole run as one aggregate operation.
//!
//! # State Machine
//!
//! ```text
//! NotStarted ──start()──► Running(0) ──► Running(1) ──► … ──► Finished
//!                              │              ▲
//!                          pause()        resume()
//!                              ▼              │
//!                           Paused(i) ────────┘
//! ```
//!
//! # Step Completion
//!
//! ```text
//! step i settles with state s:
//!   s is Failed/Canceled and cancel_on_error -> aggregate = (s, step result), stop
//!   otherwise                                -> run step handler (if any)
//!   cancel requested                         -> aggregate = Canceled, stop
//!   pause requested                          -> Paused(i)
//!   step i+1 exists                          -> start it
//!   otherwise                                -> finish per AggregatePolicy
//! ```
//!
//! Calls may be added while the sequence runs, typically from a step
//! handler, to grow the pipeline (pagination, retries, branching).
//!
//! # Invariants
//!
//! - **Serial execution**: at most one step operation is non-terminal
//! - **Handler before advance**: a step's handler returns before the next step starts
//! - **Fail-fast**: with `cancel_on_error`, no step after a failed one starts

use crate::call::Call;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};
use tether_core::{AggregatePolicy, AsyncState, Error, ResumeMode, Result, SequenceConfig, Value};
use tether_operation::{CompletionHandler, Operation, OperationKind, Promise};

type StepHandler = Box<dyn FnMut(&Operation)>;

/// Where a sequence is in its run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequenceStatus {
    /// `start()` has not been called
    NotStarted,
    /// Step `i` is in flight
    Running(usize),
    /// Halted after step `i` finished; waiting for `resume()`
    Paused(usize),
    /// The aggregate operation has settled
    Finished,
}

impl fmt::Display for SequenceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SequenceStatus::NotStarted => f.write_str("not started"),
            SequenceStatus::Running(i) => write!(f, "running step {}", i),
            SequenceStatus::Paused(i) => write!(f, "paused after step {}", i),
            SequenceStatus::Finished => f.write_str("finished"),
        }
    }
}

struct CallItem {
    call: Call,
    operation: Option<Operation>,
    handler: Option<StepHandler>,
}

struct Shared {
    config: Cell<SequenceConfig>,
    items: RefCell<Vec<CallItem>>,
    status: Cell<SequenceStatus>,
    /// Index of the next step to start
    next: Cell<usize>,
    /// Index of the most recently started step
    last: Cell<Option<usize>>,
    total: RefCell<Option<Operation>>,
    pause_requested: Cell<bool>,
    cancel_requested: Cell<bool>,
    /// Set while `drive` is on the stack
    driving: Cell<bool>,
    /// Step that settled while `drive` was starting it
    settled: RefCell<Option<(usize, Operation)>>,
}

/// Ordered list of calls executed one at a time
///
/// `Sequence` is a shared handle: clones drive the same run, so a step
/// handler can capture the sequence to add further steps. While a step is in
/// flight, that step's operation keeps the sequence alive.
#[derive(Clone)]
pub struct Sequence {
    shared: Rc<Shared>,
}

impl Sequence {
    /// Create an empty sequence with the default policy
    pub fn new() -> Self {
        Self::with_config(SequenceConfig::default())
    }

    /// Create an empty sequence with `config`
    pub fn with_config(config: SequenceConfig) -> Self {
        Sequence {
            shared: Rc::new(Shared {
                config: Cell::new(config),
                items: RefCell::new(Vec::new()),
                status: Cell::new(SequenceStatus::NotStarted),
                next: Cell::new(0),
                last: Cell::new(None),
                total: RefCell::new(None),
                pause_requested: Cell::new(false),
                cancel_requested: Cell::new(false),
                driving: Cell::new(false),
                settled: RefCell::new(None),
            }),
        }
    }

    /// Current policy
    pub fn config(&self) -> SequenceConfig {
        self.shared.config.get()
    }

    /// Fail-fast flag
    pub fn cancel_on_error(&self) -> bool {
        self.config().cancel_on_error
    }

    /// Set the fail-fast flag; takes effect for the next step that settles
    pub fn set_cancel_on_error(&self, cancel_on_error: bool) {
        self.shared
            .config
            .set(self.config().with_cancel_on_error(cancel_on_error));
    }

    /// Append a call; returns its index
    ///
    /// Allowed before and while running. A call added after the sequence
    /// finished never runs.
    pub fn add(&self, call: Call) -> usize {
        let mut items = self.shared.items.borrow_mut();
        items.push(CallItem {
            call,
            operation: None,
            handler: None,
        });
        let index = items.len() - 1;
        drop(items);

        if self.is_finished() {
            tracing::warn!(index, "Call added to a finished sequence will not run");
        } else {
            tracing::trace!(index, "Call added");
        }
        index
    }

    /// Append a closure as a call; returns its index
    pub fn add_fn<F>(&self, f: F) -> usize
    where
        F: FnMut() -> Operation + 'static,
    {
        self.add(Call::new(f))
    }

    /// Attach a handler to the most recently added call
    ///
    /// The handler runs when that step's operation settles, before the next
    /// step starts. It runs again if the step is retried.
    pub fn then<F>(&self, f: F) -> Result<()>
    where
        F: FnMut(&Operation) + 'static,
    {
        let mut items = self.shared.items.borrow_mut();
        let item = items.last_mut().ok_or(Error::NoStep)?;
        item.handler = Some(Box::new(f));
        Ok(())
    }

    /// Attach a one-shot handler to the most recently added call
    pub fn then_handler(&self, handler: CompletionHandler) -> Result<()> {
        let mut handler = Some(handler);
        self.then(move |operation| {
            if let Some(handler) = handler.take() {
                handler.invoke(operation);
            }
        })
    }

    /// Call `method` on `target` (held weakly) when the most recent call's step settles
    pub fn then_method<T: 'static>(&self, target: &Rc<T>, method: fn(&T, &Operation)) -> Result<()> {
        let target: Weak<T> = Rc::downgrade(target);
        self.then(move |operation| {
            if let Some(target) = target.upgrade() {
                method(&target, operation);
            }
        })
    }

    /// Begin execution at the first call
    ///
    /// Returns a promise over the aggregate operation. Calling `start()`
    /// again returns a promise over the same aggregate.
    pub fn start(&self) -> Promise {
        if let Some(total) = self.total() {
            return Promise::from(total);
        }

        let weak = Rc::downgrade(&self.shared);
        let total = Operation::with_kind(OperationKind::Aggregate, move |_| {
            if let Some(shared) = weak.upgrade() {
                Sequence { shared }.cancel();
            }
        });
        *self.shared.total.borrow_mut() = Some(total.clone());
        tracing::debug!(operation = %total.id(), steps = self.len(), "Sequence started");

        self.drive(None);
        Promise::from(total)
    }

    /// True once `start()` was called
    pub fn is_started(&self) -> bool {
        self.shared.total.borrow().is_some()
    }

    /// True once the aggregate operation has settled
    pub fn is_finished(&self) -> bool {
        self.status() == SequenceStatus::Finished
    }

    /// Where the sequence is in its run
    pub fn status(&self) -> SequenceStatus {
        self.shared.status.get()
    }

    /// The aggregate operation, once started
    pub fn total(&self) -> Option<Operation> {
        self.shared.total.borrow().clone()
    }

    /// Request cancellation
    ///
    /// Forwards to the step in flight. No further step starts; once that
    /// step settles the aggregate resolves `Canceled` (or, under fail-fast,
    /// with the step's own error state). A paused sequence resolves
    /// `Canceled` immediately. Does nothing before `start()` or after the
    /// aggregate settled.
    pub fn cancel(&self) {
        match self.status() {
            SequenceStatus::NotStarted | SequenceStatus::Finished => {
                tracing::trace!(status = %self.status(), "Nothing to cancel");
            }
            SequenceStatus::Paused(_) => {
                tracing::debug!("Canceling paused sequence");
                self.resolve(AsyncState::Canceled, Value::Null);
            }
            SequenceStatus::Running(index) => {
                tracing::debug!(index, "Canceling sequence");
                self.shared.cancel_requested.set(true);
                if let Some(operation) = self.operation(index) {
                    operation.cancel();
                }
            }
        }
    }

    /// Halt after the step in flight settles
    ///
    /// Only valid while running.
    pub fn pause(&self) -> Result<()> {
        match self.status() {
            SequenceStatus::Running(index) => {
                tracing::debug!(index, "Pause requested");
                self.shared.pause_requested.set(true);
                Ok(())
            }
            other => Err(Error::invalid_state("running", other)),
        }
    }

    /// Re-arm a paused sequence
    ///
    /// Only valid in [`SequenceStatus::Paused`]. With
    /// [`ResumeMode::ContinueNext`] the first step that has not run yet
    /// starts; with [`ResumeMode::RetryLast`] the step that finished last
    /// is invoked again. If there is nothing left to run, the sequence
    /// finishes.
    pub fn resume(&self) -> Result<()> {
        let last = match self.status() {
            SequenceStatus::Paused(last) => last,
            other => return Err(Error::invalid_state("paused", other)),
        };
        let mode = self.config().resume;
        if mode == ResumeMode::RetryLast {
            self.shared.next.set(last);
        }
        tracing::debug!(last, mode = ?mode, "Resuming sequence");
        self.drive(None);
        Ok(())
    }

    /// True if no call was added
    pub fn is_empty(&self) -> bool {
        self.shared.items.borrow().is_empty()
    }

    /// Number of calls added
    pub fn len(&self) -> usize {
        self.shared.items.borrow().len()
    }

    /// Result of the step at `index`, once it started
    pub fn result(&self, index: usize) -> Option<Value> {
        self.operation(index).map(|operation| operation.result())
    }

    /// Operation of the step at `index`, once it started
    pub fn operation(&self, index: usize) -> Option<Operation> {
        self.shared
            .items
            .borrow()
            .get(index)
            .and_then(|item| item.operation.clone())
    }

    /// Run steps until one is in flight or the sequence stops
    ///
    /// A step whose operation settles while it is being started (including
    /// every pre-resolved step) is handed back to this loop instead of
    /// re-entering it, so the stack stays flat however many steps complete
    /// synchronously.
    fn drive(&self, mut settled: Option<(usize, Operation)>) {
        if self.shared.driving.replace(true) {
            if settled.is_some() {
                *self.shared.settled.borrow_mut() = settled;
            }
            return;
        }

        loop {
            if let Some((index, operation)) = settled.take() {
                if !self.complete_step(index, &operation) {
                    break;
                }
            }
            if !self.advance() {
                break;
            }
            settled = self.shared.settled.borrow_mut().take();
            if settled.is_none() {
                break;
            }
        }

        self.shared.driving.set(false);
    }

    /// Start the next step; `false` once the sequence stopped, paused or finished
    fn advance(&self) -> bool {
        if self.shared.cancel_requested.get() {
            let result = self.last_operation().map(|op| op.result()).unwrap_or_default();
            self.resolve(AsyncState::Canceled, result);
            return false;
        }
        if self.shared.pause_requested.replace(false) {
            if let Some(last) = self.shared.last.get() {
                tracing::debug!(last, "Sequence paused");
                self.shared.status.set(SequenceStatus::Paused(last));
                return false;
            }
        }
        if self.start_next() {
            true
        } else {
            self.finish();
            false
        }
    }

    fn start_next(&self) -> bool {
        let index = self.shared.next.get();
        let call = match self.shared.items.borrow().get(index) {
            Some(item) => item.call.clone(),
            None => return false,
        };
        self.shared.next.set(index + 1);
        self.shared.last.set(Some(index));
        self.shared.status.set(SequenceStatus::Running(index));
        tracing::debug!(index, "Starting step");

        let operation = call.invoke();
        if let Some(item) = self.shared.items.borrow_mut().get_mut(index) {
            item.operation = Some(operation.clone());
        }

        let sequence = self.clone();
        let attached = operation.set_completion_handler(CompletionHandler::new(move |settled| {
            sequence.on_step_completion(index, settled);
        }));
        if let Err(e) = attached {
            tracing::error!(index, error = %e, "Cannot observe step; treating it as failed");
            self.on_step_completion(index, &Operation::failed());
        }
        true
    }

    fn on_step_completion(&self, index: usize, operation: &Operation) {
        tracing::debug!(index, state = %operation.state(), "Step settled");
        self.drive(Some((index, operation.clone())));
    }

    /// Apply a settled step; `false` if the sequence stopped on it
    fn complete_step(&self, index: usize, operation: &Operation) -> bool {
        let state = operation.state();
        if state.is_error() && self.cancel_on_error() {
            tracing::debug!(index, state = %state, "Stopping sequence at failed step");
            self.resolve(state, operation.result());
            return false;
        }

        let handler = self
            .shared
            .items
            .borrow_mut()
            .get_mut(index)
            .and_then(|item| item.handler.take());
        if let Some(mut handler) = handler {
            handler(operation);
            if let Some(item) = self.shared.items.borrow_mut().get_mut(index) {
                if item.handler.is_none() && !self.is_finished() {
                    item.handler = Some(handler);
                }
            }
        }
        true
    }

    fn finish(&self) {
        let (state, result) = match self.last_operation() {
            None => (AsyncState::Completed, Value::Null),
            Some(last) => match self.config().aggregate {
                AggregatePolicy::AlwaysCompleted => (AsyncState::Completed, last.result()),
                AggregatePolicy::MirrorLastStep => (last.state(), last.result()),
            },
        };
        self.resolve(state, result);
    }

    fn resolve(&self, state: AsyncState, result: Value) {
        self.shared.status.set(SequenceStatus::Finished);
        self.shared.pause_requested.set(false);

        // Handlers commonly capture the sequence itself; none can run again.
        let handlers: Vec<StepHandler> = self
            .shared
            .items
            .borrow_mut()
            .iter_mut()
            .filter_map(|item| item.handler.take())
            .collect();
        drop(handlers);

        if let Some(total) = self.total() {
            tracing::debug!(operation = %total.id(), state = %state, "Sequence finished");
            total.set_result(result);
            total.set_state(state);
        }
    }

    fn last_operation(&self) -> Option<Operation> {
        self.shared.last.get().and_then(|index| self.operation(index))
    }
}

impl Default for Sequence {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Sequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sequence")
            .field("status", &self.status())
            .field("len", &self.len())
            .field("config", &self.config())
            .finish()
    }
}
