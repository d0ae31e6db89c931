//! Declarative steps compiled into a sequence
//!
//! A [`StepMachine`] owns a [`Sequence`]. Collaborators declare [`Step`]s,
//! each with a start action and a completion handler, and enqueue them with
//! [`Step::start`]. Enqueueing a step from another step's completion handler
//! is how branches and loops are expressed:
//!
//! ```ignore
//! let machine = StepMachine::new();
//! let fetch = machine.create_step();
//! let parse = machine.create_step();
//! let next = parse.clone();
//! fetch.on_start(|| download(url));
//! fetch.on_completion(move |op| if op.state() == AsyncState::Completed { next.start(); });
//! parse.on_start(|| parse_document());
//! let total = machine.start(&fetch);
//! ```
//!
//! The aggregate returned by [`StepMachine::start`] keeps the machine alive
//! until it settles, so the caller may drop its handle right away. Steps
//! refer to their machine weakly and never extend its lifetime.

use crate::call::Call;
use crate::sequence::Sequence;
use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};
use tether_core::SequenceConfig;
use tether_operation::Operation;

type SharedHandler = Rc<RefCell<Box<dyn FnMut(&Operation)>>>;

#[derive(Default)]
struct StepState {
    on_start: RefCell<Option<Call>>,
    on_completion: RefCell<Option<SharedHandler>>,
}

struct MachineInner {
    sequence: Sequence,
    steps: RefCell<Vec<Rc<StepState>>>,
}

/// Builder of named steps over one sequence
#[derive(Clone)]
pub struct StepMachine {
    inner: Rc<MachineInner>,
}

/// Handle to one step of a [`StepMachine`]
#[derive(Clone)]
pub struct Step {
    index: usize,
    machine: Weak<MachineInner>,
}

impl StepMachine {
    /// Create a machine with the default sequence policy
    pub fn new() -> Self {
        Self::with_config(SequenceConfig::default())
    }

    /// Create a machine whose sequence uses `config`
    pub fn with_config(config: SequenceConfig) -> Self {
        StepMachine {
            inner: Rc::new(MachineInner {
                sequence: Sequence::with_config(config),
                steps: RefCell::new(Vec::new()),
            }),
        }
    }

    /// Declare a new step
    pub fn create_step(&self) -> Step {
        let mut steps = self.inner.steps.borrow_mut();
        steps.push(Rc::new(StepState::default()));
        Step {
            index: steps.len() - 1,
            machine: Rc::downgrade(&self.inner),
        }
    }

    /// Number of declared steps
    pub fn step_count(&self) -> usize {
        self.inner.steps.borrow().len()
    }

    /// The underlying sequence
    pub fn sequence(&self) -> Sequence {
        self.inner.sequence.clone()
    }

    /// Enqueue `step` and start the sequence
    ///
    /// Returns the aggregate operation. It holds the machine until it
    /// settles. A step declared on another machine yields a failed
    /// operation. Calling `start` on a running machine only enqueues `step`.
    pub fn start(&self, step: &Step) -> Operation {
        if !Weak::ptr_eq(&step.machine, &Rc::downgrade(&self.inner)) {
            tracing::error!(step = step.index, "Step belongs to another machine");
            return Operation::failed();
        }

        step.start();
        let total = self.inner.sequence.start().into_operation();
        total.retain_until_settled(self.inner.clone() as Rc<dyn Any>);
        total
    }
}

impl Default for StepMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for StepMachine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StepMachine")
            .field("steps", &self.step_count())
            .field("sequence", &self.inner.sequence)
            .finish()
    }
}

impl Step {
    /// Index of the step within its machine
    pub fn index(&self) -> usize {
        self.index
    }

    /// Set the action that starts the step's work
    pub fn on_start<F>(&self, f: F)
    where
        F: FnMut() -> Operation + 'static,
    {
        if let Some(state) = self.state() {
            *state.on_start.borrow_mut() = Some(Call::new(f));
        }
    }

    /// Set the handler run when the step's work settles
    pub fn on_completion<F>(&self, f: F)
    where
        F: FnMut(&Operation) + 'static,
    {
        if let Some(state) = self.state() {
            let handler: Box<dyn FnMut(&Operation)> = Box::new(f);
            *state.on_completion.borrow_mut() = Some(Rc::new(RefCell::new(handler)));
        }
    }

    /// Append this step to the machine's sequence
    ///
    /// May be called repeatedly, including from a completion handler.
    /// Returns `false` if the machine no longer exists. The start action and
    /// completion handler are looked up when the step runs, so setting them
    /// after enqueueing still takes effect. A step without a start action
    /// runs as an already-failed operation.
    pub fn start(&self) -> bool {
        let (machine, state) = match (self.machine.upgrade(), self.state()) {
            (Some(machine), Some(state)) => (machine, state),
            _ => {
                tracing::warn!(step = self.index, "Step outlived its machine");
                return false;
            }
        };

        let index = self.index;
        let action = state.clone();
        let call = Call::new(move || {
            let current = action.on_start.borrow().clone();
            match current {
                Some(call) => call.invoke(),
                None => {
                    tracing::error!(step = index, "Step has no start action");
                    Operation::failed()
                }
            }
        });

        let sequence = &machine.sequence;
        let position = sequence.add(call);
        tracing::debug!(step = index, position, "Step enqueued");

        let attached = sequence.then(move |operation| {
            let handler = state.on_completion.borrow().clone();
            let Some(handler) = handler else {
                return;
            };
            match handler.try_borrow_mut() {
                Ok(mut handler) => (&mut **handler)(operation),
                Err(_) => tracing::error!(step = index, "Re-entrant step completion; skipped"),
            };
        });
        if let Err(e) = attached {
            tracing::error!(step = index, error = %e, "Cannot attach step completion");
        }
        true
    }

    fn state(&self) -> Option<Rc<StepState>> {
        let machine = self.machine.upgrade()?;
        let steps = machine.steps.borrow();
        steps.get(self.index).cloned()
    }
}

impl fmt::Debug for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Step")
            .field("index", &self.index)
            .field("attached", &(self.machine.strong_count() > 0))
            .finish()
    }
}
