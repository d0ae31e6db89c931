//! # Tether
//!
//! Single-threaded operation, promise and sequence runtime for event-loop
//! driven applications.
//!
//! Tether models asynchronous work as explicit, observable operations that
//! are chained, cancelled and sequenced on the thread that runs the host
//! event loop. Nothing is ever executed concurrently: "asynchronous" means
//! deferred to a later turn of that loop.
//!
//! ## Quick Start
//!
//! ```ignore
//! use tether::prelude::*;
//!
//! let tether = Tether::new();
//!
//! // Chain work onto an operation
//! let done = Promise::from(download(url))
//!     .then(|op| cache(op.result()))
//!     .modify_state(|op| if op.result().is_null() { AsyncState::Failed } else { op.state() });
//!
//! // Run calls one after another
//! let seq = tether.sequence();
//! seq.add_fn(|| login());
//! seq.add_fn(|| fetch_inbox());
//! let total = seq.start();
//!
//! // Spin the loop until the sequence settles
//! tether.wait(&total);
//! ```
//!
//! ## Building Blocks
//!
//! - [`Operation`] - Shared handle over one unit of work
//! - [`Promise`] - Fluent `then` / `modify_state` chain builder
//! - [`Sequence`] - Ordered, serial execution of [`Call`]s
//! - [`StepMachine`] - Declarative steps compiled into a sequence
//! - [`Tether`] - Runtime configuration and event-loop driving

#![warn(missing_docs)]

mod error;
mod runtime;

pub mod prelude;

// Re-export main entry points
pub use error::{Error, Result};
pub use runtime::{Tether, TetherBuilder};

// Re-export member crates
pub use tether_core::{
    AggregatePolicy, AsyncState, OperationId, ResumeMode, SequenceConfig, Value,
};
pub use tether_host::{dispatch, LocalPump, Pump};
pub use tether_operation::{
    pending, wait_until_settled, CompletionHandler, Operation, OperationKind, Progress,
    ProgressHandler, Promise, StateModifier,
};
pub use tether_sequence::{Call, Sequence, SequenceStatus, Step, StepMachine};
