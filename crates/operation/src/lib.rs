//! Operations and promises
//!
//! This crate implements the single-threaded operation model:
//! - [`Operation`]: shared handle over state, result and one completion handler
//! - chain links: operations that complete when their upstream completes
//! - [`Promise`]: fluent `then` / `modify_state` chain builder
//! - [`pending`]: keep-alive registry for leaves awaiting native callbacks
//! - [`wait_until_settled`]: modal wait by pumping the host loop
//!
//! "Asynchronous" here means deferred, never concurrent: every transition and
//! every handler runs on the thread that drives the host event loop.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod chain;
pub mod handler;
pub mod operation;
pub mod pending;
pub mod promise;
pub mod wait;

pub use handler::{CompletionHandler, Progress, ProgressHandler, StateModifier};
pub use operation::{CancelHook, Operation, OperationKind};
pub use promise::Promise;
pub use wait::wait_until_settled;
