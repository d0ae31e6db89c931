//! Ordered multi-step execution
//!
//! - [`Call`]: reusable "start this work" thunk
//! - [`Sequence`]: runs calls one at a time and reports an aggregate operation
//! - [`StepMachine`]: declarative steps (start action + completion handler)
//!   compiled into a sequence

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod call;
pub mod sequence;
pub mod step_machine;

pub use call::Call;
pub use sequence::{Sequence, SequenceStatus};
pub use step_machine::{Step, StepMachine};
