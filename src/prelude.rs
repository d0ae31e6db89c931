//! Convenient imports for tether.
//!
//! This module re-exports the most commonly used types so you can get started
//! with a single import:
//!
//! ```ignore
//! use tether::prelude::*;
//!
//! let total = Tether::new().sequence().start();
//! ```

// Main entry point
pub use crate::runtime::{Tether, TetherBuilder};

// Error handling
pub use crate::error::{Error, Result};

// Operations and chains
pub use tether_operation::{CompletionHandler, Operation, Promise, StateModifier};

// Sequencing
pub use tether_sequence::{Call, Sequence, Step, StepMachine};

// Core types
pub use tether_core::{AggregatePolicy, AsyncState, ResumeMode, SequenceConfig, Value};
