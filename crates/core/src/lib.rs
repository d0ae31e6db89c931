//! Core types for the tether runtime
//!
//! This crate defines the vocabulary shared by every other crate:
//! - [`AsyncState`]: lifecycle of an operation
//! - [`Value`]: dynamically-typed operation result
//! - [`OperationId`]: log/diagnostic identity of an operation
//! - [`SequenceConfig`]: execution policy of a sequence
//! - [`Error`]: API misuse and configuration errors

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod state;
pub mod value;

pub use config::{AggregatePolicy, ResumeMode, SequenceConfig};
pub use error::{Error, Result};
pub use state::{AsyncState, OperationId};
pub use value::Value;
