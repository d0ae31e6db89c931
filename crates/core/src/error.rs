//! Error types for the runtime
//!
//! Outcomes of asynchronous work are never errors here: they are states
//! (`Failed`, `Canceled`) observed through completion handlers. This error
//! type covers misuse of the API and bad configuration only.

use crate::state::{AsyncState, OperationId};
use thiserror::Error;

/// All runtime errors.
#[derive(Debug, Error)]
pub enum Error {
    /// An operation accepts exactly one completion handler
    #[error("operation {operation} already has a completion handler")]
    HandlerAlreadyAttached {
        /// Operation that rejected the handler
        operation: OperationId,
    },

    /// A step handler was attached before any call was added
    #[error("sequence has no step to attach a handler to")]
    NoStep,

    /// Operation requested in a state that does not allow it
    #[error("invalid state: expected {expected}, got {actual}")]
    InvalidState {
        /// State the operation requires
        expected: String,
        /// State actually found
        actual: String,
    },

    /// Malformed configuration
    #[error("configuration error: {0}")]
    Config(String),

    /// Configuration file could not be read
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal error (bug or invariant violation)
    #[error("internal error: {0}")]
    Internal(String),
}

/// Result type for runtime operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Build an `InvalidState` error from two displayable states
    pub fn invalid_state(expected: impl ToString, actual: impl ToString) -> Self {
        Error::InvalidState {
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }

    /// Build an `InvalidState` error for an operation state mismatch
    pub fn unexpected_state(expected: &str, actual: AsyncState) -> Self {
        Self::invalid_state(expected, actual)
    }

    /// Check if this error is a violation of a usage contract.
    ///
    /// Usage errors are programmer mistakes; retrying will not help.
    pub fn is_usage_error(&self) -> bool {
        matches!(
            self,
            Error::HandlerAlreadyAttached { .. } | Error::NoStep | Error::InvalidState { .. }
        )
    }

    /// Check if this is a configuration error, including an unreadable file.
    pub fn is_config_error(&self) -> bool {
        matches!(self, Error::Config(_) | Error::Io(_))
    }
}

impl From<toml::de::Error> for Error {
    fn from(e: toml::de::Error) -> Self {
        Error::Config(e.to_string())
    }
}
