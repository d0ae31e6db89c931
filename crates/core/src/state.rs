//! Operation states
//!
//! ```text
//! None ──► Started ──┬──► Completed
//!                    ├──► Failed
//!                    └──► Canceled
//! ```
//!
//! `Started` is the only running state. The three terminal states are
//! mutually exclusive and absorbing: once an operation reaches one of them it
//! never changes again.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Lifecycle state of an operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AsyncState {
    /// Not yet handed out; never observed on a constructed operation
    #[default]
    None,
    /// Running; the only non-terminal state a live operation reports
    Started,
    /// Ran and produced a definitive positive outcome
    Completed,
    /// Ran and produced a definitive negative outcome
    Failed,
    /// Aborted before or without producing an outcome
    Canceled,
}

impl AsyncState {
    /// True for `Completed`, `Failed` and `Canceled`
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            AsyncState::Completed | AsyncState::Failed | AsyncState::Canceled
        )
    }

    /// True for `Failed` and `Canceled`
    pub fn is_error(self) -> bool {
        matches!(self, AsyncState::Failed | AsyncState::Canceled)
    }

    /// Stable lowercase name
    pub fn as_str(self) -> &'static str {
        match self {
            AsyncState::None => "none",
            AsyncState::Started => "started",
            AsyncState::Completed => "completed",
            AsyncState::Failed => "failed",
            AsyncState::Canceled => "canceled",
        }
    }
}

impl fmt::Display for AsyncState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifier of one operation, used in log fields and error reports
///
/// Allocated from a process-wide monotonic counter, so ids are unique even
/// though operations themselves never leave their thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct OperationId(u64);

static NEXT_OPERATION_ID: AtomicU64 = AtomicU64::new(1);

impl OperationId {
    /// Allocate the next id
    pub fn next() -> Self {
        OperationId(NEXT_OPERATION_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw numeric value
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for OperationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "op-{}", self.0)
    }
}
