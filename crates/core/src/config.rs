//! Sequence policies and configuration
//!
//! Two behaviours of a sequence are genuinely ambiguous and are therefore
//! named policies rather than hard-coded choices:
//!
//! | Policy | Options | Default |
//! |--------|---------|---------|
//! | [`AggregatePolicy`] | `AlwaysCompleted`, `MirrorLastStep` | `AlwaysCompleted` |
//! | [`ResumeMode`] | `ContinueNext`, `RetryLast` | `ContinueNext` |
//!
//! Configuration can be written in TOML:
//!
//! ```text
//! cancel-on-error = true
//! aggregate = "mirror-last-step"
//! resume = "retry-last"
//! ```

use crate::error::Result;
use serde::{Deserialize, Serialize};

/// How a sequence resolves its aggregate operation once every step has run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AggregatePolicy {
    /// Exhausting the step list always resolves `Completed`
    #[default]
    AlwaysCompleted,
    /// The aggregate takes the terminal state of the last executed step
    MirrorLastStep,
}

/// What `resume()` does after a paused sequence is re-armed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResumeMode {
    /// Start the first step that has not run yet
    #[default]
    ContinueNext,
    /// Invoke the most recently finished step's call again
    RetryLast,
}

/// Execution policy of one sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "kebab-case")]
pub struct SequenceConfig {
    /// Stop at the first `Failed`/`Canceled` step and resolve the aggregate with it
    pub cancel_on_error: bool,
    /// State of the aggregate after the last step
    pub aggregate: AggregatePolicy,
    /// Behaviour of `resume()`
    pub resume: ResumeMode,
}

impl SequenceConfig {
    /// Default policy: run every step, resolve `Completed`
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail-fast policy
    pub fn fail_fast() -> Self {
        SequenceConfig {
            cancel_on_error: true,
            ..Self::default()
        }
    }

    /// Parse from TOML text; missing keys keep their defaults
    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Set the fail-fast flag
    pub fn with_cancel_on_error(mut self, cancel_on_error: bool) -> Self {
        self.cancel_on_error = cancel_on_error;
        self
    }

    /// Set the aggregate policy
    pub fn with_aggregate(mut self, aggregate: AggregatePolicy) -> Self {
        self.aggregate = aggregate;
        self
    }

    /// Set the resume mode
    pub fn with_resume(mut self, resume: ResumeMode) -> Self {
        self.resume = resume;
        self
    }
}
