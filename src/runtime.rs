//! Runtime entry point for tether.
//!
//! This module provides the `Tether` struct, which carries the default
//! sequence policy and drives the host event loop on the current thread.

use crate::error::Result;
use serde::Deserialize;
use std::path::Path;
use tether_core::{AggregatePolicy, AsyncState, ResumeMode, SequenceConfig};
use tether_host::{dispatch, LocalPump, Pump};
use tether_operation::{pending, wait_until_settled, Operation};
use tether_sequence::{Sequence, StepMachine};

/// The tether runtime.
///
/// Sequences and step machines created through a `Tether` share its default
/// policy. The runtime itself holds no operations: it is a handle on the
/// thread's deferred queue plus configuration.
///
/// # Example
///
/// ```ignore
/// use tether::prelude::*;
///
/// let tether = Tether::builder().cancel_on_error(true).build();
///
/// let seq = tether.sequence();
/// seq.add_fn(|| fetch_page(1));
/// seq.add_fn(|| fetch_page(2));
/// let total = seq.start();
///
/// let state = tether.wait(&total);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Tether {
    config: SequenceConfig,
}

impl Tether {
    /// Create a runtime with the default policy.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a builder for runtime configuration.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let tether = Tether::builder()
    ///     .aggregate_policy(AggregatePolicy::MirrorLastStep)
    ///     .resume_mode(ResumeMode::RetryLast)
    ///     .build();
    /// ```
    pub fn builder() -> TetherBuilder {
        TetherBuilder::new()
    }

    /// Default policy of sequences created by this runtime.
    pub fn config(&self) -> SequenceConfig {
        self.config
    }

    /// Create an empty sequence with the runtime's policy.
    pub fn sequence(&self) -> Sequence {
        Sequence::with_config(self.config)
    }

    /// Create a step machine with the runtime's policy.
    pub fn step_machine(&self) -> StepMachine {
        StepMachine::with_config(self.config)
    }

    /// Run every deferred task, including tasks posted while draining.
    ///
    /// Returns the number of tasks that ran.
    pub fn flush(&self) -> usize {
        dispatch::drain()
    }

    /// Pump the thread's deferred queue until `operation` settles.
    ///
    /// Returns the operation's state afterwards; it is still `Started` if the
    /// queue ran dry first (the completion depends on work outside this
    /// thread's queue).
    pub fn wait(&self, operation: &Operation) -> AsyncState {
        self.wait_with(operation, &mut LocalPump::new())
    }

    /// Like [`Tether::wait`], driving the loop through `pump`.
    pub fn wait_with<P>(&self, operation: &Operation, pump: &mut P) -> AsyncState
    where
        P: Pump + ?Sized,
    {
        wait_until_settled(operation, pump)
    }

    /// Number of deferred tasks waiting to run.
    pub fn queued_tasks(&self) -> usize {
        dispatch::pending_count()
    }

    /// Number of operations kept alive by the pending registry.
    pub fn pending_operations(&self) -> usize {
        pending::count()
    }

    /// Drop every deferred task without running it.
    ///
    /// Call when the host loop shuts down. Returns the number of discarded
    /// tasks.
    pub fn shutdown(&self) -> usize {
        let discarded = dispatch::discard();
        tracing::debug!(discarded, pending = pending::count(), "Runtime shut down");
        discarded
    }
}

/// On-disk configuration layout.
///
/// ```text
/// [sequence]
/// cancel-on-error = true
/// aggregate = "mirror-last-step"
/// resume = "retry-last"
/// ```
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ConfigFile {
    sequence: SequenceConfig,
}

/// Builder for runtime configuration.
///
/// # Example
///
/// ```ignore
/// // Fail-fast pipelines
/// let tether = Tether::builder().cancel_on_error(true).build();
///
/// // Loaded from a file, then adjusted
/// let tether = TetherBuilder::from_toml_file("tether.toml")?
///     .resume_mode(ResumeMode::RetryLast)
///     .build();
/// ```
#[derive(Debug, Clone, Default)]
pub struct TetherBuilder {
    config: SequenceConfig,
}

impl TetherBuilder {
    /// Create a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse settings from TOML text with a `[sequence]` table.
    ///
    /// Missing keys keep their defaults; unknown top-level tables are
    /// rejected.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let file: ConfigFile = toml::from_str(text)?;
        Ok(Self {
            config: file.sequence,
        })
    }

    /// Read settings from a TOML file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        tracing::debug!(path = %path.display(), "Loaded runtime configuration");
        Self::from_toml_str(&text)
    }

    /// Stop sequences at the first failed or canceled step.
    pub fn cancel_on_error(mut self, cancel_on_error: bool) -> Self {
        self.config = self.config.with_cancel_on_error(cancel_on_error);
        self
    }

    /// How sequences resolve after their last step.
    pub fn aggregate_policy(mut self, aggregate: AggregatePolicy) -> Self {
        self.config = self.config.with_aggregate(aggregate);
        self
    }

    /// What `resume()` does on a paused sequence.
    pub fn resume_mode(mut self, resume: ResumeMode) -> Self {
        self.config = self.config.with_resume(resume);
        self
    }

    /// Replace every setting at once.
    pub fn config(mut self, config: SequenceConfig) -> Self {
        self.config = config;
        self
    }

    /// Build the runtime.
    pub fn build(self) -> Tether {
        Tether {
            config: self.config,
        }
    }
}
