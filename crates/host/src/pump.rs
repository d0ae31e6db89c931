//! Event loop pump
//!
//! The runtime never blocks. A caller that needs a synchronous-looking
//! result spins the host loop through a [`Pump`] until the operation it is
//! watching settles. Blocking a real thread instead would deadlock the host,
//! since every completion is delivered on this same thread.

use crate::dispatch;

/// Drives the host event loop forward by one turn
pub trait Pump {
    /// Retire pending work
    ///
    /// Returns `false` when the loop cannot make further progress (it was
    /// shut down, or nothing is left to deliver); pollers stop on `false`.
    fn flush_updates(&mut self) -> bool;
}

impl<F> Pump for F
where
    F: FnMut() -> bool,
{
    fn flush_updates(&mut self) -> bool {
        self()
    }
}

/// Pump over the thread-local deferred queue
///
/// Suitable for headless hosts and tests: every turn drains the queue and
/// reports whether anything ran.
#[derive(Debug, Default)]
pub struct LocalPump {
    turns: u64,
}

impl LocalPump {
    /// Create a new pump
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of turns that retired at least one task
    pub fn turns(&self) -> u64 {
        self.turns
    }
}

impl Pump for LocalPump {
    fn flush_updates(&mut self) -> bool {
        let ran = dispatch::drain();
        if ran == 0 {
            return false;
        }
        self.turns += 1;
        true
    }
}
