//! Modal wait
//!
//! Code that needs a synchronous-looking answer (a modal dialog, a blocking
//! credential prompt) spins the host loop until the watched operation leaves
//! `Started`. The thread is never blocked; every turn goes through the pump.

use crate::operation::Operation;
use tether_core::AsyncState;
use tether_host::Pump;

/// Pump `pump` until `operation` settles or the loop stops making progress
///
/// Returns the state the operation is in afterwards, which is still
/// `Started` if the pump gave up first.
pub fn wait_until_settled<P>(operation: &Operation, pump: &mut P) -> AsyncState
where
    P: Pump + ?Sized,
{
    let mut turns = 0u64;
    while operation.state() == AsyncState::Started {
        if !pump.flush_updates() {
            tracing::debug!(operation = %operation.id(), turns, "Pump stopped before operation settled");
            break;
        }
        turns += 1;
    }
    operation.state()
}
