//! Host event-loop collaboration
//!
//! The runtime needs two things from the application that embeds it:
//! - a place to post work for a later turn (the [`dispatch`] queue)
//! - a way to drive that loop forward (a [`Pump`])
//!
//! Everything here is thread-local and `!Send`; the runtime lives on the
//! thread that runs the event loop.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod dispatch;
pub mod pump;

pub use pump::{LocalPump, Pump};
