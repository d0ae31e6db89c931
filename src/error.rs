//! Error types for tether.
//!
//! The runtime has a single error type, defined in `tether-core` and shared
//! by every member crate. It is re-exported here unchanged.

pub use tether_core::{Error, Result};
