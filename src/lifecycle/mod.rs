//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → shutdown.trigger()
//!
//! Shutdown (shutdown.rs):
//!     trigger → every ShutdownSignal resolves → servers stop accepting → drain → return
//! ```

pub mod shutdown;
pub mod signals;

pub use shutdown::{Shutdown, ShutdownSignal};
pub use signals::wait_for_signal;
