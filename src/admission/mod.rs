//! Admission control subsystem.
//!
//! # Data Flow
//! ```text
//! Request arrives
//!     → control.rs (increment-and-get under the lock)
//!     → over ceiling: compensating release, 503
//!     → admitted: AdmissionPermit held for the whole handler
//!     → permit dropped: slot released
//! ```

pub mod control;

pub use control::{AdmissionControl, AdmissionPermit};
