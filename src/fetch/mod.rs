//! Outbound fetch subsystem.
//!
//! # Data Flow
//! ```text
//! Request body
//!     → fanout.rs (split on '\n', one task per URL, shared deadline)
//!     → client.rs (GET, read body, measure length)
//!     → fanout.rs (join barrier, merge result slots, render lines)
//! ```

pub mod client;
pub mod fanout;

pub use client::{ContentFetcher, FetchError, HttpFetcher};
pub use fanout::{fan_out, render_lines, split_urls, FetchOutcome};
