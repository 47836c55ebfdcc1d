//! Admission-limited URL fetch gateway.
//!
//! Accepts a POST whose body is a newline-separated list of URLs, fetches
//! them all concurrently and answers with each body's length in bytes, one
//! per line. At most `max_in_flight` requests are handled at once; the rest
//! get `503 too many connections`.

pub mod admin;
pub mod admission;
pub mod config;
pub mod fetch;
pub mod http;
pub mod lifecycle;
pub mod observability;

pub use admission::{AdmissionControl, AdmissionPermit};
pub use config::GatewayConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
