//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware)
//!     → request.rs (assign x-request-id)
//!     → handler.rs (admission, method, body, fan-out)
//!     → error.rs (503 / 404 / 400 mapping)
//!     → Send to client
//! ```

pub mod error;
pub mod handler;
pub mod request;
pub mod server;

pub use error::HandleError;
pub use handler::{handle, AppState, HandlerSettings};
pub use request::X_REQUEST_ID;
pub use server::{build_router, HttpServer};
