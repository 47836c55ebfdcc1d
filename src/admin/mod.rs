//! Read-only admin listener.
//!
//! Serves `GET /admin/status` with the admission counter as JSON, on its own
//! address so it stays reachable while the main listener is saturated.

pub mod handlers;

use std::sync::Arc;

use axum::{routing::get, Router};
use tokio::net::TcpListener;

use crate::admission::AdmissionControl;
use crate::lifecycle::ShutdownSignal;

pub fn admin_router(admission: Arc<AdmissionControl>) -> Router {
    Router::new()
        .route("/admin/status", get(handlers::get_status))
        .with_state(admission)
}

/// Serve the admin router until `shutdown` fires.
pub async fn serve(
    listener: TcpListener,
    admission: Arc<AdmissionControl>,
    shutdown: ShutdownSignal,
) -> Result<(), std::io::Error> {
    tracing::info!(address = %listener.local_addr()?, "Admin server starting");

    axum::serve(listener, admin_router(admission))
        .with_graceful_shutdown(shutdown.wait())
        .await
}
