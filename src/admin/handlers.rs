use std::sync::Arc;

use axum::{extract::State, Json};
use serde::Serialize;

use crate::admission::AdmissionControl;

#[derive(Debug, Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub status: &'static str,
    pub in_flight: usize,
    pub max_in_flight: usize,
}

pub async fn get_status(State(admission): State<Arc<AdmissionControl>>) -> Json<SystemStatus> {
    let in_flight = admission.in_flight();
    let status = if in_flight >= admission.max_in_flight() {
        "saturated"
    } else {
        "operational"
    };

    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        status,
        in_flight,
        max_in_flight: admission.max_in_flight(),
    })
}
