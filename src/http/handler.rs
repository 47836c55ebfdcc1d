//! The single request-handling entry point.
//!
//! # Flow
//! ```text
//! admit (or 503)
//!     → POST only (or 404)
//!     → read body (or 400)
//!     → split into URLs → fan out → join
//!     → 200 with one length per line
//! ```

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::State,
    http::{Method, Request, StatusCode},
    response::{IntoResponse, Response},
};
use tracing::Instrument;

use crate::admission::AdmissionControl;
use crate::config::{GatewayConfig, ResultOrder};
use crate::fetch::{fan_out, render_lines, split_urls, ContentFetcher, HttpFetcher};
use crate::http::error::HandleError;
use crate::http::request::request_id;
use crate::observability::metrics;

/// Per-request knobs taken from configuration.
#[derive(Debug, Clone)]
pub struct HandlerSettings {
    pub max_body_bytes: usize,
    pub fetch_timeout: Duration,
    pub order: ResultOrder,
    pub failure_marker: Option<String>,
}

impl HandlerSettings {
    pub fn from_config(config: &GatewayConfig) -> Self {
        Self {
            max_body_bytes: config.listener.max_body_bytes,
            fetch_timeout: Duration::from_secs(config.fetch.timeout_secs),
            order: config.fetch.order,
            failure_marker: config.fetch.failure_marker.clone(),
        }
    }
}

/// Application state injected into the handler.
pub struct AppState<F = HttpFetcher> {
    pub admission: Arc<AdmissionControl>,
    pub fetcher: Arc<F>,
    pub settings: Arc<HandlerSettings>,
}

impl<F> AppState<F> {
    pub fn new(admission: Arc<AdmissionControl>, fetcher: F, settings: HandlerSettings) -> Self {
        Self {
            admission,
            fetcher: Arc::new(fetcher),
            settings: Arc::new(settings),
        }
    }
}

// Manual impl: F itself need not be Clone.
impl<F> Clone for AppState<F> {
    fn clone(&self) -> Self {
        Self {
            admission: Arc::clone(&self.admission),
            fetcher: Arc::clone(&self.fetcher),
            settings: Arc::clone(&self.settings),
        }
    }
}

/// Handle one request: admission, method check, body read, fan-out, join.
pub async fn handle<F>(State(state): State<AppState<F>>, request: Request<Body>) -> Response
where
    F: ContentFetcher,
{
    let start = Instant::now();
    let request_id = request_id(request.headers());
    let span = tracing::info_span!("request", request_id = %request_id, method = %request.method());

    let response = match process(&state, request).instrument(span.clone()).await {
        Ok(body) => (StatusCode::OK, body).into_response(),
        Err(e) => {
            span.in_scope(|| match &e {
                HandleError::AdmissionRejected => {
                    metrics::record_admission_rejected();
                    tracing::warn!(max_in_flight = state.admission.max_in_flight(), "Too many connections");
                }
                other => tracing::info!(error = %other, "Request rejected"),
            });
            e.into_response()
        }
    };

    metrics::record_request(response.status().as_u16(), start);
    response
}

async fn process<F>(state: &AppState<F>, request: Request<Body>) -> Result<String, HandleError>
where
    F: ContentFetcher,
{
    // Time spent receiving the body counts against the fetch budget.
    let deadline = tokio::time::Instant::now() + state.settings.fetch_timeout;

    // Held until this function returns, whichever way it returns.
    let _permit = state
        .admission
        .admit()
        .ok_or(HandleError::AdmissionRejected)?;

    if request.method() != Method::POST {
        return Err(HandleError::MethodNotAllowed(request.method().clone()));
    }

    let settings = &state.settings;
    let bytes = axum::body::to_bytes(request.into_body(), settings.max_body_bytes)
        .await
        .map_err(|e| HandleError::BodyRead(e.to_string()))?;
    let body = String::from_utf8(bytes.to_vec()).map_err(|e| HandleError::BodyRead(e.to_string()))?;

    let urls = split_urls(&body);
    tracing::debug!(urls = urls.len(), "Fanning out");

    let outcomes = fan_out(Arc::clone(&state.fetcher), urls, deadline).await;

    Ok(render_lines(
        outcomes,
        settings.order,
        settings.failure_marker.as_deref(),
    ))
}
