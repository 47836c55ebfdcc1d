//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the handler on every path
//! - Wire up middleware (tracing, request ID, outer timeout)
//! - Accept connections and serve each one with hyper
//! - Log connection-level failures (resets, broken writes) without stopping
//! - Stop accepting and drain on shutdown

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{routing::any, Router};
use hyper::server::conn::http1;
use hyper_util::rt::{TokioIo, TokioTimer};
use hyper_util::server::graceful::GracefulShutdown;
use hyper_util::service::TowerToHyperService;
use tokio::net::{TcpListener, TcpStream};
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::admission::AdmissionControl;
use crate::config::GatewayConfig;
use crate::fetch::{ContentFetcher, FetchError, HttpFetcher};
use crate::http::handler::{handle, AppState, HandlerSettings};
use crate::http::request::{propagate_request_id_layer, set_request_id_layer};
use crate::lifecycle::ShutdownSignal;

/// How long open connections get to finish after shutdown is triggered.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(30);

type HttpConnection = http1::Connection<TokioIo<TcpStream>, TowerToHyperService<Router>>;

/// HTTP server for the fetch gateway.
pub struct HttpServer {
    router: Router,
    admission: Arc<AdmissionControl>,
}

impl HttpServer {
    /// Create a new HTTP server that fetches with reqwest.
    pub fn new(config: GatewayConfig) -> Result<Self, FetchError> {
        let fetcher = HttpFetcher::new(&config.fetch)?;
        Ok(Self::with_fetcher(config, fetcher))
    }

    /// Create a new HTTP server around any fetcher.
    pub fn with_fetcher<F>(config: GatewayConfig, fetcher: F) -> Self
    where
        F: ContentFetcher,
    {
        let admission = Arc::new(AdmissionControl::new(config.listener.max_in_flight));
        let state = AppState::new(
            Arc::clone(&admission),
            fetcher,
            HandlerSettings::from_config(&config),
        );

        let router = build_router(&config, state);
        Self { router, admission }
    }

    /// Run the server, accepting connections until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        shutdown: ShutdownSignal,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            max_in_flight = self.admission.max_in_flight(),
            "HTTP server starting"
        );

        let graceful = GracefulShutdown::new();
        let stop = shutdown.wait();
        tokio::pin!(stop);

        loop {
            tokio::select! {
                accepted = listener.accept() => {
                    let (stream, peer) = match accepted {
                        Ok(accepted) => accepted,
                        Err(e) => {
                            tracing::warn!(error = %e, "Failed to accept connection");
                            continue;
                        }
                    };
                    let conn = graceful.watch(http1_connection(self.router.clone(), stream));
                    tokio::spawn(serve_connection(conn, peer));
                }
                () = &mut stop => break,
            }
        }

        drop(listener);
        tracing::info!("HTTP server draining");
        if tokio::time::timeout(DRAIN_TIMEOUT, graceful.shutdown()).await.is_err() {
            tracing::warn!(
                timeout_secs = DRAIN_TIMEOUT.as_secs(),
                "Drain timed out, dropping open connections"
            );
        }

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Shared admission controller, for status reporting.
    pub fn admission(&self) -> Arc<AdmissionControl> {
        Arc::clone(&self.admission)
    }

    /// The router, for driving the service in-process.
    pub fn router(&self) -> Router {
        self.router.clone()
    }
}

fn http1_connection(router: Router, stream: TcpStream) -> HttpConnection {
    http1::Builder::new()
        .timer(TokioTimer::new())
        .serve_connection(TokioIo::new(stream), TowerToHyperService::new(router))
}

/// Drive one connection to completion.
///
/// A client that resets mid-request or mid-response ends its own connection;
/// the failure is logged and the accept loop carries on.
async fn serve_connection<C>(conn: C, peer: SocketAddr) -> Result<(), hyper::Error>
where
    C: Future<Output = Result<(), hyper::Error>>,
{
    let result = conn.await;
    if let Err(e) = &result {
        tracing::warn!(peer = %peer, error = %e, "Failed to serve connection");
    }
    result
}

/// Build the Axum router with all middleware layers.
#[allow(deprecated)]
pub fn build_router<F>(config: &GatewayConfig, state: AppState<F>) -> Router
where
    F: ContentFetcher,
{
    Router::new()
        .route("/", any(handle::<F>))
        .route("/{*path}", any(handle::<F>))
        .with_state(state)
        .layer(propagate_request_id_layer())
        .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
        .layer(set_request_id_layer())
        .layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    fn hello_router() -> Router {
        Router::new().route("/", any(|| async { "hello" }))
    }

    #[tokio::test]
    async fn truncated_request_is_reported() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let client = tokio::spawn(async move {
            let mut client = TcpStream::connect(addr).await.unwrap();
            client
                .write_all(b"POST / HTTP/1.1\r\nHost: local\r\nContent-Le")
                .await
                .unwrap();
            // Dropped here: the peer hangs up mid-head.
        });

        let (stream, peer) = listener.accept().await.unwrap();
        client.await.unwrap();

        let result = serve_connection(http1_connection(hello_router(), stream), peer).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn complete_exchange_is_clean() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let client = tokio::spawn(async move {
            let mut client = TcpStream::connect(addr).await.unwrap();
            client
                .write_all(b"GET / HTTP/1.1\r\nHost: local\r\nConnection: close\r\n\r\n")
                .await
                .unwrap();
            let mut response = String::new();
            client.read_to_string(&mut response).await.unwrap();
            response
        });

        let (stream, peer) = listener.accept().await.unwrap();
        let result = serve_connection(http1_connection(hello_router(), stream), peer).await;
        assert!(result.is_ok());

        let response = client.await.unwrap();
        assert!(response.starts_with("HTTP/1.1 200"));
        assert!(response.ends_with("hello"));
    }
}
