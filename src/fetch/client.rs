//! Outbound content fetching.
//!
//! # Responsibilities
//! - Issue a GET for one URL and read the whole body
//! - Report the body length in bytes
//!
//! # Design Decisions
//! - Non-2xx responses are successful fetches; only transport errors fail
//! - One shared `reqwest::Client` so connections are pooled across requests

use std::future::Future;
use std::time::Duration;
use thiserror::Error;

use crate::config::FetchConfig;

/// Why a single fetch produced no length.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Connection, TLS, redirect, body or URL error.
    #[error(transparent)]
    Transport(#[from] reqwest::Error),

    /// The request's fetch deadline passed first.
    #[error("deadline exceeded")]
    DeadlineExceeded,

    /// The fetch task panicked or was aborted.
    #[error("fetch task failed: {0}")]
    TaskFailed(String),
}

/// Capability to fetch a URL and measure its body.
pub trait ContentFetcher: Send + Sync + 'static {
    fn content_length(&self, url: &str) -> impl Future<Output = Result<usize, FetchError>> + Send;
}

/// [`ContentFetcher`] backed by reqwest.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    /// Build a fetcher from configuration.
    pub fn new(config: &FetchConfig) -> Result<Self, FetchError> {
        let mut builder = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .user_agent(config.user_agent.as_str());
        if !config.system_proxy {
            builder = builder.no_proxy();
        }

        Ok(Self {
            client: builder.build()?,
        })
    }
}

impl ContentFetcher for HttpFetcher {
    async fn content_length(&self, url: &str) -> Result<usize, FetchError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        let body = response.bytes().await?;

        tracing::debug!(url = %url, status = %status, bytes = body.len(), "Fetched");
        Ok(body.len())
    }
}
