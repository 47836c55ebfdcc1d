//! Concurrent fan-out of one request body's URLs.
//!
//! # Responsibilities
//! - Spawn one task per URL
//! - Bound every task by the request's shared deadline
//! - Wait for all tasks (join barrier) and merge their results
//!
//! # Design Decisions
//! - Each task owns its result slot; only the orchestrator merges, after the join
//! - Results come back in completion order; input order is an explicit option
//! - Dropping the fan-out future drops the JoinSet, which aborts every fetch
//! - A failed fetch is logged inside its task and never fails the request

use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures_util::FutureExt;
use tokio::task::JoinSet;
use tokio::time::{timeout_at, Instant};
use tracing::Instrument;

use crate::config::ResultOrder;
use crate::fetch::client::{ContentFetcher, FetchError};
use crate::observability::metrics;

/// Result slot of a single fetch.
#[derive(Debug)]
pub struct FetchOutcome {
    /// Position of the URL in the request body.
    pub index: usize,
    pub url: String,
    pub result: Result<usize, FetchError>,
}

/// Split a request body into the URLs to fetch.
///
/// Every `\n`-separated segment is kept, empty ones included, so a trailing
/// newline yields an empty URL that fails like any other malformed entry.
/// A trailing `\r` is stripped from each segment.
pub fn split_urls(body: &str) -> Vec<String> {
    body.split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line).to_string())
        .collect()
}

/// Fetch every URL concurrently and return the outcomes in completion order.
///
/// Returns only once every fetch has succeeded, failed or hit `deadline`.
pub async fn fan_out<F>(fetcher: Arc<F>, urls: Vec<String>, deadline: Instant) -> Vec<FetchOutcome>
where
    F: ContentFetcher,
{
    let mut tasks = JoinSet::new();
    let mut pending = HashMap::with_capacity(urls.len());

    for (index, url) in urls.into_iter().enumerate() {
        pending.insert(index, url.clone());
        let fetcher = Arc::clone(&fetcher);
        let task = async move {
            let result = fetch_one(fetcher.as_ref(), &url, deadline).await;
            match &result {
                Ok(_) => metrics::record_fetch("success"),
                Err(FetchError::DeadlineExceeded) => {
                    metrics::record_fetch("timeout");
                    tracing::warn!(url = %url, "Fetch deadline exceeded");
                }
                Err(e) => {
                    metrics::record_fetch("error");
                    tracing::warn!(url = %url, error = %e, "Fetch failed");
                }
            }
            FetchOutcome { index, url, result }
        };
        tasks.spawn(task.instrument(tracing::Span::current()));
    }

    join_all(tasks, pending).await
}

/// Wait for every task, keeping one outcome per URL.
///
/// A task that dies without producing its outcome still gets one, as a
/// `TaskFailed`, so a failure marker keeps its line.
async fn join_all(
    mut tasks: JoinSet<FetchOutcome>,
    mut pending: HashMap<usize, String>,
) -> Vec<FetchOutcome> {
    let mut outcomes = Vec::with_capacity(pending.len());
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(outcome) => {
                pending.remove(&outcome.index);
                outcomes.push(outcome);
            }
            Err(e) => tracing::error!(error = %e, "Fetch task lost"),
        }
    }

    let mut lost: Vec<_> = pending.into_iter().collect();
    lost.sort_by_key(|(index, _)| *index);
    for (index, url) in lost {
        metrics::record_fetch("error");
        outcomes.push(FetchOutcome {
            index,
            url,
            result: Err(FetchError::TaskFailed("fetch task did not complete".into())),
        });
    }
    outcomes
}

async fn fetch_one<F>(fetcher: &F, url: &str, deadline: Instant) -> Result<usize, FetchError>
where
    F: ContentFetcher,
{
    let fetch = AssertUnwindSafe(timeout_at(deadline, fetcher.content_length(url)));
    match fetch.catch_unwind().await {
        Ok(Ok(result)) => result,
        Ok(Err(_elapsed)) => Err(FetchError::DeadlineExceeded),
        Err(panic) => Err(FetchError::TaskFailed(panic_message(panic.as_ref()))),
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "panic".to_string()
    }
}

/// Render outcomes as the response body: one decimal length per line.
///
/// Failed fetches are skipped, or written as `failure_marker` when one is set.
pub fn render_lines(
    mut outcomes: Vec<FetchOutcome>,
    order: ResultOrder,
    failure_marker: Option<&str>,
) -> String {
    if order == ResultOrder::Input {
        outcomes.sort_by_key(|outcome| outcome.index);
    }

    outcomes
        .iter()
        .filter_map(|outcome| match &outcome.result {
            Ok(len) => Some(len.to_string()),
            Err(_) => failure_marker.map(str::to_string),
        })
        .collect::<Vec<_>>()
        .join("\n")
}
