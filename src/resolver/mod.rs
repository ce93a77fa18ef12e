//! Link resolution
//!
//! This module follows shortened links to their destination pages with a
//! bounded number of requests in flight. Each task carries its own context
//! (post id, original URL) and fails in isolation: a timeout or bad status
//! drops that one link and the rest of the batch carries on.
//!
//! # Architecture
//!
//! ```text
//! LinkTask ──▶ fetch (redirects followed) ──▶ status / content-type filter
//!                                                   │
//!                                                   ▼
//!                                   bounded body read ──▶ <title> ──▶ ResolvedPage
//! ```
//!
//! Finished tasks are folded into a single map by one aggregator, so no
//! state is shared between in-flight requests.

use crate::config::HarvestConfig;
use crate::error::{Error, ResolveError, Result};
use crate::extraction::title_or_placeholder;
use crate::metrics::global_metrics;
use futures::stream::{self, StreamExt};
use reqwest::header::CONTENT_TYPE;
use reqwest::{redirect, StatusCode};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, instrument, warn};

/// A link found in a post, waiting to be resolved
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LinkTask {
    /// Id of the post the link came from
    pub post_id: String,
    /// URL as it appeared in the post
    pub url: String,
}

impl LinkTask {
    /// Create a task
    pub fn new<P: Into<String>, U: Into<String>>(post_id: P, url: U) -> Self {
        Self {
            post_id: post_id.into(),
            url: url.into(),
        }
    }
}

/// Destination page of a resolved link
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedPage {
    /// Id of the post the link came from
    pub post_id: String,
    /// URL as it appeared in the post
    pub original_url: String,
    /// URL of the terminal response after redirects
    pub final_url: String,
    /// Page title, or the `???` placeholder
    pub title: String,
    /// Captured body, possibly cut at the byte budget
    pub content: String,
    /// HTTP status of the terminal response
    pub status: u16,
    /// Time spent resolving, in seconds
    pub elapsed_secs: f64,
}

/// Resolves link tasks concurrently
#[derive(Debug, Clone)]
pub struct LinkResolver {
    client: reqwest::Client,
    concurrency: usize,
    timeout: Duration,
}

impl LinkResolver {
    /// Create a resolver from the batch configuration
    pub fn new(config: &HarvestConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder()
            .redirect(redirect::Policy::limited(config.max_redirects));
        if let Some(ua) = &config.user_agent {
            builder = builder.user_agent(ua.clone());
        }
        let client = builder
            .build()
            .map_err(|e| Error::config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self::with_client(
            client,
            config.concurrency,
            config.request_timeout,
        ))
    }

    /// Create a resolver around an existing client
    pub fn with_client(client: reqwest::Client, concurrency: usize, timeout: Duration) -> Self {
        Self {
            client,
            concurrency: concurrency.max(1),
            timeout,
        }
    }

    /// Resolve every task, returning the successful pages keyed by post id.
    ///
    /// When several links of one post resolve, the last one to finish wins.
    /// Completion order is not deterministic.
    #[instrument(skip(self, tasks), fields(task_count = tasks.len(), concurrency = self.concurrency))]
    pub async fn resolve_all(
        &self,
        tasks: Vec<LinkTask>,
        content_byte_budget: Option<usize>,
    ) -> HashMap<String, ResolvedPage> {
        info!("Fetching titles of web pages");

        let pages = stream::iter(tasks)
            .map(|task| async move { self.resolve_one(&task, content_byte_budget).await })
            .buffer_unordered(self.concurrency)
            .fold(HashMap::new(), |mut acc, outcome| async move {
                if let Ok(page) = outcome {
                    acc.insert(page.post_id.clone(), page);
                }
                acc
            })
            .await;

        info!(resolved = pages.len(), "Finished resolving links");
        pages
    }

    /// Resolve a single task under the per-task timeout
    pub async fn resolve_one(
        &self,
        task: &LinkTask,
        content_byte_budget: Option<usize>,
    ) -> std::result::Result<ResolvedPage, ResolveError> {
        let start = Instant::now();
        let outcome = tokio::time::timeout(self.timeout, self.fetch(task, content_byte_budget, start))
            .await
            .unwrap_or_else(|_| Err(ResolveError::Timeout(timeout_millis(self.timeout))));

        let metrics = global_metrics();
        match &outcome {
            Ok(page) => {
                metrics.record_link_resolved(start.elapsed());
                info!(
                    status = page.status,
                    final_url = %page.final_url,
                    original_url = %task.url,
                    post_id = %task.post_id,
                    title = %page.title,
                    elapsed_secs = page.elapsed_secs,
                    "Resolved link"
                );
            }
            Err(e) => {
                metrics.record_link_skipped(skip_label(e));
                if e.is_unexpected() {
                    error!(original_url = %task.url, post_id = %task.post_id, error = %e, "Skipping link");
                } else {
                    warn!(original_url = %task.url, post_id = %task.post_id, reason = %e, "Skipping link");
                }
            }
        }
        outcome
    }

    async fn fetch(
        &self,
        task: &LinkTask,
        content_byte_budget: Option<usize>,
        start: Instant,
    ) -> std::result::Result<ResolvedPage, ResolveError> {
        let response = self.client.get(&task.url).send().await?;
        let status = response.status();
        let final_url = response.url().to_string();
        debug!(status = status.as_u16(), final_url = %final_url, "Terminal response");

        if status == StatusCode::NOT_FOUND {
            return Err(ResolveError::NotFound);
        }
        if status != StatusCode::OK {
            return Err(ResolveError::Status(status.as_u16()));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        if !is_textual(content_type.as_deref()) {
            return Err(ResolveError::NotText(content_type));
        }

        let content = match content_byte_budget {
            None => response.text().await?,
            Some(budget) => read_bounded(response, budget).await?,
        };
        let title = title_or_placeholder(&content);

        Ok(ResolvedPage {
            post_id: task.post_id.clone(),
            original_url: task.url.clone(),
            final_url,
            title,
            content,
            status: status.as_u16(),
            elapsed_secs: start.elapsed().as_secs_f64(),
        })
    }
}

/// Whether a declared content type is textual (`text/*`).
///
/// A missing header counts as non-textual.
pub fn is_textual(content_type: Option<&str>) -> bool {
    content_type
        .and_then(|ct| ct.split('/').next())
        .map(|primary| primary.trim().to_ascii_lowercase().starts_with("text"))
        .unwrap_or(false)
}

/// Read at most `budget` bytes of the body
async fn read_bounded(
    mut response: reqwest::Response,
    budget: usize,
) -> std::result::Result<String, ResolveError> {
    let mut buf: Vec<u8> = Vec::with_capacity(budget.min(64 * 1024));
    while buf.len() < budget {
        match response.chunk().await? {
            Some(chunk) => buf.extend_from_slice(&chunk),
            None => break,
        }
    }
    buf.truncate(budget);
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

/// Timeout in whole milliseconds, saturating at `u64::MAX`
fn timeout_millis(timeout: Duration) -> u64 {
    u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX)
}

fn skip_label(err: &ResolveError) -> &'static str {
    match err {
        ResolveError::NotText(_) => "not_text",
        ResolveError::NotFound => "not_found",
        ResolveError::Status(_) => "status",
        ResolveError::Timeout(_) => "timeout",
        ResolveError::Transport(_) => "transport",
        ResolveError::Body(_) => "body",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_textual() {
        assert!(is_textual(Some("text/html")));
        assert!(is_textual(Some("text/html; charset=utf-8")));
        assert!(is_textual(Some("TEXT/plain")));
        assert!(!is_textual(Some("image/png")));
        assert!(!is_textual(Some("application/json")));
        assert!(!is_textual(Some("")));
        assert!(!is_textual(None));
    }

    #[test]
    fn test_link_task_new() {
        let task = LinkTask::new("42", "http://t.co/x");
        assert_eq!(task.post_id, "42");
        assert_eq!(task.url, "http://t.co/x");
    }

    #[test]
    fn test_resolver_clamps_concurrency() {
        let resolver = LinkResolver::with_client(reqwest::Client::new(), 0, Duration::from_secs(1));
        assert_eq!(resolver.concurrency, 1);
    }

    #[test]
    fn test_skip_labels() {
        assert_eq!(skip_label(&ResolveError::Timeout(10)), "timeout");
        assert_eq!(skip_label(&ResolveError::NotText(None)), "not_text");
    }

    #[test]
    fn test_timeout_millis_saturates() {
        assert_eq!(timeout_millis(Duration::from_secs(15)), 15_000);
        assert_eq!(timeout_millis(Duration::from_micros(1500)), 1);
        assert_eq!(timeout_millis(Duration::MAX), u64::MAX);
    }
}
