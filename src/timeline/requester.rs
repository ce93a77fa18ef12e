//! Rate-limit aware request execution
//!
//! Every timeline call goes through [`RateLimitedRequester::execute`], which
//! classifies the outcome of the call and decides whether to return, retry
//! after a wait, or abort the batch. Waits use `tokio::time::sleep`, so only
//! the calling task is parked while other work keeps running.

use crate::config::RetryPolicy;
use crate::error::{ApiError, HarvestError};
use crate::metrics::global_metrics;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, error, warn};

/// Classification of a single API call outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// 2xx
    Success,
    /// 3xx that reached the caller
    Redirect,
    /// 401
    NotAuthorized,
    /// 404
    NotFound,
    /// 429
    RateLimited,
    /// 500, 502, 503, 504
    TransientServer,
    /// Connection reset, malformed status line and the like
    Transport,
    /// Payload could not be decoded
    Malformed,
    /// Any status without a retry policy
    Unhandled(u16),
}

impl Outcome {
    /// Classify an HTTP status code
    pub fn from_status(status: u16) -> Self {
        match status {
            200..=299 => Outcome::Success,
            300..=399 => Outcome::Redirect,
            401 => Outcome::NotAuthorized,
            404 => Outcome::NotFound,
            429 => Outcome::RateLimited,
            500 | 502 | 503 | 504 => Outcome::TransientServer,
            other => Outcome::Unhandled(other),
        }
    }

    /// Classify a failed call
    pub fn from_error(err: &ApiError) -> Self {
        match err {
            ApiError::Status(status) => Self::from_status(*status),
            ApiError::Transport(_) => Outcome::Transport,
            ApiError::Decode(_) => Outcome::Malformed,
        }
    }
}

/// Escalating wait for transient server errors
#[derive(Debug, Clone)]
pub struct Backoff {
    initial: f64,
    current: f64,
    multiplier: f64,
    cap: Duration,
}

impl Backoff {
    /// Start a fresh backoff from a policy
    pub fn new(policy: &RetryPolicy) -> Self {
        let initial = policy.initial_wait.as_secs_f64();
        Self {
            initial,
            current: initial,
            multiplier: policy.multiplier,
            cap: policy.max_wait,
        }
    }

    /// Fail if the pending wait is already past the cap.
    ///
    /// A wait that is no longer a finite number counts as past the cap.
    pub fn ensure_within_cap(&self) -> Result<(), HarvestError> {
        if !self.current.is_finite() || self.current > self.cap.as_secs_f64() {
            return Err(HarvestError::BackoffExhausted {
                next_wait_secs: self.current,
                cap_secs: self.cap.as_secs(),
            });
        }
        Ok(())
    }

    /// Take the wait to sleep now and escalate the next one
    pub fn next_wait(&mut self) -> Result<Duration, HarvestError> {
        self.ensure_within_cap()?;
        let wait = Duration::from_secs_f64(self.current);
        self.current *= self.multiplier;
        Ok(wait)
    }

    /// Back to the initial wait
    pub fn reset(&mut self) {
        self.current = self.initial;
    }
}

/// Executes timeline calls under the retry policy
#[derive(Debug, Clone, Default)]
pub struct RateLimitedRequester {
    policy: RetryPolicy,
}

impl RateLimitedRequester {
    /// Create a requester with the given policy
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    /// Policy in effect
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Run `call` until it yields a terminal outcome.
    ///
    /// Returns `Ok(Some(_))` on success, `Ok(None)` when the call produced no
    /// result (401, 404, or a redirect surfaced by the client) and `Err` when
    /// the batch must be aborted.
    pub async fn execute<T, F, Fut>(&self, mut call: F) -> Result<Option<T>, HarvestError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ApiError>>,
    {
        let metrics = global_metrics();
        let mut backoff = Backoff::new(&self.policy);
        let mut transport_errors: u32 = 0;

        loop {
            metrics.record_api_request();

            let err = match call().await {
                Ok(value) => return Ok(Some(value)),
                Err(err) => err,
            };

            let outcome = Outcome::from_error(&err);
            if outcome != Outcome::Transport {
                transport_errors = 0;
            }

            match outcome {
                Outcome::Success => {
                    // Only reachable when a client reports a 2xx as an error.
                    return Err(HarvestError::Decode(err.to_string()));
                }
                Outcome::Redirect => {
                    debug!("Redirect reached the requester; passing through without a result");
                    return Ok(None);
                }
                Outcome::NotAuthorized => {
                    error!("Encountered 401 Error (Not Authorized)");
                    return Ok(None);
                }
                Outcome::NotFound => {
                    error!("Encountered 404 Error (Not Found)");
                    return Ok(None);
                }
                Outcome::RateLimited => {
                    backoff.ensure_within_cap()?;
                    metrics.record_rate_limited();
                    let cooldown = self.policy.rate_limit_cooldown;
                    warn!(
                        cooldown_secs = cooldown.as_secs(),
                        "Encountered 429 Error (Rate Limit Exceeded), sleeping"
                    );
                    tokio::time::sleep(cooldown).await;
                    debug!("Awake after rate-limit cooldown, retrying");
                    backoff.reset();
                }
                Outcome::TransientServer => {
                    let wait = backoff.next_wait().map_err(|e| {
                        error!(error = %e, "Too many retries. Quitting.");
                        e
                    })?;
                    metrics.record_server_error();
                    warn!(
                        error = %err,
                        wait_secs = wait.as_secs_f64(),
                        "Transient server error, retrying"
                    );
                    tokio::time::sleep(wait).await;
                }
                Outcome::Transport => {
                    transport_errors += 1;
                    metrics.record_transport_error();
                    warn!(error = %err, consecutive = transport_errors, "Transport error, continuing");
                    if transport_errors > self.policy.max_transport_errors {
                        error!("Too many consecutive errors, bailing out");
                        return Err(HarvestError::TransportBudgetExhausted {
                            count: transport_errors,
                            last: err.to_string(),
                        });
                    }
                }
                Outcome::Malformed => {
                    return Err(HarvestError::Decode(err.to_string()));
                }
                Outcome::Unhandled(status) => {
                    error!(status, "Unhandled API status");
                    return Err(HarvestError::Api(status));
                }
            }
        }
    }
}
