//! Harvest configuration
//!
//! All tunables for one harvest batch live here and are passed in explicitly
//! at startup. Nothing in the crate reads ambient process state.

use std::time::Duration;

/// Number of posts requested per timeline page
pub const DEFAULT_PAGE_SIZE: usize = 200;
/// Page cap for a user timeline walk
pub const DEFAULT_USER_MAX_PAGES: usize = 16;
/// Page cap for a home timeline walk
pub const DEFAULT_HOME_MAX_PAGES: usize = 4;
/// Default number of links resolved at once
pub const DEFAULT_CONCURRENCY: usize = 16;
/// Default per-link timeout
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(15);
/// Default redirect hop cap per link
pub const DEFAULT_MAX_REDIRECTS: usize = 10;

/// Retry and backoff policy for timeline API calls
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// First wait after a transient server error (default: 2s)
    pub initial_wait: Duration,
    /// Growth factor applied after every transient wait (default: 1.5)
    pub multiplier: f64,
    /// Abort once the next wait would exceed this (default: 3600s)
    pub max_wait: Duration,
    /// Cooldown slept after a rate-limit response (default: 900s)
    pub rate_limit_cooldown: Duration,
    /// Consecutive transport errors tolerated before aborting (default: 10)
    pub max_transport_errors: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            initial_wait: Duration::from_secs(2),
            multiplier: 1.5,
            max_wait: Duration::from_secs(3600),
            rate_limit_cooldown: Duration::from_secs(900),
            max_transport_errors: 10,
        }
    }
}

/// Parameters of the significant-word summarizer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SummarizerConfig {
    /// Number of significant words considered (default: 100)
    pub significant_words: usize,
    /// Gap below which adjacent significant words share a cluster (default: 5)
    pub cluster_threshold: usize,
    /// Sentences in the top-N summary (default: 5)
    pub top_sentences: usize,
}

impl Default for SummarizerConfig {
    fn default() -> Self {
        Self {
            significant_words: 100,
            cluster_threshold: 5,
            top_sentences: 5,
        }
    }
}

/// Configuration for a harvest batch
#[derive(Debug, Clone)]
pub struct HarvestConfig {
    /// Posts per timeline page (default: 200)
    pub page_size: usize,
    /// Page cap for user timelines (default: 16)
    pub user_max_pages: usize,
    /// Page cap for the home timeline (default: 4)
    pub home_max_pages: usize,
    /// Links resolved concurrently (default: 16)
    pub concurrency: usize,
    /// Per-link timeout (default: 15s)
    pub request_timeout: Duration,
    /// Redirect hops followed per link (default: 10)
    pub max_redirects: usize,
    /// Bytes read per page; `None` reads the whole body (default: None)
    pub content_byte_budget: Option<usize>,
    /// User agent for page fetches (None = reqwest default)
    pub user_agent: Option<String>,
    /// Retry policy for timeline calls
    pub retry: RetryPolicy,
    /// Summarizer parameters
    pub summarizer: SummarizerConfig,
    /// Identifier attached to this batch's log lines (None = generated)
    pub batch_id: Option<String>,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            user_max_pages: DEFAULT_USER_MAX_PAGES,
            home_max_pages: DEFAULT_HOME_MAX_PAGES,
            concurrency: DEFAULT_CONCURRENCY,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            max_redirects: DEFAULT_MAX_REDIRECTS,
            content_byte_budget: None,
            user_agent: None,
            retry: RetryPolicy::default(),
            summarizer: SummarizerConfig::default(),
            batch_id: None,
        }
    }
}

impl HarvestConfig {
    /// Create a new config builder
    pub fn builder() -> HarvestConfigBuilder {
        HarvestConfigBuilder::default()
    }

    /// Check the values that would otherwise stall or spin the pipeline
    pub fn validate(&self) -> crate::Result<()> {
        if self.page_size == 0 {
            return Err(crate::Error::config("page_size must be at least 1"));
        }
        if self.concurrency == 0 {
            return Err(crate::Error::config("concurrency must be at least 1"));
        }
        if self.content_byte_budget == Some(0) {
            return Err(crate::Error::config("content byte budget must be positive"));
        }
        if !self.retry.multiplier.is_finite() || self.retry.multiplier <= 1.0 {
            return Err(crate::Error::config(
                "backoff multiplier must be a finite number above 1.0",
            ));
        }
        if self.retry.initial_wait.is_zero() {
            return Err(crate::Error::config("initial backoff wait must be positive"));
        }
        if self.summarizer.cluster_threshold == 0 {
            return Err(crate::Error::config("cluster threshold must be at least 1"));
        }
        Ok(())
    }
}

/// Builder for HarvestConfig
#[derive(Default)]
pub struct HarvestConfigBuilder {
    config: HarvestConfig,
}

impl HarvestConfigBuilder {
    /// Set posts per page
    pub fn page_size(mut self, size: usize) -> Self {
        self.config.page_size = size;
        self
    }

    /// Set page caps for user and home timelines
    pub fn max_pages(mut self, user: usize, home: usize) -> Self {
        self.config.user_max_pages = user;
        self.config.home_max_pages = home;
        self
    }

    /// Set link resolution concurrency
    pub fn concurrency(mut self, concurrency: usize) -> Self {
        self.config.concurrency = concurrency;
        self
    }

    /// Set per-link timeout
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.config.request_timeout = timeout;
        self
    }

    /// Set redirect hop cap
    pub fn max_redirects(mut self, hops: usize) -> Self {
        self.config.max_redirects = hops;
        self
    }

    /// Set the per-page byte budget
    pub fn content_byte_budget(mut self, budget: Option<usize>) -> Self {
        self.config.content_byte_budget = budget;
        self
    }

    /// Set user agent
    pub fn user_agent<S: Into<String>>(mut self, ua: S) -> Self {
        self.config.user_agent = Some(ua.into());
        self
    }

    /// Set retry policy
    pub fn retry(mut self, retry: RetryPolicy) -> Self {
        self.config.retry = retry;
        self
    }

    /// Set summarizer parameters
    pub fn summarizer(mut self, summarizer: SummarizerConfig) -> Self {
        self.config.summarizer = summarizer;
        self
    }

    /// Set the batch identifier
    pub fn batch_id<S: Into<String>>(mut self, id: S) -> Self {
        self.config.batch_id = Some(id.into());
        self
    }

    /// Build the config
    pub fn build(self) -> HarvestConfig {
        self.config
    }
}
