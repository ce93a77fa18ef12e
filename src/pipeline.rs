//! Harvest pipeline
//!
//! One batch end to end:
//!
//! ```text
//! TimelinePaginator ──▶ posts by id ──▶ LinkTasks ──▶ LinkResolver
//!                                                        │
//!                         FeatureSink ◀── FeatureBuilder ◀┘
//! ```
//!
//! A fatal harvest error ends the batch before anything reaches the sink.
//! Link and summary failures only drop or mark single records.

use crate::config::HarvestConfig;
use crate::error::{Error, Result};
use crate::extraction::EntityExtractor;
use crate::features::FeatureBuilder;
use crate::resolver::LinkResolver;
use crate::sink::FeatureSink;
use crate::summarize::Summarizer;
use crate::timeline::{Post, TimelineApi, TimelinePaginator, TimelineSelector};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, info_span, Instrument};
use uuid::Uuid;

/// Counts for one finished batch
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchReport {
    /// Id stamped on every log line of the batch
    pub batch_id: String,
    /// Posts returned by the paginator
    pub posts_fetched: usize,
    /// Posts left after de-duplication by id
    pub unique_posts: usize,
    /// Fetchable links found in the posts
    pub links: usize,
    /// Links that resolved to a textual page
    pub pages_resolved: usize,
    /// Records handed to the sink
    pub records_persisted: usize,
    /// Wall time of the batch
    pub elapsed: Duration,
}

/// Runs harvest batches
pub struct Harvester {
    paginator: TimelinePaginator,
    resolver: LinkResolver,
    summarizer: Summarizer,
    config: HarvestConfig,
    account: Option<String>,
}

impl Harvester {
    /// Create a harvester for `api` with a validated configuration
    pub fn new(api: Arc<dyn TimelineApi>, config: HarvestConfig) -> Result<Self> {
        config.validate()?;
        let resolver = LinkResolver::new(&config)?;
        Ok(Self {
            paginator: TimelinePaginator::new(api, &config),
            resolver,
            summarizer: Summarizer::new(config.summarizer),
            config,
            account: None,
        })
    }

    /// Stamp records with the harvesting account's screen name
    pub fn with_account<S: Into<String>>(mut self, account: S) -> Self {
        self.account = Some(account.into());
        self
    }

    /// Paginator used for timeline requests
    pub fn paginator(&self) -> &TimelinePaginator {
        &self.paginator
    }

    /// Harvest up to `max_results` posts of `selector` and persist their features.
    ///
    /// The sink is called exactly once, and only if the harvest succeeded.
    pub async fn run(
        &self,
        selector: TimelineSelector,
        max_results: usize,
        sink: &dyn FeatureSink,
    ) -> Result<BatchReport> {
        let batch_id = self
            .config
            .batch_id
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let span = info_span!("batch", batch_id = %batch_id, timeline = selector.label());

        self.run_batch(batch_id, selector, max_results, sink)
            .instrument(span)
            .await
    }

    async fn run_batch(
        &self,
        batch_id: String,
        selector: TimelineSelector,
        max_results: usize,
        sink: &dyn FeatureSink,
    ) -> Result<BatchReport> {
        let start = Instant::now();
        info!(max_results, "Starting harvest batch");

        let fetched = self.paginator.fetch(selector, max_results).await?;
        let posts_fetched = fetched.len();
        let posts = dedupe_posts(fetched);

        let tasks = EntityExtractor::link_tasks(posts.values());
        let links = tasks.len();
        let pages = self
            .resolver
            .resolve_all(tasks, self.config.content_byte_budget)
            .await;

        let records = FeatureBuilder::new(&self.summarizer)
            .account(self.account.as_deref())
            .build(&posts, &pages);
        let records_persisted = sink.persist(&records).await.map_err(Error::from)?;

        let report = BatchReport {
            batch_id,
            posts_fetched,
            unique_posts: posts.len(),
            links,
            pages_resolved: pages.len(),
            records_persisted,
            elapsed: start.elapsed(),
        };
        info!(
            posts = report.unique_posts,
            links = report.links,
            pages = report.pages_resolved,
            records = report.records_persisted,
            elapsed_secs = report.elapsed.as_secs_f64(),
            "Harvest batch complete"
        );
        Ok(report)
    }
}

/// Key posts by id; a repeated id keeps its first occurrence
fn dedupe_posts(posts: Vec<Post>) -> HashMap<String, Post> {
    let mut by_id = HashMap::with_capacity(posts.len());
    for post in posts {
        by_id.entry(post.id.clone()).or_insert(post);
    }
    by_id
}
