//! linkfeed - Social Link Harvesting & Summarization
//!
//! This crate harvests posts from a social timeline, follows the links they
//! carry to the destination pages, summarizes those pages, and emits one
//! flat feature record per post for downstream ranking.
//!
//! # Features
//!
//! - **Timeline Harvesting**: Backward pagination with a max-id cursor and
//!   rate-limit aware retries
//! - **Link Resolution**: Bounded-concurrency fetching with per-link timeouts
//!   and content-type filtering
//! - **Summarization**: Luhn-style extractive summaries of page text
//! - **Feature Records**: Posts joined with pages, summaries and a popularity rank
//!
//! # Architecture
//!
//! ```text
//! Social API ──▶ TimelinePaginator ──▶ EntityExtractor ──▶ LinkResolver
//!                      │                                        │
//!                      ▼                                        ▼
//!              RateLimitedRequester                    Summarizer + titles
//!                                                               │
//!                                                               ▼
//!                                          FeatureBuilder ──▶ FeatureSink
//! ```
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use linkfeed::config::HarvestConfig;
//! use linkfeed::pipeline::Harvester;
//! use linkfeed::sink::JsonLinesSink;
//! use linkfeed::timeline::{HttpTimelineApi, TimelineSelector};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let api = Arc::new(HttpTimelineApi::new("https://api.twitter.com", "token"));
//!     let harvester = Harvester::new(api, HarvestConfig::default())?;
//!
//!     let report = harvester
//!         .run(TimelineSelector::Home, 50, &JsonLinesSink::stdout())
//!         .await?;
//!     eprintln!("persisted {} records", report.records_persisted);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod config;
pub mod error;
pub mod extraction;
pub mod features;
pub mod metrics;
pub mod pipeline;
pub mod resolver;
pub mod sink;
pub mod summarize;
pub mod timeline;

// Re-exports for convenience
pub use config::HarvestConfig;
pub use error::{Error, HarvestError, Result};
pub use features::{build_features, FeatureBuilder, FeatureRecord};
pub use pipeline::{BatchReport, Harvester};
pub use resolver::{LinkResolver, LinkTask, ResolvedPage};
pub use sink::{FeatureSink, JsonLinesSink, MemorySink};
pub use summarize::{Summarizer, Summary, SUMMARY_UNAVAILABLE};
pub use timeline::{Post, TimelinePaginator, TimelineSelector};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
