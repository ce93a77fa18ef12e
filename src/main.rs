//! linkfeed CLI
//!
//! Harvests one batch from a timeline and writes feature records as JSON lines.

use anyhow::{Context, Result};
use clap::Parser;
use linkfeed::config::{HarvestConfig, DEFAULT_CONCURRENCY, DEFAULT_REQUEST_TIMEOUT};
use linkfeed::metrics;
use linkfeed::pipeline::Harvester;
use linkfeed::sink::{FeatureSink, JsonLinesSink};
use linkfeed::timeline::client::DEFAULT_API_BASE;
use linkfeed::timeline::{HttpTimelineApi, TimelineSelector, UserRef};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// linkfeed harvester
#[derive(Parser, Debug)]
#[command(name = "linkfeed")]
#[command(version)]
#[command(about = "Harvest timeline links, summarize the pages, emit feature records")]
struct Args {
    /// Root URL of the social API
    #[arg(long, env = "LINKFEED_API_BASE", default_value = DEFAULT_API_BASE)]
    api_base: String,

    /// Bearer token for the social API
    #[arg(long, env = "LINKFEED_API_TOKEN", hide_env_values = true)]
    token: String,

    /// Harvest the home timeline (default)
    #[arg(long, conflicts_with_all = ["user_timeline", "user_id"])]
    home_timeline: bool,

    /// Harvest a user timeline; without a name, the authenticated account's
    #[arg(long, value_name = "SCREEN_NAME", num_args = 0..=1, default_missing_value = "")]
    user_timeline: Option<String>,

    /// Harvest the user timeline of a numeric user id
    #[arg(long, conflicts_with = "user_timeline")]
    user_id: Option<String>,

    /// Maximum number of posts to harvest
    #[arg(short = 'n', long, default_value = "50")]
    num_posts: usize,

    /// Links resolved concurrently
    #[arg(short, long, default_value_t = DEFAULT_CONCURRENCY)]
    concurrency: usize,

    /// Per-link timeout in seconds
    #[arg(long, default_value_t = DEFAULT_REQUEST_TIMEOUT.as_secs())]
    timeout_secs: u64,

    /// Keep at most this many bytes of each page
    #[arg(long)]
    byte_budget: Option<usize>,

    /// User-Agent header for link resolution
    #[arg(long)]
    user_agent: Option<String>,

    /// Write records to this file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Batch id for log correlation (random when omitted)
    #[arg(long)]
    batch_id: Option<String>,

    /// Print Prometheus-format metrics to stderr when done
    #[arg(long)]
    metrics: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn config(&self) -> HarvestConfig {
        let mut builder = HarvestConfig::builder()
            .concurrency(self.concurrency)
            .request_timeout(Duration::from_secs(self.timeout_secs))
            .content_byte_budget(self.byte_budget);
        if let Some(ua) = &self.user_agent {
            builder = builder.user_agent(ua.clone());
        }
        if let Some(id) = &self.batch_id {
            builder = builder.batch_id(id.clone());
        }
        builder.build()
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let filter = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(std::io::stderr)
        .init();
    metrics::init();

    info!(version = linkfeed::VERSION, api_base = %args.api_base, "linkfeed starting");

    let api = Arc::new(HttpTimelineApi::new(args.api_base.clone(), args.token.clone()));
    let harvester =
        Harvester::new(api, args.config()).context("invalid harvest configuration")?;

    let account = match harvester.paginator().authenticated_screen_name().await {
        Ok(name) => Some(name),
        Err(e) => {
            warn!(error = %e, "Could not determine the authenticated account");
            None
        }
    };

    let selector = match (&args.user_timeline, &args.user_id) {
        _ if args.home_timeline => TimelineSelector::Home,
        (_, Some(id)) => TimelineSelector::User(UserRef::UserId(id.clone())),
        (Some(name), None) if !name.is_empty() => {
            TimelineSelector::User(UserRef::ScreenName(name.clone()))
        }
        (Some(_), None) => {
            let name = account
                .clone()
                .context("user timeline requested without a name and no authenticated account")?;
            TimelineSelector::User(UserRef::ScreenName(name))
        }
        (None, None) => TimelineSelector::Home,
    };

    let harvester = match account {
        Some(name) => harvester.with_account(name),
        None => harvester,
    };

    let sink: Box<dyn FeatureSink> = match &args.output {
        Some(path) => Box::new(
            JsonLinesSink::create(path)
                .with_context(|| format!("cannot open {}", path.display()))?,
        ),
        None => Box::new(JsonLinesSink::stdout()),
    };

    let report = harvester
        .run(selector, args.num_posts, sink.as_ref())
        .await
        .context("harvest failed")?;
    info!(
        batch_id = %report.batch_id,
        records = report.records_persisted,
        "Done"
    );

    if args.metrics {
        eprint!("{}", metrics::global_metrics().to_prometheus_format());
    }

    Ok(())
}
