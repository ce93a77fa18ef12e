//! Feature records
//!
//! Joins posts with their resolved pages and page summaries into flat,
//! serializable records ready for a [`crate::sink::FeatureSink`].

use crate::metrics::global_metrics;
use crate::resolver::ResolvedPage;
use crate::summarize::{Summarizer, Summary, SUMMARY_UNAVAILABLE};
use crate::timeline::Post;
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, warn};
use url::Url;

/// Source type stamped on every record
pub const SOURCE_TYPE: &str = "twitter";

/// One post joined with the page it links to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureRecord {
    /// Page title, or the `???` placeholder
    pub title: String,
    /// Final URL of the page
    pub url: String,
    /// Host of the final URL
    pub hostname: Option<String>,
    /// Screen name of the post author
    pub source: String,
    /// Profile image of the post author
    pub source_image_url: Option<String>,
    /// Where the post came from
    pub source_type: String,
    /// Raw post text
    pub post_text: String,
    /// Post timestamp as delivered by the API
    pub post_created_at: String,
    /// Parsed post timestamp, absent when the API value is malformed
    pub post_published: Option<DateTime<FixedOffset>>,
    /// Likes of the post
    pub favorite_count: u64,
    /// Reposts of the post
    pub retweet_count: u64,
    /// Whether the account liked the post
    pub favorited: bool,
    /// Whether the account reposted the post
    pub retweeted: bool,
    /// `1.5 * favorite_count + retweet_count`
    pub rank: f64,
    /// Id of the post
    pub post_id: String,
    /// Screen name of the harvesting account, when known
    pub account: Option<String>,
    /// Top sentences joined, or [`SUMMARY_UNAVAILABLE`]
    pub excerpt: String,
    /// Structured summary, absent when summarization failed
    pub summary: Option<Summary>,
}

/// Popularity rank of a post
pub fn rank(favorite_count: u64, retweet_count: u64) -> f64 {
    1.5 * favorite_count as f64 + retweet_count as f64
}

/// Builds feature records for one batch
#[derive(Debug, Clone, Copy)]
pub struct FeatureBuilder<'a> {
    summarizer: &'a Summarizer,
    account: Option<&'a str>,
}

impl<'a> FeatureBuilder<'a> {
    /// Create a builder
    pub fn new(summarizer: &'a Summarizer) -> Self {
        Self {
            summarizer,
            account: None,
        }
    }

    /// Stamp records with the harvesting account
    pub fn account(mut self, account: Option<&'a str>) -> Self {
        self.account = account;
        self
    }

    /// Join posts and pages by post id, newest post first.
    ///
    /// Pages without a matching post are dropped.
    pub fn build(
        &self,
        posts: &HashMap<String, Post>,
        pages: &HashMap<String, ResolvedPage>,
    ) -> Vec<FeatureRecord> {
        let mut records: Vec<FeatureRecord> = pages
            .iter()
            .filter_map(|(post_id, page)| match posts.get(post_id) {
                Some(post) => Some(self.record(post, page)),
                None => {
                    debug!(post_id = %post_id, "Dropping page without a matching post");
                    None
                }
            })
            .collect();

        records.sort_by(|a, b| {
            let key = |r: &FeatureRecord| (r.post_id.parse::<u64>().ok(), r.post_id.clone());
            key(b).cmp(&key(a))
        });
        records
    }

    /// Build the record of one post and its page
    pub fn record(&self, post: &Post, page: &ResolvedPage) -> FeatureRecord {
        let summary = match self
            .summarizer
            .summarize_page(&page.content, Some(&page.final_url))
        {
            Ok(summary) => Some(summary),
            Err(e) => {
                global_metrics().record_summary_failed();
                warn!(post_id = %post.id, url = %page.final_url, error = %e, "Summary unavailable");
                None
            }
        };
        let excerpt = summary
            .as_ref()
            .map(Summary::excerpt)
            .unwrap_or_else(|| SUMMARY_UNAVAILABLE.to_string());

        FeatureRecord {
            title: page.title.clone(),
            url: page.final_url.clone(),
            hostname: Url::parse(&page.final_url)
                .ok()
                .and_then(|u| u.host_str().map(str::to_string)),
            source: post.author.screen_name.clone(),
            source_image_url: post.author.profile_image_url.clone(),
            source_type: SOURCE_TYPE.to_string(),
            post_text: post.text.clone(),
            post_created_at: post.created_at.clone(),
            post_published: post.created_at_time(),
            favorite_count: post.favorite_count,
            retweet_count: post.retweet_count,
            favorited: post.favorited,
            retweeted: post.retweeted,
            rank: rank(post.favorite_count, post.retweet_count),
            post_id: post.id.clone(),
            account: self.account.map(str::to_string),
            excerpt,
            summary,
        }
    }
}

/// Build feature records with a one-off [`FeatureBuilder`]
pub fn build_features(
    posts: &HashMap<String, Post>,
    pages: &HashMap<String, ResolvedPage>,
    summarizer: &Summarizer,
    account: Option<&str>,
) -> Vec<FeatureRecord> {
    FeatureBuilder::new(summarizer)
        .account(account)
        .build(posts, pages)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timeline::Author;
    use pretty_assertions::assert_eq;
    use std::collections::BTreeMap;

    fn post(id: &str, fav: u64, rt: u64) -> Post {
        Post {
            id: id.to_string(),
            author: Author {
                screen_name: "alice".to_string(),
                profile_image_url: Some("http://img.example/alice.png".to_string()),
            },
            created_at: "Sat May 03 14:20:00 +0000 2014".to_string(),
            favorite_count: fav,
            retweet_count: rt,
            favorited: false,
            retweeted: true,
            text: format!("post {}", id),
            entities: BTreeMap::new(),
        }
    }

    fn page(post_id: &str, content: &str) -> ResolvedPage {
        ResolvedPage {
            post_id: post_id.to_string(),
            original_url: "http://t.co/x".to_string(),
            final_url: "https://news.example.com/story".to_string(),
            title: "Story".to_string(),
            content: content.to_string(),
            status: 200,
            elapsed_secs: 0.1,
        }
    }

    #[test]
    fn test_rank() {
        assert_eq!(rank(4, 2), 8.0);
        assert_eq!(rank(0, 0), 0.0);
        assert_eq!(rank(1, 0), 1.5);
    }

    #[test]
    fn test_build_joins_and_drops_orphans() {
        let posts = HashMap::from([("1".to_string(), post("1", 4, 2))]);
        let pages = HashMap::from([
            ("1".to_string(), page("1", "<p>Rust makes link harvesting fast.</p>")),
            ("2".to_string(), page("2", "<p>Orphan page.</p>")),
        ]);
        let summarizer = Summarizer::default();
        let records = build_features(&posts, &pages, &summarizer, Some("me"));

        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.post_id, "1");
        assert_eq!(record.rank, 8.0);
        assert_eq!(record.hostname.as_deref(), Some("news.example.com"));
        assert_eq!(record.source, "alice");
        assert_eq!(record.source_type, "twitter");
        assert_eq!(record.account.as_deref(), Some("me"));
        assert_eq!(
            record.post_published.map(|t| t.timestamp()),
            Some(1399126800)
        );
        assert!(record.retweeted);
        assert_eq!(record.excerpt, "Rust makes link harvesting fast.");
        assert!(record.summary.is_some());
    }

    #[test]
    fn test_failed_summary_uses_marker() {
        let posts = HashMap::from([("7".to_string(), post("7", 0, 0))]);
        let pages = HashMap::from([("7".to_string(), page("7", ""))]);
        let records = build_features(&posts, &pages, &Summarizer::default(), None);

        assert_eq!(records[0].excerpt, SUMMARY_UNAVAILABLE);
        assert_eq!(records[0].summary, None);
        assert_eq!(records[0].account, None);
    }

    #[test]
    fn test_malformed_created_at_leaves_published_empty() {
        let mut bad = post("3", 1, 1);
        bad.created_at = "yesterday".to_string();
        let record = FeatureBuilder::new(&Summarizer::default())
            .record(&bad, &page("3", "<p>Rust pages load quickly.</p>"));

        assert_eq!(record.post_created_at, "yesterday");
        assert_eq!(record.post_published, None);
    }

    #[test]
    fn test_records_sorted_newest_first() {
        let posts: HashMap<String, Post> = ["9", "100", "42"]
            .iter()
            .map(|id| (id.to_string(), post(id, 0, 0)))
            .collect();
        let pages: HashMap<String, ResolvedPage> = ["9", "100", "42"]
            .iter()
            .map(|id| (id.to_string(), page(id, "<p>Some page text.</p>")))
            .collect();

        let ids: Vec<String> = build_features(&posts, &pages, &Summarizer::default(), None)
            .into_iter()
            .map(|r| r.post_id)
            .collect();
        assert_eq!(ids, vec!["100", "42", "9"]);
    }
}
