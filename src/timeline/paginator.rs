//! Timeline pagination
//!
//! Walks a timeline backward in time with a max-id cursor until a page cap,
//! an empty page, or the requested number of posts is reached.

use crate::config::HarvestConfig;
use crate::error::HarvestError;
use crate::timeline::client::{TimelineApi, TimelineQuery, TimelineSelector};
use crate::timeline::requester::RateLimitedRequester;
use crate::timeline::types::Post;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Assembles bounded post collections from a [`TimelineApi`]
#[derive(Clone)]
pub struct TimelinePaginator {
    api: Arc<dyn TimelineApi>,
    requester: RateLimitedRequester,
    page_size: usize,
    user_max_pages: usize,
    home_max_pages: usize,
}

impl TimelinePaginator {
    /// Create a paginator using the page settings and retry policy of `config`
    pub fn new(api: Arc<dyn TimelineApi>, config: &HarvestConfig) -> Self {
        Self {
            api,
            requester: RateLimitedRequester::new(config.retry.clone()),
            page_size: config.page_size,
            user_max_pages: config.user_max_pages,
            home_max_pages: config.home_max_pages,
        }
    }

    /// Page cap for a selector
    pub fn max_pages(&self, selector: &TimelineSelector) -> usize {
        match selector {
            TimelineSelector::Home => self.home_max_pages,
            TimelineSelector::User(_) => self.user_max_pages,
        }
    }

    /// Fetch up to `max_results` posts, newest first.
    ///
    /// Boundary posts may be requested twice across pages; duplicates are
    /// left for the caller, which keys posts by id.
    #[instrument(skip(self), fields(timeline = selector.label()))]
    pub async fn fetch(
        &self,
        selector: TimelineSelector,
        max_results: usize,
    ) -> Result<Vec<Post>, HarvestError> {
        let max_pages = self.max_pages(&selector);
        let mut query = TimelineQuery::first_page(selector, self.page_size);
        let mut results: Vec<Post> = Vec::new();

        let page = match self.fetch_page(&query).await? {
            Some(page) => page,
            None => {
                warn!("First timeline page returned no result; nothing to harvest");
                return Ok(Vec::new());
            }
        };
        info!("Fetched {} posts", page.len());
        let mut cursor = next_cursor(&page);
        let mut last_len = page.len();
        results.extend(page);

        // Small timelines fit in one page; don't spend a second request.
        let mut page_num = if max_results <= self.page_size {
            max_pages
        } else {
            1
        };

        while page_num < max_pages && last_len > 0 && results.len() < max_results {
            let Some(max_id) = cursor else {
                warn!("Page carried no numeric ids; stopping pagination");
                break;
            };
            query.max_id = Some(max_id);

            let page = self.fetch_page(&query).await?.unwrap_or_default();
            info!("Fetched {} posts", page.len());
            cursor = next_cursor(&page);
            last_len = page.len();
            results.extend(page);

            page_num += 1;
        }

        info!(total = results.len(), pages = page_num, "Done fetching posts");
        results.truncate(max_results);
        Ok(results)
    }

    /// Screen name of the authenticated account
    pub async fn authenticated_screen_name(&self) -> Result<String, HarvestError> {
        self.requester
            .execute(|| self.api.verify_credentials())
            .await?
            .ok_or(HarvestError::NoAccount)
    }

    async fn fetch_page(&self, query: &TimelineQuery) -> Result<Option<Vec<Post>>, HarvestError> {
        self.requester.execute(|| self.api.fetch_page(query)).await
    }
}

/// Cursor for the page after `page`: one below its smallest id
fn next_cursor(page: &[Post]) -> Option<u64> {
    page.iter()
        .filter_map(Post::numeric_id)
        .min()
        .map(|min| min.saturating_sub(1))
}
