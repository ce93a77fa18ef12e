//! Shared fixtures for integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use linkfeed::error::ApiError;
use linkfeed::timeline::{Author, EntityKind, Post, TimelineApi, TimelineQuery};
use std::collections::{BTreeMap, VecDeque};
use std::sync::Mutex;

/// A post with the given id and expanded link URLs
pub fn post(id: u64, urls: &[&str]) -> Post {
    let mut entities = BTreeMap::new();
    entities.insert(
        EntityKind::Url,
        urls.iter().map(|u| u.to_string()).collect::<Vec<_>>(),
    );
    Post {
        id: id.to_string(),
        author: Author {
            screen_name: "author".to_string(),
            profile_image_url: None,
        },
        created_at: "Sat May 03 14:20:00 +0000 2014".to_string(),
        favorite_count: 2,
        retweet_count: 1,
        favorited: false,
        retweeted: false,
        text: format!("post {}", id),
        entities,
    }
}

/// A page of link-free posts with descending ids
pub fn page(ids: &[u64]) -> Vec<Post> {
    ids.iter().map(|id| post(*id, &[])).collect()
}

/// Timeline API that replays a fixed script of responses.
///
/// Once the script runs out every call returns an empty page.
#[derive(Default)]
pub struct ScriptedApi {
    responses: Mutex<VecDeque<Result<Vec<Post>, ApiError>>>,
    queries: Mutex<Vec<TimelineQuery>>,
    account: Option<String>,
}

impl ScriptedApi {
    /// Script the responses, in call order
    pub fn new<I>(responses: I) -> Self
    where
        I: IntoIterator<Item = Result<Vec<Post>, ApiError>>,
    {
        Self {
            responses: Mutex::new(responses.into_iter().collect()),
            queries: Mutex::new(Vec::new()),
            account: None,
        }
    }

    /// Answer credential checks with `name`
    pub fn with_account(mut self, name: &str) -> Self {
        self.account = Some(name.to_string());
        self
    }

    /// Queries received so far
    pub fn queries(&self) -> Vec<TimelineQuery> {
        self.queries.lock().unwrap().clone()
    }

    /// Number of page requests received
    pub fn calls(&self) -> usize {
        self.queries.lock().unwrap().len()
    }
}

#[async_trait]
impl TimelineApi for ScriptedApi {
    async fn fetch_page(&self, query: &TimelineQuery) -> Result<Vec<Post>, ApiError> {
        self.queries.lock().unwrap().push(query.clone());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn verify_credentials(&self) -> Result<String, ApiError> {
        self.account.clone().ok_or(ApiError::Status(401))
    }
}
