//! Timeline API client
//!
//! [`TimelineApi`] is the seam between the harvesting loop and the social
//! network. The paginator only depends on the trait, so tests can script page
//! sequences and failures without a network. [`HttpTimelineApi`] talks to a
//! v1.1-style REST API over reqwest.

use crate::error::ApiError;
use crate::timeline::types::{ApiStatus, Post};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

/// Which account a user timeline belongs to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserRef {
    /// Look up by screen name
    ScreenName(String),
    /// Look up by numeric user id
    UserId(String),
}

/// Timeline to harvest
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimelineSelector {
    /// The authenticated account's home timeline
    Home,
    /// A user's own posts
    User(UserRef),
}

impl TimelineSelector {
    /// Short label for logs
    pub fn label(&self) -> &'static str {
        match self {
            TimelineSelector::Home => "home",
            TimelineSelector::User(_) => "user",
        }
    }
}

/// Parameters for one page request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimelineQuery {
    /// Timeline being walked
    pub selector: TimelineSelector,
    /// Posts per page
    pub count: usize,
    /// Lower exclusive bound on ids
    pub since_id: u64,
    /// Upper inclusive bound on ids; `None` for the newest page
    pub max_id: Option<u64>,
}

impl TimelineQuery {
    /// Query for the newest page of a timeline
    pub fn first_page(selector: TimelineSelector, count: usize) -> Self {
        Self {
            selector,
            count,
            since_id: 1,
            max_id: None,
        }
    }

    /// Query parameters in API form
    pub fn params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("count", self.count.to_string()),
            ("since_id", self.since_id.to_string()),
            ("trim_user", "false".to_string()),
        ];
        match &self.selector {
            TimelineSelector::Home => {
                params.push(("include_entities", "true".to_string()));
            }
            TimelineSelector::User(user) => {
                params.push(("include_rts", "true".to_string()));
                match user {
                    UserRef::ScreenName(name) => params.push(("screen_name", name.clone())),
                    UserRef::UserId(id) => params.push(("user_id", id.clone())),
                }
            }
        }
        if let Some(max_id) = self.max_id {
            params.push(("max_id", max_id.to_string()));
        }
        params
    }
}

/// A paginated, rate-limited timeline API
#[async_trait]
pub trait TimelineApi: Send + Sync {
    /// Fetch one page of posts
    async fn fetch_page(&self, query: &TimelineQuery) -> Result<Vec<Post>, ApiError>;

    /// Screen name of the authenticated account
    async fn verify_credentials(&self) -> Result<String, ApiError>;
}

/// Default API root
pub const DEFAULT_API_BASE: &str = "https://api.twitter.com";

#[derive(Debug, Deserialize)]
struct Credentials {
    screen_name: String,
}

/// reqwest-backed [`TimelineApi`]
#[derive(Debug, Clone)]
pub struct HttpTimelineApi {
    client: reqwest::Client,
    base_url: String,
    token: String,
}

impl HttpTimelineApi {
    /// Create a client against `base_url` authenticating with a bearer token
    pub fn new<S: Into<String>, T: Into<String>>(base_url: S, token: T) -> Self {
        Self::with_client(reqwest::Client::new(), base_url, token)
    }

    /// Create a client reusing an existing reqwest client
    pub fn with_client<S: Into<String>, T: Into<String>>(
        client: reqwest::Client,
        base_url: S,
        token: T,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        }
    }

    fn endpoint(&self, selector: &TimelineSelector) -> String {
        let path = match selector {
            TimelineSelector::Home => "statuses/home_timeline.json",
            TimelineSelector::User(_) => "statuses/user_timeline.json",
        };
        format!("{}/1.1/{}", self.base_url, path)
    }

    async fn get(&self, url: &str, params: &[(&str, String)]) -> Result<reqwest::Response, ApiError> {
        let response = self
            .client
            .get(url)
            .bearer_auth(&self.token)
            .query(params)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            Err(ApiError::Status(status.as_u16()))
        }
    }
}

#[async_trait]
impl TimelineApi for HttpTimelineApi {
    async fn fetch_page(&self, query: &TimelineQuery) -> Result<Vec<Post>, ApiError> {
        let url = self.endpoint(&query.selector);
        debug!(url = %url, max_id = ?query.max_id, "Requesting timeline page");

        let statuses: Vec<ApiStatus> = self
            .get(&url, &query.params())
            .await?
            .json()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))?;

        Ok(statuses.into_iter().map(Post::from).collect())
    }

    async fn verify_credentials(&self) -> Result<String, ApiError> {
        let url = format!("{}/1.1/account/verify_credentials.json", self.base_url);
        let creds: Credentials = self
            .get(&url, &[])
            .await?
            .json()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))?;
        Ok(creds.screen_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn param<'a>(params: &'a [(&'static str, String)], key: &str) -> Option<&'a str> {
        params.iter().find(|(k, _)| *k == key).map(|(_, v)| v.as_str())
    }

    #[test]
    fn test_first_page_params_home() {
        let query = TimelineQuery::first_page(TimelineSelector::Home, 200);
        let params = query.params();
        assert_eq!(param(&params, "count"), Some("200"));
        assert_eq!(param(&params, "since_id"), Some("1"));
        assert_eq!(param(&params, "include_entities"), Some("true"));
        assert_eq!(param(&params, "max_id"), None);
    }

    #[test]
    fn test_user_params_with_cursor() {
        let mut query = TimelineQuery::first_page(
            TimelineSelector::User(UserRef::ScreenName("someone".into())),
            200,
        );
        query.max_id = Some(41);
        let params = query.params();
        assert_eq!(param(&params, "screen_name"), Some("someone"));
        assert_eq!(param(&params, "include_rts"), Some("true"));
        assert_eq!(param(&params, "max_id"), Some("41"));
        assert_eq!(param(&params, "user_id"), None);
    }

    #[test]
    fn test_endpoint_per_selector() {
        let api = HttpTimelineApi::new("http://localhost:9/", "t");
        assert_eq!(
            api.endpoint(&TimelineSelector::Home),
            "http://localhost:9/1.1/statuses/home_timeline.json"
        );
        assert_eq!(
            api.endpoint(&TimelineSelector::User(UserRef::UserId("7".into()))),
            "http://localhost:9/1.1/statuses/user_timeline.json"
        );
    }
}
