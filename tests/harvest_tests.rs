//! Timeline harvesting tests
//!
//! These tests drive the paginator and the rate-limit aware requester against
//! a scripted timeline API. Clock-dependent tests run on a paused tokio clock,
//! so multi-minute waits complete instantly.

mod common;

use common::{page, ScriptedApi};
use linkfeed::config::{HarvestConfig, RetryPolicy};
use linkfeed::error::{ApiError, HarvestError};
use linkfeed::timeline::{TimelinePaginator, TimelineSelector, UserRef};
use linkfeed::metrics::global_metrics;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

fn paginator(api: &Arc<ScriptedApi>, config: &HarvestConfig) -> TimelinePaginator {
    TimelinePaginator::new(api.clone(), config)
}

fn small_pages() -> HarvestConfig {
    HarvestConfig::builder().page_size(2).build()
}

fn user(name: &str) -> TimelineSelector {
    TimelineSelector::User(UserRef::ScreenName(name.to_string()))
}

#[tokio::test]
async fn test_small_request_uses_one_page() {
    let api = Arc::new(ScriptedApi::new([
        Ok(page(&[30, 20, 10])),
        Ok(page(&[9, 8])),
    ]));
    let posts = paginator(&api, &HarvestConfig::default())
        .fetch(TimelineSelector::Home, 50)
        .await
        .unwrap();

    assert_eq!(posts.len(), 3);
    assert_eq!(api.calls(), 1);
}

#[tokio::test]
async fn test_home_timeline_stops_at_page_cap_and_keeps_endpoint() {
    let api = Arc::new(ScriptedApi::new((0..6u64).map(|i| {
        let top = 100 - i * 2;
        Ok(page(&[top, top - 1]))
    })));
    let posts = paginator(&api, &small_pages())
        .fetch(TimelineSelector::Home, 100)
        .await
        .unwrap();

    assert_eq!(posts.len(), 8);
    let queries = api.queries();
    assert_eq!(queries.len(), 4);
    assert!(queries.iter().all(|q| q.selector == TimelineSelector::Home));
    let cursors: Vec<Option<u64>> = queries.iter().map(|q| q.max_id).collect();
    assert_eq!(cursors, vec![None, Some(98), Some(96), Some(94)]);
}

#[tokio::test]
async fn test_user_timeline_page_cap() {
    let config = HarvestConfig::builder().page_size(2).max_pages(3, 4).build();
    let api = Arc::new(ScriptedApi::new((0..10u64).map(|i| {
        let top = 100 - i * 2;
        Ok(page(&[top, top - 1]))
    })));
    let posts = paginator(&api, &config)
        .fetch(user("someone"), 1000)
        .await
        .unwrap();

    assert_eq!(api.calls(), 3);
    assert_eq!(posts.len(), 6);
    assert!(api.queries().iter().all(|q| q.selector == user("someone")));
}

#[tokio::test]
async fn test_truncates_to_requested_count() {
    let api = Arc::new(ScriptedApi::new([
        Ok(page(&[10, 9])),
        Ok(page(&[8, 7])),
        Ok(page(&[6, 5])),
    ]));
    let posts = paginator(&api, &small_pages())
        .fetch(user("someone"), 3)
        .await
        .unwrap();

    let ids: Vec<&str> = posts.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(ids, vec!["10", "9", "8"]);
    assert_eq!(api.calls(), 2);
}

#[tokio::test]
async fn test_empty_page_ends_pagination() {
    let api = Arc::new(ScriptedApi::new([Ok(page(&[10, 9])), Ok(Vec::new())]));
    let posts = paginator(&api, &small_pages())
        .fetch(user("someone"), 100)
        .await
        .unwrap();

    assert_eq!(posts.len(), 2);
    assert_eq!(api.calls(), 2);
}

#[tokio::test]
async fn test_not_authorized_first_page_is_empty_result() {
    let api = Arc::new(ScriptedApi::new([Err(ApiError::Status(401))]));
    let posts = paginator(&api, &small_pages())
        .fetch(TimelineSelector::Home, 100)
        .await
        .unwrap();

    assert!(posts.is_empty());
    assert_eq!(api.calls(), 1);
}

#[tokio::test]
async fn test_not_authorized_later_page_ends_pagination() {
    let api = Arc::new(ScriptedApi::new([
        Ok(page(&[10, 9])),
        Err(ApiError::Status(401)),
        Ok(page(&[8, 7])),
    ]));
    let posts = paginator(&api, &small_pages())
        .fetch(user("someone"), 100)
        .await
        .unwrap();

    assert_eq!(posts.len(), 2);
    assert_eq!(api.calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_rate_limit_waits_cooldown_then_succeeds() {
    let api = Arc::new(ScriptedApi::new([
        Err(ApiError::Status(429)),
        Ok(page(&[3, 2, 1])),
    ]));
    let rate_limited_before = global_metrics().rate_limited_total.load(Ordering::Relaxed);
    let start = Instant::now();
    let posts = paginator(&api, &HarvestConfig::default())
        .fetch(TimelineSelector::Home, 10)
        .await
        .unwrap();

    assert_eq!(posts.len(), 3);
    assert_eq!(api.calls(), 2);
    // One cooldown, with no server-error backoff stacked on top.
    let elapsed = start.elapsed();
    assert!(elapsed >= Duration::from_secs(900), "{:?}", elapsed);
    assert!(elapsed < Duration::from_secs(901), "{:?}", elapsed);
    assert!(global_metrics().rate_limited_total.load(Ordering::Relaxed) > rate_limited_before);
}

#[tokio::test(start_paused = true)]
async fn test_server_errors_back_off_then_abort() {
    let api = Arc::new(ScriptedApi::new(
        std::iter::repeat_with(|| Err(ApiError::Status(503))).take(30),
    ));
    let start = Instant::now();
    let err = paginator(&api, &HarvestConfig::default())
        .fetch(TimelineSelector::Home, 10)
        .await
        .unwrap_err();

    assert!(matches!(err, HarvestError::BackoffExhausted { cap_secs: 3600, .. }));
    // 19 escalating waits (2s, 3s, 4.5s, ...) fit under the cap
    assert_eq!(api.calls(), 20);
    assert!(start.elapsed() >= Duration::from_secs(8800));
}

#[tokio::test(start_paused = true)]
async fn test_server_error_then_success() {
    let api = Arc::new(ScriptedApi::new([
        Err(ApiError::Status(502)),
        Err(ApiError::Status(500)),
        Ok(page(&[1])),
    ]));
    let start = Instant::now();
    let posts = paginator(&api, &HarvestConfig::default())
        .fetch(TimelineSelector::Home, 10)
        .await
        .unwrap();

    assert_eq!(posts.len(), 1);
    assert!(start.elapsed() >= Duration::from_secs(5));
}

#[tokio::test]
async fn test_transport_error_budget() {
    let api = Arc::new(ScriptedApi::new(
        std::iter::repeat_with(|| Err(ApiError::Transport("connection reset".into()))).take(20),
    ));
    let err = paginator(&api, &HarvestConfig::default())
        .fetch(TimelineSelector::Home, 10)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        HarvestError::TransportBudgetExhausted { count: 11, .. }
    ));
    assert_eq!(api.calls(), 11);
}

#[tokio::test(start_paused = true)]
async fn test_transport_counter_resets_on_other_outcomes() {
    let transport = || Err(ApiError::Transport("connection reset".into()));
    let script = std::iter::repeat_with(transport)
        .take(10)
        .chain([Err(ApiError::Status(503))])
        .chain(std::iter::repeat_with(transport).take(10))
        .chain([Ok(page(&[5, 4]))]);
    let api = Arc::new(ScriptedApi::new(script));

    let posts = paginator(&api, &HarvestConfig::default())
        .fetch(TimelineSelector::Home, 10)
        .await
        .unwrap();
    assert_eq!(posts.len(), 2);
    assert_eq!(api.calls(), 22);
}

#[tokio::test]
async fn test_unhandled_status_is_fatal() {
    let api = Arc::new(ScriptedApi::new([Err(ApiError::Status(403))]));
    let err = paginator(&api, &HarvestConfig::default())
        .fetch(TimelineSelector::Home, 10)
        .await
        .unwrap_err();
    assert!(matches!(err, HarvestError::Api(403)));
}

#[tokio::test]
async fn test_custom_retry_policy() {
    let retry = RetryPolicy {
        max_transport_errors: 2,
        ..RetryPolicy::default()
    };
    let config = HarvestConfig::builder().retry(retry).build();
    let api = Arc::new(ScriptedApi::new(
        std::iter::repeat_with(|| Err(ApiError::Transport("refused".into()))).take(5),
    ));
    let err = paginator(&api, &config)
        .fetch(TimelineSelector::Home, 10)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        HarvestError::TransportBudgetExhausted { count: 3, .. }
    ));
}

#[tokio::test]
async fn test_authenticated_screen_name() {
    let api = Arc::new(ScriptedApi::default().with_account("me"));
    let name = paginator(&api, &HarvestConfig::default())
        .authenticated_screen_name()
        .await
        .unwrap();
    assert_eq!(name, "me");

    let anonymous = Arc::new(ScriptedApi::default());
    let err = paginator(&anonymous, &HarvestConfig::default())
        .authenticated_screen_name()
        .await
        .unwrap_err();
    assert!(matches!(err, HarvestError::NoAccount));
}
