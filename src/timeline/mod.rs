//! Timeline harvesting module
//!
//! This module provides the social API seam, the rate-limit aware requester
//! and the backward-walking paginator.

pub mod client;
pub mod paginator;
pub mod requester;
pub mod types;

pub use client::{HttpTimelineApi, TimelineApi, TimelineQuery, TimelineSelector, UserRef};
pub use paginator::TimelinePaginator;
pub use requester::{Backoff, Outcome, RateLimitedRequester};
pub use types::{Author, EntityKind, Post};
