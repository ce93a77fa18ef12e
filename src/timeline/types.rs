//! Post types
//!
//! [`Post`] is the crate's own view of a timeline entry. [`ApiStatus`] mirrors
//! the JSON the timeline API returns and is converted into a `Post` as soon as
//! a page is decoded.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Timestamp layout used by the timeline API (`Wed Oct 10 20:19:24 +0000 2018`)
pub const CREATED_AT_FORMAT: &str = "%a %b %d %H:%M:%S %z %Y";

/// Kinds of structured entity embedded in a post
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    /// `@screen_name` mentions
    Mention,
    /// `#hashtag` text
    Hashtag,
    /// Expanded link URLs
    Url,
    /// Attached media URLs
    Media,
    /// `$SYMBOL` cashtags
    Symbol,
}

impl EntityKind {
    /// All kinds, in extraction order
    pub const ALL: [EntityKind; 5] = [
        EntityKind::Mention,
        EntityKind::Hashtag,
        EntityKind::Url,
        EntityKind::Media,
        EntityKind::Symbol,
    ];
}

/// A post author
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    /// Screen name
    pub screen_name: String,
    /// Profile image URL
    pub profile_image_url: Option<String>,
}

/// A harvested post
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    /// Post identifier, kept as a string since ids exceed 2^53
    pub id: String,
    /// Author
    pub author: Author,
    /// Creation timestamp as delivered by the API
    pub created_at: String,
    /// Favorite count
    pub favorite_count: u64,
    /// Retweet count
    pub retweet_count: u64,
    /// Whether the authenticated account favorited it
    pub favorited: bool,
    /// Whether the authenticated account retweeted it
    pub retweeted: bool,
    /// Raw text
    pub text: String,
    /// Entity values grouped by kind, each in post order
    pub entities: BTreeMap<EntityKind, Vec<String>>,
}

impl Post {
    /// Numeric form of the id, used for cursor arithmetic
    pub fn numeric_id(&self) -> Option<u64> {
        self.id.parse().ok()
    }

    /// Entity values of one kind
    pub fn entities_of(&self, kind: EntityKind) -> &[String] {
        self.entities.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Parsed creation timestamp
    pub fn created_at_time(&self) -> Option<DateTime<FixedOffset>> {
        DateTime::parse_from_str(&self.created_at, CREATED_AT_FORMAT).ok()
    }
}

/// A status object as returned by the timeline API
#[derive(Debug, Clone, Deserialize)]
pub struct ApiStatus {
    /// String id
    pub id_str: String,
    /// Creation timestamp
    #[serde(default)]
    pub created_at: String,
    /// Text
    #[serde(default)]
    pub text: String,
    /// Favorite count
    #[serde(default)]
    pub favorite_count: u64,
    /// Retweet count
    #[serde(default)]
    pub retweet_count: u64,
    /// Favorited flag
    #[serde(default)]
    pub favorited: bool,
    /// Retweeted flag
    #[serde(default)]
    pub retweeted: bool,
    /// Author
    #[serde(default)]
    pub user: ApiUser,
    /// Embedded entities
    #[serde(default)]
    pub entities: ApiEntities,
}

/// User object embedded in a status
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiUser {
    /// Screen name
    #[serde(default)]
    pub screen_name: String,
    /// Profile image URL
    pub profile_image_url: Option<String>,
}

/// Entities object embedded in a status
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiEntities {
    /// Mentions
    #[serde(default)]
    pub user_mentions: Vec<ApiMention>,
    /// Hashtags
    #[serde(default)]
    pub hashtags: Vec<ApiTextEntity>,
    /// Links
    #[serde(default)]
    pub urls: Vec<ApiUrl>,
    /// Symbols
    #[serde(default)]
    pub symbols: Vec<ApiTextEntity>,
    /// Media, absent for posts without attachments
    #[serde(default)]
    pub media: Vec<ApiMedia>,
}

/// Mention entity
#[derive(Debug, Clone, Deserialize)]
pub struct ApiMention {
    /// Mentioned screen name
    pub screen_name: String,
}

/// Hashtag or symbol entity
#[derive(Debug, Clone, Deserialize)]
pub struct ApiTextEntity {
    /// Entity text without the sigil
    pub text: String,
}

/// Link entity
#[derive(Debug, Clone, Deserialize)]
pub struct ApiUrl {
    /// Expanded URL, null for some truncated links
    pub expanded_url: Option<String>,
}

/// Media entity
#[derive(Debug, Clone, Deserialize)]
pub struct ApiMedia {
    /// Short media URL
    pub url: String,
}

impl From<ApiStatus> for Post {
    fn from(status: ApiStatus) -> Self {
        let e = status.entities;
        let mut entities = BTreeMap::new();
        entities.insert(
            EntityKind::Mention,
            e.user_mentions.into_iter().map(|m| m.screen_name).collect(),
        );
        entities.insert(
            EntityKind::Hashtag,
            e.hashtags.into_iter().map(|h| h.text).collect(),
        );
        entities.insert(
            EntityKind::Url,
            e.urls.into_iter().filter_map(|u| u.expanded_url).collect(),
        );
        entities.insert(
            EntityKind::Media,
            e.media.into_iter().map(|m| m.url).collect(),
        );
        entities.insert(
            EntityKind::Symbol,
            e.symbols.into_iter().map(|s| s.text).collect(),
        );

        Post {
            id: status.id_str,
            author: Author {
                screen_name: status.user.screen_name,
                profile_image_url: status.user.profile_image_url,
            },
            created_at: status.created_at,
            favorite_count: status.favorite_count,
            retweet_count: status.retweet_count,
            favorited: status.favorited,
            retweeted: status.retweeted,
            text: status.text,
            entities,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STATUS: &str = r#"{
        "id": 462300000000000001,
        "id_str": "462300000000000001",
        "created_at": "Sat May 03 14:20:00 +0000 2014",
        "text": "Worth reading http://t.co/abc #news",
        "favorite_count": 4,
        "retweet_count": 2,
        "favorited": false,
        "retweeted": true,
        "user": {"screen_name": "ptwobrussell", "profile_image_url": "http://img/p.png"},
        "entities": {
            "user_mentions": [{"screen_name": "hacknashville"}],
            "hashtags": [{"text": "news"}],
            "urls": [{"expanded_url": "http://example.com/story"}, {"expanded_url": null}],
            "symbols": []
        }
    }"#;

    #[test]
    fn test_status_conversion() {
        let status: ApiStatus = serde_json::from_str(STATUS).unwrap();
        let post = Post::from(status);

        assert_eq!(post.id, "462300000000000001");
        assert_eq!(post.numeric_id(), Some(462300000000000001));
        assert_eq!(post.author.screen_name, "ptwobrussell");
        assert_eq!(post.entities_of(EntityKind::Url), ["http://example.com/story"]);
        assert_eq!(post.entities_of(EntityKind::Mention), ["hacknashville"]);
        assert!(post.entities_of(EntityKind::Media).is_empty());
        assert!(post.retweeted);
    }

    #[test]
    fn test_created_at_parsing() {
        let status: ApiStatus = serde_json::from_str(STATUS).unwrap();
        let post = Post::from(status);
        let ts = post.created_at_time().unwrap();
        assert_eq!(ts.timestamp(), 1399126800);
    }

    #[test]
    fn test_entity_kind_serialization() {
        let json = serde_json::to_string(&EntityKind::Hashtag).unwrap();
        assert_eq!(json, "\"hashtag\"");
    }
}
