//! Post entity extraction
//!
//! Flattens the entities embedded in harvested posts into `(post id, value)`
//! pairs and turns the link entities into resolver tasks.

use crate::resolver::LinkTask;
use crate::timeline::{EntityKind, Post};
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

/// Entity values of a batch, each paired with the id of the post it came from
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedEntities {
    /// Mentioned screen names
    pub mentions: Vec<(String, String)>,
    /// Hashtag texts
    pub hashtags: Vec<(String, String)>,
    /// Expanded link URLs
    pub urls: Vec<(String, String)>,
    /// Media URLs
    pub media: Vec<(String, String)>,
    /// Symbol texts
    pub symbols: Vec<(String, String)>,
}

impl ExtractedEntities {
    fn of_mut(&mut self, kind: EntityKind) -> &mut Vec<(String, String)> {
        match kind {
            EntityKind::Mention => &mut self.mentions,
            EntityKind::Hashtag => &mut self.hashtags,
            EntityKind::Url => &mut self.urls,
            EntityKind::Media => &mut self.media,
            EntityKind::Symbol => &mut self.symbols,
        }
    }
}

/// Entity extraction functionality
pub struct EntityExtractor;

impl EntityExtractor {
    /// Extract every entity of every post, in post order
    pub fn extract<'a, I>(posts: I) -> ExtractedEntities
    where
        I: IntoIterator<Item = &'a Post>,
    {
        let mut out = ExtractedEntities::default();
        for post in posts {
            for kind in EntityKind::ALL {
                out.of_mut(kind).extend(
                    post.entities_of(kind)
                        .iter()
                        .map(|value| (post.id.clone(), value.clone())),
                );
            }
        }
        out
    }

    /// Link tasks for every fetchable URL entity
    pub fn link_tasks<'a, I>(posts: I) -> Vec<LinkTask>
    where
        I: IntoIterator<Item = &'a Post>,
    {
        Self::extract(posts)
            .urls
            .into_iter()
            .filter(|(post_id, url)| {
                let fetchable = Url::parse(url)
                    .map(|u| matches!(u.scheme(), "http" | "https"))
                    .unwrap_or(false);
                if !fetchable {
                    debug!(post_id = %post_id, url = %url, "Skipping unfetchable link");
                }
                fetchable
            })
            .map(|(post_id, url)| LinkTask::new(post_id, url))
            .collect()
    }
}
