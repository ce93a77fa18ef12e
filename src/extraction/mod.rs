//! Extraction module
//!
//! This module pulls structured data out of posts (entities) and out of
//! fetched pages (titles and readable article text).

pub mod content;
pub mod entities;
pub mod title;

pub use content::extract_article_text;
pub use entities::{EntityExtractor, ExtractedEntities};
pub use title::{parse_title, title_or_placeholder, UNKNOWN_TITLE};
