//! Page title parsing

use scraper::{Html, Selector};
use std::sync::OnceLock;

/// Title recorded when a page has no parseable `<title>`
pub const UNKNOWN_TITLE: &str = "???";

fn title_selector() -> &'static Selector {
    static SELECTOR: OnceLock<Selector> = OnceLock::new();
    SELECTOR.get_or_init(|| Selector::parse("title").expect("static selector is valid"))
}

/// Text of the document's first `<title>`, whitespace collapsed.
///
/// Returns `None` when there is no title element or it is blank.
pub fn parse_title(markup: &str) -> Option<String> {
    let document = Html::parse_document(markup);
    let element = document.select(title_selector()).next()?;
    let raw: String = element.text().collect();
    let title = collapse_whitespace(&raw);
    if title.is_empty() {
        None
    } else {
        Some(title)
    }
}

/// [`parse_title`] with the [`UNKNOWN_TITLE`] placeholder on failure
pub fn title_or_placeholder(markup: &str) -> String {
    parse_title(markup).unwrap_or_else(|| UNKNOWN_TITLE.to_string())
}

/// Join whitespace-separated words with single spaces
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
