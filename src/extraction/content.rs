//! Readable article text extraction
//!
//! This module strips boilerplate (scripts, navigation, headers, footers)
//! from a page and returns its main text, one block per line. It is the input
//! stage of the summarizer.

use scraper::node::Node;
use scraper::{ElementRef, Html, Selector};
use std::sync::OnceLock;
use tracing::debug;

/// Minimum characters for a main-content candidate to be trusted
const MIN_MAIN_CONTENT_CHARS: usize = 200;

/// Elements whose subtrees never contribute article text
const SKIPPED_TAGS: &[&str] = &[
    "script", "style", "noscript", "nav", "header", "footer", "aside", "form", "iframe", "svg",
    "template", "head",
];

/// Elements that start a new line of text
const BLOCK_TAGS: &[&str] = &[
    "address", "article", "blockquote", "br", "dd", "div", "dl", "dt", "figcaption", "h1", "h2",
    "h3", "h4", "h5", "h6", "hr", "li", "main", "ol", "p", "pre", "section", "table", "td", "th",
    "tr", "ul",
];

/// Candidate containers for the main content, most specific first
const MAIN_SELECTORS: &[&str] = &[
    "article",
    "main",
    "[role=\"main\"]",
    "[role=\"article\"]",
    ".article",
    ".post",
    ".content",
    ".entry-content",
    ".post-content",
    "#content",
    "#main-content",
    ".main-content",
];

struct Selectors {
    main: Vec<Selector>,
    paragraph: Selector,
    body: Selector,
}

fn selectors() -> &'static Selectors {
    static SELECTORS: OnceLock<Selectors> = OnceLock::new();
    SELECTORS.get_or_init(|| Selectors {
        main: MAIN_SELECTORS
            .iter()
            .filter_map(|s| Selector::parse(s).ok())
            .collect(),
        paragraph: Selector::parse("p").expect("static selector is valid"),
        body: Selector::parse("body").expect("static selector is valid"),
    })
}

/// Extract the readable article text of `markup`.
///
/// Tries well-known main-content containers first, then the page's
/// paragraphs, then the whole body. Plain text input comes back unchanged
/// apart from whitespace normalization.
pub fn extract_article_text(markup: &str, source_url: Option<&str>) -> String {
    let document = Html::parse_document(markup);
    let sel = selectors();

    for selector in &sel.main {
        for element in document.select(selector) {
            let text = element_text(element);
            if text.chars().count() > MIN_MAIN_CONTENT_CHARS {
                debug!(url = ?source_url, "Extracted article text from main container");
                return text;
            }
        }
    }

    let paragraphs: Vec<String> = document
        .select(&sel.paragraph)
        .filter(|p| !inside_skipped(*p))
        .map(element_text)
        .filter(|t| !t.is_empty())
        .collect();
    if !paragraphs.is_empty() {
        debug!(url = ?source_url, count = paragraphs.len(), "Extracted article text from paragraphs");
        return paragraphs.join("\n");
    }

    debug!(url = ?source_url, "Falling back to body text");
    match document.select(&sel.body).next() {
        Some(body) => element_text(body),
        None => element_text(document.root_element()),
    }
}

/// Text of an element with boilerplate removed, one block per line
fn element_text(element: ElementRef<'_>) -> String {
    let mut raw = String::new();
    collect_text(element, &mut raw);
    raw.lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn collect_text(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => out.push_str(text),
            Node::Element(el) => {
                let name = el.name();
                if SKIPPED_TAGS.contains(&name) {
                    continue;
                }
                let block = BLOCK_TAGS.contains(&name);
                if block {
                    out.push('\n');
                }
                if let Some(child_ref) = ElementRef::wrap(child) {
                    collect_text(child_ref, out);
                }
                if block {
                    out.push('\n');
                }
            }
            _ => {}
        }
    }
}

fn inside_skipped(element: ElementRef<'_>) -> bool {
    element.ancestors().any(|node| {
        node.value()
            .as_element()
            .map(|el| SKIPPED_TAGS.contains(&el.name()))
            .unwrap_or(false)
    })
}
