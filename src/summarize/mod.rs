//! Extractive summarization
//!
//! Luhn-style summaries built from the clustering of significant words, as
//! described in "The Automatic Creation of Literature Abstracts" (H.P. Luhn,
//! 1958).
//!
//! # Algorithm
//!
//! 1. Extract readable text from the page and split it into sentences.
//! 2. The `n` most frequent non-stopwords of the lower-cased text are the
//!    significant words (ties: earlier first occurrence wins).
//! 3. In each sentence, the first position of every significant word it
//!    contains is collected; positions closer than the cluster threshold
//!    form a cluster.
//! 4. A cluster scores `count² / span`; a sentence scores its best cluster.
//!    Sentences without significant words are not scored at all.
//! 5. Two summaries come out: sentences scoring above
//!    `mean + 0.5 · stddev`, and the `top_sentences` best scores. Both list
//!    sentences in their original order.
//!
//! # Example
//!
//! ```rust
//! use linkfeed::config::SummarizerConfig;
//! use linkfeed::summarize::Summarizer;
//!
//! let summarizer = Summarizer::new(SummarizerConfig::default());
//! let summary = summarizer
//!     .summarize("<p>Rust is fast. Rust is safe and Rust is fun.</p>")
//!     .unwrap();
//! assert!(!summary.top_n.is_empty());
//! ```

pub mod stopwords;
pub mod tokenize;

use crate::config::SummarizerConfig;
use crate::error::SummaryError;
use crate::extraction::extract_article_text;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

pub use stopwords::is_stopword;
pub use tokenize::{split_sentences, words};

/// Marker used in place of a summary when summarization fails
pub const SUMMARY_UNAVAILABLE: &str = "Error generating summary";

/// Two alternative extractive summaries of one document
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    /// The highest-scoring sentences, in document order
    pub top_n: Vec<String>,
    /// Sentences scoring above mean + half a standard deviation, in document order
    pub above_threshold: Vec<String>,
}

impl Summary {
    /// Top-N sentences joined into one excerpt
    pub fn excerpt(&self) -> String {
        self.top_n.join(" ")
    }
}

/// Score of one sentence
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoredSentence {
    /// Position in the document's sentence sequence
    pub index: usize,
    /// Best cluster score
    pub score: f64,
}

/// Significant-word summarizer
#[derive(Debug, Clone, Copy, Default)]
pub struct Summarizer {
    config: SummarizerConfig,
}

impl Summarizer {
    /// Create a summarizer
    pub fn new(config: SummarizerConfig) -> Self {
        Self { config }
    }

    /// Parameters in effect
    pub fn config(&self) -> &SummarizerConfig {
        &self.config
    }

    /// Summarize page markup (or plain text)
    pub fn summarize(&self, content: &str) -> Result<Summary, SummaryError> {
        self.summarize_page(content, None)
    }

    /// Summarize page markup fetched from `source_url`
    pub fn summarize_page(
        &self,
        content: &str,
        source_url: Option<&str>,
    ) -> Result<Summary, SummaryError> {
        let text = extract_article_text(content, source_url);
        self.summarize_text(&text)
    }

    /// Summarize text that has already been extracted
    pub fn summarize_text(&self, text: &str) -> Result<Summary, SummaryError> {
        if text.trim().is_empty() {
            return Err(SummaryError::EmptyContent);
        }

        let sentences = split_sentences(text);
        if sentences.is_empty() {
            return Err(SummaryError::NoSentences);
        }

        let normalized: Vec<String> = sentences.iter().map(|s| s.to_lowercase()).collect();
        let tokens: Vec<Vec<&str>> = normalized.iter().map(|s| words(s)).collect();

        let significant = significant_words(&tokens, self.config.significant_words);
        let scored = score_sentences(&tokens, &significant, self.config.cluster_threshold);
        if scored.is_empty() {
            return Err(SummaryError::NoSignificantWords);
        }

        let (mean, std) = mean_and_std(&scored);
        let cutoff = mean + 0.5 * std;
        let above_threshold = scored
            .iter()
            .filter(|s| s.score > cutoff)
            .map(|s| sentences[s.index].clone())
            .collect();

        // Stable sort keeps earlier sentences ahead on equal scores.
        let mut ranked = scored;
        ranked.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
        ranked.truncate(self.config.top_sentences);
        ranked.sort_by_key(|s| s.index);
        let top_n = ranked.iter().map(|s| sentences[s.index].clone()).collect();

        Ok(Summary {
            top_n,
            above_threshold,
        })
    }
}

/// The `n` most frequent non-stopwords.
///
/// Ordered by frequency, then by first occurrence in the document.
fn significant_words<'a>(tokens: &[Vec<&'a str>], n: usize) -> HashSet<&'a str> {
    let mut freq: HashMap<&'a str, (usize, usize)> = HashMap::new();
    for (position, word) in tokens.iter().flatten().enumerate() {
        freq.entry(*word).or_insert((0, position)).0 += 1;
    }

    let mut ranked: Vec<(&'a str, usize, usize)> = freq
        .into_iter()
        .filter(|(word, _)| !is_stopword(word))
        .map(|(word, (count, first))| (word, count, first))
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.2.cmp(&b.2)));

    ranked.into_iter().take(n).map(|(word, _, _)| word).collect()
}

fn score_sentences(
    tokens: &[Vec<&str>],
    significant: &HashSet<&str>,
    cluster_threshold: usize,
) -> Vec<ScoredSentence> {
    tokens
        .iter()
        .enumerate()
        .filter_map(|(index, sentence)| {
            score_sentence(sentence, significant, cluster_threshold)
                .map(|score| ScoredSentence { index, score })
        })
        .collect()
}

/// Best cluster score of one sentence, `None` without significant words
fn score_sentence(
    sentence: &[&str],
    significant: &HashSet<&str>,
    cluster_threshold: usize,
) -> Option<f64> {
    let mut seen = HashSet::new();
    let positions: Vec<usize> = sentence
        .iter()
        .enumerate()
        .filter(|(_, word)| significant.contains(*word) && seen.insert(**word))
        .map(|(i, _)| i)
        .collect();

    let first = *positions.first()?;
    let mut clusters: Vec<(usize, usize, usize)> = Vec::new(); // (start, end, count)
    let mut current = (first, first, 1);
    for &pos in &positions[1..] {
        if pos - current.1 < cluster_threshold {
            current.1 = pos;
            current.2 += 1;
        } else {
            clusters.push(current);
            current = (pos, pos, 1);
        }
    }
    clusters.push(current);

    clusters
        .iter()
        .map(|&(start, end, count)| (count * count) as f64 / (end - start + 1) as f64)
        .reduce(f64::max)
}

/// Mean and population standard deviation of the scores
fn mean_and_std(scored: &[ScoredSentence]) -> (f64, f64) {
    let n = scored.len() as f64;
    let mean = scored.iter().map(|s| s.score).sum::<f64>() / n;
    let variance = scored.iter().map(|s| (s.score - mean).powi(2)).sum::<f64>() / n;
    (mean, variance.sqrt())
}
