//! Sentence and word tokenization

use regex::Regex;
use std::sync::OnceLock;

/// Words that end in a period without ending the sentence
const ABBREVIATIONS: &[&str] = &[
    "mr", "mrs", "ms", "dr", "prof", "sr", "jr", "st", "vs", "etc", "e.g", "i.e", "inc", "ltd",
    "co", "corp", "u.s", "u.k", "no", "fig", "approx", "jan", "feb", "mar", "apr", "jun", "jul",
    "aug", "sep", "sept", "oct", "nov", "dec",
];

fn boundary_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"[.!?]+["'”’)\]]*\s+"#).unwrap())
}

fn word_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[\p{L}\p{N}]+(?:['’][\p{L}\p{N}]+)*").unwrap())
}

/// Split text into sentences, preserving order and original case.
///
/// Line breaks always end a sentence. Within a line a terminator followed by
/// whitespace ends one unless the next word starts lower-case or the word
/// before it is a known abbreviation or a single-letter initial.
pub fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let mut start = 0;
        for m in boundary_re().find_iter(line) {
            let next = line[m.end()..].chars().next();
            if next.map(char::is_lowercase).unwrap_or(false) {
                continue;
            }
            let candidate = line[start..m.end()].trim();
            if ends_with_abbreviation(candidate) {
                continue;
            }
            sentences.push(candidate.to_string());
            start = m.end();
        }

        let rest = line[start..].trim();
        if !rest.is_empty() {
            sentences.push(rest.to_string());
        }
    }

    sentences
}

fn ends_with_abbreviation(candidate: &str) -> bool {
    let Some(last) = candidate.split_whitespace().last() else {
        return false;
    };
    let last = last.trim_end_matches(|c| matches!(c, '"' | '\'' | '”' | '’' | ')' | ']'));
    let Some(word) = last.strip_suffix('.') else {
        return false;
    };
    let word = word.to_lowercase();
    let is_initial = word.chars().count() == 1 && word.chars().all(char::is_alphabetic);
    is_initial || ABBREVIATIONS.contains(&word.as_str())
}

/// Word tokens of `text` (letter/digit runs, inner apostrophes kept)
pub fn words(text: &str) -> Vec<&str> {
    word_re().find_iter(text).map(|m| m.as_str()).collect()
}
