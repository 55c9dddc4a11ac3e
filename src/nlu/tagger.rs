//! Statistical sequence tagging (BIO) and span reconstruction

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One token with its BIO tag (`B-TEN_NGANH`, `I-TEN_NGANH`, `O`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaggedToken {
    pub token: String,
    pub tag: String,
}

impl TaggedToken {
    pub fn new(token: impl Into<String>, tag: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            tag: tag.into(),
        }
    }
}

/// External named-entity tagger
///
/// Implementations receive the normalized utterance. A failing tagger never
/// aborts extraction; the statistical pass simply yields nothing.
pub trait SequenceTagger: Send + Sync + fmt::Debug {
    fn tag(&self, text: &str) -> Result<Vec<TaggedToken>>;
}

/// A reconstructed span: `(label, joined text)`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaggedSpan {
    pub label: String,
    pub text: String,
}

/// Rebuilds labeled spans from BIO tags.
///
/// `B-X` flushes the open span and starts a new one, `I-X` extends an open
/// span of the same type, anything else flushes. An `I-` tag with no
/// matching open span is dropped. Syllables of segmented tokens
/// (`công_nghệ`) are rejoined with spaces.
pub fn collect_bio_spans(tokens: &[TaggedToken]) -> Vec<TaggedSpan> {
    let mut spans = Vec::new();
    let mut open: Option<(String, Vec<String>)> = None;

    for tagged in tokens {
        let word = tagged.token.replace('_', " ");
        if let Some(label) = tagged.tag.strip_prefix("B-") {
            flush(&mut open, &mut spans);
            open = Some((label.to_string(), vec![word]));
            continue;
        }
        if let Some(label) = tagged.tag.strip_prefix("I-") {
            match open.as_mut() {
                Some((open_label, words)) if open_label == label => {
                    words.push(word);
                    continue;
                }
                _ => {}
            }
        }
        flush(&mut open, &mut spans);
    }
    flush(&mut open, &mut spans);

    spans
}

fn flush(open: &mut Option<(String, Vec<String>)>, spans: &mut Vec<TaggedSpan>) {
    if let Some((label, words)) = open.take() {
        let text = words.join(" ").trim().to_string();
        if !label.is_empty() && !text.is_empty() {
            spans.push(TaggedSpan { label, text });
        }
    }
}
