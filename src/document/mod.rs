//! Document text and paragraph segmentation
//!
//! The reader never works on raw text directly: every playback position is
//! an index into the paragraph sequence produced here.

pub mod store;

pub use store::{DocumentStore, StoredDocument};

use once_cell::sync::Lazy;
use regex::Regex;

/// A blank line: newline, any run of whitespace (more newlines included), newline
static PARAGRAPH_BREAK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\n\s*\n").expect("paragraph break pattern is valid"));

/// One readable paragraph of the current document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paragraph {
    /// Trimmed paragraph text, never empty
    pub text: String,

    /// Position in the current sequence (0-based)
    pub index: usize,
}

/// Split document text into paragraphs at blank lines
///
/// Candidates are trimmed and empty ones dropped, so indices always form a
/// dense `0..n` run.
pub fn segment(text: &str) -> Vec<Paragraph> {
    PARAGRAPH_BREAK
        .split(text)
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .enumerate()
        .map(|(index, p)| Paragraph {
            text: p.to_string(),
            index,
        })
        .collect()
}
