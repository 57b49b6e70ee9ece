//! Coarse language detection for voice selection

use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;

/// CJK Unified Ideographs block
static CJK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\x{4e00}-\x{9fff}]").expect("CJK pattern is valid"));

/// Language guess used to rank voices
///
/// Only two languages are distinguished; everything that is not Chinese is
/// treated as English.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Language {
    #[default]
    English,
    Chinese,
}

impl Language {
    /// Prefix a voice's language tag must start with to match
    pub fn tag_prefix(self) -> &'static str {
        match self {
            Language::English => "en",
            Language::Chinese => "zh",
        }
    }

    /// Full BCP 47 tag attached to utterances
    pub fn tag(self) -> &'static str {
        match self {
            Language::English => "en-US",
            Language::Chinese => "zh-CN",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Classify text: any CJK ideograph makes it Chinese
pub fn detect_language(text: &str) -> Language {
    if CJK.is_match(text) {
        Language::Chinese
    } else {
        Language::English
    }
}
