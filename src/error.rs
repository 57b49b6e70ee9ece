//! Error types for mdread

use std::io;
use thiserror::Error;

/// Main error type for mdread
#[derive(Error, Debug)]
pub enum ReaderError {
    /// No speech backend could be created; playback degrades to no-ops
    #[error("Speech synthesis unavailable")]
    SynthesisUnavailable,

    #[error("Speech synthesis error: {0}")]
    Speech(String),

    /// The backend reported a failure mid-utterance
    #[error("Utterance failed: {0}")]
    Utterance(String),

    #[error("Paragraph index {index} out of range (have {len})")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("INI parse error: {0}")]
    IniParse(String),

    #[error("Clipboard error: {0}")]
    Clipboard(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

/// Result type alias for mdread operations
pub type Result<T> = std::result::Result<T, ReaderError>;

impl From<String> for ReaderError {
    fn from(s: String) -> Self {
        ReaderError::Other(s)
    }
}

impl From<&str> for ReaderError {
    fn from(s: &str) -> Self {
        ReaderError::Other(s.to_string())
    }
}
