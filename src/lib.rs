//! mdread - read markdown documents aloud from the terminal
//!
//! The document is split into paragraphs that can be read one at a time or
//! played through in order, with pause, resume and stop. Speech goes through
//! the platform's TTS service or an espeak-ng subprocess.

pub mod clipboard;
pub mod document;
pub mod error;
pub mod input;
pub mod platform;
pub mod playback;
pub mod speech;
pub mod state;
pub mod terminal;
pub mod view;

pub use error::{ReaderError, Result};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const APP_NAME: &str = "mdread";
