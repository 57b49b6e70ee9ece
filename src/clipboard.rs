//! Clipboard integration

use crate::{ReaderError, Result};
use arboard::Clipboard;
use log::debug;

/// Get text from the system clipboard
///
/// Used to replace the whole document with pasted markdown.
pub fn get_from_clipboard() -> Result<String> {
    debug!("Getting text from clipboard");

    let mut clipboard = Clipboard::new()
        .map_err(|e| ReaderError::Clipboard(format!("Failed to open clipboard: {}", e)))?;

    clipboard
        .get_text()
        .map_err(|e| ReaderError::Clipboard(format!("Failed to get from clipboard: {}", e)))
}
