//! Persistence of the last opened document
//!
//! Keeps the document content between runs so `mdread` with no arguments
//! reopens what was read last. Voice choice is deliberately not stored.

use crate::{ReaderError, Result};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Content shown when nothing has been stored yet
pub const DEFAULT_CONTENT: &str = "# Hello, World!";

/// Document snapshot written to disk
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredDocument {
    pub content: String,

    /// File the content was loaded from, if any
    #[serde(default)]
    pub source: Option<PathBuf>,
}

impl Default for StoredDocument {
    fn default() -> Self {
        Self {
            content: DEFAULT_CONTENT.to_string(),
            source: None,
        }
    }
}

/// JSON-backed store for the last document
pub struct DocumentStore {
    path: PathBuf,
}

impl DocumentStore {
    /// Store at the default location (`<data dir>/mdread/document.json`)
    pub fn open_default() -> Result<Self> {
        let dir = dirs::data_dir()
            .ok_or("Could not find data directory")?
            .join("mdread");
        Ok(Self::at(dir.join("document.json")))
    }

    /// Store at an explicit path
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the stored document, falling back to the default content
    pub fn load(&self) -> Result<StoredDocument> {
        if !self.path.exists() {
            debug!("No stored document at {:?}", self.path);
            return Ok(StoredDocument::default());
        }

        let raw = fs::read_to_string(&self.path)?;
        let doc: StoredDocument = serde_json::from_str(&raw)?;
        info!(
            "Restored document ({} chars) from {:?}",
            doc.content.len(),
            self.path
        );
        Ok(doc)
    }

    /// Write the document, creating the parent directory when needed
    pub fn save(&self, doc: &StoredDocument) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                ReaderError::Config(format!("Failed to create {:?}: {}", parent, e))
            })?;
        }
        let raw = serde_json::to_string_pretty(doc)?;
        fs::write(&self.path, raw)?;
        debug!("Saved document ({} chars)", doc.content.len());
        Ok(())
    }
}
