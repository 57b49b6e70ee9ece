//! Application state management
//!
//! The Reader struct is the central data structure of the front end,
//! holding configuration, the playback controller, the focused paragraph
//! and where the document came from.

pub mod config;

use crate::document::store::{DocumentStore, StoredDocument};
use crate::playback::PlaybackController;
use crate::speech::{SettingsUpdate, SpeechSettings};
use crate::Result;
use config::Config;
use log::{debug, info, warn};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Main application state for the reader
pub struct Reader {
    /// Configuration loaded from ~/.mdread.cfg
    pub config: Config,

    /// Owns the speech resource and the playback state machine
    pub controller: PlaybackController,

    /// Focused paragraph; the target of "read" and "start from here"
    cursor: usize,

    /// Raw document text as last loaded
    text: String,

    /// File the document was read from, if any
    source: Option<PathBuf>,

    /// Modification time of `source` when it was last read
    source_mtime: Option<SystemTime>,

    /// Where the document is persisted between runs
    store: Option<DocumentStore>,

    /// Transient message for the status area
    message: Option<String>,

    /// Set by the quit key; the main loop exits when true
    pub quit: bool,
}

impl Reader {
    pub fn new(config: Config, controller: PlaybackController, store: Option<DocumentStore>) -> Self {
        Self {
            config,
            controller,
            cursor: 0,
            text: String::new(),
            source: None,
            source_mtime: None,
            store,
            message: None,
            quit: false,
        }
    }

    // ========== Document ==========

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Replace the document text and persist it
    ///
    /// A failed save is logged, not returned.
    pub fn load_text(&mut self, text: &str, source: Option<PathBuf>) -> Result<()> {
        self.text = text.to_string();
        self.controller.set_text(text);
        self.clamp_cursor();
        self.source_mtime = source.as_deref().and_then(modified);
        self.source = source;

        if let Some(store) = &self.store {
            let doc = StoredDocument {
                content: self.text.clone(),
                source: self.source.clone(),
            };
            // Reading goes on without persistence
            if let Err(e) = store.save(&doc) {
                warn!("Failed to save document to {:?}: {}", store.path(), e);
            }
        }
        Ok(())
    }

    /// Read a document from disk
    pub fn open_file(&mut self, path: &Path) -> Result<()> {
        info!("Opening {:?}", path);
        let text = fs::read_to_string(path)?;
        self.load_text(&text, Some(path.to_path_buf()))
    }

    /// Restore the last stored document (or the default content)
    pub fn restore(&mut self) -> Result<()> {
        let doc = match &self.store {
            Some(store) => store.load().unwrap_or_else(|e| {
                warn!("Ignoring unreadable stored document: {}", e);
                StoredDocument::default()
            }),
            None => StoredDocument::default(),
        };
        self.load_text(&doc.content, doc.source)
    }

    /// Reload the source file if it changed on disk
    ///
    /// Returns true when the document was re-segmented.
    pub fn reload_if_changed(&mut self) -> Result<bool> {
        if !self.config.watch() {
            return Ok(false);
        }
        let Some(path) = self.source.clone() else {
            return Ok(false);
        };
        let mtime = modified(&path);
        if mtime.is_none() || mtime == self.source_mtime {
            return Ok(false);
        }

        debug!("{:?} changed on disk, reloading", path);
        self.open_file(&path)?;
        Ok(true)
    }

    /// Force a reload of the source file
    pub fn reload(&mut self) -> Result<()> {
        match self.source.clone() {
            Some(path) => {
                self.open_file(&path)?;
                self.set_message("reloaded");
            }
            None => self.set_message("no file to reload"),
        }
        Ok(())
    }

    /// Replace the document with the clipboard contents
    pub fn paste_from_clipboard(&mut self) -> Result<()> {
        let text = crate::clipboard::get_from_clipboard()?;
        if text.trim().is_empty() {
            self.set_message("clipboard is empty");
            return Ok(());
        }
        self.load_text(&text, None)?;
        self.set_message("pasted from clipboard");
        Ok(())
    }

    // ========== Focus ==========

    fn clamp_cursor(&mut self) {
        let len = self.controller.paragraphs().len();
        if self.cursor >= len {
            self.cursor = len.saturating_sub(1);
        }
    }

    /// Move focus by `delta` paragraphs, stopping at either end
    pub fn move_cursor(&mut self, delta: isize) {
        let len = self.controller.paragraphs().len();
        if len == 0 {
            return;
        }
        let target = self.cursor as isize + delta;
        self.cursor = target.clamp(0, len as isize - 1) as usize;
    }

    pub fn cursor_to_start(&mut self) {
        self.cursor = 0;
    }

    pub fn cursor_to_end(&mut self) {
        self.cursor = self.controller.paragraphs().len().saturating_sub(1);
    }

    /// Keep focus on the paragraph being read
    ///
    /// The voice can still be on a paragraph the reloaded document no longer
    /// has, so focus is clamped afterwards.
    pub fn follow_playback(&mut self) {
        if let Some(index) = self.controller.speaking_index() {
            self.cursor = index;
            self.clamp_cursor();
        }
    }

    // ========== Voice and settings ==========

    /// Step through the voice list; wraps back to automatic selection
    pub fn cycle_voice(&mut self, forward: bool) {
        let catalog = self.controller.catalog();
        let count = catalog.voices().len();
        if count == 0 {
            self.set_message("no voices available");
            return;
        }

        let current = if catalog.is_user_chosen() {
            catalog.selected_position()
        } else {
            None
        };
        // `None` is the slot before the first voice and after the last
        let next = match (current, forward) {
            (None, true) => Some(0),
            (None, false) => Some(count - 1),
            (Some(i), true) if i + 1 < count => Some(i + 1),
            (Some(i), false) if i > 0 => Some(i - 1),
            (Some(_), _) => None,
        };

        let voice = next.and_then(|i| catalog.voices().get(i).cloned());
        let label = voice
            .as_ref()
            .map(|v| v.name.clone())
            .unwrap_or_else(|| "auto voice".to_string());
        self.controller.set_voice(voice);
        self.set_message(&label);
    }

    pub fn auto_voice(&mut self) {
        self.controller.set_voice(None);
        self.set_message("auto voice");
    }

    pub fn adjust_rate(&mut self, steps: i32) {
        let update = self.controller.settings().rate_step(steps);
        self.apply_settings(update);
    }

    pub fn adjust_pitch(&mut self, steps: i32) {
        let update = self.controller.settings().pitch_step(steps);
        self.apply_settings(update);
    }

    pub fn adjust_volume(&mut self, steps: i32) {
        let update = self.controller.settings().volume_step(steps);
        self.apply_settings(update);
    }

    fn apply_settings(&mut self, update: SettingsUpdate) {
        self.controller.set_settings(update);
        self.set_message(&crate::view::settings_label(&self.controller.settings()));
    }

    pub fn settings(&self) -> SpeechSettings {
        self.controller.settings()
    }

    // ========== Messages ==========

    pub fn set_message(&mut self, message: &str) {
        self.message = Some(message.to_string());
    }

    pub fn take_message(&mut self) -> Option<String> {
        self.message.take()
    }
}

fn modified(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).and_then(|m| m.modified()).ok()
}
