//! Configuration management

use crate::speech::{BackendPreference, SpeechSettings};
use crate::{ReaderError, Result};
use ini::Ini;
use log::{debug, info, warn};
use std::path::{Path, PathBuf};

/// Reader configuration stored in `~/.mdread.cfg`
///
/// Holds the speech defaults each session starts with and document
/// handling switches. The voice is deliberately absent: a voice choice only
/// lives as long as the process.
pub struct Config {
    /// INI configuration storage
    ini: Ini,

    /// Config file path
    path: PathBuf,
}

impl Config {
    /// Load configuration from the default location, creating it if missing
    pub fn load() -> Result<Self> {
        Self::load_from(Self::config_path())
    }

    /// Load configuration from an explicit path, creating it if missing
    pub fn load_from(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        debug!("Loading config from {:?}", path);

        let ini = if path.exists() {
            Ini::load_from_file(&path)
                .map_err(|e| ReaderError::IniParse(format!("Failed to load config: {}", e)))?
        } else {
            info!("Config file not found, creating default");
            let default = Self::default_config();
            default
                .write_to_file(&path)
                .map_err(|e| ReaderError::IniParse(format!("Failed to write config: {}", e)))?;
            default
        };

        Ok(Self { ini, path })
    }

    /// Save configuration to disk
    pub fn save(&self) -> Result<()> {
        debug!("Saving config to {:?}", self.path);
        self.ini
            .write_to_file(&self.path)
            .map_err(|e| ReaderError::Config(format!("Failed to save config: {}", e)))
    }

    /// Default config file path (~/.mdread.cfg)
    fn config_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".mdread.cfg")
    }

    /// Expose the config file path for display
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create default configuration
    fn default_config() -> Ini {
        let defaults = SpeechSettings::default();
        let mut ini = Ini::new();

        ini.with_section(Some("speech"))
            .set("rate", defaults.rate.to_string())
            .set("pitch", defaults.pitch.to_string())
            .set("volume", defaults.volume.to_string())
            .set("backend", BackendPreference::default().to_string());

        ini.with_section(Some("document"))
            .set("watch", "true")
            .set("restore_last", "true");

        ini
    }

    /// Get a boolean value from config
    pub fn get_bool(&self, section: &str, key: &str, default: bool) -> bool {
        self.ini
            .get_from(Some(section), key)
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(default)
    }

    /// Get a string value from config
    pub fn get_string(&self, section: &str, key: &str, default: &str) -> String {
        self.ini
            .get_from(Some(section), key)
            .unwrap_or(default)
            .to_string()
    }

    /// Get a float value from config
    pub fn get_float(&self, section: &str, key: &str, default: f32) -> f32 {
        self.ini
            .get_from(Some(section), key)
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(default)
    }

    /// Set a value in config
    pub fn set(&mut self, section: &str, key: &str, value: &str) {
        self.ini.with_section(Some(section)).set(key, value);
    }

    // Reader-specific getters

    /// Initial rate, pitch and volume, clamped into range
    pub fn speech_settings(&self) -> SpeechSettings {
        let defaults = SpeechSettings::default();
        SpeechSettings::new(
            self.get_float("speech", "rate", defaults.rate),
            self.get_float("speech", "pitch", defaults.pitch),
            self.get_float("speech", "volume", defaults.volume),
        )
    }

    /// Preferred speech backend; unknown names fall back to auto
    pub fn backend(&self) -> BackendPreference {
        let raw = self.get_string("speech", "backend", "auto");
        raw.parse().unwrap_or_else(|e| {
            warn!("{}, using auto", e);
            BackendPreference::Auto
        })
    }

    /// Reload the document when its file changes on disk
    pub fn watch(&self) -> bool {
        self.get_bool("document", "watch", true)
    }

    /// Reopen the last document when started without a path
    pub fn restore_last(&self) -> bool {
        self.get_bool("document", "restore_last", true)
    }
}
