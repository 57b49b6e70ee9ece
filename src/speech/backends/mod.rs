//! Platform speech backends

// Native TTS backend using the tts crate (cross-platform)
pub mod native;

// espeak-ng subprocess backend, with real pause/resume
pub mod espeak;

use super::SpeechResource;
use crate::platform::is_wsl;
use crate::{ReaderError, Result};
use log::info;
use std::fmt;
use std::str::FromStr;

/// Which backend to create
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackendPreference {
    /// Native first, espeak-ng as fallback
    #[default]
    Auto,
    Native,
    Espeak,
}

impl FromStr for BackendPreference {
    type Err = ReaderError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "native" | "tts" => Ok(Self::Native),
            "espeak" | "espeak-ng" => Ok(Self::Espeak),
            other => Err(ReaderError::Config(format!("Unknown speech backend: {}", other))),
        }
    }
}

impl fmt::Display for BackendPreference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Auto => "auto",
            Self::Native => "native",
            Self::Espeak => "espeak",
        })
    }
}

type Factory = fn() -> Result<Box<dyn SpeechResource>>;

fn native() -> Result<Box<dyn SpeechResource>> {
    Ok(Box::new(native::NativeSynth::new()?))
}

fn espeak() -> Result<Box<dyn SpeechResource>> {
    Ok(Box::new(espeak::EspeakSynth::new()?))
}

/// Create the speech resource for a preference
///
/// **auto:**
/// 1. Native platform TTS (Speech Dispatcher, AVFoundation, SAPI)
/// 2. espeak-ng subprocess
///
/// Under WSL the order is reversed: Speech Dispatcher is rarely running
/// there, while espeak-ng reaches the WSLg PulseAudio server.
///
/// Returns `SynthesisUnavailable` when nothing could be initialized; the
/// controller then runs with every operation as a no-op.
pub fn create_resource(preference: BackendPreference) -> Result<Box<dyn SpeechResource>> {
    info!("Creating speech resource (backend = {})", preference);

    let candidates: Vec<(&str, Factory)> = match preference {
        BackendPreference::Auto if is_wsl() => {
            info!("WSL detected, preferring espeak-ng");
            vec![
                ("espeak-ng", espeak as Factory),
                ("native", native as Factory),
            ]
        }
        BackendPreference::Auto => vec![
            ("native", native as Factory),
            ("espeak-ng", espeak as Factory),
        ],
        BackendPreference::Native => vec![("native", native as Factory)],
        BackendPreference::Espeak => vec![("espeak-ng", espeak as Factory)],
    };

    for (name, create) in candidates {
        info!("Trying {} backend...", name);
        match create() {
            Ok(resource) => {
                info!("✓ Successfully initialized {} backend", name);
                return Ok(resource);
            }
            Err(e) => {
                info!("✗ {} backend unavailable: {}", name, e);
            }
        }
    }

    Err(ReaderError::SynthesisUnavailable)
}
