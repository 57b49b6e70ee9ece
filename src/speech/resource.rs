//! Shared speech resource abstraction
//!
//! The platform synthesizer can only voice one utterance at a time. The
//! playback controller talks to it through [`SpeechResource`] and learns
//! about completion through [`SpeechEvent`]s it drains on every loop turn.

use super::{Language, SpeechSettings};
use crate::Result;
use std::fmt;

/// Generation token assigned by the controller to each submitted utterance
///
/// Backends echo it back in events so stale callbacks can be told apart
/// from the one the controller is waiting on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UtteranceId(pub u64);

impl fmt::Display for UtteranceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A synthesis voice as reported by the platform
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Voice {
    /// Backend-specific identifier used to select the voice
    pub id: String,
    /// Human readable name ("Google US English")
    pub name: String,
    /// Language tag ("en-US", "zh-CN")
    pub lang: String,
}

/// Quality badge shown next to a voice
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceTier {
    Premium,
    HighQuality,
    Standard,
}

impl Voice {
    pub fn new(id: impl Into<String>, name: impl Into<String>, lang: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            lang: lang.into(),
        }
    }

    pub fn tier(&self) -> VoiceTier {
        if self.name.contains("Google US English") {
            VoiceTier::Premium
        } else if self.name.contains("Google") {
            VoiceTier::HighQuality
        } else {
            VoiceTier::Standard
        }
    }
}

/// One request to vocalize a paragraph
#[derive(Debug, Clone, PartialEq)]
pub struct Utterance {
    pub id: UtteranceId,
    pub text: String,
    /// `None` leaves the backend's current voice in place
    pub voice: Option<Voice>,
    pub language: Language,
    pub settings: SpeechSettings,
}

/// Asynchronous notifications from the speech resource
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpeechEvent {
    /// The utterance finished naturally
    Ended(UtteranceId),
    /// The utterance failed part way through
    Error { id: UtteranceId, message: String },
    /// The available voice list changed (or became ready)
    VoicesChanged,
}

/// The platform speech synthesizer
///
/// Implementations hold at most one utterance in flight. `speak` replaces
/// whatever is playing; `cancel` on an idle resource is a no-op. A cancelled
/// utterance must not produce an `Ended` event, but the controller tolerates
/// it if one slips through.
pub trait SpeechResource: Send {
    /// Start speaking an utterance
    fn speak(&mut self, utterance: &Utterance) -> Result<()>;

    /// Silence and forget the current utterance
    fn cancel(&mut self) -> Result<()>;

    /// Pause the current utterance in place
    fn pause(&mut self) -> Result<()>;

    /// Resume a paused utterance
    fn resume(&mut self) -> Result<()>;

    /// Voices currently known to the backend (may be empty early on)
    fn voices(&self) -> Result<Vec<Voice>>;

    /// Drain events that arrived since the last call
    fn poll_events(&mut self) -> Vec<SpeechEvent>;

    /// Short backend name for logs and the status line
    fn name(&self) -> &str;
}
