//! Native TTS backend using the tts crate
//!
//! The `tts` crate wraps the platform synthesizer:
//! - Speech Dispatcher on Linux
//! - AVFoundation on macOS
//! - WinRT / SAPI on Windows
//!
//! Completion is reported through `on_utterance_end` callbacks where the
//! platform supports them, and by polling `is_speaking` otherwise. The crate
//! has no pause, so pausing stops the utterance and resuming speaks it again
//! from the start of the paragraph.

use crate::speech::{SpeechEvent, SpeechResource, SpeechSettings, Utterance, UtteranceId, Voice};
use crate::{ReaderError, Result};
use log::{debug, error, warn};
use std::sync::mpsc::{self, Receiver};
use tts::{Tts as TtsCrate, UtteranceId as PlatformId};

/// Platform ids are not `Send` on every backend, so they are keyed by their
/// debug form once they leave the callback.
fn platform_key(id: &PlatformId) -> String {
    format!("{:?}", id)
}

/// The utterance currently owned by the platform
struct InFlight {
    id: UtteranceId,
    platform: Option<String>,
    utterance: Utterance,
}

impl InFlight {
    /// True when an end notification carries this utterance's platform id
    ///
    /// Without a platform id nothing matches: a late end from a cancelled
    /// utterance must not complete this one.
    fn ended_by(&self, key: &str) -> bool {
        self.platform.as_deref() == Some(key)
    }

    /// Completion has to come from `is_speaking` polling
    fn needs_polling(&self, callbacks: bool) -> bool {
        !callbacks || self.platform.is_none()
    }
}

/// Native TTS backend using the tts crate
pub struct NativeSynth {
    tts: TtsCrate,

    /// End notifications from the platform callback thread
    ended: Receiver<String>,

    /// Whether the platform delivers end callbacks at all
    callbacks: bool,

    current: Option<InFlight>,

    /// Utterance stopped by `pause`, re-spoken by `resume`
    paused: Option<Utterance>,

    /// Readiness is announced on the first poll
    announced: bool,
}

impl NativeSynth {
    /// Create a new native TTS resource
    pub fn new() -> Result<Self> {
        debug!("Creating native TTS backend");

        let mut tts = TtsCrate::default()
            .map_err(|e| ReaderError::Speech(format!("Failed to initialize TTS: {}", e)))?;

        let features = tts.supported_features();
        let (tx, rx) = mpsc::channel();

        if features.utterance_callbacks {
            tts.on_utterance_end(Some(Box::new(move |id| {
                // Receiver is gone once the backend is dropped
                let _ = tx.send(platform_key(&id));
            })))
            .map_err(|e| ReaderError::Speech(format!("Failed to register callback: {}", e)))?;
        } else {
            warn!("Utterance callbacks not supported, polling is_speaking instead");
        }

        debug!("Native TTS backend created successfully");

        Ok(Self {
            tts,
            ended: rx,
            callbacks: features.utterance_callbacks,
            current: None,
            paused: None,
            announced: false,
        })
    }

    /// Map a 0.5..=2.0 multiplier (1.0 = normal) onto the platform range
    ///
    /// Below 1.0 interpolates between min and normal, above between normal
    /// and max, so the platform's own default stays at the midpoint.
    fn scale(multiplier: f32, min: f32, normal: f32, max: f32) -> f32 {
        if multiplier <= 1.0 {
            let t = ((multiplier - 0.5) / 0.5).clamp(0.0, 1.0);
            min + (normal - min) * t
        } else {
            let t = ((multiplier - 1.0) / 1.0).clamp(0.0, 1.0);
            normal + (max - normal) * t
        }
    }

    /// Volume is already a 0..1 fraction of full scale
    fn scale_volume(volume: f32, min: f32, max: f32) -> f32 {
        min + (max - min) * volume.clamp(0.0, 1.0)
    }

    fn apply_settings(&mut self, settings: &SpeechSettings) -> Result<()> {
        let features = self.tts.supported_features();

        if features.rate {
            let rate = Self::scale(
                settings.rate,
                self.tts.min_rate(),
                self.tts.normal_rate(),
                self.tts.max_rate(),
            );
            self.tts
                .set_rate(rate)
                .map_err(|e| ReaderError::Speech(format!("Failed to set rate: {}", e)))?;
        }

        if features.pitch {
            let pitch = Self::scale(
                settings.pitch,
                self.tts.min_pitch(),
                self.tts.normal_pitch(),
                self.tts.max_pitch(),
            );
            self.tts
                .set_pitch(pitch)
                .map_err(|e| ReaderError::Speech(format!("Failed to set pitch: {}", e)))?;
        }

        if features.volume {
            let volume =
                Self::scale_volume(settings.volume, self.tts.min_volume(), self.tts.max_volume());
            self.tts
                .set_volume(volume)
                .map_err(|e| ReaderError::Speech(format!("Failed to set volume: {}", e)))?;
        }

        Ok(())
    }

    fn apply_voice(&mut self, voice: &Voice) -> Result<()> {
        if !self.tts.supported_features().voice {
            warn!("Voice selection not supported on this platform");
            return Ok(());
        }

        let voices = self
            .tts
            .voices()
            .map_err(|e| ReaderError::Speech(format!("Failed to get voices: {}", e)))?;

        match voices.iter().find(|v| v.id() == voice.id) {
            Some(platform_voice) => self
                .tts
                .set_voice(platform_voice)
                .map_err(|e| ReaderError::Speech(format!("Failed to set voice: {}", e))),
            None => {
                warn!("Voice {} is no longer available", voice.name);
                Ok(())
            }
        }
    }

    fn start(&mut self, utterance: &Utterance) -> Result<()> {
        self.apply_settings(&utterance.settings)?;
        if let Some(voice) = &utterance.voice {
            self.apply_voice(voice)?;
        }

        debug!("Speaking {}: {} chars", utterance.id, utterance.text.len());
        let platform = self.tts.speak(utterance.text.as_str(), true).map_err(|e| {
            error!("Failed to speak: {}", e);
            ReaderError::Speech(format!("Speak failed: {}", e))
        })?;

        self.current = Some(InFlight {
            id: utterance.id,
            platform: platform.as_ref().map(platform_key),
            utterance: utterance.clone(),
        });
        Ok(())
    }

    fn stop_platform(&mut self) -> Result<()> {
        self.tts.stop().map_err(|e| {
            error!("Failed to stop speech: {}", e);
            ReaderError::Speech(format!("Cancel failed: {}", e))
        })?;
        Ok(())
    }

    /// True when a platform end notification belongs to the current utterance
    fn is_current(&self, ended: &str) -> bool {
        self.current
            .as_ref()
            .is_some_and(|in_flight| in_flight.ended_by(ended))
    }
}

impl SpeechResource for NativeSynth {
    fn speak(&mut self, utterance: &Utterance) -> Result<()> {
        self.paused = None;
        self.start(utterance)
    }

    fn cancel(&mut self) -> Result<()> {
        debug!("Canceling speech");
        let was_speaking = self.current.take().is_some();
        self.paused = None;
        if was_speaking {
            self.stop_platform()?;
        }
        Ok(())
    }

    fn pause(&mut self) -> Result<()> {
        if let Some(in_flight) = self.current.take() {
            debug!("Pausing {} (will restart paragraph on resume)", in_flight.id);
            self.stop_platform()?;
            self.paused = Some(in_flight.utterance);
        }
        Ok(())
    }

    fn resume(&mut self) -> Result<()> {
        if let Some(utterance) = self.paused.take() {
            debug!("Resuming {}", utterance.id);
            self.start(&utterance)?;
        }
        Ok(())
    }

    fn voices(&self) -> Result<Vec<Voice>> {
        let voices = self
            .tts
            .voices()
            .map_err(|e| ReaderError::Speech(format!("Failed to get voices: {}", e)))?;

        Ok(voices
            .iter()
            .map(|v| Voice::new(v.id(), v.name(), v.language().to_string()))
            .collect())
    }

    fn poll_events(&mut self) -> Vec<SpeechEvent> {
        let mut events = Vec::new();

        if !self.announced {
            self.announced = true;
            events.push(SpeechEvent::VoicesChanged);
        }

        if self.callbacks {
            while let Ok(ended) = self.ended.try_recv() {
                if self.is_current(&ended) {
                    if let Some(in_flight) = self.current.take() {
                        events.push(SpeechEvent::Ended(in_flight.id));
                    }
                } else {
                    debug!("Ignoring end notification {} for another utterance", ended);
                }
            }
        }

        let polling = self
            .current
            .as_ref()
            .is_some_and(|in_flight| in_flight.needs_polling(self.callbacks));
        if polling {
            match self.tts.is_speaking() {
                Ok(false) => {
                    if let Some(in_flight) = self.current.take() {
                        events.push(SpeechEvent::Ended(in_flight.id));
                    }
                }
                Ok(true) => {}
                Err(e) => {
                    if let Some(in_flight) = self.current.take() {
                        events.push(SpeechEvent::Error {
                            id: in_flight.id,
                            message: e.to_string(),
                        });
                    }
                }
            }
        }

        events
    }

    fn name(&self) -> &str {
        "native"
    }
}
