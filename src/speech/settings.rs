//! Speech parameters applied to every utterance

use std::ops::RangeInclusive;

pub const RATE_RANGE: RangeInclusive<f32> = 0.5..=2.0;
pub const PITCH_RANGE: RangeInclusive<f32> = 0.5..=2.0;
pub const VOLUME_RANGE: RangeInclusive<f32> = 0.1..=1.0;

/// Slider granularity for interactive adjustment
pub const STEP: f32 = 0.1;

/// Rate, pitch and volume for new utterances
///
/// Changes only affect utterances built afterwards; an utterance already
/// submitted keeps the values it was built with.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpeechSettings {
    /// Speaking rate multiplier (1.0 is the platform's normal rate)
    pub rate: f32,
    /// Pitch multiplier (1.0 is normal)
    pub pitch: f32,
    /// Volume from quiet to full
    pub volume: f32,
}

impl Default for SpeechSettings {
    fn default() -> Self {
        Self {
            rate: 0.9,
            pitch: 1.0,
            volume: 1.0,
        }
    }
}

/// A partial settings change; `None` fields are left alone
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SettingsUpdate {
    pub rate: Option<f32>,
    pub pitch: Option<f32>,
    pub volume: Option<f32>,
}

impl SettingsUpdate {
    pub fn rate(rate: f32) -> Self {
        Self {
            rate: Some(rate),
            ..Self::default()
        }
    }

    pub fn pitch(pitch: f32) -> Self {
        Self {
            pitch: Some(pitch),
            ..Self::default()
        }
    }

    pub fn volume(volume: f32) -> Self {
        Self {
            volume: Some(volume),
            ..Self::default()
        }
    }
}

fn clamp(value: f32, range: &RangeInclusive<f32>) -> f32 {
    if value.is_nan() {
        return *range.start();
    }
    value.clamp(*range.start(), *range.end())
}

/// Round to the slider step so repeated +/- never drifts (0.30000004...)
fn snap(value: f32) -> f32 {
    (value / STEP).round() * STEP
}

impl SpeechSettings {
    /// Build settings, clamping every field into its range
    pub fn new(rate: f32, pitch: f32, volume: f32) -> Self {
        Self {
            rate: clamp(rate, &RATE_RANGE),
            pitch: clamp(pitch, &PITCH_RANGE),
            volume: clamp(volume, &VOLUME_RANGE),
        }
    }

    /// Apply a partial update, clamping the new values
    pub fn apply(&mut self, update: SettingsUpdate) {
        if let Some(rate) = update.rate {
            self.rate = clamp(rate, &RATE_RANGE);
        }
        if let Some(pitch) = update.pitch {
            self.pitch = clamp(pitch, &PITCH_RANGE);
        }
        if let Some(volume) = update.volume {
            self.volume = clamp(volume, &VOLUME_RANGE);
        }
    }

    /// Update that nudges the rate by `steps` slider steps
    pub fn rate_step(&self, steps: i32) -> SettingsUpdate {
        SettingsUpdate::rate(snap(self.rate + STEP * steps as f32))
    }

    pub fn pitch_step(&self, steps: i32) -> SettingsUpdate {
        SettingsUpdate::pitch(snap(self.pitch + STEP * steps as f32))
    }

    pub fn volume_step(&self, steps: i32) -> SettingsUpdate {
        SettingsUpdate::volume(snap(self.volume + STEP * steps as f32))
    }
}
