//! Read-aloud playback controller
//!
//! The controller owns the only handle to the speech resource and is the
//! single place where playback state changes. Everything runs on the main
//! loop: user actions call the operations directly, resource callbacks
//! arrive as [`SpeechEvent`]s through [`PlaybackController::pump`], and the
//! settle delay between paragraphs is a deadline checked by
//! [`PlaybackController::tick`].
//!
//! Every submitted utterance gets a fresh [`UtteranceId`]. Only events
//! carrying the id of the active utterance are acted on, so a late callback
//! from a cancelled utterance can never move the state machine.

use crate::document::{segment, Paragraph};
use crate::speech::{
    detect_language, Language, SettingsUpdate, SpeechEvent, SpeechResource, SpeechSettings,
    Utterance, UtteranceId, Voice, VoiceCatalog,
};
use crate::{ReaderError, Result};
use log::{debug, info, warn};
use std::time::{Duration, Instant};

/// Pause inserted between consecutive paragraphs of a sequential run
pub const SETTLE_DELAY: Duration = Duration::from_millis(500);

/// Text spoken by [`PlaybackController::test_voice`]
pub const VOICE_SAMPLE: &str =
    "Hello, this is a voice test. The pronunciation is clear and natural. 你好，这是语音测试。";

/// What the controller is currently doing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackMode {
    #[default]
    Idle,
    /// Reading one paragraph (or the voice sample when `index` is `None`);
    /// never advances on its own
    SpeakingSingle { index: Option<usize> },
    /// Reading from `start` to the end, currently at `index`
    SpeakingSequential { index: usize, start: usize },
}

impl PlaybackMode {
    /// Paragraph the mode refers to, if any
    pub fn index(&self) -> Option<usize> {
        match *self {
            PlaybackMode::Idle => None,
            PlaybackMode::SpeakingSingle { index } => index,
            PlaybackMode::SpeakingSequential { index, .. } => Some(index),
        }
    }
}

/// Live playback state; `paused` is only ever true outside `Idle`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PlaybackState {
    pub mode: PlaybackMode,
    pub paused: bool,
}

impl PlaybackState {
    const IDLE: PlaybackState = PlaybackState {
        mode: PlaybackMode::Idle,
        paused: false,
    };

    pub fn is_idle(&self) -> bool {
        self.mode == PlaybackMode::Idle
    }

    pub fn is_sequential(&self) -> bool {
        matches!(self.mode, PlaybackMode::SpeakingSequential { .. })
    }
}

/// Next paragraph of a sequential run, waiting out the settle delay
#[derive(Debug, Clone, Copy)]
struct PendingAdvance {
    due: Instant,
    index: usize,
}

/// Drives single and sequential paragraph playback
pub struct PlaybackController {
    /// `None` when no backend could be created
    resource: Option<Box<dyn SpeechResource>>,

    catalog: VoiceCatalog,
    settings: SpeechSettings,

    paragraphs: Vec<Paragraph>,

    /// Language of the whole document, used for the displayed voice
    language_hint: Language,

    state: PlaybackState,

    /// Where the next sequential run starts when none is given
    start_from: usize,

    /// Utterance submitted and not yet ended, errored or cancelled
    active: Option<UtteranceId>,

    /// Last generation handed out
    generation: u64,

    pending: Option<PendingAdvance>,

    /// Reported once to the front end
    notice: Option<ReaderError>,
}

impl PlaybackController {
    /// Create a controller around a speech resource
    ///
    /// Passing `None` yields a controller whose operations are all no-ops;
    /// [`take_notice`](Self::take_notice) reports the problem once.
    pub fn new(resource: Option<Box<dyn SpeechResource>>, settings: SpeechSettings) -> Self {
        let notice = match &resource {
            Some(r) => {
                info!("Playback controller using {} backend", r.name());
                None
            }
            None => {
                warn!("No speech backend; playback disabled");
                Some(ReaderError::SynthesisUnavailable)
            }
        };

        let mut controller = Self {
            resource,
            catalog: VoiceCatalog::new(),
            settings,
            paragraphs: Vec::new(),
            language_hint: Language::default(),
            state: PlaybackState::IDLE,
            start_from: 0,
            active: None,
            generation: 0,
            pending: None,
            notice,
        };
        // Often empty this early; VoicesChanged fills it in later
        controller.refresh_voices();
        controller
    }

    // ========== Accessors ==========

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn paragraphs(&self) -> &[Paragraph] {
        &self.paragraphs
    }

    pub fn start_from(&self) -> usize {
        self.start_from
    }

    /// Paragraph the current mode points at (also during the settle delay)
    pub fn current_index(&self) -> Option<usize> {
        self.state.mode.index()
    }

    /// Paragraph being voiced right now, for highlighting
    pub fn speaking_index(&self) -> Option<usize> {
        self.active.and(self.state.mode.index())
    }

    pub fn catalog(&self) -> &VoiceCatalog {
        &self.catalog
    }

    pub fn settings(&self) -> SpeechSettings {
        self.settings
    }

    pub fn is_available(&self) -> bool {
        self.resource.is_some()
    }

    pub fn backend_name(&self) -> Option<&str> {
        self.resource.as_ref().map(|r| r.name())
    }

    /// One-shot startup problem for the front end to display
    pub fn take_notice(&mut self) -> Option<ReaderError> {
        self.notice.take()
    }

    /// Time until the pending advance is due, for the event loop timeout
    pub fn time_until_next(&self, now: Instant) -> Option<Duration> {
        if self.state.paused {
            return None;
        }
        self.pending
            .map(|p| p.due.saturating_duration_since(now))
    }

    // ========== Document, voice and settings ==========

    /// Re-segment after the document text changed
    ///
    /// Playback in progress is left alone; an index the new sequence no
    /// longer covers is caught at the next advance.
    pub fn set_text(&mut self, text: &str) {
        self.paragraphs = segment(text);
        self.language_hint = detect_language(text);
        self.catalog.reselect(self.language_hint);

        if self.start_from >= self.paragraphs.len() {
            self.start_from = 0;
        }
        debug!(
            "Document has {} paragraphs ({})",
            self.paragraphs.len(),
            self.language_hint
        );
    }

    /// Choose a voice; `None` returns to automatic selection
    pub fn set_voice(&mut self, voice: Option<Voice>) {
        self.catalog.choose(voice, self.language_hint);
    }

    /// Change settings for utterances built from now on
    pub fn set_settings(&mut self, update: SettingsUpdate) {
        self.settings.apply(update);
        debug!("Speech settings now {:?}", self.settings);
    }

    fn refresh_voices(&mut self) {
        let Some(resource) = self.resource.as_ref() else {
            return;
        };
        match resource.voices() {
            Ok(voices) => {
                self.catalog.refresh(voices, self.language_hint);
            }
            Err(e) => warn!("Failed to list voices: {}", e),
        }
    }

    // ========== Operations ==========

    /// Read a single paragraph, preempting anything in progress
    pub fn read_one(&mut self, index: usize) -> Result<()> {
        if !self.ensure_available("read_one") || !self.ensure_index(index) {
            return Ok(());
        }
        self.begin(index, PlaybackMode::SpeakingSingle { index: Some(index) })
    }

    /// Speak [`VOICE_SAMPLE`] with the selected voice and current settings
    ///
    /// Preempts like [`read_one`](Self::read_one) and ends in `Idle`. Does
    /// nothing until voices are listed and one is selected.
    pub fn test_voice(&mut self) -> Result<()> {
        if !self.ensure_available("test_voice") {
            return Ok(());
        }
        let Some(voice) = self.catalog.selected().cloned() else {
            debug!("No voice selected, ignoring test_voice");
            return Ok(());
        };
        if self.catalog.is_empty() {
            return Ok(());
        }
        info!("Testing voice {}", voice.name);
        self.submit(
            VOICE_SAMPLE.to_string(),
            Some(voice),
            PlaybackMode::SpeakingSingle { index: None },
        )
    }

    /// Start, pause or resume sequential playback
    ///
    /// While idle (or reading a single paragraph) this starts a run at
    /// `from`, defaulting to the remembered start position. During a run it
    /// toggles pause.
    pub fn play_all(&mut self, from: Option<usize>) -> Result<()> {
        if !self.ensure_available("play_all") {
            return Ok(());
        }

        match self.state.mode {
            PlaybackMode::SpeakingSequential { .. } if !self.state.paused => {
                debug!("Pausing sequential playback");
                if let Some(resource) = self.resource.as_mut() {
                    resource.pause()?;
                }
                self.state.paused = true;
                Ok(())
            }
            PlaybackMode::SpeakingSequential { .. } => {
                debug!("Resuming sequential playback");
                if let Some(resource) = self.resource.as_mut() {
                    resource.resume()?;
                }
                self.state.paused = false;
                Ok(())
            }
            PlaybackMode::Idle | PlaybackMode::SpeakingSingle { .. } => {
                let start = from.unwrap_or(self.start_from);
                if !self.ensure_index(start) {
                    return Ok(());
                }
                info!("Playing all from paragraph {}", start);
                self.start_from = start;
                self.begin(start, PlaybackMode::SpeakingSequential { index: start, start })
            }
        }
    }

    /// Stop everything and forget the start position
    pub fn stop(&mut self) -> Result<()> {
        self.pending = None;
        if let Some(id) = self.active.take() {
            debug!("Stopping {}", id);
        }
        self.state = PlaybackState::IDLE;
        self.start_from = 0;

        match self.resource.as_mut() {
            Some(resource) => resource.cancel(),
            None => Ok(()),
        }
    }

    // ========== Event handling ==========

    /// Drain resource events and run a due advance
    pub fn pump(&mut self, now: Instant) -> Result<()> {
        let events = match self.resource.as_mut() {
            Some(resource) => resource.poll_events(),
            None => return Ok(()),
        };
        for event in events {
            self.handle_event(event, now);
        }
        self.tick(now)
    }

    /// Apply one resource event
    pub fn handle_event(&mut self, event: SpeechEvent, now: Instant) {
        match event {
            SpeechEvent::VoicesChanged => self.refresh_voices(),
            SpeechEvent::Ended(id) => {
                if !self.claim(id) {
                    return;
                }
                self.on_ended(now);
            }
            SpeechEvent::Error { id, message } => {
                if !self.claim(id) {
                    return;
                }
                warn!("{}", ReaderError::Utterance(message));
                self.pending = None;
                self.state = PlaybackState::IDLE;
            }
        }
    }

    /// Start the pending paragraph once the settle delay has passed
    pub fn tick(&mut self, now: Instant) -> Result<()> {
        let index = match self.pending {
            Some(p) if p.due <= now && !self.state.paused => p.index,
            _ => return Ok(()),
        };
        self.pending = None;

        let PlaybackMode::SpeakingSequential { start, .. } = self.state.mode else {
            debug!("Dropping advance to {}: no sequential run", index);
            return Ok(());
        };

        if index >= self.paragraphs.len() {
            warn!(
                "Stopping run: {}",
                ReaderError::IndexOutOfRange {
                    index,
                    len: self.paragraphs.len()
                }
            );
            self.finish_run();
            return Ok(());
        }

        self.begin(index, PlaybackMode::SpeakingSequential { index, start })
    }

    /// Cancel timers and speech; called on teardown
    pub fn shutdown(&mut self) {
        self.pending = None;
        if self.active.take().is_some() {
            if let Some(resource) = self.resource.as_mut() {
                if let Err(e) = resource.cancel() {
                    warn!("Failed to cancel speech on shutdown: {}", e);
                }
            }
        }
        self.state = PlaybackState::IDLE;
    }

    // ========== Internals ==========

    fn ensure_available(&self, op: &str) -> bool {
        if self.resource.is_none() {
            debug!("Speech synthesis unavailable, ignoring {}", op);
            return false;
        }
        true
    }

    fn ensure_index(&self, index: usize) -> bool {
        if index < self.paragraphs.len() {
            return true;
        }
        debug!(
            "Ignoring request: {}",
            ReaderError::IndexOutOfRange {
                index,
                len: self.paragraphs.len()
            }
        );
        false
    }

    /// Accept an event only for the active utterance
    fn claim(&mut self, id: UtteranceId) -> bool {
        if self.active != Some(id) {
            debug!("Ignoring stale event for {}", id);
            return false;
        }
        self.active = None;
        true
    }

    fn on_ended(&mut self, now: Instant) {
        match self.state.mode {
            PlaybackMode::Idle => {}
            PlaybackMode::SpeakingSingle { index } => {
                debug!("Finished single read {:?}", index);
                self.state = PlaybackState::IDLE;
            }
            PlaybackMode::SpeakingSequential { index, .. } => {
                let len = self.paragraphs.len();
                if index + 1 < len {
                    debug!("Paragraph {} done, next in {:?}", index, SETTLE_DELAY);
                    self.pending = Some(PendingAdvance {
                        due: now + SETTLE_DELAY,
                        index: index + 1,
                    });
                } else {
                    if index >= len {
                        warn!(
                            "Stopping run: {}",
                            ReaderError::IndexOutOfRange { index, len }
                        );
                    } else {
                        info!("Finished reading all paragraphs");
                    }
                    self.finish_run();
                }
            }
        }
    }

    fn finish_run(&mut self) {
        self.pending = None;
        self.state = PlaybackState::IDLE;
        self.start_from = 0;
    }

    fn next_id(&mut self) -> UtteranceId {
        self.generation += 1;
        UtteranceId(self.generation)
    }

    /// Cancel whatever is active and submit paragraph `index`
    fn begin(&mut self, index: usize, mode: PlaybackMode) -> Result<()> {
        let Some(paragraph) = self.paragraphs.get(index) else {
            self.finish_run();
            return Err(ReaderError::IndexOutOfRange {
                index,
                len: self.paragraphs.len(),
            });
        };

        let text = paragraph.text.clone();
        let voice = self.catalog.voice_for(detect_language(&text));
        self.submit(text, voice, mode)
    }

    /// Cancel whatever is active and submit `text` in `mode`
    ///
    /// A failed cancel or speak leaves the controller `Idle`.
    fn submit(&mut self, text: String, voice: Option<Voice>, mode: PlaybackMode) -> Result<()> {
        let language = detect_language(&text);
        let id = self.next_id();
        let utterance = Utterance {
            id,
            text,
            voice,
            language,
            settings: self.settings,
        };

        let Some(resource) = self.resource.as_mut() else {
            return Ok(());
        };

        self.pending = None;
        if let Some(previous) = self.active.take() {
            debug!("Preempting {}", previous);
        }
        if let Err(e) = resource.cancel() {
            warn!("Failed to cancel before {:?}: {}", mode, e);
            self.state = PlaybackState::IDLE;
            return Err(e);
        }

        debug!("Submitting {} ({:?})", id, mode);
        self.state = PlaybackState {
            mode,
            paused: false,
        };

        match resource.speak(&utterance) {
            Ok(()) => {
                self.active = Some(id);
                Ok(())
            }
            Err(e) => {
                warn!("Failed to start {:?}: {}", mode, e);
                self.state = PlaybackState::IDLE;
                Err(e)
            }
        }
    }
}

impl Drop for PlaybackController {
    fn drop(&mut self) {
        self.shutdown();
    }
}
