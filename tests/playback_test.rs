//! Playback controller tests
//!
//! Drive the state machine against a recording fake resource and feed it
//! completion/error events by hand, the way the main loop would.

use mdread::playback::{PlaybackController, PlaybackMode, SETTLE_DELAY, VOICE_SAMPLE};
use mdread::speech::{
    SettingsUpdate, SpeechEvent, SpeechResource, SpeechSettings, Utterance, UtteranceId, Voice,
};
use mdread::{ReaderError, Result};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, PartialEq)]
enum Call {
    Speak(String),
    Cancel,
    Pause,
    Resume,
}

#[derive(Default)]
struct Shared {
    calls: Vec<Call>,
    spoken: Vec<Utterance>,
    voices: Vec<Voice>,
    queued: Vec<SpeechEvent>,
    fail_next_speak: bool,
    fail_next_cancel: bool,
}

/// Fake resource recording every call; clones share the same log
#[derive(Clone, Default)]
struct Recorder(Arc<Mutex<Shared>>);

impl Recorder {
    fn with_voices(voices: Vec<Voice>) -> Self {
        let recorder = Self::default();
        recorder.0.lock().unwrap().voices = voices;
        recorder
    }

    fn calls(&self) -> Vec<Call> {
        self.0.lock().unwrap().calls.clone()
    }

    fn clear_calls(&self) {
        self.0.lock().unwrap().calls.clear();
    }

    fn last(&self) -> Utterance {
        self.0.lock().unwrap().spoken.last().cloned().expect("nothing spoken")
    }

    fn set_voices(&self, voices: Vec<Voice>) {
        self.0.lock().unwrap().voices = voices;
    }

    fn queue(&self, event: SpeechEvent) {
        self.0.lock().unwrap().queued.push(event);
    }

    fn fail_next_speak(&self) {
        self.0.lock().unwrap().fail_next_speak = true;
    }

    fn fail_next_cancel(&self) {
        self.0.lock().unwrap().fail_next_cancel = true;
    }

    fn spoken_texts(&self) -> Vec<String> {
        self.0.lock().unwrap().spoken.iter().map(|u| u.text.clone()).collect()
    }
}

impl SpeechResource for Recorder {
    fn speak(&mut self, utterance: &Utterance) -> Result<()> {
        let mut shared = self.0.lock().unwrap();
        if std::mem::take(&mut shared.fail_next_speak) {
            return Err(ReaderError::Speech("device busy".to_string()));
        }
        shared.calls.push(Call::Speak(utterance.text.clone()));
        shared.spoken.push(utterance.clone());
        Ok(())
    }

    fn cancel(&mut self) -> Result<()> {
        let mut shared = self.0.lock().unwrap();
        if std::mem::take(&mut shared.fail_next_cancel) {
            return Err(ReaderError::Speech("cancel refused".to_string()));
        }
        shared.calls.push(Call::Cancel);
        Ok(())
    }

    fn pause(&mut self) -> Result<()> {
        self.0.lock().unwrap().calls.push(Call::Pause);
        Ok(())
    }

    fn resume(&mut self) -> Result<()> {
        self.0.lock().unwrap().calls.push(Call::Resume);
        Ok(())
    }

    fn voices(&self) -> Result<Vec<Voice>> {
        Ok(self.0.lock().unwrap().voices.clone())
    }

    fn poll_events(&mut self) -> Vec<SpeechEvent> {
        std::mem::take(&mut self.0.lock().unwrap().queued)
    }

    fn name(&self) -> &str {
        "recorder"
    }
}

fn controller_with(text: &str, recorder: &Recorder) -> PlaybackController {
    let mut controller =
        PlaybackController::new(Some(Box::new(recorder.clone())), SpeechSettings::default());
    controller.set_text(text);
    controller
}

fn ended(recorder: &Recorder) -> SpeechEvent {
    SpeechEvent::Ended(recorder.last().id)
}

const ABC: &str = "A.\n\nB.\n\nC.";

#[test]
fn test_play_all_advances_after_settle_delay() {
    let recorder = Recorder::default();
    let mut controller = controller_with(ABC, &recorder);
    let t0 = Instant::now();

    controller.play_all(Some(0)).unwrap();
    assert_eq!(
        controller.state().mode,
        PlaybackMode::SpeakingSequential { index: 0, start: 0 }
    );
    assert_eq!(controller.speaking_index(), Some(0));

    controller.handle_event(ended(&recorder), t0);
    // Waiting out the delay: nothing is being voiced
    assert_eq!(controller.speaking_index(), None);
    assert_eq!(controller.time_until_next(t0), Some(SETTLE_DELAY));

    controller.tick(t0 + Duration::from_millis(499)).unwrap();
    assert_eq!(recorder.last().text, "A.");

    controller.tick(t0 + SETTLE_DELAY).unwrap();
    assert_eq!(
        controller.state().mode,
        PlaybackMode::SpeakingSequential { index: 1, start: 0 }
    );
    assert_eq!(recorder.last().text, "B.");
}

#[test]
fn test_last_paragraph_finishes_run() {
    let recorder = Recorder::default();
    let mut controller = controller_with(ABC, &recorder);
    let now = Instant::now();

    controller.play_all(Some(2)).unwrap();
    assert_eq!(controller.start_from(), 2);

    controller.handle_event(ended(&recorder), now);
    assert!(controller.state().is_idle());
    assert_eq!(controller.start_from(), 0);
    assert_eq!(controller.time_until_next(now), None);
}

#[test]
fn test_full_run_reads_every_paragraph_in_order() {
    let recorder = Recorder::default();
    let mut controller = controller_with(ABC, &recorder);
    let mut now = Instant::now();

    controller.play_all(None).unwrap();
    while !controller.state().is_idle() {
        recorder.queue(ended(&recorder));
        controller.pump(now).unwrap();
        now += SETTLE_DELAY;
        controller.pump(now).unwrap();
    }

    let spoken: Vec<Call> = recorder
        .calls()
        .into_iter()
        .filter(|c| matches!(c, Call::Speak(_)))
        .collect();
    assert_eq!(
        spoken,
        vec![
            Call::Speak("A.".into()),
            Call::Speak("B.".into()),
            Call::Speak("C.".into())
        ]
    );
}

#[test]
fn test_play_all_toggles_pause_and_resume() {
    let recorder = Recorder::default();
    let mut controller = controller_with(ABC, &recorder);

    controller.play_all(Some(1)).unwrap();
    recorder.clear_calls();

    controller.play_all(None).unwrap();
    assert_eq!(recorder.calls(), vec![Call::Pause]);
    assert!(controller.state().paused);
    assert_eq!(
        controller.state().mode,
        PlaybackMode::SpeakingSequential { index: 1, start: 1 }
    );

    controller.play_all(None).unwrap();
    assert_eq!(recorder.calls(), vec![Call::Pause, Call::Resume]);
    assert!(!controller.state().paused);
}

#[test]
fn test_pause_holds_pending_advance() {
    let recorder = Recorder::default();
    let mut controller = controller_with(ABC, &recorder);
    let t0 = Instant::now();

    controller.play_all(Some(0)).unwrap();
    controller.handle_event(ended(&recorder), t0);
    controller.play_all(None).unwrap();
    assert!(controller.state().paused);
    assert_eq!(controller.time_until_next(t0), None);

    controller.tick(t0 + SETTLE_DELAY * 4).unwrap();
    assert_eq!(recorder.last().text, "A.");

    controller.play_all(None).unwrap();
    controller.tick(t0 + SETTLE_DELAY * 4).unwrap();
    assert_eq!(recorder.last().text, "B.");
    assert_eq!(
        controller.state().mode,
        PlaybackMode::SpeakingSequential { index: 1, start: 0 }
    );
}

#[test]
fn test_every_submission_follows_a_cancel() {
    let recorder = Recorder::default();
    let mut controller = controller_with(ABC, &recorder);
    let now = Instant::now();

    controller.read_one(0).unwrap();
    controller.read_one(1).unwrap();
    controller.play_all(Some(0)).unwrap();
    controller.handle_event(ended(&recorder), now);
    controller.tick(now + SETTLE_DELAY).unwrap();

    let calls = recorder.calls();
    for (i, call) in calls.iter().enumerate() {
        if matches!(call, Call::Speak(_)) {
            assert!(i > 0, "speak without a preceding call");
            assert_eq!(calls[i - 1], Call::Cancel, "speak not preceded by cancel");
        }
    }
}

#[test]
fn test_read_one_preempts_sequential_run() {
    let recorder = Recorder::default();
    let mut controller = controller_with(ABC, &recorder);
    let now = Instant::now();

    controller.play_all(Some(0)).unwrap();
    let first = recorder.last().id;

    controller.read_one(2).unwrap();
    assert_eq!(controller.state().mode, PlaybackMode::SpeakingSingle { index: Some(2) });

    // Late completion of the cancelled utterance is ignored
    controller.handle_event(SpeechEvent::Ended(first), now);
    assert_eq!(controller.state().mode, PlaybackMode::SpeakingSingle { index: Some(2) });

    controller.handle_event(ended(&recorder), now);
    assert!(controller.state().is_idle());
    controller.tick(now + SETTLE_DELAY * 2).unwrap();
    assert!(controller.state().is_idle());
}

#[test]
fn test_single_read_never_advances() {
    let recorder = Recorder::default();
    let mut controller = controller_with(ABC, &recorder);
    let now = Instant::now();

    controller.read_one(0).unwrap();
    controller.handle_event(ended(&recorder), now);
    controller.tick(now + SETTLE_DELAY).unwrap();

    assert!(controller.state().is_idle());
    assert_eq!(recorder.last().text, "A.");
}

#[test]
fn test_play_all_during_single_read_starts_run() {
    let recorder = Recorder::default();
    let mut controller = controller_with(ABC, &recorder);

    controller.read_one(2).unwrap();
    controller.play_all(Some(1)).unwrap();

    assert_eq!(
        controller.state().mode,
        PlaybackMode::SpeakingSequential { index: 1, start: 1 }
    );
    assert!(!recorder.calls().contains(&Call::Pause));
}

#[test]
fn test_stop_is_idempotent_and_resets_start() {
    let recorder = Recorder::default();
    let mut controller = controller_with(ABC, &recorder);

    controller.stop().unwrap();
    assert!(controller.state().is_idle());

    controller.play_all(Some(2)).unwrap();
    controller.stop().unwrap();
    controller.stop().unwrap();

    assert!(controller.state().is_idle());
    assert!(!controller.state().paused);
    assert_eq!(controller.start_from(), 0);
    assert_eq!(recorder.calls().last(), Some(&Call::Cancel));
}

#[test]
fn test_stop_during_settle_delay_cancels_advance() {
    let recorder = Recorder::default();
    let mut controller = controller_with(ABC, &recorder);
    let now = Instant::now();

    controller.play_all(Some(0)).unwrap();
    controller.handle_event(ended(&recorder), now);
    controller.stop().unwrap();

    controller.tick(now + SETTLE_DELAY * 2).unwrap();
    assert!(controller.state().is_idle());
    assert_eq!(recorder.last().text, "A.");
}

#[test]
fn test_error_abandons_run_without_retry() {
    let recorder = Recorder::default();
    let mut controller = controller_with(ABC, &recorder);
    let now = Instant::now();

    controller.play_all(Some(1)).unwrap();
    let id = recorder.last().id;
    controller.handle_event(
        SpeechEvent::Error {
            id,
            message: "audio device lost".into(),
        },
        now,
    );

    assert!(controller.state().is_idle());
    controller.tick(now + SETTLE_DELAY * 2).unwrap();
    assert_eq!(recorder.last().id, id);
}

#[test]
fn test_stale_error_is_ignored() {
    let recorder = Recorder::default();
    let mut controller = controller_with(ABC, &recorder);
    let now = Instant::now();

    controller.read_one(0).unwrap();
    controller.read_one(1).unwrap();
    controller.handle_event(
        SpeechEvent::Error {
            id: UtteranceId(1),
            message: "interrupted".into(),
        },
        now,
    );

    assert_eq!(controller.state().mode, PlaybackMode::SpeakingSingle { index: Some(1) });
}

#[test]
fn test_empty_document_is_a_no_op() {
    let recorder = Recorder::default();
    let mut controller = controller_with("  \n\n  ", &recorder);

    controller.play_all(None).unwrap();
    controller.read_one(0).unwrap();

    assert!(controller.state().is_idle());
    assert!(recorder.calls().is_empty());
}

#[test]
fn test_out_of_range_requests_are_ignored() {
    let recorder = Recorder::default();
    let mut controller = controller_with(ABC, &recorder);

    controller.read_one(3).unwrap();
    controller.play_all(Some(7)).unwrap();

    assert!(controller.state().is_idle());
    assert!(recorder.calls().is_empty());
}

#[test]
fn test_document_shrinking_mid_run_goes_idle() {
    let recorder = Recorder::default();
    let mut controller = controller_with("A.\n\nB.\n\nC.\n\nD.", &recorder);
    let now = Instant::now();

    controller.play_all(Some(2)).unwrap();
    controller.set_text("A.\n\nB.");
    controller.handle_event(ended(&recorder), now);
    controller.tick(now + SETTLE_DELAY).unwrap();

    assert!(controller.state().is_idle());
    assert_eq!(controller.start_from(), 0);
    assert_eq!(recorder.last().text, "C.");
}

#[test]
fn test_document_shrinking_during_delay_goes_idle() {
    let recorder = Recorder::default();
    let mut controller = controller_with(ABC, &recorder);
    let now = Instant::now();

    controller.play_all(Some(0)).unwrap();
    controller.handle_event(ended(&recorder), now);
    controller.set_text("A.");
    controller.tick(now + SETTLE_DELAY).unwrap();

    assert!(controller.state().is_idle());
    assert_eq!(recorder.last().text, "A.");
}

#[test]
fn test_failed_submit_forces_idle() {
    let recorder = Recorder::default();
    let mut controller = controller_with(ABC, &recorder);

    recorder.fail_next_speak();
    assert!(controller.read_one(0).is_err());
    assert!(controller.state().is_idle());
    assert_eq!(controller.speaking_index(), None);
}

#[test]
fn test_failed_cancel_on_advance_goes_idle() {
    let recorder = Recorder::default();
    let mut controller = controller_with(ABC, &recorder);
    let t0 = Instant::now();

    controller.play_all(Some(0)).unwrap();
    controller.handle_event(ended(&recorder), t0);

    recorder.fail_next_cancel();
    assert!(controller.tick(t0 + SETTLE_DELAY).is_err());
    assert!(controller.state().is_idle());
    assert!(!controller.state().paused);
    assert_eq!(controller.speaking_index(), None);
    assert_eq!(controller.time_until_next(t0 + SETTLE_DELAY), None);

    // Play All starts a fresh run instead of pausing a dead one
    controller.play_all(None).unwrap();
    assert_eq!(
        controller.state().mode,
        PlaybackMode::SpeakingSequential { index: 0, start: 0 }
    );
    assert!(!controller.state().paused);
    assert_eq!(recorder.spoken_texts(), vec!["A.", "A."]);
}

#[test]
fn test_failed_cancel_on_read_one_goes_idle() {
    let recorder = Recorder::default();
    let mut controller = controller_with(ABC, &recorder);

    controller.play_all(Some(0)).unwrap();
    recorder.fail_next_cancel();
    assert!(controller.read_one(1).is_err());
    assert!(controller.state().is_idle());
    assert_eq!(recorder.spoken_texts(), vec!["A."]);
}

#[test]
fn test_voice_sample_needs_a_selected_voice() {
    let recorder = Recorder::default();
    let mut controller = controller_with(ABC, &recorder);

    controller.test_voice().unwrap();
    assert!(controller.state().is_idle());
    assert!(recorder.spoken_texts().is_empty());
}

#[test]
fn test_voice_sample_preempts_and_ends_idle() {
    let daniel = Voice::new("daniel", "Daniel", "en-GB");
    let recorder = Recorder::with_voices(vec![
        daniel.clone(),
        Voice::new("tingting", "Ting-Ting", "zh-CN"),
    ]);
    let mut controller = controller_with(ABC, &recorder);
    let now = Instant::now();

    controller.play_all(Some(0)).unwrap();
    let run = recorder.last().id;

    controller.test_voice().unwrap();
    assert_eq!(
        controller.state().mode,
        PlaybackMode::SpeakingSingle { index: None }
    );
    assert_eq!(controller.speaking_index(), None);

    // Mixed-language sample still uses the displayed voice
    let sample = recorder.last();
    assert_eq!(sample.text, VOICE_SAMPLE);
    assert_eq!(sample.voice, Some(daniel));
    assert_eq!(recorder.calls().iter().filter(|c| **c == Call::Cancel).count(), 2);

    controller.handle_event(SpeechEvent::Ended(run), now);
    assert_eq!(
        controller.state().mode,
        PlaybackMode::SpeakingSingle { index: None }
    );

    controller.handle_event(ended(&recorder), now);
    assert!(controller.state().is_idle());
    controller.tick(now + SETTLE_DELAY * 2).unwrap();
    assert!(controller.state().is_idle());
}

#[test]
fn test_settings_apply_to_next_utterance_only() {
    let recorder = Recorder::default();
    let mut controller = controller_with(ABC, &recorder);

    controller.read_one(0).unwrap();
    controller.set_settings(SettingsUpdate::rate(1.5));
    assert_eq!(recorder.last().settings.rate, 0.9);

    controller.read_one(1).unwrap();
    assert_eq!(recorder.last().settings.rate, 1.5);
    assert_eq!(recorder.last().settings.volume, 1.0);
}

#[test]
fn test_voices_arrive_late() {
    let recorder = Recorder::default();
    let mut controller = controller_with(ABC, &recorder);
    assert!(controller.catalog().is_empty());

    controller.read_one(0).unwrap();
    assert_eq!(recorder.last().voice, None);

    recorder.set_voices(vec![
        Voice::new("basic", "Basic", "en-GB"),
        Voice::new("gus", "Google US English", "en-US"),
    ]);
    recorder.queue(SpeechEvent::VoicesChanged);
    controller.pump(Instant::now()).unwrap();

    assert_eq!(
        controller.catalog().selected().map(|v| v.name.as_str()),
        Some("Google US English")
    );
    controller.read_one(1).unwrap();
    assert_eq!(recorder.last().voice.map(|v| v.id), Some("gus".to_string()));
}

#[test]
fn test_auto_voice_follows_paragraph_language() {
    let recorder = Recorder::with_voices(vec![
        Voice::new("gus", "Google US English", "en-US"),
        Voice::new("tt", "Ting-Ting", "zh-CN"),
    ]);
    let mut controller = controller_with("Hello there.\n\n你好世界。", &recorder);

    controller.read_one(1).unwrap();
    assert_eq!(recorder.last().voice.map(|v| v.id), Some("tt".to_string()));

    controller.read_one(0).unwrap();
    assert_eq!(recorder.last().voice.map(|v| v.id), Some("gus".to_string()));
}

#[test]
fn test_user_voice_is_sticky() {
    let recorder = Recorder::with_voices(vec![
        Voice::new("gus", "Google US English", "en-US"),
        Voice::new("tt", "Ting-Ting", "zh-CN"),
    ]);
    let mut controller = controller_with("Hello there.\n\n你好世界。", &recorder);

    controller.set_voice(Some(Voice::new("gus", "Google US English", "en-US")));
    recorder.set_voices(vec![
        Voice::new("tt", "Ting-Ting", "zh-CN"),
        Voice::new("gus", "Google US English", "en-US"),
        Voice::new("mj", "Mei-Jia", "zh-TW"),
    ]);
    recorder.queue(SpeechEvent::VoicesChanged);
    controller.pump(Instant::now()).unwrap();

    controller.read_one(1).unwrap();
    assert_eq!(recorder.last().voice.map(|v| v.id), Some("gus".to_string()));
    assert!(controller.catalog().is_user_chosen());
}
