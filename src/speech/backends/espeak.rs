//! espeak-ng subprocess backend
//!
//! Each utterance runs in its own `espeak-ng --stdin` child. Text goes in on
//! stdin so paragraphs starting with `-` (markdown lists) are never parsed
//! as options. Pause and resume stop and continue the child with
//! SIGSTOP/SIGCONT; completion is detected by reaping it.
//!
//! Dependencies:
//! - espeak-ng (install with: sudo apt install espeak-ng)
//! - PulseAudio or PipeWire for audio output

use crate::platform::wslg_pulse_server;
use crate::speech::{SpeechEvent, SpeechResource, Utterance, UtteranceId, Voice};
use crate::{ReaderError, Result};
use log::{debug, error, info};
use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use std::io::Write;
use std::process::{Child, Command, Stdio};
use std::thread::{self, JoinHandle};

/// espeak-ng's default speed in words per minute
const NORMAL_WPM: f32 = 175.0;

/// Write `text` to espeak-ng's stdin from a short-lived thread
///
/// A paragraph larger than the pipe buffer would otherwise block until
/// espeak-ng reads it. The sink is dropped when done, which closes stdin so
/// espeak-ng sees end of input. A killed child just fails the write.
fn feed_text<W: Write + Send + 'static>(mut sink: W, text: String) -> JoinHandle<()> {
    thread::spawn(move || {
        if let Err(e) = sink.write_all(text.as_bytes()) {
            debug!("Stopped writing text to espeak-ng: {}", e);
        }
    })
}

/// A running espeak-ng child and the utterance it voices
struct Running {
    id: UtteranceId,
    child: Child,
}

/// espeak-ng backend
pub struct EspeakSynth {
    current: Option<Running>,

    /// Path to espeak-ng
    espeak_path: String,

    /// PULSE_SERVER to hand to children, when auto-detected
    pulse_server: Option<String>,

    /// Readiness is announced on the first poll
    announced: bool,
}

impl EspeakSynth {
    /// Create a new espeak-ng resource
    ///
    /// Verifies espeak-ng can be executed.
    pub fn new() -> Result<Self> {
        debug!("Creating espeak-ng backend");

        let espeak_path = Self::find_espeak()?;
        debug!("Found espeak-ng at: {}", espeak_path);

        Ok(Self {
            current: None,
            espeak_path,
            pulse_server: Self::detect_pulse_server(),
            announced: false,
        })
    }

    /// Find espeak-ng executable
    fn find_espeak() -> Result<String> {
        for path in ["espeak-ng", "/usr/bin/espeak-ng"] {
            if let Ok(status) = Command::new(path)
                .arg("--version")
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .status()
            {
                if status.success() {
                    return Ok(path.to_string());
                }
            }
        }

        Err(ReaderError::Speech(
            "espeak-ng not found. Install with: sudo apt install espeak-ng".to_string(),
        ))
    }

    fn detect_pulse_server() -> Option<String> {
        if std::env::var("PULSE_SERVER").is_ok() {
            debug!("PULSE_SERVER already set via environment");
            return None;
        }
        let server = wslg_pulse_server()?;
        info!("Auto-detected WSLg PulseAudio server at {}", server);
        Some(server.to_string())
    }

    /// Rate multiplier to words per minute (espeak accepts 80..=450)
    fn rate_to_speed(rate: f32) -> u16 {
        (NORMAL_WPM * rate).round().clamp(80.0, 450.0) as u16
    }

    /// Pitch multiplier to espeak pitch (0..=99, 50 is normal)
    fn pitch_to_espeak(pitch: f32) -> u8 {
        (50.0 * pitch).round().clamp(0.0, 99.0) as u8
    }

    /// Volume fraction to espeak amplitude (100 is normal)
    fn volume_to_amplitude(volume: f32) -> u8 {
        (100.0 * volume).round().clamp(0.0, 200.0) as u8
    }

    /// Parse the table printed by `espeak-ng --voices`
    ///
    /// ```text
    /// Pty Language       Age/Gender VoiceName          File                 Other Languages
    ///  5  en-us           --/M      English_(America)  gmw/en-US            (en 3)
    /// ```
    fn parse_voices(listing: &str) -> Vec<Voice> {
        listing
            .lines()
            .skip(1)
            .filter_map(|line| {
                let mut cols = line.split_whitespace();
                let _priority = cols.next()?;
                let lang = cols.next()?;
                let _age_gender = cols.next()?;
                let name = cols.next()?;
                let file = cols.next()?;
                // Mandarin and Cantonese are listed without the macrolanguage
                let lang = if lang.starts_with("cmn") || lang.starts_with("yue") {
                    format!("zh-{}", lang)
                } else {
                    lang.to_string()
                };
                Some(Voice::new(file, name.replace('_', " "), lang))
            })
            .collect()
    }

    fn signal_current(&mut self, signal: Signal) -> Result<()> {
        if let Some(running) = &self.current {
            let pid = Pid::from_raw(running.child.id() as i32);
            kill(pid, signal).map_err(|e| {
                ReaderError::Speech(format!("Failed to send {:?} to espeak-ng: {}", signal, e))
            })?;
        }
        Ok(())
    }

    /// Kill and reap the current child, if any
    fn kill_current(&mut self) {
        if let Some(mut running) = self.current.take() {
            debug!("Killing espeak-ng for {}", running.id);
            match running.child.kill() {
                Ok(_) => {
                    let _ = running.child.wait();
                }
                Err(e) => {
                    debug!("Failed to kill espeak-ng process: {}", e);
                }
            }
        }
    }
}

impl SpeechResource for EspeakSynth {
    fn speak(&mut self, utterance: &Utterance) -> Result<()> {
        self.kill_current();

        let settings = &utterance.settings;
        let mut cmd = Command::new(&self.espeak_path);
        if let Some(voice) = &utterance.voice {
            cmd.arg("-v").arg(&voice.id);
        } else {
            cmd.arg("-v").arg(utterance.language.tag_prefix());
        }
        cmd.arg("-s").arg(Self::rate_to_speed(settings.rate).to_string());
        cmd.arg("-p").arg(Self::pitch_to_espeak(settings.pitch).to_string());
        cmd.arg("-a").arg(Self::volume_to_amplitude(settings.volume).to_string());
        cmd.arg("--stdin");

        if let Some(server) = &self.pulse_server {
            cmd.env("PULSE_SERVER", server);
        }

        cmd.stdin(Stdio::piped());
        cmd.stdout(Stdio::null());
        cmd.stderr(Stdio::null());

        let mut child = cmd.spawn().map_err(|e| {
            error!("Failed to spawn espeak-ng: {}", e);
            ReaderError::Speech(format!("Failed to start espeak-ng: {}", e))
        })?;

        if let Some(stdin) = child.stdin.take() {
            feed_text(stdin, utterance.text.clone());
        }

        debug!("espeak-ng started for {}", utterance.id);
        self.current = Some(Running {
            id: utterance.id,
            child,
        });
        Ok(())
    }

    fn cancel(&mut self) -> Result<()> {
        debug!("Canceling speech");
        self.kill_current();
        Ok(())
    }

    fn pause(&mut self) -> Result<()> {
        debug!("Pausing espeak-ng");
        self.signal_current(Signal::SIGSTOP)
    }

    fn resume(&mut self) -> Result<()> {
        debug!("Resuming espeak-ng");
        self.signal_current(Signal::SIGCONT)
    }

    fn voices(&self) -> Result<Vec<Voice>> {
        let output = Command::new(&self.espeak_path)
            .arg("--voices")
            .stderr(Stdio::null())
            .output()?;

        if !output.status.success() {
            return Err(ReaderError::Speech(
                "espeak-ng --voices failed".to_string(),
            ));
        }

        Ok(Self::parse_voices(&String::from_utf8_lossy(&output.stdout)))
    }

    fn poll_events(&mut self) -> Vec<SpeechEvent> {
        let mut events = Vec::new();

        if !self.announced {
            self.announced = true;
            events.push(SpeechEvent::VoicesChanged);
        }

        let finished = match self.current.as_mut() {
            Some(running) => match running.child.try_wait() {
                Ok(Some(status)) => Some((running.id, Ok(status))),
                Ok(None) => None,
                Err(e) => Some((running.id, Err(e))),
            },
            None => None,
        };

        if let Some((id, outcome)) = finished {
            self.current = None;
            match outcome {
                Ok(status) if status.success() => events.push(SpeechEvent::Ended(id)),
                Ok(status) => events.push(SpeechEvent::Error {
                    id,
                    message: format!("espeak-ng exited with {}", status),
                }),
                Err(e) => events.push(SpeechEvent::Error {
                    id,
                    message: e.to_string(),
                }),
            }
        }

        events
    }

    fn name(&self) -> &str {
        "espeak-ng"
    }
}

impl Drop for EspeakSynth {
    fn drop(&mut self) {
        debug!("Shutting down espeak-ng backend");
        self.kill_current();
    }
}
