//! Text rendering of playback state for the terminal front end
//!
//! Everything here is pure string building so it can be tested without a
//! terminal. Lines end in `\r\n` at the call site because stdout is raw.

use crate::playback::{PlaybackController, PlaybackMode, PlaybackState};
use crate::speech::{SpeechSettings, Voice, VoiceTier};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

/// Label of the play/pause/resume control
pub fn play_all_label(state: &PlaybackState) -> &'static str {
    match (state.mode, state.paused) {
        (PlaybackMode::SpeakingSequential { .. }, false) => "Pause",
        (PlaybackMode::SpeakingSequential { .. }, true) => "Resume",
        _ => "Play All",
    }
}

/// Label of the stop control
pub fn stop_label(state: &PlaybackState) -> &'static str {
    if state.is_idle() {
        "Stop"
    } else {
        "Stop Reading"
    }
}

/// Voice name with its quality badge, as shown in the selector
pub fn voice_label(voice: &Voice) -> String {
    let badge = match voice.tier() {
        VoiceTier::Premium => "🏆 ",
        VoiceTier::HighQuality => "⭐ ",
        VoiceTier::Standard => "",
    };
    format!("{}{} ({})", badge, voice.name, voice.lang)
}

pub fn settings_label(settings: &SpeechSettings) -> String {
    format!(
        "speed {:.1}x  pitch {:.1}  volume {}%",
        settings.rate,
        settings.pitch,
        (settings.volume * 100.0).round() as u32
    )
}

fn mode_label(mode: PlaybackMode) -> String {
    match mode {
        PlaybackMode::Idle => "idle".to_string(),
        PlaybackMode::SpeakingSingle { index: Some(index) } => format!("reading {}", index + 1),
        PlaybackMode::SpeakingSingle { index: None } => "testing voice".to_string(),
        PlaybackMode::SpeakingSequential { index, start } => {
            format!("playing {} (from {})", index + 1, start + 1)
        }
    }
}

/// One-line summary: mode, focus, voice and settings
pub fn status_line(controller: &PlaybackController, focus: usize) -> String {
    let state = controller.state();
    let total = controller.paragraphs().len();
    let voice = match controller.catalog().selected() {
        _ if !controller.is_available() => "speech unavailable".to_string(),
        Some(voice) if controller.catalog().is_user_chosen() => voice_label(voice),
        Some(voice) => format!("auto: {}", voice_label(voice)),
        None if controller.catalog().is_empty() => "Loading voices...".to_string(),
        None => "auto".to_string(),
    };

    let mut line = format!(
        "[{}/{}] {}{}",
        if total == 0 { 0 } else { focus + 1 },
        total,
        mode_label(state.mode),
        if state.paused { ", paused" } else { "" }
    );
    line.push_str(&format!(
        " | {} | {} | {}",
        play_all_label(&state),
        voice,
        settings_label(&controller.settings())
    ));
    line
}

/// Paragraph row with its marker
///
/// `>` marks the paragraph being voiced, `*` the focused one and `^` the
/// start position of the next run.
pub fn paragraph_line(
    controller: &PlaybackController,
    index: usize,
    focus: usize,
    width: usize,
) -> Option<String> {
    let paragraph = controller.paragraphs().get(index)?;
    let marker = if controller.speaking_index() == Some(index) {
        '>'
    } else if index == focus {
        '*'
    } else if controller.state().is_idle() && controller.start_from() == index {
        '^'
    } else {
        ' '
    };

    let flat: String = paragraph
        .text
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    let prefix = format!("{} {:>3}  ", marker, index + 1);
    let room = width.saturating_sub(prefix.width()).max(8);
    Some(format!("{}{}", prefix, fit_width(&flat, room)))
}

/// Cut `text` to at most `cols` terminal columns, marking the cut with `...`
///
/// Wide characters (CJK ideographs) take two columns and are never split.
pub fn fit_width(text: &str, cols: usize) -> String {
    if text.width() <= cols {
        return text.to_string();
    }

    let budget = cols.saturating_sub(3);
    let mut used = 0;
    let mut out = String::new();
    for ch in text.chars() {
        let w = ch.width().unwrap_or(0);
        if used + w > budget {
            break;
        }
        used += w;
        out.push(ch);
    }
    out.push_str("...");
    out
}

/// First visible row so that `focus` stays inside a window of `height`
pub fn scroll_top(focus: usize, top: usize, height: usize) -> usize {
    let height = height.max(1);
    if focus < top {
        focus
    } else if focus >= top + height {
        focus + 1 - height
    } else {
        top
    }
}

/// Full screen contents, ready to write after clearing the terminal
pub fn frame(
    controller: &PlaybackController,
    title: &str,
    focus: usize,
    top: usize,
    (cols, rows): (u16, u16),
    message: Option<&str>,
) -> String {
    let width = cols as usize;
    // Title, blank, paragraphs..., blank, status, message
    let height = (rows as usize).saturating_sub(5).max(1);

    let mut out = String::from("\x1b[H\x1b[2J");
    out.push_str(&fit_width(title, width));
    out.push_str("\r\n\r\n");

    let end = (top + height).min(controller.paragraphs().len());
    for index in top..end {
        if let Some(line) = paragraph_line(controller, index, focus, width) {
            out.push_str(&line);
        }
        out.push_str("\r\n");
    }
    for _ in end.saturating_sub(top)..height {
        out.push_str("\r\n");
    }

    out.push_str("\r\n");
    out.push_str(&fit_width(&status_line(controller, focus), width));
    out.push_str("\r\n");
    if let Some(message) = message {
        out.push_str(&fit_width(message, width));
    }
    out
}
