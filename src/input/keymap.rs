//! Default key bindings for mdread

use std::collections::HashMap;

/// Key sequence type
pub type KeySequence = Vec<u8>;

/// Action identifier for key bindings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyAction {
    // Playback
    PlayAll,
    PlayFromCursor,
    ReadCursor,
    Stop,

    // Focus
    PrevParagraph,
    NextParagraph,
    FirstParagraph,
    LastParagraph,

    // Voice
    NextVoice,
    PrevVoice,
    AutoVoice,
    TestVoice,

    // Settings
    RateUp,
    RateDown,
    PitchUp,
    PitchDown,
    VolumeUp,
    VolumeDown,

    // Document
    Paste,
    Reload,

    Help,
    Quit,
}

impl KeyAction {
    /// Short description for the help line
    pub fn describe(&self) -> &'static str {
        use KeyAction::*;
        match self {
            PlayAll => "play all / pause / resume",
            PlayFromCursor => "play from focused paragraph",
            ReadCursor => "read focused paragraph",
            Stop => "stop",
            PrevParagraph => "previous paragraph",
            NextParagraph => "next paragraph",
            FirstParagraph => "first paragraph",
            LastParagraph => "last paragraph",
            NextVoice => "next voice",
            PrevVoice => "previous voice",
            AutoVoice => "automatic voice",
            TestVoice => "test selected voice",
            RateUp => "faster",
            RateDown => "slower",
            PitchUp => "higher pitch",
            PitchDown => "lower pitch",
            VolumeUp => "louder",
            VolumeDown => "quieter",
            Paste => "paste document from clipboard",
            Reload => "reload file",
            Help => "help",
            Quit => "quit",
        }
    }
}

/// Create the default keymap
pub fn create_default_keymap() -> HashMap<KeySequence, KeyAction> {
    let mut map = HashMap::new();

    // Playback
    map.insert(b" ".to_vec(), KeyAction::PlayAll);
    map.insert(b"p".to_vec(), KeyAction::PlayFromCursor);
    map.insert(b"\r".to_vec(), KeyAction::ReadCursor);
    map.insert(b"\n".to_vec(), KeyAction::ReadCursor);
    map.insert(b"s".to_vec(), KeyAction::Stop);
    map.insert(b"x".to_vec(), KeyAction::Stop);

    // Focus (vi keys and arrows)
    map.insert(b"k".to_vec(), KeyAction::PrevParagraph);
    map.insert(b"j".to_vec(), KeyAction::NextParagraph);
    map.insert(b"\x1b[A".to_vec(), KeyAction::PrevParagraph);
    map.insert(b"\x1b[B".to_vec(), KeyAction::NextParagraph);
    map.insert(b"\x1bOA".to_vec(), KeyAction::PrevParagraph);
    map.insert(b"\x1bOB".to_vec(), KeyAction::NextParagraph);
    map.insert(b"g".to_vec(), KeyAction::FirstParagraph);
    map.insert(b"G".to_vec(), KeyAction::LastParagraph);
    map.insert(b"\x1b[H".to_vec(), KeyAction::FirstParagraph);
    map.insert(b"\x1b[F".to_vec(), KeyAction::LastParagraph);

    // Voice
    map.insert(b"v".to_vec(), KeyAction::NextVoice);
    map.insert(b"V".to_vec(), KeyAction::PrevVoice);
    map.insert(b"a".to_vec(), KeyAction::AutoVoice);
    map.insert(b"t".to_vec(), KeyAction::TestVoice);

    // Settings
    map.insert(b"]".to_vec(), KeyAction::RateUp);
    map.insert(b"[".to_vec(), KeyAction::RateDown);
    map.insert(b"}".to_vec(), KeyAction::PitchUp);
    map.insert(b"{".to_vec(), KeyAction::PitchDown);
    map.insert(b"+".to_vec(), KeyAction::VolumeUp);
    map.insert(b"=".to_vec(), KeyAction::VolumeUp);
    map.insert(b"-".to_vec(), KeyAction::VolumeDown);

    // Document (ctrl+v pastes)
    map.insert(b"\x16".to_vec(), KeyAction::Paste);
    map.insert(b"r".to_vec(), KeyAction::Reload);

    map.insert(b"?".to_vec(), KeyAction::Help);
    map.insert(b"h".to_vec(), KeyAction::Help);
    map.insert(b"q".to_vec(), KeyAction::Quit);
    map.insert(b"\x03".to_vec(), KeyAction::Quit);

    map
}
