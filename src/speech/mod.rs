//! Speech synthesis: voices, settings and the shared speech resource

pub mod backends;
pub mod catalog;
pub mod language;
pub mod resource;
pub mod settings;

pub use backends::{create_resource, BackendPreference};
pub use catalog::{pick_default_voice, VoiceCatalog};
pub use language::{detect_language, Language};
pub use resource::{SpeechEvent, SpeechResource, Utterance, UtteranceId, Voice, VoiceTier};
pub use settings::{SettingsUpdate, SpeechSettings};
