//! Voice catalog and default voice ranking

use super::{Language, Voice};
use log::{debug, info};

/// Pick the preferred voice for a language
///
/// A strict waterfall, first match wins. Falls back to the first available
/// voice regardless of language, and to `None` only when the list is empty.
pub fn pick_default_voice(available: &[Voice], language: Language) -> Option<&Voice> {
    let prefix = language.tag_prefix();
    let in_language = |v: &&Voice| v.lang.starts_with(prefix);

    let premium = match language {
        Language::English => available
            .iter()
            .find(|v| v.name.contains("Google US English") && v.lang == "en-US"),
        Language::Chinese => None,
    };

    premium
        .or_else(|| {
            available
                .iter()
                .filter(in_language)
                .find(|v| v.name.contains("Google"))
        })
        .or_else(|| {
            available
                .iter()
                .filter(in_language)
                .find(|v| v.name.contains("Enhanced"))
        })
        .or_else(|| available.iter().find(in_language))
        .or_else(|| available.first())
}

/// Available voices plus the one shown as selected
///
/// Until the user picks a voice, the selection follows the ranking and is
/// recomputed on every refresh. Once the user picks one it is sticky.
#[derive(Debug, Default)]
pub struct VoiceCatalog {
    voices: Vec<Voice>,
    selected: Option<Voice>,
    user_chosen: bool,
}

impl VoiceCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn voices(&self) -> &[Voice] {
        &self.voices
    }

    pub fn selected(&self) -> Option<&Voice> {
        self.selected.as_ref()
    }

    /// True when the selection came from the user rather than the ranking
    pub fn is_user_chosen(&self) -> bool {
        self.user_chosen
    }

    pub fn is_empty(&self) -> bool {
        self.voices.is_empty()
    }

    /// Replace the voice set after a readiness signal
    ///
    /// Returns true when the set actually changed.
    pub fn refresh(&mut self, voices: Vec<Voice>, language: Language) -> bool {
        if voices == self.voices {
            return false;
        }
        info!("Voice list updated: {} voices", voices.len());
        self.voices = voices;
        self.reselect(language);
        true
    }

    /// Re-run automatic selection for a new language hint
    pub fn reselect(&mut self, language: Language) {
        if self.user_chosen {
            return;
        }
        self.selected = pick_default_voice(&self.voices, language).cloned();
        debug!(
            "Auto-selected voice for {}: {:?}",
            language,
            self.selected.as_ref().map(|v| &v.name)
        );
    }

    /// Set the user's choice; `None` hands selection back to the ranking
    pub fn choose(&mut self, voice: Option<Voice>, language: Language) {
        match voice {
            Some(voice) => {
                info!("Voice changed to: {} ({})", voice.name, voice.lang);
                self.selected = Some(voice);
                self.user_chosen = true;
            }
            None => {
                info!("Voice selection back to automatic");
                self.user_chosen = false;
                self.reselect(language);
            }
        }
    }

    /// Voice for an utterance in the given language
    ///
    /// The user's choice always wins; otherwise the ranking runs for this
    /// utterance without touching the displayed selection.
    pub fn voice_for(&self, language: Language) -> Option<Voice> {
        if self.user_chosen {
            return self.selected.clone();
        }
        pick_default_voice(&self.voices, language).cloned()
    }

    pub fn find_by_name(&self, name: &str) -> Option<&Voice> {
        self.voices.iter().find(|v| v.name == name)
    }

    /// Position of the selected voice in the list
    pub fn selected_position(&self) -> Option<usize> {
        let selected = self.selected.as_ref()?;
        self.voices.iter().position(|v| v == selected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn voice(name: &str, lang: &str) -> Voice {
        Voice::new(name, name, lang)
    }

    fn pick<'a>(voices: &'a [Voice], language: Language) -> Option<&'a str> {
        pick_default_voice(voices, language).map(|v| v.name.as_str())
    }

    #[test]
    fn test_google_us_english_preferred() {
        let voices = vec![voice("Google US English", "en-US"), voice("Basic", "en-GB")];
        assert_eq!(pick(&voices, Language::English), Some("Google US English"));
    }

    #[test]
    fn test_google_us_english_needs_exact_tag() {
        let voices = vec![
            voice("Basic", "en-GB"),
            voice("Google US English", "en-GB"),
            voice("Google UK English Female", "en-GB"),
        ];
        // Falls through to the "en* containing Google" rung, first match wins
        assert_eq!(pick(&voices, Language::English), Some("Google US English"));

        let voices = vec![voice("Google US English", "es-US"), voice("Basic", "en-GB")];
        assert_eq!(pick(&voices, Language::English), Some("Basic"));
    }

    #[test]
    fn test_english_waterfall_order() {
        let voices = vec![
            voice("Daniel", "en-GB"),
            voice("Samantha (Enhanced)", "en-US"),
            voice("Ting-Ting", "zh-CN"),
        ];
        assert_eq!(pick(&voices, Language::English), Some("Samantha (Enhanced)"));

        let voices = vec![voice("Ting-Ting", "zh-CN"), voice("Daniel", "en-GB")];
        assert_eq!(pick(&voices, Language::English), Some("Daniel"));
    }

    #[test]
    fn test_chinese_waterfall_order() {
        let voices = vec![
            voice("Google US English", "en-US"),
            voice("Ting-Ting", "zh-CN"),
            voice("Mei-Jia (Enhanced)", "zh-TW"),
            voice("Google 普通话（中国大陆）", "zh-CN"),
        ];
        assert_eq!(
            pick(&voices, Language::Chinese),
            Some("Google 普通话（中国大陆）")
        );

        let voices = vec![
            voice("Ting-Ting", "zh-CN"),
            voice("Mei-Jia (Enhanced)", "zh-TW"),
        ];
        assert_eq!(pick(&voices, Language::Chinese), Some("Mei-Jia (Enhanced)"));
    }

    #[test]
    fn test_language_agnostic_fallback() {
        let voices = vec![voice("Thomas", "fr-FR"), voice("Anna", "de-DE")];
        assert_eq!(pick(&voices, Language::Chinese), Some("Thomas"));
        assert_eq!(pick(&voices, Language::English), Some("Thomas"));
        assert_eq!(pick(&[], Language::English), None);
    }

    #[test]
    fn test_pick_is_deterministic() {
        let voices = vec![
            voice("Google UK English Male", "en-GB"),
            voice("Google UK English Female", "en-GB"),
        ];
        let first = pick(&voices, Language::English);
        for _ in 0..10 {
            assert_eq!(pick(&voices, Language::English), first);
        }
    }

    #[test]
    fn test_refresh_tolerates_empty_then_selects() {
        let mut catalog = VoiceCatalog::new();
        assert!(!catalog.refresh(Vec::new(), Language::English));
        assert!(catalog.selected().is_none());

        assert!(catalog.refresh(vec![voice("Daniel", "en-GB")], Language::English));
        assert_eq!(catalog.selected().map(|v| v.name.as_str()), Some("Daniel"));
    }

    #[test]
    fn test_user_choice_is_sticky() {
        let mut catalog = VoiceCatalog::new();
        catalog.refresh(
            vec![voice("Google US English", "en-US"), voice("Daniel", "en-GB")],
            Language::English,
        );
        catalog.choose(Some(voice("Daniel", "en-GB")), Language::English);

        catalog.refresh(
            vec![
                voice("Google US English", "en-US"),
                voice("Daniel", "en-GB"),
                voice("Karen", "en-AU"),
            ],
            Language::English,
        );
        catalog.reselect(Language::Chinese);

        assert!(catalog.is_user_chosen());
        assert_eq!(catalog.selected().map(|v| v.name.as_str()), Some("Daniel"));
        assert_eq!(
            catalog.voice_for(Language::Chinese).map(|v| v.name),
            Some("Daniel".to_string())
        );
    }

    #[test]
    fn test_auto_voice_follows_utterance_language() {
        let mut catalog = VoiceCatalog::new();
        catalog.refresh(
            vec![voice("Google US English", "en-US"), voice("Ting-Ting", "zh-CN")],
            Language::English,
        );

        assert_eq!(
            catalog.voice_for(Language::Chinese).map(|v| v.name),
            Some("Ting-Ting".to_string())
        );
        // Displayed selection is untouched by per-utterance picks
        assert_eq!(
            catalog.selected().map(|v| v.name.as_str()),
            Some("Google US English")
        );
    }

    #[test]
    fn test_clearing_choice_reselects() {
        let mut catalog = VoiceCatalog::new();
        catalog.refresh(
            vec![voice("Daniel", "en-GB"), voice("Google US English", "en-US")],
            Language::English,
        );
        catalog.choose(Some(voice("Daniel", "en-GB")), Language::English);
        catalog.choose(None, Language::English);

        assert!(!catalog.is_user_chosen());
        assert_eq!(
            catalog.selected().map(|v| v.name.as_str()),
            Some("Google US English")
        );
        assert_eq!(catalog.selected_position(), Some(1));
    }
}
