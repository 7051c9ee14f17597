//! Raw model output validation pipeline.
//!
//! Steps run in a fixed order; the discarding steps replace the whole
//! reply with a persona-flavored line and report which step fired, while
//! the shaping steps (truncation, prefix strip, tag extraction, quote
//! strip) edit in place. Already-clean text passes through unchanged.

use rand::Rng;

use chorus_types::config::{LexiconConfig, SanitizerConfig};
use chorus_types::directive::Directive;
use chorus_types::persona::{Language, Persona};

use super::directive;
use crate::templates;

/// Which discarding step rejected the raw text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscardReason {
    /// An echoed system instruction surfaced in the output.
    LeakDetected,
    /// Reply opened in the default language when another was expected.
    WrongLanguage,
    /// Too many near-identical lines.
    ExcessiveRepetition,
}

/// Sanitization result: visible text plus extracted directives. When a
/// discarding step fired, `text` is a synthesized replacement and
/// `directives` is empty.
#[derive(Debug, Clone)]
pub struct SanitizeOutcome {
    pub text: String,
    pub directives: Vec<Directive>,
    pub discarded: Option<DiscardReason>,
}

impl SanitizeOutcome {
    pub fn was_discarded(&self) -> bool {
        self.discarded.is_some()
    }
}

/// Validates and cleans raw provider text before it reaches users.
pub struct ResponseSanitizer {
    config: SanitizerConfig,
    leak_phrases: Vec<String>,
    wrong_language_starters: Vec<String>,
}

impl ResponseSanitizer {
    pub fn new(config: SanitizerConfig, lexicon: &LexiconConfig) -> Self {
        Self {
            config,
            leak_phrases: lexicon
                .leak_phrases
                .iter()
                .map(|p| p.to_lowercase())
                .collect(),
            wrong_language_starters: lexicon
                .wrong_language_starters
                .iter()
                .map(|p| p.to_lowercase())
                .collect(),
        }
    }

    /// Run the full pipeline over one raw reply.
    pub fn sanitize<R: Rng + ?Sized>(
        &self,
        raw: &str,
        persona: &Persona,
        expected_language: Language,
        rng: &mut R,
    ) -> SanitizeOutcome {
        if let Some(reason) = self.check_content(raw, expected_language) {
            return self.replace(persona, reason, rng);
        }

        let mut text = self.truncate(raw.trim());

        if self.is_excessively_repetitive(&text) {
            return self.replace(persona, DiscardReason::ExcessiveRepetition, rng);
        }

        text = strip_self_reference(&text, &persona.name);

        let extraction = directive::extract(&text);
        let mut directives = extraction.directives;
        text = extraction.text;

        if let Some((stripped, shift)) = strip_wrapping_quotes(&text) {
            // Offsets pointed into the quoted text; shift them back past
            // the opening quote and keep them inside the shorter text (a
            // tag that stood right before the closing quote now points at
            // the end).
            text = stripped;
            for d in &mut directives {
                d.offset = d.offset.saturating_sub(shift).min(text.len());
            }
        }

        SanitizeOutcome {
            text,
            directives,
            discarded: None,
        }
    }

    fn replace<R: Rng + ?Sized>(
        &self,
        persona: &Persona,
        reason: DiscardReason,
        rng: &mut R,
    ) -> SanitizeOutcome {
        tracing::warn!(
            persona = %persona.name,
            reason = ?reason,
            "Discarding raw output, substituting replacement"
        );
        SanitizeOutcome {
            text: templates::replacement_line(persona, rng),
            directives: Vec::new(),
            discarded: Some(reason),
        }
    }

    fn check_content(&self, raw: &str, expected_language: Language) -> Option<DiscardReason> {
        let lowered = raw.to_lowercase();

        if self.leak_phrases.iter().any(|p| lowered.contains(p)) {
            return Some(DiscardReason::LeakDetected);
        }

        if expected_language != Language::default() && self.opens_in_default_language(&lowered) {
            return Some(DiscardReason::WrongLanguage);
        }

        None
    }

    /// Heuristic: the reply's opening words match a default-language
    /// sentence starter.
    fn opens_in_default_language(&self, lowered: &str) -> bool {
        let head = lowered.trim_start();
        self.wrong_language_starters.iter().any(|starter| {
            head.starts_with(starter.as_str())
                && head[starter.len()..]
                    .chars()
                    .next()
                    .is_none_or(|c| !c.is_alphanumeric())
        })
    }

    fn is_excessively_repetitive(&self, raw: &str) -> bool {
        let lines: Vec<&str> = raw
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .collect();
        if lines.len() <= self.config.repetition_line_threshold {
            return false;
        }
        let unique: std::collections::HashSet<&str> = lines.iter().copied().collect();
        (unique.len() as f64) / (lines.len() as f64) < self.config.repetition_unique_ratio
    }

    /// Soft-truncate above the soft cap; the result always fits the hard
    /// cap since soft < hard.
    fn truncate(&self, text: &str) -> String {
        if text.chars().count() <= self.config.soft_cap {
            return text.to_string();
        }
        let cut: String = text.chars().take(self.config.soft_cap).collect();
        // Prefer a word boundary near the cut point.
        let cut = match cut.rfind(char::is_whitespace) {
            Some(idx) if idx > self.config.soft_cap.saturating_sub(100) => cut[..idx].to_string(),
            _ => cut,
        };
        format!("{}...", cut.trim_end())
    }
}

/// Remove one leading case-insensitive `"<name>: "` echo of the speaker's
/// own name. Exactly one; a deliberately doubled prefix loses one layer
/// per pass.
fn strip_self_reference(text: &str, name: &str) -> String {
    // The name length may not land on a char boundary in multibyte output.
    let prefix_len = name.len();
    if let (Some(head), Some(tail)) = (text.get(..prefix_len), text.get(prefix_len..))
        && head.eq_ignore_ascii_case(name)
        && tail.starts_with(':')
    {
        return tail[1..].trim_start().to_string();
    }
    text.to_string()
}

const QUOTE_PAIRS: &[(char, char)] = &[('"', '"'), ('\u{201c}', '\u{201d}'), ('\u{ab}', '\u{bb}')];

/// Strip a single pair of wrapping quote characters, if the text both
/// opens and closes with a matching pair. Returns the inner text and the
/// byte length of the removed opening quote, which directive offsets must
/// shift back by.
fn strip_wrapping_quotes(text: &str) -> Option<(String, usize)> {
    let mut chars = text.chars();
    let first = chars.next()?;
    let last = chars.next_back()?;
    QUOTE_PAIRS
        .iter()
        .find(|(open, close)| first == *open && last == *close)?;

    Some((chars.as_str().to_string(), first.len_utf8()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chorus_types::directive::DirectiveKind;
    use chorus_types::persona::{PersonaId, SpeechStyle};
    use chrono::Utc;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn sanitizer() -> ResponseSanitizer {
        ResponseSanitizer::new(SanitizerConfig::default(), &LexiconConfig::default())
    }

    fn persona(name: &str, language: Language) -> Persona {
        Persona {
            id: PersonaId::new(),
            name: name.to_string(),
            primary_language: language,
            secondary_languages: vec![],
            style: SpeechStyle::default(),
            traits: vec![],
            created_at: Utc::now(),
        }
    }

    fn run(raw: &str, p: &Persona, lang: Language) -> SanitizeOutcome {
        let mut rng = StdRng::seed_from_u64(7);
        sanitizer().sanitize(raw, p, lang, &mut rng)
    }

    #[test]
    fn test_clean_input_is_unchanged() {
        let p = persona("Nova", Language::English);
        let raw = "the weather has been lovely all week, hasn't it?";
        let out = run(raw, &p, Language::English);
        assert!(!out.was_discarded());
        assert_eq!(out.text, raw);
        assert!(out.directives.is_empty());
    }

    #[test]
    fn test_idempotent_on_clean_input() {
        let p = persona("Nova", Language::English);
        let raw = "a perfectly ordinary reply about music and movies";
        let once = run(raw, &p, Language::English);
        let twice = run(&once.text, &p, Language::English);
        assert_eq!(once.text, twice.text);
        assert!(!twice.was_discarded());
    }

    #[test]
    fn test_leaked_instructions_are_discarded() {
        let p = persona("Nova", Language::English);
        let raw = "Nova: Follow these instructions and stay in character. Hi!";
        let out = run(raw, &p, Language::English);
        assert_eq!(out.discarded, Some(DiscardReason::LeakDetected));
        assert!(!out.text.contains("instructions"));
        assert!(!out.text.is_empty());
        assert!(out.directives.is_empty());
    }

    #[test]
    fn test_wrong_language_opening_discarded() {
        let p = persona("Luna", Language::Spanish);
        let out = run("Well, I think that movie was great", &p, Language::Spanish);
        assert_eq!(out.discarded, Some(DiscardReason::WrongLanguage));
    }

    #[test]
    fn test_wrong_language_check_skipped_for_default_language() {
        let p = persona("Nova", Language::English);
        let out = run("Well, I think that movie was great", &p, Language::English);
        assert!(!out.was_discarded());
    }

    #[test]
    fn test_starter_requires_word_boundary() {
        let p = persona("Luna", Language::Spanish);
        // "theatro" starts with "the" but is not the English article.
        let out = run("theatro lleno esta noche", &p, Language::Spanish);
        assert!(!out.was_discarded());
    }

    #[test]
    fn test_long_text_soft_truncated() {
        let p = persona("Nova", Language::English);
        let raw = "word ".repeat(500);
        let out = run(&raw, &p, Language::English);
        assert!(!out.was_discarded());
        assert!(out.text.ends_with("..."));
        assert!(out.text.chars().count() <= SanitizerConfig::default().hard_cap);
    }

    #[test]
    fn test_repetitive_lines_discarded() {
        let p = persona("Nova", Language::English);
        let raw = "same line here\n".repeat(12);
        let out = run(&raw, &p, Language::English);
        assert_eq!(out.discarded, Some(DiscardReason::ExcessiveRepetition));
    }

    #[test]
    fn test_varied_lines_kept() {
        let p = persona("Nova", Language::English);
        let raw: String = (0..12).map(|i| format!("distinct line {i}\n")).collect();
        let out = run(&raw, &p, Language::English);
        assert!(!out.was_discarded());
    }

    #[test]
    fn test_self_reference_stripped_exactly_once() {
        let p = persona("Nova", Language::English);
        let out = run("Nova: Nova: hello everyone", &p, Language::English);
        assert_eq!(out.text, "Nova: hello everyone");
    }

    #[test]
    fn test_self_reference_case_insensitive() {
        let p = persona("Nova", Language::English);
        let out = run("nova: good point", &p, Language::English);
        assert_eq!(out.text, "good point");
    }

    #[test]
    fn test_directive_extracted_from_text() {
        let p = persona("Nova", Language::English);
        let out = run(
            "you should watch [SEARCH_IMDB: Inception] tonight",
            &p,
            Language::English,
        );
        assert_eq!(out.text, "you should watch  tonight");
        assert_eq!(out.directives.len(), 1);
        assert_eq!(out.directives[0].kind, DirectiveKind::ImdbSearch);
        assert_eq!(out.directives[0].payload, "Inception");
        assert_eq!(out.directives[0].offset, "you should watch ".len());
    }

    #[test]
    fn test_wrapping_quotes_stripped_and_offsets_shifted() {
        let p = persona("Nova", Language::English);
        let out = run(
            "\"listen to [SEARCH_TRACK: So What] later\"",
            &p,
            Language::English,
        );
        assert_eq!(out.text, "listen to  later");
        assert_eq!(out.directives[0].offset, "listen to ".len());
    }

    #[test]
    fn test_multibyte_text_shorter_than_name_boundary_is_kept() {
        let p = persona("Luna", Language::English);
        // The name's byte length lands inside 'é'; no prefix to strip.
        let out = run("aaaé hello", &p, Language::English);
        assert!(!out.was_discarded());
        assert_eq!(out.text, "aaaé hello");
    }

    #[test]
    fn test_multibyte_self_reference_strips_cleanly() {
        let p = persona("Zoé", Language::English);
        let out = run("Zoé: bonsoir tout le monde", &p, Language::English);
        assert_eq!(out.text, "bonsoir tout le monde");
    }

    #[test]
    fn test_quoted_text_ending_in_tag_keeps_offsets_in_bounds() {
        let p = persona("Nova", Language::English);
        let out = run("\"hello [SEARCH_IMDB: Inception]\"", &p, Language::English);
        assert_eq!(out.text, "hello ");
        assert_eq!(out.directives.len(), 1);
        assert!(out.directives[0].offset <= out.text.len());
        assert_eq!(out.directives[0].offset, out.text.len());
    }

    #[test]
    fn test_interior_quotes_untouched() {
        let p = persona("Nova", Language::English);
        let raw = "she said \"hello\" and left";
        let out = run(raw, &p, Language::English);
        assert_eq!(out.text, raw);
    }
}
