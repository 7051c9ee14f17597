//! Overused-phrase extraction and greeting-spam detection.
//!
//! Both analyses read the recent conversation window and skip transport
//! bookkeeping (system/join/part/quit) plus anything the locale-aware
//! matcher classifies as a greeting. The phrase lists are heuristics, not
//! invariants; deployments override them through `LexiconConfig`.

use std::collections::{BTreeMap, HashMap};

use regex::Regex;

use chorus_types::config::{LexiconConfig, RepetitionConfig};
use chorus_types::message::ChatMessage;
use chorus_types::persona::Language;

/// Compiled greeting lexicon for one language.
#[derive(Debug)]
struct CompiledLexicon {
    phrases: Vec<String>,
    starters: Vec<Regex>,
    short_message_words: usize,
}

/// Locale-aware multilingual greeting classifier.
///
/// Lookup is data-driven: the matcher keys on `Language` and falls back to
/// the default-language lexicon when a language has no entry.
#[derive(Debug)]
pub struct GreetingMatcher {
    lexicons: BTreeMap<Language, CompiledLexicon>,
}

impl GreetingMatcher {
    /// Compile the configured lexicons. Fails on an invalid starter pattern.
    pub fn new(config: &LexiconConfig) -> Result<Self, regex::Error> {
        let mut lexicons = BTreeMap::new();
        for (language, lexicon) in &config.greetings {
            let starters = lexicon
                .starters
                .iter()
                .map(|pattern| Regex::new(pattern))
                .collect::<Result<Vec<_>, _>>()?;
            lexicons.insert(
                *language,
                CompiledLexicon {
                    phrases: lexicon.phrases.iter().map(|p| p.to_lowercase()).collect(),
                    starters,
                    short_message_words: lexicon.short_message_words,
                },
            );
        }
        Ok(Self { lexicons })
    }

    fn lexicon(&self, language: Language) -> Option<&CompiledLexicon> {
        self.lexicons
            .get(&language)
            .or_else(|| self.lexicons.get(&Language::default()))
    }

    /// Classify a message as a greeting.
    ///
    /// Three mechanisms, any of which suffices:
    /// - the whole message (punctuation-stripped) is a known phrase;
    /// - a short message opens with a known phrase ("hi all!!");
    /// - a starter pattern matches and the message is not much longer than
    ///   the short-message bound.
    pub fn is_greeting(&self, text: &str, language: Language) -> bool {
        let Some(lexicon) = self.lexicon(language) else {
            return false;
        };

        let normalized = text
            .trim()
            .trim_end_matches(['!', '?', '.', ',', '~'])
            .to_lowercase();
        if normalized.is_empty() {
            return false;
        }
        let word_count = normalized.split_whitespace().count();

        if lexicon.phrases.iter().any(|p| *p == normalized) {
            return true;
        }

        if word_count <= lexicon.short_message_words
            && lexicon
                .phrases
                .iter()
                .any(|p| normalized.starts_with(p.as_str()))
        {
            return true;
        }

        word_count <= lexicon.short_message_words * 2
            && lexicon.starters.iter().any(|re| re.is_match(&normalized))
    }
}

/// Extracts recently-overused phrases and greeting spam from history.
pub struct RepetitionDetector {
    config: RepetitionConfig,
    matcher: GreetingMatcher,
}

impl RepetitionDetector {
    pub fn new(config: RepetitionConfig, lexicon: &LexiconConfig) -> Result<Self, regex::Error> {
        Ok(Self {
            config,
            matcher: GreetingMatcher::new(lexicon)?,
        })
    }

    pub fn matcher(&self) -> &GreetingMatcher {
        &self.matcher
    }

    /// Phrases (2-4 words, more than 3 characters) that occur more than
    /// once across the last `phrase_window` non-greeting, conversational
    /// messages. Sorted for deterministic output.
    pub fn detect_phrases(&self, window: &[ChatMessage], language: Language) -> Vec<String> {
        let recent: Vec<&ChatMessage> = window
            .iter()
            .rev()
            .filter(|m| m.kind.is_conversational())
            .filter(|m| !self.matcher.is_greeting(&m.text, language))
            .take(self.config.phrase_window)
            .collect();

        let mut counts: HashMap<String, usize> = HashMap::new();
        for message in recent {
            let lowered = message.text.to_lowercase();
            let words: Vec<&str> = lowered.split_whitespace().collect();
            for size in 2..=4usize {
                for chunk in words.windows(size) {
                    let phrase = chunk.join(" ");
                    if phrase.chars().count() > self.config.min_phrase_chars {
                        *counts.entry(phrase).or_insert(0) += 1;
                    }
                }
            }
        }

        let mut repeated: Vec<String> = counts
            .into_iter()
            .filter(|(_, count)| *count > 1)
            .map(|(phrase, _)| phrase)
            .collect();
        repeated.sort();
        repeated
    }

    /// Greeting-classified messages within the speaker's last
    /// `greeting_lookback` conversational messages.
    pub fn greeting_count(
        &self,
        window: &[ChatMessage],
        speaker: &str,
        language: Language,
    ) -> usize {
        window
            .iter()
            .rev()
            .filter(|m| m.kind.is_conversational() && m.speaker == speaker)
            .take(self.config.greeting_lookback)
            .filter(|m| self.matcher.is_greeting(&m.text, language))
            .count()
    }

    /// Whether the speaker has hit the ordinary greeting-spam threshold.
    pub fn is_greeting_spam(
        &self,
        window: &[ChatMessage],
        speaker: &str,
        language: Language,
    ) -> bool {
        self.greeting_count(window, speaker, language) >= self.config.greeting_spam_threshold
    }

    /// Stricter check used by re-engagement (follow-up) flows.
    pub fn is_followup_greeting_spam(
        &self,
        window: &[ChatMessage],
        speaker: &str,
        language: Language,
    ) -> bool {
        self.greeting_count(window, speaker, language) >= self.config.followup_greeting_threshold
    }
}
