//! Tunable configuration surface for the orchestration layer.
//!
//! Every constant the core consults is injectable through these structs:
//! breaker thresholds, backoff constants, cooldown window sizes, off-hours
//! boundaries, sanitizer caps, and the locale lexicons. Defaults match the
//! production values; tests construct their own.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::generation::ProviderConfig;
use crate::persona::Language;

/// Circuit breaker tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BreakerConfig {
    /// Sliding window length for rate-limit failures, in seconds.
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,
    /// Rate-limit failures within the window that open the circuit.
    #[serde(default = "default_rate_limit_threshold")]
    pub rate_limit_threshold: usize,
    /// How long the circuit stays open after a window trip, in seconds.
    #[serde(default = "default_open_secs")]
    pub open_secs: u64,
    /// Minimum open duration for a quota-exhaustion trip, in seconds.
    #[serde(default = "default_quota_floor_secs")]
    pub quota_floor_secs: u64,
    /// Open duration when a quota error carries no retry hint, in seconds.
    #[serde(default = "default_quota_default_secs")]
    pub quota_default_secs: u64,
    /// Jitter added to quota-trip durations, uniform in this range (seconds).
    #[serde(default = "default_quota_jitter_min_secs")]
    pub quota_jitter_min_secs: u64,
    #[serde(default = "default_quota_jitter_max_secs")]
    pub quota_jitter_max_secs: u64,
}

fn default_window_secs() -> u64 {
    180
}
fn default_rate_limit_threshold() -> usize {
    10
}
fn default_open_secs() -> u64 {
    300
}
fn default_quota_floor_secs() -> u64 {
    60
}
fn default_quota_default_secs() -> u64 {
    120
}
fn default_quota_jitter_min_secs() -> u64 {
    5
}
fn default_quota_jitter_max_secs() -> u64 {
    15
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            window_secs: default_window_secs(),
            rate_limit_threshold: default_rate_limit_threshold(),
            open_secs: default_open_secs(),
            quota_floor_secs: default_quota_floor_secs(),
            quota_default_secs: default_quota_default_secs(),
            quota_jitter_min_secs: default_quota_jitter_min_secs(),
            quota_jitter_max_secs: default_quota_jitter_max_secs(),
        }
    }
}

/// Retry loop tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Backoff base: attempt k sleeps `base * 2^(k-1)` plus jitter.
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    /// Uniform jitter added to each backoff, in `[0, jitter_cap_ms)`.
    #[serde(default = "default_jitter_cap_ms")]
    pub jitter_cap_ms: u64,
    /// Total attempts before the loop gives up (1 = no retry).
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

fn default_base_delay_ms() -> u64 {
    5000
}
fn default_jitter_cap_ms() -> u64 {
    1000
}
fn default_max_attempts() -> u32 {
    10
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            base_delay_ms: default_base_delay_ms(),
            jitter_cap_ms: default_jitter_cap_ms(),
            max_attempts: default_max_attempts(),
        }
    }
}

impl RetryConfig {
    /// A cheaper profile for latency-sensitive calls (fewer attempts).
    pub fn quick(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            ..Self::default()
        }
    }
}

/// An hour-of-day window, possibly wrapping midnight (`start > end`).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct HourWindow {
    pub start: u32,
    pub end: u32,
}

impl HourWindow {
    /// Whether `hour` falls inside this window. A wrapping window such as
    /// 23..6 contains 23, 0, and 5 but not 6.
    pub fn contains(&self, hour: u32) -> bool {
        if self.start <= self.end {
            hour >= self.start && hour < self.end
        } else {
            hour >= self.start || hour < self.end
        }
    }
}

/// Speaker selection tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectorConfig {
    /// Messages back that define the short cooldown exclusion.
    #[serde(default = "default_short_cooldown")]
    pub short_cooldown_messages: usize,
    /// Messages back that define the long cooldown exclusion.
    #[serde(default = "default_long_cooldown")]
    pub long_cooldown_messages: usize,
    /// Lookback for the overactive post-filter.
    #[serde(default = "default_overactive_lookback")]
    pub overactive_lookback: usize,
    /// Spoken-message count within the lookback that marks a persona overactive.
    #[serde(default = "default_overactive_threshold")]
    pub overactive_threshold: usize,
    /// Probability of the diversity floor (uniform pick, ignores exclusions).
    #[serde(default = "default_diversity_probability")]
    pub diversity_probability: f64,
    /// Probability of using the long-cooldown exclusion when it has candidates.
    #[serde(default = "default_long_cooldown_probability")]
    pub long_cooldown_probability: f64,
    /// Probability of using the short-cooldown exclusion when it has candidates.
    #[serde(default = "default_short_cooldown_probability")]
    pub short_cooldown_probability: f64,
    /// Off-hours boundaries differ on weekends.
    #[serde(default = "default_weekday_off_hours")]
    pub weekday_off_hours: HourWindow,
    #[serde(default = "default_weekend_off_hours")]
    pub weekend_off_hours: HourWindow,
    #[serde(default = "default_morning_hours")]
    pub morning_hours: HourWindow,
    #[serde(default = "default_late_hours")]
    pub late_hours: HourWindow,
    /// Probability of favoring creative/nocturnal personas during off-hours.
    #[serde(default = "default_off_hours_probability")]
    pub off_hours_probability: f64,
    /// Probability of favoring energetic personas in the morning window.
    #[serde(default = "default_morning_probability")]
    pub morning_probability: f64,
    /// Probability of favoring introspective personas in the late window.
    #[serde(default = "default_late_probability")]
    pub late_probability: f64,
}

fn default_short_cooldown() -> usize {
    2
}
fn default_long_cooldown() -> usize {
    5
}
fn default_overactive_lookback() -> usize {
    7
}
fn default_overactive_threshold() -> usize {
    2
}
fn default_diversity_probability() -> f64 {
    0.30
}
fn default_long_cooldown_probability() -> f64 {
    0.2
}
fn default_short_cooldown_probability() -> f64 {
    0.15
}
fn default_weekday_off_hours() -> HourWindow {
    HourWindow { start: 23, end: 6 }
}
fn default_weekend_off_hours() -> HourWindow {
    HourWindow { start: 0, end: 8 }
}
fn default_morning_hours() -> HourWindow {
    HourWindow { start: 6, end: 10 }
}
fn default_late_hours() -> HourWindow {
    HourWindow { start: 20, end: 23 }
}
fn default_off_hours_probability() -> f64 {
    0.7
}
fn default_morning_probability() -> f64 {
    0.6
}
fn default_late_probability() -> f64 {
    0.2
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            short_cooldown_messages: default_short_cooldown(),
            long_cooldown_messages: default_long_cooldown(),
            overactive_lookback: default_overactive_lookback(),
            overactive_threshold: default_overactive_threshold(),
            diversity_probability: default_diversity_probability(),
            long_cooldown_probability: default_long_cooldown_probability(),
            short_cooldown_probability: default_short_cooldown_probability(),
            weekday_off_hours: default_weekday_off_hours(),
            weekend_off_hours: default_weekend_off_hours(),
            morning_hours: default_morning_hours(),
            late_hours: default_late_hours(),
            off_hours_probability: default_off_hours_probability(),
            morning_probability: default_morning_probability(),
            late_probability: default_late_probability(),
        }
    }
}

/// Repetition/greeting detection tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepetitionConfig {
    /// Messages considered for phrase extraction.
    #[serde(default = "default_phrase_window")]
    pub phrase_window: usize,
    /// Phrases shorter than or equal to this many characters are ignored.
    #[serde(default = "default_min_phrase_chars")]
    pub min_phrase_chars: usize,
    /// A speaker's recent messages considered for greeting counting.
    #[serde(default = "default_greeting_lookback")]
    pub greeting_lookback: usize,
    /// Greetings within the lookback that count as spam.
    #[serde(default = "default_greeting_spam_threshold")]
    pub greeting_spam_threshold: usize,
    /// Stricter threshold used by re-engagement (follow-up) flows.
    #[serde(default = "default_followup_greeting_threshold")]
    pub followup_greeting_threshold: usize,
}

fn default_phrase_window() -> usize {
    10
}
fn default_min_phrase_chars() -> usize {
    3
}
fn default_greeting_lookback() -> usize {
    5
}
fn default_greeting_spam_threshold() -> usize {
    2
}
fn default_followup_greeting_threshold() -> usize {
    1
}

impl Default for RepetitionConfig {
    fn default() -> Self {
        Self {
            phrase_window: default_phrase_window(),
            min_phrase_chars: default_min_phrase_chars(),
            greeting_lookback: default_greeting_lookback(),
            greeting_spam_threshold: default_greeting_spam_threshold(),
            followup_greeting_threshold: default_followup_greeting_threshold(),
        }
    }
}

/// Greeting lexicon for one language: exact phrases, starter patterns, and
/// the short-message heuristic bound.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GreetingLexicon {
    /// Whole-message greetings after trimming punctuation ("good morning").
    pub phrases: Vec<String>,
    /// Regex patterns matched against the start of a message ("^hey\\b").
    pub starters: Vec<String>,
    /// Messages with at most this many words qualify for the phrase check
    /// even with trailing chatter ("hi all!!").
    #[serde(default = "default_short_message_words")]
    pub short_message_words: usize,
}

fn default_short_message_words() -> usize {
    3
}

/// Locale lexicons for greeting detection and sanitizer heuristics.
///
/// Data-driven by design: lookups key on `Language` and fall back to the
/// `Language::default()` entry, never to per-language code paths. The
/// shipped lists are heuristics, not invariants -- deployments override
/// them freely.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LexiconConfig {
    /// Greeting lexicons keyed by language.
    #[serde(default = "default_greetings")]
    pub greetings: BTreeMap<Language, GreetingLexicon>,
    /// Phrases whose presence marks an echoed system instruction.
    #[serde(default = "default_leak_phrases")]
    pub leak_phrases: Vec<String>,
    /// Default-language sentence starters; when the expected language is
    /// non-default and the reply opens with one of these, the reply is in
    /// the wrong language.
    #[serde(default = "default_wrong_language_starters")]
    pub wrong_language_starters: Vec<String>,
}

fn default_greetings() -> BTreeMap<Language, GreetingLexicon> {
    let mut map = BTreeMap::new();
    map.insert(
        Language::English,
        GreetingLexicon {
            phrases: [
                "hi", "hello", "hey", "yo", "good morning", "good evening", "good night",
                "what's up", "sup",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            starters: ["^hi\\b", "^hello\\b", "^hey\\b", "^good (morning|evening|night)\\b"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            short_message_words: default_short_message_words(),
        },
    );
    map.insert(
        Language::Spanish,
        GreetingLexicon {
            phrases: [
                "hola", "buenas", "buenos dias", "buenos días", "buenas tardes",
                "buenas noches", "que tal", "qué tal",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            starters: ["^hola\\b", "^buenas\\b", "^buenos\\b"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            short_message_words: default_short_message_words(),
        },
    );
    map
}

fn default_leak_phrases() -> Vec<String> {
    [
        "follow these instructions",
        "stay in character",
        "you are a chat persona",
        "system prompt",
        "as an ai language model",
        "do not reveal these rules",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_wrong_language_starters() -> Vec<String> {
    [
        "the", "i think", "i'm", "well", "okay", "sure", "here is", "here's", "sorry",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

impl Default for LexiconConfig {
    fn default() -> Self {
        Self {
            greetings: default_greetings(),
            leak_phrases: default_leak_phrases(),
            wrong_language_starters: default_wrong_language_starters(),
        }
    }
}

/// Sanitizer pipeline tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SanitizerConfig {
    /// Hard length cap in characters; text at or past this is cut.
    #[serde(default = "default_hard_cap")]
    pub hard_cap: usize,
    /// Soft cap: text above this is truncated with an ellipsis.
    #[serde(default = "default_soft_cap")]
    pub soft_cap: usize,
    /// Line count above which the repetition-ratio check applies.
    #[serde(default = "default_line_threshold")]
    pub repetition_line_threshold: usize,
    /// Minimum unique/total line ratio; below it the text is discarded.
    #[serde(default = "default_unique_ratio")]
    pub repetition_unique_ratio: f64,
}

fn default_hard_cap() -> usize {
    2000
}
fn default_soft_cap() -> usize {
    1900
}
fn default_line_threshold() -> usize {
    10
}
fn default_unique_ratio() -> f64 {
    0.5
}

impl Default for SanitizerConfig {
    fn default() -> Self {
        Self {
            hard_cap: default_hard_cap(),
            soft_cap: default_soft_cap(),
            repetition_line_threshold: default_line_threshold(),
            repetition_unique_ratio: default_unique_ratio(),
        }
    }
}

/// Umbrella configuration for the whole orchestration layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChorusConfig {
    /// Token budget passed to providers unless the caller overrides it.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Sampling temperature passed to providers, if any.
    #[serde(default)]
    pub temperature: Option<f64>,
    #[serde(default)]
    pub providers: Vec<ProviderConfig>,
    #[serde(default)]
    pub breaker: BreakerConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub selector: SelectorConfig,
    #[serde(default)]
    pub repetition: RepetitionConfig,
    #[serde(default)]
    pub sanitizer: SanitizerConfig,
    #[serde(default)]
    pub lexicon: LexiconConfig,
}

fn default_max_tokens() -> u32 {
    400
}

impl Default for ChorusConfig {
    fn default() -> Self {
        Self {
            max_tokens: default_max_tokens(),
            temperature: None,
            providers: Vec::new(),
            breaker: BreakerConfig::default(),
            retry: RetryConfig::default(),
            selector: SelectorConfig::default(),
            repetition: RepetitionConfig::default(),
            sanitizer: SanitizerConfig::default(),
            lexicon: LexiconConfig::default(),
        }
    }
}
