//! Next-speaker selection.
//!
//! Chooses which persona answers, layering a language filter, cooldown
//! exclusions, time-of-day trait weighting, a diversity floor, and an
//! overactivity post-filter. Every probabilistic branch draws from an
//! injectable RNG so the whole decision is reproducible under a seed.

use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::{DateTime, Datelike, Timelike, Utc, Weekday};
use rand::Rng;
use rand::seq::IndexedRandom;

use chorus_types::config::SelectorConfig;
use chorus_types::message::ChatMessage;
use chorus_types::persona::{Language, Persona, PersonaTrait};

use super::weighted::WeightedPool;

/// Selection failure. The only variant is a caller error; valid non-empty
/// pools always produce a speaker.
#[derive(Debug, thiserror::Error)]
pub enum SelectError {
    #[error("candidate pool is empty")]
    EmptyPool,
}

/// Coarse phase of day driving trait weighting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DayPhase {
    OffHours,
    Morning,
    Late,
    Regular,
}

/// Chooses which persona speaks next.
pub struct SpeakerSelector {
    config: SelectorConfig,
}

impl SpeakerSelector {
    pub fn new(config: SelectorConfig) -> Self {
        Self { config }
    }

    /// Select a speaker from the candidate pool.
    ///
    /// Always returns a member of `pool` for non-empty input; every
    /// narrowing step falls back rather than failing. An empty input pool
    /// is a caller error.
    pub fn select<'a, R: Rng + ?Sized>(
        &self,
        pool: &[&'a Persona],
        window: &[ChatMessage],
        now: DateTime<Utc>,
        rng: &mut R,
    ) -> Result<&'a Persona, SelectError> {
        if pool.is_empty() {
            return Err(SelectError::EmptyPool);
        }

        // 1. Language filter, falling back to the unfiltered pool.
        let dominant = Self::dominant_language(pool);
        let language_pool: Vec<&Persona> = {
            let filtered: Vec<&Persona> = pool
                .iter()
                .copied()
                .filter(|p| p.speaks(dominant))
                .collect();
            if filtered.is_empty() {
                pool.to_vec()
            } else {
                filtered
            }
        };

        // 2. Exclusion sets from the conversation window.
        let short_set = Self::recent_speakers(window, self.config.short_cooldown_messages);
        let long_set = Self::recent_speakers(window, self.config.long_cooldown_messages);
        let last_set = Self::recent_speakers(window, 1);

        // 3/4. Probabilistic layering over the language pool.
        let chosen = self.layered_pool(&language_pool, &short_set, &long_set, &last_set, now, rng);

        // 5. Overactivity post-filter, ignored when it would empty the pool.
        let final_pool = self.without_overactive(chosen, window);

        // 6. Uniform sample.
        final_pool
            .choose(rng)
            .copied()
            .ok_or(SelectError::EmptyPool)
    }

    /// Majority vote over candidate primary languages. Ties break toward
    /// the lexicographically smallest language code (deterministic).
    fn dominant_language(pool: &[&Persona]) -> Language {
        let mut votes: BTreeMap<&'static str, (usize, Language)> = BTreeMap::new();
        for persona in pool {
            let lang = persona.primary_language;
            let entry = votes.entry(lang.code()).or_insert((0, lang));
            entry.0 += 1;
        }
        votes
            .into_iter()
            .max_by(|(code_a, (count_a, _)), (code_b, (count_b, _))| {
                // BTreeMap iterates codes ascending; max_by keeps the first
                // of equals only if strictly greater, so compare code
                // descending as the tiebreak to land on the smallest.
                count_a.cmp(count_b).then_with(|| code_b.cmp(code_a))
            })
            .map(|(_, (_, lang))| lang)
            .unwrap_or_default()
    }

    /// Display names of whoever spoke in the last `n` conversational
    /// messages.
    fn recent_speakers<'w>(window: &'w [ChatMessage], n: usize) -> HashSet<&'w str> {
        window
            .iter()
            .rev()
            .filter(|m| m.kind.is_conversational())
            .take(n)
            .map(|m| m.speaker.as_str())
            .collect()
    }

    fn layered_pool<'a, R: Rng + ?Sized>(
        &self,
        language_pool: &[&'a Persona],
        short_set: &HashSet<&str>,
        long_set: &HashSet<&str>,
        last_set: &HashSet<&str>,
        now: DateTime<Utc>,
        rng: &mut R,
    ) -> Vec<&'a Persona> {
        // Diversity floor: ignore every exclusion some of the time so
        // quiet personas still surface.
        if rng.random_bool(self.config.diversity_probability) {
            return language_pool.to_vec();
        }

        let minus = |set: &HashSet<&str>| -> Vec<&'a Persona> {
            language_pool
                .iter()
                .copied()
                .filter(|p| !set.contains(p.name.as_str()))
                .collect()
        };

        let long_pool = minus(long_set);
        if !long_pool.is_empty() && rng.random_bool(self.config.long_cooldown_probability) {
            return long_pool;
        }

        let short_pool = minus(short_set);
        if !short_pool.is_empty() && rng.random_bool(self.config.short_cooldown_probability) {
            return short_pool;
        }

        let not_last = minus(last_set);
        if !not_last.is_empty() {
            return not_last;
        }

        self.time_weighted_pool(language_pool, now, rng)
    }

    /// Favor trait-tagged personas depending on the phase of day.
    fn time_weighted_pool<'a, R: Rng + ?Sized>(
        &self,
        language_pool: &[&'a Persona],
        now: DateTime<Utc>,
        rng: &mut R,
    ) -> Vec<&'a Persona> {
        let (traits, probability): (&[PersonaTrait], f64) = match self.day_phase(now) {
            DayPhase::OffHours => (
                &[PersonaTrait::Creative, PersonaTrait::Nocturnal],
                self.config.off_hours_probability,
            ),
            DayPhase::Morning => (&[PersonaTrait::Energetic], self.config.morning_probability),
            DayPhase::Late => (
                &[PersonaTrait::Introspective],
                self.config.late_probability,
            ),
            DayPhase::Regular => return language_pool.to_vec(),
        };

        let favored: Vec<&Persona> = language_pool
            .iter()
            .copied()
            .filter(|p| traits.iter().any(|t| p.has_trait(*t)))
            .collect();
        if favored.is_empty() {
            return language_pool.to_vec();
        }

        let pools: WeightedPool<Vec<&Persona>> = [
            (favored, probability),
            (language_pool.to_vec(), 1.0 - probability),
        ]
        .into_iter()
        .collect();
        match pools.choose(rng) {
            Some(pool) => pool.clone(),
            None => language_pool.to_vec(),
        }
    }

    fn day_phase(&self, now: DateTime<Utc>) -> DayPhase {
        let hour = now.hour();
        let weekend = matches!(now.weekday(), Weekday::Sat | Weekday::Sun);
        let off_hours = if weekend {
            self.config.weekend_off_hours
        } else {
            self.config.weekday_off_hours
        };

        if off_hours.contains(hour) {
            DayPhase::OffHours
        } else if self.config.morning_hours.contains(hour) {
            DayPhase::Morning
        } else if self.config.late_hours.contains(hour) {
            DayPhase::Late
        } else {
            DayPhase::Regular
        }
    }

    /// Drop personas who spoke at least `overactive_threshold` times in the
    /// last `overactive_lookback` conversational messages, unless that
    /// would empty the pool.
    fn without_overactive<'a>(
        &self,
        pool: Vec<&'a Persona>,
        window: &[ChatMessage],
    ) -> Vec<&'a Persona> {
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for message in window
            .iter()
            .rev()
            .filter(|m| m.kind.is_conversational())
            .take(self.config.overactive_lookback)
        {
            *counts.entry(message.speaker.as_str()).or_insert(0) += 1;
        }

        let filtered: Vec<&Persona> = pool
            .iter()
            .copied()
            .filter(|p| {
                counts
                    .get(p.name.as_str())
                    .is_none_or(|c| *c < self.config.overactive_threshold)
            })
            .collect();

        if filtered.is_empty() { pool } else { filtered }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chorus_types::persona::{PersonaId, SpeechStyle};
    use chrono::TimeZone;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn persona(name: &str, language: Language, traits: Vec<PersonaTrait>) -> Persona {
        Persona {
            id: PersonaId::new(),
            name: name.to_string(),
            primary_language: language,
            secondary_languages: vec![],
            style: SpeechStyle::default(),
            traits,
            created_at: Utc::now(),
        }
    }

    fn msg(speaker: &str, text: &str) -> ChatMessage {
        ChatMessage::chat(speaker, text)
    }

    /// A Wednesday at 14:00 UTC -- regular hours.
    fn midweek_afternoon() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 11, 14, 0, 0).unwrap()
    }

    fn selector() -> SpeakerSelector {
        SpeakerSelector::new(SelectorConfig::default())
    }

    #[test]
    fn test_empty_pool_is_caller_error() {
        let mut rng = StdRng::seed_from_u64(1);
        let result = selector().select(&[], &[], midweek_afternoon(), &mut rng);
        assert!(matches!(result, Err(SelectError::EmptyPool)));
    }

    #[test]
    fn test_always_returns_pool_member() {
        let personas = vec![
            persona("A", Language::English, vec![]),
            persona("B", Language::English, vec![PersonaTrait::Energetic]),
            persona("C", Language::Spanish, vec![PersonaTrait::Nocturnal]),
        ];
        let pool: Vec<&Persona> = personas.iter().collect();
        let window = vec![msg("A", "hello there"), msg("B", "how is everyone")];

        let s = selector();
        for seed in 0..200 {
            let mut rng = StdRng::seed_from_u64(seed);
            // Sweep hours to cover every day phase branch.
            let now = Utc
                .with_ymd_and_hms(2025, 6, 11, (seed % 24) as u32, 0, 0)
                .unwrap();
            let picked = s.select(&pool, &window, now, &mut rng).unwrap();
            assert!(personas.iter().any(|p| p.name == picked.name));
        }
    }

    #[test]
    fn test_single_candidate_always_wins() {
        let personas = vec![persona("Solo", Language::English, vec![])];
        let pool: Vec<&Persona> = personas.iter().collect();
        // Solo spoke last and is overactive; filters must all yield.
        let window = vec![
            msg("Solo", "first"),
            msg("Solo", "second"),
            msg("Solo", "third"),
        ];

        let s = selector();
        for seed in 0..50 {
            let mut rng = StdRng::seed_from_u64(seed);
            let picked = s
                .select(&pool, &window, midweek_afternoon(), &mut rng)
                .unwrap();
            assert_eq!(picked.name, "Solo");
        }
    }

    #[test]
    fn test_dominant_language_majority() {
        let personas = vec![
            persona("A", Language::Spanish, vec![]),
            persona("B", Language::Spanish, vec![]),
            persona("C", Language::English, vec![]),
        ];
        let pool: Vec<&Persona> = personas.iter().collect();
        assert_eq!(SpeakerSelector::dominant_language(&pool), Language::Spanish);
    }

    #[test]
    fn test_dominant_language_tie_breaks_to_smallest_code() {
        let personas = vec![
            persona("A", Language::Spanish, vec![]),
            persona("B", Language::German, vec![]),
        ];
        let pool: Vec<&Persona> = personas.iter().collect();
        // "de" < "es".
        assert_eq!(SpeakerSelector::dominant_language(&pool), Language::German);
    }

    #[test]
    fn test_language_filter_prefers_dominant_speakers() {
        let personas = vec![
            persona("Es1", Language::Spanish, vec![]),
            persona("Es2", Language::Spanish, vec![]),
            persona("En", Language::English, vec![]),
        ];
        let pool: Vec<&Persona> = personas.iter().collect();

        let s = selector();
        let mut en_picked = 0;
        for seed in 0..300 {
            let mut rng = StdRng::seed_from_u64(seed);
            let picked = s.select(&pool, &[], midweek_afternoon(), &mut rng).unwrap();
            if picked.name == "En" {
                en_picked += 1;
            }
        }
        // The English persona does not speak the dominant language and is
        // filtered out of every branch.
        assert_eq!(en_picked, 0);
    }

    #[test]
    fn test_overactive_speaker_excluded() {
        let personas = vec![
            persona("A", Language::English, vec![]),
            persona("B", Language::English, vec![]),
            persona("C", Language::English, vec![]),
        ];
        let pool: Vec<&Persona> = personas.iter().collect();
        // A spoke 3 times within the last 7 messages.
        let window = vec![
            msg("A", "one"),
            msg("B", "two"),
            msg("A", "three"),
            msg("C", "four"),
            msg("A", "five"),
        ];

        let s = selector();
        let mut a_picked = 0;
        for seed in 0..300 {
            let mut rng = StdRng::seed_from_u64(seed);
            let picked = s.select(&pool, &window, midweek_afternoon(), &mut rng).unwrap();
            if picked.name == "A" {
                a_picked += 1;
            }
        }
        assert_eq!(a_picked, 0);
    }

    #[test]
    fn test_overactive_filter_ignored_when_it_empties_pool() {
        let personas = vec![
            persona("A", Language::English, vec![]),
            persona("B", Language::English, vec![]),
        ];
        let pool: Vec<&Persona> = personas.iter().collect();
        let window = vec![
            msg("A", "one"),
            msg("B", "two"),
            msg("A", "three"),
            msg("B", "four"),
            msg("A", "five"),
            msg("B", "six"),
        ];

        let s = selector();
        let mut rng = StdRng::seed_from_u64(11);
        // Both are overactive; the filter must be ignored, not fail.
        let picked = s.select(&pool, &window, midweek_afternoon(), &mut rng).unwrap();
        assert!(picked.name == "A" || picked.name == "B");
    }

    #[test]
    fn test_day_phase_boundaries() {
        let s = selector();
        // Wednesday 02:00 is weekday off-hours; Saturday 07:00 is weekend
        // off-hours but a weekday morning.
        let wed_night = Utc.with_ymd_and_hms(2025, 6, 11, 2, 0, 0).unwrap();
        let sat_early = Utc.with_ymd_and_hms(2025, 6, 14, 7, 0, 0).unwrap();
        let wed_early = Utc.with_ymd_and_hms(2025, 6, 11, 7, 0, 0).unwrap();
        let wed_late = Utc.with_ymd_and_hms(2025, 6, 11, 21, 0, 0).unwrap();

        assert_eq!(s.day_phase(wed_night), DayPhase::OffHours);
        assert_eq!(s.day_phase(sat_early), DayPhase::OffHours);
        assert_eq!(s.day_phase(wed_early), DayPhase::Morning);
        assert_eq!(s.day_phase(wed_late), DayPhase::Late);
        assert_eq!(s.day_phase(midweek_afternoon()), DayPhase::Regular);
    }

    #[test]
    fn test_off_hours_favors_nocturnal_traits() {
        let personas = vec![
            persona("Owl", Language::English, vec![PersonaTrait::Nocturnal]),
            persona("Lark", Language::English, vec![PersonaTrait::Energetic]),
        ];
        let pool: Vec<&Persona> = personas.iter().collect();
        let night = Utc.with_ymd_and_hms(2025, 6, 11, 2, 0, 0).unwrap();

        let s = selector();
        let mut favored = 0;
        let total = 2000;
        for seed in 0..total {
            let mut rng = StdRng::seed_from_u64(seed);
            let sub_pool = s.time_weighted_pool(&pool, night, &mut rng);
            if sub_pool.len() == 1 && sub_pool[0].name == "Owl" {
                favored += 1;
            }
        }
        // The trait sub-pool wins with probability 0.7.
        assert!(
            (1300..=1500).contains(&favored),
            "favored pool drawn {favored}/{total}"
        );
    }

    #[test]
    fn test_regular_hours_use_full_pool() {
        let personas = vec![
            persona("Owl", Language::English, vec![PersonaTrait::Nocturnal]),
            persona("Lark", Language::English, vec![PersonaTrait::Energetic]),
        ];
        let pool: Vec<&Persona> = personas.iter().collect();
        let s = selector();
        let mut rng = StdRng::seed_from_u64(9);
        let sub_pool = s.time_weighted_pool(&pool, midweek_afternoon(), &mut rng);
        assert_eq!(sub_pool.len(), 2);
    }

    #[test]
    fn test_last_speaker_avoided_outside_diversity_floor() {
        let personas = vec![
            persona("A", Language::English, vec![]),
            persona("B", Language::English, vec![]),
        ];
        let pool: Vec<&Persona> = personas.iter().collect();
        let window = vec![msg("A", "I spoke last")];

        let s = selector();
        let mut a_picked = 0;
        let total = 2000;
        for seed in 0..total {
            let mut rng = StdRng::seed_from_u64(seed);
            if s.select(&pool, &window, midweek_afternoon(), &mut rng).unwrap().name == "A" {
                a_picked += 1;
            }
        }
        // A can only win through the diversity floor (30% * uniform 50%)
        // or cooldown branches that happen to include it; B dominates.
        assert!(
            a_picked < total * 35 / 100,
            "last speaker picked {a_picked}/{total}"
        );
    }
}
