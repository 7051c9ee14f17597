//! Locally synthesized text for degraded and terminal situations.
//!
//! Three pools live here:
//! - degraded-mode lines, tagged by generation context, used when the
//!   circuit is open and no provider is called at all;
//! - terminal fallback lines, persona-flavored, substituted when every
//!   provider in the chain has failed on a user-triggered cycle;
//! - replacement lines, substituted when the sanitizer discards output.
//!
//! Pools are lookup tables keyed by language with English as the single
//! documented default -- no per-language code forks.

use rand::Rng;
use rand::seq::IndexedRandom;

use chorus_types::generation::GenerationContext;
use chorus_types::persona::{Language, Persona};

/// Degraded-mode text synthesized while the circuit is open.
///
/// Context-tagged so operator replies do not read like channel banter.
pub fn degraded_line(context: GenerationContext) -> &'static str {
    match context {
        GenerationContext::Activity => "*stares out the window, lost in thought*",
        GenerationContext::Reaction => "hm, give me a second to think about that one",
        GenerationContext::Operator => {
            "upstream generation is temporarily paused; try again shortly"
        }
        GenerationContext::PrivateMessage => {
            "sorry, I'm a bit scattered right now -- ping me again in a few minutes?"
        }
    }
}

/// Terminal fallback pool: every provider failed on a user-triggered cycle.
///
/// Each entry is (short variant, long variant); verbosity picks between
/// them.
const TERMINAL_POOLS: &[(Language, &[(&str, &str)])] = &[
    (
        Language::English,
        &[
            (
                "ugh, brain fog. ask me again?",
                "ugh, total brain fog over here. ask me again in a moment and I'll do better",
            ),
            (
                "lost my train of thought, sorry",
                "I completely lost my train of thought there, sorry about that -- one more try?",
            ),
            (
                "words are hard today",
                "words are really not cooperating with me today, let me gather myself",
            ),
        ],
    ),
    (
        Language::Spanish,
        &[
            (
                "uf, se me fue la idea",
                "uf, se me fue la idea por completo. preguntame de nuevo en un momento",
            ),
            (
                "perdon, me quede en blanco",
                "perdon, me quede totalmente en blanco -- dame un segundo y lo intento otra vez",
            ),
        ],
    ),
];

/// Sanitizer replacement pool: raw output was discarded.
const REPLACEMENT_POOLS: &[(Language, &[(&str, &str)])] = &[
    (
        Language::English,
        &[
            (
                "let me rephrase that...",
                "hold on, let me rephrase that -- it came out all wrong",
            ),
            (
                "scratch that thought",
                "actually, scratch that whole thought, it wasn't going anywhere good",
            ),
            (
                "never mind, where were we?",
                "never mind what I was about to say -- where were we?",
            ),
        ],
    ),
    (
        Language::Spanish,
        &[
            (
                "mejor lo digo de otra forma...",
                "espera, mejor lo digo de otra forma -- no me salio bien",
            ),
            (
                "olvida eso",
                "olvida eso que iba a decir, no tenia mucho sentido",
            ),
        ],
    ),
];

/// Emoji appended for emoji-heavy personas, cycled by the RNG.
const EMOJI: &[&str] = &["😅", "🙃", "✨", "😴", "🤔"];

fn pool_for(
    pools: &'static [(Language, &[(&'static str, &'static str)])],
    language: Language,
) -> &'static [(&'static str, &'static str)] {
    pools
        .iter()
        .find(|(lang, _)| *lang == language)
        .or_else(|| pools.iter().find(|(lang, _)| *lang == Language::default()))
        .map(|(_, pool)| *pool)
        .unwrap_or(&[])
}

fn flavored_line<R: Rng + ?Sized>(
    pools: &'static [(Language, &[(&'static str, &'static str)])],
    persona: &Persona,
    rng: &mut R,
) -> String {
    let pool = pool_for(pools, persona.primary_language);
    let (short, long) = match pool.choose(rng) {
        Some(entry) => *entry,
        None => ("...", "..."),
    };

    let mut line = if persona.style.terse() { short } else { long }.to_string();
    if persona.style.emoji_heavy()
        && let Some(emoji) = EMOJI.choose(rng)
    {
        line.push(' ');
        line.push_str(emoji);
    }
    line
}

/// Persona-flavored line for a terminal chain failure on a user-triggered
/// cycle. Autonomous cycles stay silent instead of using this.
pub fn terminal_line<R: Rng + ?Sized>(persona: &Persona, rng: &mut R) -> String {
    flavored_line(TERMINAL_POOLS, persona, rng)
}

/// Persona-flavored line substituted when the sanitizer discards output.
pub fn replacement_line<R: Rng + ?Sized>(persona: &Persona, rng: &mut R) -> String {
    flavored_line(REPLACEMENT_POOLS, persona, rng)
}
