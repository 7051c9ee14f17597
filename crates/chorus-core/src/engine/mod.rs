//! Generation cycle orchestration.
//!
//! One entry point, `GenerationEngine::run_cycle`, strings the layer
//! together: claim the channel's in-flight slot, pick a speaker, steer the
//! prompt away from recent repetition, generate through the fallback
//! chain, sanitize, and resolve extracted directives through the media
//! service. Failures degrade (template text or silence), they do not
//! propagate.

pub mod guard;

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use rand::SeedableRng;
use rand::rngs::StdRng;

use chorus_types::config::ChorusConfig;
use chorus_types::directive::{DirectiveKind, ResolvedMedia};
use chorus_types::generation::{
    GenerationContext, GenerationRequest, ProviderConfig, ProviderStatusInfo,
};
use chorus_types::message::{ChannelId, ChatMessage};
use chorus_types::persona::Persona;

use crate::llm::box_provider::BoxTextProvider;
use crate::llm::breaker::CircuitBreaker;
use crate::llm::fallback::FallbackChain;
use crate::media::MediaService;
use crate::sanitize::ResponseSanitizer;
use crate::speaker::repetition::RepetitionDetector;
use crate::speaker::selector::{SelectError, SpeakerSelector};
use crate::templates;

use guard::InFlightRegistry;

/// Engine construction / invocation failure.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("greeting lexicon failed to compile: {0}")]
    Lexicon(#[from] regex::Error),
    #[error(transparent)]
    Selection(#[from] SelectError),
}

/// One generation cycle's inputs. Storage stays with the transport; the
/// engine only borrows slices of it.
pub struct CycleRequest<'a> {
    pub channel: &'a ChannelId,
    /// Personas present in the channel.
    pub pool: &'a [Persona],
    /// Recent conversation, oldest first.
    pub window: &'a [ChatMessage],
    pub prompt: String,
    pub system: Option<String>,
    pub context: GenerationContext,
    pub now: DateTime<Utc>,
}

impl CycleRequest<'_> {
    /// Autonomous cycles stay silent on terminal failure; user-triggered
    /// ones substitute a persona-flavored line.
    fn is_autonomous(&self) -> bool {
        self.context == GenerationContext::Activity
    }
}

/// Raw media bytes produced by directive resolution, handed to the
/// transport alongside the text.
#[derive(Debug, Clone)]
pub struct Attachment {
    pub kind: DirectiveKind,
    pub bytes: Vec<u8>,
}

/// The outcome of a completed cycle.
#[derive(Debug, Clone)]
pub struct CycleReply {
    pub speaker: String,
    pub text: String,
    pub attachments: Vec<Attachment>,
}

/// Orchestrates speaker selection, generation, and sanitization.
pub struct GenerationEngine<M> {
    chain: FallbackChain,
    selector: SpeakerSelector,
    detector: RepetitionDetector,
    sanitizer: ResponseSanitizer,
    media: M,
    registry: InFlightRegistry,
    max_tokens: u32,
    temperature: Option<f64>,
    rng: StdRng,
}

impl<M: MediaService> GenerationEngine<M> {
    pub fn new(
        config: ChorusConfig,
        providers: Vec<(ProviderConfig, BoxTextProvider)>,
        media: M,
    ) -> Result<Self, EngineError> {
        let breaker = Arc::new(Mutex::new(CircuitBreaker::new(config.breaker)));
        Ok(Self {
            chain: FallbackChain::new(providers, breaker, config.retry),
            selector: SpeakerSelector::new(config.selector),
            detector: RepetitionDetector::new(config.repetition, &config.lexicon)?,
            sanitizer: ResponseSanitizer::new(config.sanitizer, &config.lexicon),
            media,
            registry: InFlightRegistry::new(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            rng: StdRng::from_os_rng(),
        })
    }

    /// Replace the engine's RNG (tests).
    pub fn with_rng(mut self, rng: StdRng) -> Self {
        self.rng = rng;
        self
    }

    /// Shared in-flight registry, for surfaces that want to probe or
    /// pre-claim channels.
    pub fn registry(&self) -> InFlightRegistry {
        self.registry.clone()
    }

    /// Shared handle to the process-wide breaker (operator overrides).
    pub fn breaker(&self) -> Arc<Mutex<CircuitBreaker>> {
        self.chain.breaker()
    }

    /// Provider/breaker snapshot for operational introspection.
    pub fn status(&self) -> Vec<ProviderStatusInfo> {
        self.chain.status()
    }

    /// Run one full generation cycle.
    ///
    /// `Ok(None)` means the cycle produced nothing on purpose: the channel
    /// already had a cycle in flight, or an autonomous cycle hit terminal
    /// provider exhaustion. Only caller errors (empty persona pool) reach
    /// the `Err` branch.
    pub async fn run_cycle(
        &mut self,
        request: CycleRequest<'_>,
    ) -> Result<Option<CycleReply>, EngineError> {
        let Some(_guard) = self.registry.try_acquire(request.channel) else {
            tracing::debug!(
                channel = %request.channel,
                "Generation already in flight, dropping request"
            );
            return Ok(None);
        };

        let pool: Vec<&Persona> = request.pool.iter().collect();
        let persona = self
            .selector
            .select(&pool, request.window, request.now, &mut self.rng)?;
        tracing::debug!(
            channel = %request.channel,
            persona = %persona.name,
            context = %request.context,
            "Speaker selected"
        );

        let system = self.steered_system(request.system.clone(), persona, request.window);
        let gen_request = GenerationRequest {
            prompt: request.prompt.clone(),
            system,
            context: request.context,
            language: persona.primary_language,
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        };

        let chain_result = match self.chain.generate(&gen_request).await {
            Ok(result) => result,
            Err(err) => {
                tracing::warn!(
                    channel = %request.channel,
                    persona = %persona.name,
                    error = %err,
                    "Generation failed terminally"
                );
                if request.is_autonomous() {
                    return Ok(None);
                }
                return Ok(Some(CycleReply {
                    speaker: persona.name.clone(),
                    text: templates::terminal_line(persona, &mut self.rng),
                    attachments: Vec::new(),
                }));
            }
        };

        // Degraded text is synthesized locally and needs no cleaning.
        if chain_result.is_degraded() {
            return Ok(Some(CycleReply {
                speaker: persona.name.clone(),
                text: chain_result.text,
                attachments: Vec::new(),
            }));
        }

        let outcome = self.sanitizer.sanitize(
            &chain_result.text,
            persona,
            persona.primary_language,
            &mut self.rng,
        );

        let mut text = outcome.text;
        let mut attachments = Vec::new();
        // Splice from the highest offset down so earlier offsets stay valid.
        for directive in outcome.directives.iter().rev() {
            match self.media.resolve(directive.kind, &directive.payload).await {
                Ok(Some(ResolvedMedia::Url(url))) => text.insert_str(directive.offset, &url),
                Ok(Some(ResolvedMedia::Buffer(bytes))) => attachments.push(Attachment {
                    kind: directive.kind,
                    bytes,
                }),
                // Unhandled kind or upstream failure: the tag is already
                // gone from the text, nothing else to do.
                Ok(None) => {}
                Err(err) => {
                    tracing::warn!(
                        kind = %directive.kind,
                        error = %err,
                        "Media resolution failed, dropping tag"
                    );
                }
            }
        }
        attachments.reverse();

        Ok(Some(CycleReply {
            speaker: persona.name.clone(),
            text,
            attachments,
        }))
    }

    /// Fold anti-repetition hints from the detector into the system prompt.
    fn steered_system(
        &self,
        base: Option<String>,
        persona: &Persona,
        window: &[ChatMessage],
    ) -> Option<String> {
        let mut system = base.unwrap_or_default();

        let phrases = self
            .detector
            .detect_phrases(window, persona.primary_language);
        if !phrases.is_empty() {
            if !system.is_empty() {
                system.push('\n');
            }
            system.push_str("Avoid reusing these recently overused phrases: ");
            system.push_str(&phrases.join(", "));
            system.push('.');
        }

        if self
            .detector
            .is_greeting_spam(window, &persona.name, persona.primary_language)
        {
            if !system.is_empty() {
                system.push('\n');
            }
            system.push_str("Do not open with a greeting; continue the conversation directly.");
        }

        if system.is_empty() { None } else { Some(system) }
    }
}
