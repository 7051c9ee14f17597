//! Tracing subscriber initialization for Chorus embedders.
//!
//! The orchestration core logs through `tracing` events (breaker trips,
//! chain failover, sanitizer discards); provider implementations add spans
//! using the [`crate::genai_attrs`] names. This module wires both to a
//! structured `fmt` output and, optionally, an OpenTelemetry exporter.
//!
//! ```no_run
//! // Structured logging only
//! chorus_observe::tracing_setup::init_tracing(false).unwrap();
//!
//! // With OpenTelemetry span export to stdout (local development; swap
//! // the exporter for OTLP in production)
//! chorus_observe::tracing_setup::init_tracing(true).unwrap();
//! ```

use opentelemetry::trace::TracerProvider as _;
use opentelemetry_sdk::trace::SdkTracerProvider;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use std::sync::OnceLock;

/// Kept so the exporter can be flushed and shut down on process exit.
static TRACER_PROVIDER: OnceLock<SdkTracerProvider> = OnceLock::new();

/// Filter applied when `RUST_LOG` is not set: the chorus crates at debug
/// (failover and selection decisions are debug-level), everything else at
/// info.
const DEFAULT_DIRECTIVES: &str = "info,chorus_core=debug";

/// Initialize the global tracing subscriber.
///
/// Installs a compact structured `fmt` layer; when `enable_otel` is true,
/// additionally bridges spans to OpenTelemetry through a stdout exporter.
/// `RUST_LOG` overrides the default filter.
///
/// # Errors
///
/// Returns an error if a global subscriber is already installed.
pub fn init_tracing(enable_otel: bool) -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVES));

    let fmt_layer = tracing_subscriber::fmt::layer().with_target(true).compact();

    let registry = tracing_subscriber::registry().with(filter).with(fmt_layer);

    if enable_otel {
        let provider = SdkTracerProvider::builder()
            .with_simple_exporter(opentelemetry_stdout::SpanExporter::default())
            .build();
        let tracer = provider.tracer("chorus");

        let _ = TRACER_PROVIDER.set(provider.clone());
        opentelemetry::global::set_tracer_provider(provider);

        registry
            .with(tracing_opentelemetry::layer().with_tracer(tracer))
            .try_init()?;
    } else {
        registry.try_init()?;
    }

    Ok(())
}

/// Flush pending spans and shut down the OpenTelemetry tracer provider.
///
/// No-op when OTel was never enabled. Call before process exit so buffered
/// spans are not lost.
pub fn shutdown_tracing() {
    if let Some(provider) = TRACER_PROVIDER.get()
        && let Err(e) = provider.shutdown()
    {
        eprintln!("otel tracer provider shutdown failed: {e}");
    }
}
