//! Logging and OpenTelemetry pipeline initialisation for the reasoner.
//!
//! Call [`init_tracing`] once at process startup to wire up the `tracing`
//! subscriber with an optional OTLP span exporter.
//!
//! # Environment variables
//!
//! | Variable | Effect |
//! |---|---|
//! | `OTEL_EXPORTER_OTLP_ENDPOINT` | OTLP collector base URL (e.g. `http://localhost:4318`). When set the OTLP HTTP exporter is activated. |
//! | `RUST_LOG` | Log filter (default `"info"`). |
//! | `NARS_LOG_FORMAT=json` | Emit newline-delimited JSON logs. |
//!
//! # Example
//!
//! ```rust,no_run
//! // Hold the guard for the entire lifetime of the process.
//! let _guard = nars_runtime::telemetry::init_tracing("nars");
//! ```

use opentelemetry::trace::TracerProvider as _;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::{trace::SdkTracerProvider, Resource};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

// ─────────────────────────────────────────────────────────────────────────────
// Public API
// ─────────────────────────────────────────────────────────────────────────────

/// Install the process-wide `tracing` subscriber.
///
/// The subscriber is an [`EnvFilter`] followed by one formatting layer
/// (compact, or JSON when `NARS_LOG_FORMAT=json`) and, when
/// `OTEL_EXPORTER_OTLP_ENDPOINT` is set, an OpenTelemetry layer that exports
/// every span, the scheduler's per-tick span included.
///
/// Only the first call installs anything; later calls report the conflict
/// on stderr and return an empty guard.  Keep the returned
/// [`TracerProviderGuard`] alive until exit so pending spans are flushed.
pub fn init_tracing(service_name: &str) -> TracerProviderGuard {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let provider = build_provider(service_name);
    let otel_layer = provider
        .as_ref()
        .map(|p| tracing_opentelemetry::layer().with_tracer(p.tracer("nars")));

    let (json_layer, compact_layer) = if json_requested() {
        (Some(fmt::layer().json()), None)
    } else {
        (None, Some(fmt::layer().compact()))
    };

    let installed = tracing_subscriber::registry()
        .with(env_filter)
        .with(otel_layer)
        .with(json_layer)
        .with(compact_layer)
        .try_init();

    match installed {
        Ok(()) => TracerProviderGuard(provider),
        Err(e) => {
            eprintln!("[nars] tracing already initialised: {e}");
            if let Some(p) = provider {
                let _ = p.shutdown();
            }
            TracerProviderGuard(None)
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// RAII guard
// ─────────────────────────────────────────────────────────────────────────────

/// RAII guard that shuts down the OTel [`SdkTracerProvider`] on drop.
///
/// Dropping this guard calls [`SdkTracerProvider::shutdown`], flushing all
/// pending spans before the process exits.  Hold an instance of this type
/// in `main` for the entire program lifetime.
pub struct TracerProviderGuard(Option<SdkTracerProvider>);

impl Drop for TracerProviderGuard {
    fn drop(&mut self) {
        if let Some(provider) = self.0.take()
            && let Err(e) = provider.shutdown()
        {
            eprintln!("[nars] OpenTelemetry provider shutdown error: {e}");
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Internal helpers
// ─────────────────────────────────────────────────────────────────────────────

fn json_requested() -> bool {
    is_json_format(std::env::var("NARS_LOG_FORMAT").ok().as_deref())
}

fn is_json_format(value: Option<&str>) -> bool {
    value.is_some_and(|v| v.trim().eq_ignore_ascii_case("json"))
}

/// Build an [`SdkTracerProvider`] when `OTEL_EXPORTER_OTLP_ENDPOINT` is set.
///
/// Returns `None` when the env-var is absent or the exporter cannot be
/// initialised (the error is printed to stderr and the caller falls back to
/// plain tracing-subscriber output).
fn build_provider(service_name: &str) -> Option<SdkTracerProvider> {
    provider_for(std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT").ok(), service_name)
}

fn provider_for(endpoint: Option<String>, service_name: &str) -> Option<SdkTracerProvider> {
    let endpoint = endpoint?;

    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_http()
        .with_endpoint(endpoint)
        .build()
        .map_err(|e| eprintln!("[nars] OTLP exporter init failed: {e}"))
        .ok()?;

    let resource = Resource::builder()
        .with_service_name(service_name.to_string())
        .build();

    Some(
        SdkTracerProvider::builder()
            .with_resource(resource)
            // The CLI runs no Tokio runtime, so a batch exporter (which spawns
            // tasks) cannot be used here.
            .with_simple_exporter(exporter)
            .build(),
    )
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    /// Without an endpoint no exporter is built.
    #[test]
    fn no_endpoint_means_no_exporter() {
        assert!(
            provider_for(None, "test-service").is_none(),
            "exporter built without OTEL_EXPORTER_OTLP_ENDPOINT"
        );
    }

    /// Dropping a guard that holds no provider must not panic.
    #[test]
    fn tracer_provider_guard_drop_with_none_is_safe() {
        let guard = TracerProviderGuard(None);
        drop(guard);
    }

    /// JSON output needs an explicit `json`; anything else stays compact.
    #[test]
    fn json_format_is_opt_in() {
        assert!(!is_json_format(None));
        assert!(!is_json_format(Some("compact")));
        assert!(!is_json_format(Some("")));
        assert!(is_json_format(Some("json")));
        assert!(is_json_format(Some(" JSON ")));
    }
}
