//! Tracing setup: env filter, pretty or JSON output, optional OTLP export
//!
//! # Environment Variables
//!
//! - `RUST_LOG`: filter directives (default: `vivid=info`)
//! - `VIVID_LOG_FORMAT`: `pretty` (default) or `json`
//! - `OTEL_EXPORTER_OTLP_ENDPOINT`: OTLP endpoint (e.g., http://localhost:4317);
//!   only honoured when built with the `telemetry` feature
//! - `OTEL_SERVICE_NAME`: service name (default: vivid-queued)
//!
//! # Example
//!
//! ```text
//! OTEL_EXPORTER_OTLP_ENDPOINT=http://localhost:4317 \
//! VIVID_LOG_FORMAT=json \
//!     ./vivid-queued
//! ```

use anyhow::Result;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::config::LogFormat;

const DEFAULT_FILTER: &str = "vivid=info";

/// Flushes pending spans on drop
pub struct TelemetryGuard {
    #[cfg(feature = "telemetry")]
    provider: Option<opentelemetry_sdk::trace::TracerProvider>,
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        #[cfg(feature = "telemetry")]
        {
            if let Some(provider) = self.provider.take() {
                if let Err(e) = provider.shutdown() {
                    eprintln!("OpenTelemetry shutdown failed: {e}");
                }
            }
        }
    }
}

pub fn init_tracing(format: LogFormat) -> Result<TelemetryGuard> {
    let env_filter =
        EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(DEFAULT_FILTER))?;

    let fmt_layer = match format {
        // Production: JSON structured logging
        LogFormat::Json => fmt::layer().json().boxed(),
        // Development: pretty formatting with colors
        LogFormat::Pretty => fmt::layer().pretty().boxed(),
    };

    #[cfg(feature = "telemetry")]
    let (otel_layer, provider) = match otlp::build()? {
        Some((layer, provider)) => (Some(layer), Some(provider)),
        None => (None, None),
    };
    #[cfg(not(feature = "telemetry"))]
    let otel_layer: Option<tracing_subscriber::layer::Identity> = None;

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .with(otel_layer)
        .try_init()?;

    if std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT").is_ok() {
        if cfg!(feature = "telemetry") {
            tracing::info!("OpenTelemetry export enabled");
        } else {
            tracing::warn!("OpenTelemetry endpoint set but feature 'telemetry' not enabled");
            tracing::warn!("Rebuild with: cargo build --features telemetry");
        }
    }

    Ok(TelemetryGuard {
        #[cfg(feature = "telemetry")]
        provider,
    })
}

#[cfg(feature = "telemetry")]
mod otlp {
    use anyhow::Result;
    use opentelemetry::trace::TracerProvider as _;
    use opentelemetry::KeyValue;
    use opentelemetry_otlp::WithExportConfig;
    use opentelemetry_sdk::trace::{Tracer, TracerProvider};
    use opentelemetry_sdk::Resource;
    use tracing::Subscriber;
    use tracing_opentelemetry::OpenTelemetryLayer;
    use tracing_subscriber::registry::LookupSpan;

    /// OTLP layer, or None when no endpoint is configured
    pub fn build<S>() -> Result<Option<(OpenTelemetryLayer<S, Tracer>, TracerProvider)>>
    where
        S: Subscriber + for<'span> LookupSpan<'span>,
    {
        let Ok(endpoint) = std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT") else {
            return Ok(None);
        };
        let service_name =
            std::env::var("OTEL_SERVICE_NAME").unwrap_or_else(|_| "vivid-queued".to_string());

        let exporter = opentelemetry_otlp::SpanExporter::builder()
            .with_tonic()
            .with_endpoint(&endpoint)
            .build()?;
        let provider = TracerProvider::builder()
            .with_batch_exporter(exporter, opentelemetry_sdk::runtime::Tokio)
            .with_resource(Resource::new(vec![KeyValue::new(
                "service.name",
                service_name.clone(),
            )]))
            .build();

        let tracer = provider.tracer(service_name);
        opentelemetry::global::set_tracer_provider(provider.clone());

        Ok(Some((tracing_opentelemetry::layer().with_tracer(tracer), provider)))
    }
}
