//! Logging and OpenTelemetry export for the lbc processes
//!
//! Log lines go to stdout as JSON (or plain text for local runs). When an
//! OTLP endpoint is configured, spans and the `lbc_*` counters are exported
//! as well, tagged with the pod identity from the downward API.

use std::fmt;
use std::str::FromStr;

use opentelemetry::trace::TracerProvider as _;
use opentelemetry::{global, KeyValue};
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::metrics::{PeriodicReader, SdkMeterProvider};
use opentelemetry_sdk::propagation::TraceContextPropagator;
use opentelemetry_sdk::trace::TracerProvider;
use opentelemetry_sdk::{runtime, Resource};
use opentelemetry_semantic_conventions::resource::{SERVICE_NAME, SERVICE_VERSION};
use thiserror::Error;
use tracing::warn;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Default log filter when neither an explicit filter nor `RUST_LOG` is set
pub const DEFAULT_LOG_FILTER: &str = "info,lbc=debug,kube=info,tower=warn,hyper=warn";

/// Downward API variables copied onto the exported resource
const POD_ATTRIBUTES: [(&str, &str); 3] = [
    ("POD_NAME", "k8s.pod.name"),
    ("POD_NAMESPACE", "k8s.namespace.name"),
    ("NODE_NAME", "k8s.node.name"),
];

/// Errors that can occur during telemetry initialization
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// The log filter directive does not parse
    #[error("invalid log filter {filter:?}: {message}")]
    Filter {
        /// Directive that was rejected
        filter: String,
        /// Parser message
        message: String,
    },

    /// An OTLP exporter could not be built
    #[error("failed to initialize {signal} exporter: {message}")]
    Exporter {
        /// "traces" or "metrics"
        signal: &'static str,
        /// Exporter message
        message: String,
    },

    /// A global subscriber is already installed
    #[error("failed to initialize tracing subscriber: {0}")]
    SubscriberInit(String),
}

/// Log line encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// One JSON object per line, with the current span
    #[default]
    Json,
    /// Human-readable lines
    Text,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "text" => Ok(Self::Text),
            other => Err(format!("unknown log format {other:?}, expected json or text")),
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Json => "json",
            Self::Text => "text",
        })
    }
}

/// Configuration for telemetry initialization
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Service name for traces and metrics (e.g., "lbc-operator")
    pub service_name: String,

    /// OTLP gRPC endpoint; spans and metrics stay local when unset
    pub otlp_endpoint: Option<String>,

    /// Log line encoding
    pub log_format: LogFormat,

    /// Filter directive taking precedence over `RUST_LOG`
    pub log_filter: Option<String>,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: "lbc".to_string(),
            otlp_endpoint: std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT").ok(),
            log_format: LogFormat::default(),
            log_filter: None,
        }
    }
}

/// Exporter handles kept alive for the life of the process
///
/// Call [`TelemetryGuard::shutdown`] before exiting so batched spans and the
/// last metric interval are flushed.
#[must_use = "dropping the guard skips the final flush"]
#[derive(Debug, Default)]
pub struct TelemetryGuard {
    tracer_provider: Option<TracerProvider>,
    meter_provider: Option<SdkMeterProvider>,
}

impl TelemetryGuard {
    /// Whether OTLP export is active
    pub fn is_exporting(&self) -> bool {
        self.tracer_provider.is_some()
    }

    /// Flush and stop the exporters
    pub fn shutdown(self) {
        if let Some(provider) = self.tracer_provider {
            if let Err(e) = provider.shutdown() {
                warn!(error = %e, "Failed to flush trace exporter");
            }
        }
        if let Some(provider) = self.meter_provider {
            if let Err(e) = provider.shutdown() {
                warn!(error = %e, "Failed to flush metrics exporter");
            }
        }
    }
}

/// Install the global subscriber and, when configured, the OTLP exporters
///
/// ```ignore
/// use lbc_common::telemetry::{init_telemetry, TelemetryConfig};
///
/// let telemetry = init_telemetry(TelemetryConfig {
///     service_name: "lbc-operator".to_string(),
///     ..Default::default()
/// })?;
/// // ... run ...
/// telemetry.shutdown();
/// ```
pub fn init_telemetry(config: TelemetryConfig) -> Result<TelemetryGuard, TelemetryError> {
    let env_filter = log_filter(config.log_filter.as_deref())?;

    global::set_text_map_propagator(TraceContextPropagator::new());

    let guard = match &config.otlp_endpoint {
        Some(endpoint) => init_otlp(endpoint, build_resource(&config.service_name))?,
        None => TelemetryGuard::default(),
    };
    let otel_layer = guard.tracer_provider.as_ref().map(|provider| {
        tracing_opentelemetry::layer().with_tracer(provider.tracer(config.service_name.clone()))
    });

    let (json_layer, text_layer) = match config.log_format {
        LogFormat::Json => (
            Some(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(false)
                    .with_target(true),
            ),
            None,
        ),
        LogFormat::Text => (None, Some(tracing_subscriber::fmt::layer().with_target(true))),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json_layer)
        .with(text_layer)
        .with(otel_layer)
        .try_init()
        .map_err(|e| TelemetryError::SubscriberInit(e.to_string()))?;

    Ok(guard)
}

/// Resolve the effective filter: explicit directive, then `RUST_LOG`, then the default
pub fn log_filter(explicit: Option<&str>) -> Result<EnvFilter, TelemetryError> {
    match explicit {
        Some(filter) => EnvFilter::try_new(filter).map_err(|e| TelemetryError::Filter {
            filter: filter.to_string(),
            message: e.to_string(),
        }),
        None => Ok(EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER))),
    }
}

fn build_resource(service_name: &str) -> Resource {
    let mut attributes = vec![
        KeyValue::new(SERVICE_NAME, service_name.to_string()),
        KeyValue::new(SERVICE_VERSION, env!("CARGO_PKG_VERSION")),
    ];
    attributes.extend(
        POD_ATTRIBUTES
            .iter()
            .filter_map(|(env, key)| std::env::var(env).ok().map(|v| KeyValue::new(*key, v))),
    );
    Resource::new(attributes)
}

/// Build the span and metric exporters against one collector and register them globally
fn init_otlp(endpoint: &str, resource: Resource) -> Result<TelemetryGuard, TelemetryError> {
    let span_exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(endpoint)
        .build()
        .map_err(|e| TelemetryError::Exporter {
            signal: "traces",
            message: e.to_string(),
        })?;
    let metric_exporter = opentelemetry_otlp::MetricExporter::builder()
        .with_tonic()
        .with_endpoint(endpoint)
        .build()
        .map_err(|e| TelemetryError::Exporter {
            signal: "metrics",
            message: e.to_string(),
        })?;

    let tracer_provider = TracerProvider::builder()
        .with_batch_exporter(span_exporter, runtime::Tokio)
        .with_resource(resource.clone())
        .build();
    let meter_provider = SdkMeterProvider::builder()
        .with_reader(PeriodicReader::builder(metric_exporter, runtime::Tokio).build())
        .with_resource(resource)
        .build();

    global::set_tracer_provider(tracer_provider.clone());
    global::set_meter_provider(meter_provider.clone());

    Ok(TelemetryGuard {
        tracer_provider: Some(tracer_provider),
        meter_provider: Some(meter_provider),
    })
}
