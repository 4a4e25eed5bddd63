//! # Telemetry Features
//!
//! Console logging is always on. OpenTelemetry export is opt-in.
//!
//! ## Feature matrix
//!
//! - `tracing`: Exports spans through an OpenTelemetry tracer provider.
//! - `metrics`: Records turn and ID counters through an OpenTelemetry meter
//!   provider.
//! - `stdout`: Prints exported spans and metrics to stdout.
//!
//! ## Span behavior
//!
//! - Every turn runs inside a `turn` span carrying its room ID
//! - Events inside a span become span events in the exporter
//! - Events outside of a span are only shown in log output (via
//!   `fmt::layer()`)
//!
//! ## Example usage
//!
//! ```bash
//! RUST_LOG=chatflake_chat=debug cargo run -p chatflake-chat --features tracing,metrics,stdout -- ids
//! ```

// Disallow using `stdout` without `tracing` or `metrics`
#[cfg(all(feature = "stdout", not(any(feature = "tracing", feature = "metrics"))))]
compile_error!(
    "The 'stdout' feature requires at least one of 'tracing' or 'metrics' to be enabled."
);

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

// Metrics-specific imports
#[cfg(feature = "metrics")]
use opentelemetry::metrics::{Counter, Histogram, Meter, UpDownCounter};
#[cfg(feature = "metrics")]
use opentelemetry_sdk::metrics as sdkmetrics;
#[cfg(feature = "metrics")]
use std::sync::OnceLock;

// Either
#[cfg(any(feature = "metrics", feature = "tracing"))]
use opentelemetry::{InstrumentationScope, KeyValue};
#[cfg(any(feature = "metrics", feature = "tracing"))]
use opentelemetry_sdk::Resource;
#[cfg(any(feature = "metrics", feature = "tracing"))]
use opentelemetry_semantic_conventions as semvcns;

// Tracing-specific imports
#[cfg(feature = "tracing")]
use opentelemetry::trace::TracerProvider;
#[cfg(feature = "tracing")]
use opentelemetry_sdk::propagation::TraceContextPropagator;
#[cfg(feature = "tracing")]
use opentelemetry_sdk::trace as sdktrace;

/// Exporter providers that must be flushed before the process exits.
pub struct TelemetryProviders {
    #[cfg(feature = "tracing")]
    pub tracer_provider: sdktrace::SdkTracerProvider,
    #[cfg(feature = "metrics")]
    pub meter_provider: sdkmetrics::SdkMeterProvider,
}

impl TelemetryProviders {
    /// Flushes and shuts down every provider, reporting failures on stderr.
    pub fn shutdown(self) {
        #[cfg(feature = "tracing")]
        {
            if let Err(err) = self.tracer_provider.force_flush() {
                eprintln!("Error flushing traces: {err:#?}");
            }
            if let Err(err) = self.tracer_provider.shutdown() {
                eprintln!("Error shutting down tracer: {err:#?}");
            }
        }

        #[cfg(feature = "metrics")]
        {
            if let Err(err) = self.meter_provider.force_flush() {
                eprintln!("Error flushing metrics: {err:#?}");
            }
            if let Err(err) = self.meter_provider.shutdown() {
                eprintln!("Error shutting down meter: {err:#?}");
            }
        }
    }
}

/// Installs the global subscriber. Logs go to stderr so stdout stays free for
/// command output.
///
/// # Errors
///
/// Returns an error if an exporter cannot be built.
pub fn init_telemetry() -> anyhow::Result<TelemetryProviders> {
    #[cfg(feature = "tracing")]
    opentelemetry::global::set_text_map_propagator(TraceContextPropagator::new());

    #[cfg(feature = "tracing")]
    let tracer_provider = init_tracer();

    #[cfg(feature = "metrics")]
    let meter_provider = init_metrics();

    #[cfg(any(feature = "metrics", feature = "tracing"))]
    let scope = InstrumentationScope::builder("chatflake")
        .with_version(env!("CARGO_PKG_VERSION"))
        .with_schema_url(semvcns::SCHEMA_URL)
        .build();

    let registry = tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_thread_ids(true)
                .with_line_number(true)
                .with_target(false)
                .with_timer(tracing_subscriber::fmt::time::ChronoLocal::rfc_3339())
                .with_file(true)
                .pretty(),
        );

    #[cfg(feature = "tracing")]
    let registry = {
        opentelemetry::global::set_tracer_provider(tracer_provider.clone());
        registry.with(
            tracing_opentelemetry::layer()
                .with_tracer(tracer_provider.tracer_with_scope(scope.clone()))
                .with_error_records_to_exceptions(true),
        )
    };

    #[cfg(feature = "metrics")]
    let registry = {
        opentelemetry::global::set_meter_provider(meter_provider.clone());
        let meter = opentelemetry::global::meter_with_scope(scope);
        init_metric_handles(meter);

        registry.with(tracing_opentelemetry::MetricsLayer::new(
            meter_provider.clone(),
        ))
    };

    registry.try_init()?;

    Ok(TelemetryProviders {
        #[cfg(feature = "tracing")]
        tracer_provider,
        #[cfg(feature = "metrics")]
        meter_provider,
    })
}

#[cfg(any(feature = "metrics", feature = "tracing"))]
fn resource() -> Resource {
    Resource::builder()
        .with_service_name("chatflake")
        .with_schema_url(
            [KeyValue::new(
                semvcns::resource::SERVICE_VERSION,
                env!("CARGO_PKG_VERSION"),
            )],
            semvcns::SCHEMA_URL,
        )
        .build()
}

#[cfg(feature = "metrics")]
fn init_metrics() -> sdkmetrics::SdkMeterProvider {
    let builder = sdkmetrics::SdkMeterProvider::builder().with_resource(resource());

    #[cfg(feature = "stdout")]
    let builder = {
        use opentelemetry_stdout::MetricExporter;
        let exporter = MetricExporter::default();
        let reader = opentelemetry_sdk::metrics::PeriodicReader::builder(exporter)
            .with_interval(std::time::Duration::from_secs(5))
            .build();

        builder.with_reader(reader)
    };

    builder.build()
}

#[cfg(feature = "tracing")]
fn init_tracer() -> sdktrace::SdkTracerProvider {
    let builder = sdktrace::SdkTracerProvider::builder().with_resource(resource());

    #[cfg(feature = "stdout")]
    let builder = {
        use opentelemetry_stdout::SpanExporter;
        let exporter = SpanExporter::default();
        let batch = sdktrace::BatchSpanProcessor::builder(exporter)
            .with_batch_config(
                sdktrace::BatchConfigBuilder::default()
                    .with_scheduled_delay(std::time::Duration::from_secs(5))
                    .with_max_queue_size(2048)
                    .build(),
            )
            .build();
        builder.with_span_processor(batch)
    };

    builder.build()
}

#[cfg(feature = "metrics")]
struct Metrics {
    turns: Counter<u64>,
    turns_inflight: UpDownCounter<i64>,
    turn_errors: Counter<u64>,
    turn_duration_ms: Histogram<f64>,
    ids_issued: Counter<u64>,
    fragments: Counter<u64>,
}

#[cfg(feature = "metrics")]
static METRICS: OnceLock<Metrics> = OnceLock::new();

#[cfg(feature = "metrics")]
fn init_metric_handles(meter: Meter) {
    let _ = METRICS.set(Metrics {
        turns: meter
            .u64_counter("turns")
            .with_description("Chat turns started")
            .build(),
        turns_inflight: meter
            .i64_up_down_counter("turns_inflight")
            .with_description("Chat turns currently streaming")
            .build(),
        turn_errors: meter
            .u64_counter("turn_errors")
            .with_description("Rejected, failed or cancelled chat turns")
            .build(),
        turn_duration_ms: meter
            .f64_histogram("turn_duration")
            .with_unit("ms")
            .with_description("End-to-end duration of successful turns")
            .build(),
        ids_issued: meter
            .u64_counter("ids_issued")
            .with_description("Chat IDs issued")
            .build(),
        fragments: meter
            .u64_counter("fragments")
            .with_description("Model fragments forwarded to clients")
            .build(),
    });
}

/// Runs `f` against the metric handles once they exist. Without the
/// `metrics` feature this and every helper below compile to nothing.
#[cfg(feature = "metrics")]
fn record(f: impl FnOnce(&Metrics)) {
    if let Some(metrics) = METRICS.get() {
        f(metrics);
    }
}

pub fn increment_turns() {
    #[cfg(feature = "metrics")]
    record(|m| m.turns.add(1, &[]));
}

pub fn increment_turns_inflight() {
    #[cfg(feature = "metrics")]
    record(|m| m.turns_inflight.add(1, &[]));
}

pub fn decrement_turns_inflight() {
    #[cfg(feature = "metrics")]
    record(|m| m.turns_inflight.add(-1, &[]));
}

pub fn increment_turn_errors() {
    #[cfg(feature = "metrics")]
    record(|m| m.turn_errors.add(1, &[]));
}

pub fn record_turn_duration(duration_ms: f64) {
    #[cfg(feature = "metrics")]
    record(|m| m.turn_duration_ms.record(duration_ms, &[]));
    #[cfg(not(feature = "metrics"))]
    let _ = duration_ms;
}

pub fn increment_ids_issued(count: u64) {
    #[cfg(feature = "metrics")]
    record(|m| m.ids_issued.add(count, &[]));
    #[cfg(not(feature = "metrics"))]
    let _ = count;
}

pub fn increment_fragments() {
    #[cfg(feature = "metrics")]
    record(|m| m.fragments.add(1, &[]));
}
