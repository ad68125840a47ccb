//! Metrics and tracing instrumentation.
//!
//! `METRICS` (feature `metrics`) exports Prometheus counters and histograms
//! through OpenTelemetry. `tracing_helpers` (feature `tracing`) builds the
//! spans entered around relation queries.

#[cfg(feature = "metrics")]
pub use self::prometheus_metrics::*;

#[cfg(feature = "metrics")]
mod prometheus_metrics {
    use once_cell::sync::Lazy;
    use opentelemetry::metrics::{Counter, Histogram, MeterProvider};
    use opentelemetry_sdk::metrics::SdkMeterProvider;
    use prometheus::{Encoder, Registry, TextEncoder};

    pub static METRICS: Lazy<RelationMetrics> = Lazy::new(RelationMetrics::init);

    pub struct RelationMetrics {
        pub registry: Registry,
        provider: SdkMeterProvider,
        pub queries_total: Counter<u64>,
        pub query_errors_total: Counter<u64>,
        pub query_duration: Histogram<f64>,
        pub eager_batch_size: Histogram<u64>,
    }

    impl RelationMetrics {
        pub fn init() -> Self {
            let registry = Registry::new();
            let exporter = opentelemetry_prometheus::exporter()
                .with_registry(registry.clone())
                .build()
                .expect("failed to build prometheus exporter");
            let provider = SdkMeterProvider::builder()
                .with_reader(exporter)
                .build();
            let meter = provider.meter("belongs_to_through");

            let queries_total = meter
                .u64_counter("relation_queries_total")
                .with_description("Total relation queries executed")
                .build();

            let query_errors_total = meter
                .u64_counter("relation_query_errors_total")
                .with_description("Relation queries that failed")
                .build();

            let query_duration = meter
                .f64_histogram("relation_query_duration_seconds")
                .with_description("Duration of relation queries")
                .build();

            let eager_batch_size = meter
                .u64_histogram("relation_eager_batch_size")
                .with_description("Parent models resolved per eager-load query")
                .build();

            Self {
                registry,
                provider,
                queries_total,
                query_errors_total,
                query_duration,
                eager_batch_size,
            }
        }

        pub fn record_query(&self, elapsed: std::time::Duration) {
            self.queries_total.add(1, &[]);
            self.query_duration.record(elapsed.as_secs_f64(), &[]);
        }

        pub fn record_query_error(&self) {
            self.query_errors_total.add(1, &[]);
        }

        pub fn record_eager_batch(&self, parents: usize) {
            self.eager_batch_size.record(parents as u64, &[]);
        }

        /// Prometheus text exposition of every recorded metric
        pub fn render(&self) -> String {
            if let Err(e) = self.provider.force_flush() {
                log::warn!("failed to flush relation metrics: {e}");
            }
            let mut buffer = Vec::new();
            if let Err(e) = TextEncoder::new().encode(&self.registry.gather(), &mut buffer) {
                log::warn!("failed to encode relation metrics: {e}");
            }
            String::from_utf8_lossy(&buffer).into_owned()
        }
    }

}

#[cfg(feature = "tracing")]
pub mod tracing_helpers {
    use tracing::{info_span, Span};

    /// Span around a single SQL round-trip
    pub fn execute_query_span(sql: &str) -> Span {
        info_span!("relation.execute_query", db.statement = %sql)
    }

    /// Span around establishing a client connection
    pub fn connect_span() -> Span {
        info_span!("relation.connect")
    }

    /// Span around a relation fetch (`get` or `first`)
    pub fn relation_query_span(related: &str, kind: &'static str) -> Span {
        info_span!("relation.query", related = %related, kind)
    }

    /// Span around a whole eager-load pass
    pub fn eager_load_span(relation: &str, batch_size: usize) -> Span {
        info_span!("relation.eager_load", relation = %relation, batch_size = batch_size as u64)
    }

    /// Install a registry subscriber for the current thread until the guard drops
    pub fn test_subscriber_guard() -> tracing::subscriber::DefaultGuard {
        tracing::subscriber::set_default(tracing_subscriber::registry())
    }
}
