use prometheus::{
    HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry,
};

// ============================================================================
// Metrics Module - Prometheus metrics for observability
// ============================================================================
//
// Provides metrics for:
// - Ingestion outcomes (accepted vs dead-lettered) and processing latency
// - Dead letters by failing stage, and failed dead-letter publishes
// - Cache hit/miss ratio of the order store
// - Backing store errors and stream reconnects
//
// All metrics are registered with Prometheus and can be scraped via /metrics
// ============================================================================

/// Central metrics registry for the entire application
pub struct Metrics {
    registry: Registry,

    // Ingestion Metrics
    pub messages_processed: IntCounterVec,
    pub processing_duration: HistogramVec,
    pub stream_reconnects: IntCounter,

    // DLQ Metrics
    pub dead_letters: IntCounterVec,
    pub dead_letter_publish_failures: IntCounter,

    // Store Metrics
    pub cache_lookups: IntCounterVec,
    pub repository_errors: IntCounterVec,
}

impl Metrics {
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let messages_processed = IntCounterVec::new(
            Opts::new("ingest_messages_total", "Total stream messages processed"),
            &["outcome"],
        )?;
        registry.register(Box::new(messages_processed.clone()))?;

        let processing_duration = HistogramVec::new(
            HistogramOpts::new("ingest_processing_duration_seconds", "Per-message processing duration")
                .buckets(vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0]),
            &["outcome"],
        )?;
        registry.register(Box::new(processing_duration.clone()))?;

        let stream_reconnects = IntCounter::new(
            "ingest_stream_reconnects_total",
            "Times the consume loop restarted after a stream fault",
        )?;
        registry.register(Box::new(stream_reconnects.clone()))?;

        let dead_letters = IntCounterVec::new(
            Opts::new("dlq_messages_total", "Messages routed to the dead letter topic"),
            &["stage", "retryable"],
        )?;
        registry.register(Box::new(dead_letters.clone()))?;

        let dead_letter_publish_failures = IntCounter::new(
            "dlq_publish_failures_total",
            "Dead letters that could not be published",
        )?;
        registry.register(Box::new(dead_letter_publish_failures.clone()))?;

        let cache_lookups = IntCounterVec::new(
            Opts::new("order_cache_lookups_total", "Order cache lookups by result"),
            &["result"],
        )?;
        registry.register(Box::new(cache_lookups.clone()))?;

        let repository_errors = IntCounterVec::new(
            Opts::new("order_repository_errors_total", "Backing store errors by operation"),
            &["operation"],
        )?;
        registry.register(Box::new(repository_errors.clone()))?;

        Ok(Self {
            registry,
            messages_processed,
            processing_duration,
            stream_reconnects,
            dead_letters,
            dead_letter_publish_failures,
            cache_lookups,
            repository_errors,
        })
    }

    /// Get the Prometheus registry for exposing metrics via HTTP
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Helper to record the terminal state of one message
    pub fn record_message(&self, outcome: &str, duration_secs: f64) {
        self.messages_processed.with_label_values(&[outcome]).inc();
        self.processing_duration.with_label_values(&[outcome]).observe(duration_secs);
    }

    pub fn record_dead_letter(&self, stage: &str, retryable: bool) {
        let retryable = if retryable { "true" } else { "false" };
        self.dead_letters.with_label_values(&[stage, retryable]).inc();
    }

    pub fn record_dead_letter_publish_failure(&self) {
        self.dead_letter_publish_failures.inc();
    }

    pub fn record_stream_reconnect(&self) {
        self.stream_reconnects.inc();
    }

    pub fn record_cache_lookup(&self, hit: bool) {
        let result = if hit { "hit" } else { "miss" };
        self.cache_lookups.with_label_values(&[result]).inc();
    }

    pub fn record_repository_error(&self, operation: &str) {
        self.repository_errors.with_label_values(&[operation]).inc();
    }
}
