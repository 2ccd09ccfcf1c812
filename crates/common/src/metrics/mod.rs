//! Metrics and observability utilities
//!
//! Provides Prometheus metrics with SLO-aligned histograms
//! and standardized naming conventions.

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram, Unit};
use std::time::Instant;

/// Metrics prefix for all Twilog search metrics
pub const METRICS_PREFIX: &str = "twilog";

/// SLO-aligned histogram buckets for RPC latency (in seconds).
/// Targets: P50 < 50ms, P99 < 500ms (brute-force cosine scan over tens of
/// thousands of rows dominates tail latency, unlike an indexed ANN lookup).
pub const LATENCY_BUCKETS: &[f64] = &[
    0.001, // 1ms
    0.005, // 5ms
    0.010, // 10ms
    0.025, // 25ms
    0.050, // 50ms - P50 target
    0.100, // 100ms
    0.250, // 250ms
    0.500, // 500ms - P99 target
    1.000, // 1s
    2.500, // 2.5s
    5.000, // 5s
];

/// Buckets for embedder round-trip latency (network + model inference)
pub const EMBEDDER_BUCKETS: &[f64] = &[
    0.050, // 50ms
    0.100, // 100ms
    0.250, // 250ms
    0.500, // 500ms
    1.000, // 1s
    2.000, // 2s
    5.000, // 5s
    10.00, // 10s
];

/// Register all metric descriptions
pub fn register_metrics() {
    describe_counter!(
        format!("{}_rpc_requests_total", METRICS_PREFIX),
        Unit::Count,
        "Total number of JSON-RPC requests dispatched"
    );

    describe_histogram!(
        format!("{}_rpc_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "JSON-RPC method latency in seconds"
    );

    describe_counter!(
        format!("{}_search_queries_total", METRICS_PREFIX),
        Unit::Count,
        "Total number of search queries, by scoring mode"
    );

    describe_histogram!(
        format!("{}_search_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Search query latency in seconds"
    );

    describe_gauge!(
        format!("{}_search_results_count", METRICS_PREFIX),
        Unit::Count,
        "Number of results returned from the most recent search"
    );

    describe_gauge!(
        format!("{}_common_set_size", METRICS_PREFIX),
        Unit::Count,
        "Size of the pre-sliced common post-id set shared across fusion modes"
    );

    describe_counter!(
        format!("{}_embedding_requests_total", METRICS_PREFIX),
        Unit::Count,
        "Total embedder adapter requests"
    );

    describe_histogram!(
        format!("{}_embedding_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Embedder round-trip latency in seconds"
    );

    describe_counter!(
        format!("{}_embedding_errors_total", METRICS_PREFIX),
        Unit::Count,
        "Total embedder adapter errors"
    );

    tracing::info!("metrics registered");
}

/// Helper to record RPC dispatch metrics
pub struct RpcMetrics {
    start: Instant,
    method: String,
}

impl RpcMetrics {
    /// Start tracking an RPC call
    pub fn start(method: &str) -> Self {
        Self {
            start: Instant::now(),
            method: method.to_string(),
        }
    }

    /// Record call completion
    pub fn finish(self, ok: bool) {
        let duration = self.start.elapsed().as_secs_f64();
        let outcome = if ok { "ok" } else { "error" };

        counter!(
            format!("{}_rpc_requests_total", METRICS_PREFIX),
            "method" => self.method.clone(),
            "outcome" => outcome
        )
        .increment(1);

        histogram!(
            format!("{}_rpc_duration_seconds", METRICS_PREFIX),
            "method" => self.method
        )
        .record(duration);
    }
}

/// Record a completed search
pub fn record_search(duration_secs: f64, mode: &str, result_count: usize) {
    counter!(
        format!("{}_search_queries_total", METRICS_PREFIX),
        "mode" => mode.to_string()
    )
    .increment(1);

    histogram!(
        format!("{}_search_duration_seconds", METRICS_PREFIX),
        "mode" => mode.to_string()
    )
    .record(duration_secs);

    gauge!(
        format!("{}_search_results_count", METRICS_PREFIX),
        "mode" => mode.to_string()
    )
    .set(result_count as f64);
}

/// Record the size of the pre-sliced common post-id set
pub fn record_common_set_size(size: usize) {
    gauge!(format!("{}_common_set_size", METRICS_PREFIX)).set(size as f64);
}

/// Record an embedder adapter round trip
pub fn record_embedding(duration_secs: f64, success: bool) {
    let status = if success { "success" } else { "error" };

    counter!(
        format!("{}_embedding_requests_total", METRICS_PREFIX),
        "status" => status
    )
    .increment(1);

    if success {
        histogram!(format!("{}_embedding_duration_seconds", METRICS_PREFIX)).record(duration_secs);
    } else {
        counter!(format!("{}_embedding_errors_total", METRICS_PREFIX)).increment(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latency_buckets_sorted() {
        let mut prev = 0.0;
        for &bucket in LATENCY_BUCKETS {
            assert!(bucket > prev);
            prev = bucket;
        }
        assert!(LATENCY_BUCKETS.contains(&0.050));
        assert!(LATENCY_BUCKETS.contains(&0.500));
    }

    #[test]
    fn test_rpc_metrics_runs() {
        let m = RpcMetrics::start("search_similar");
        std::thread::sleep(std::time::Duration::from_millis(5));
        m.finish(true);
    }
}
