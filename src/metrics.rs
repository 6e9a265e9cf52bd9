// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Prometheus metrics for the Cloudflare operator.
//!
//! All metrics carry the namespace prefix `cloudflare_firestoned_io_`
//! (prometheus-safe version of "cloudflare.firestoned.io").
//!
//! # Metrics Categories
//!
//! - **Reconciliation Metrics** - Reconcile passes, their outcome and duration
//! - **Cloudflare API Metrics** - Every HTTP attempt against the Cloudflare API
//! - **Deletion Metrics** - Remote deletions, orphaned resources and failed deletions
//!
//! # Example
//!
//! ```rust,no_run
//! use cloudflare_operator::metrics::record_reconciliation_success;
//!
//! record_reconciliation_success("R2Bucket", std::time::Duration::from_secs(1));
//! ```

use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;
use prometheus::{CounterVec, Encoder, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder};
use std::net::SocketAddr;
use std::sync::LazyLock;
use std::time::Duration;
use tracing::info;

// ============================================================================
// Metric Name Constants
// ============================================================================

/// Namespace prefix for all operator metrics (prometheus-safe)
const METRICS_NAMESPACE: &str = "cloudflare_firestoned_io";

// ============================================================================
// Global Metrics Registry
// ============================================================================

/// Global Prometheus metrics registry
///
/// All metrics are registered in this registry and exposed via `/metrics` endpoint.
pub static METRICS_REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

// ============================================================================
// Reconciliation Metrics
// ============================================================================

/// Total number of reconciliations by resource type and status
///
/// Labels:
/// - `resource_type`: Kind of resource (e.g., `R2Bucket`, `CloudflareDomain`)
/// - `status`: Outcome (`success`, `error`, `requeue`)
pub static RECONCILIATION_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_reconciliations_total"),
        "Total number of reconciliations by resource type and status",
    );
    let counter = CounterVec::new(opts, &["resource_type", "status"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

/// Duration of reconciliations in seconds
///
/// Labels:
/// - `resource_type`: Kind of resource
pub static RECONCILIATION_DURATION_SECONDS: LazyLock<HistogramVec> = LazyLock::new(|| {
    let opts = HistogramOpts::new(
        format!("{METRICS_NAMESPACE}_reconciliation_duration_seconds"),
        "Duration of reconciliations in seconds by resource type",
    )
    .buckets(vec![0.001, 0.01, 0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0, 60.0]);
    let histogram = HistogramVec::new(opts, &["resource_type"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(histogram.clone()))
        .unwrap();
    histogram
});

/// Total number of requeue operations
///
/// Labels:
/// - `resource_type`: Kind of resource
/// - `reason`: Condition reason that caused the requeue (e.g., `RateLimited`, `BucketNotReady`)
pub static REQUEUE_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_requeues_total"),
        "Total number of requeue operations by resource type and reason",
    );
    let counter = CounterVec::new(opts, &["resource_type", "reason"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

/// Total number of failed reconciliations by error class
///
/// Labels:
/// - `resource_type`: Kind of resource
/// - `error_class`: `transient`, `configuration` or `permanent`
pub static ERRORS_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_errors_total"),
        "Total number of errors by resource type and error class",
    );
    let counter = CounterVec::new(opts, &["resource_type", "error_class"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

// ============================================================================
// Cloudflare API Metrics
// ============================================================================

/// Total number of Cloudflare API requests
///
/// Labels:
/// - `operation`: Client operation (e.g., `create_bucket`, `put_bucket_cors`)
/// - `outcome`: `success` or an error label (`not_found`, `rate_limited`, `timeout`, ...)
pub static CLOUDFLARE_REQUESTS_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_cloudflare_requests_total"),
        "Total number of Cloudflare API requests by operation and outcome",
    );
    let counter = CounterVec::new(opts, &["operation", "outcome"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

/// Latency of Cloudflare API requests in seconds
///
/// Labels:
/// - `operation`: Client operation
pub static CLOUDFLARE_REQUEST_DURATION_SECONDS: LazyLock<HistogramVec> = LazyLock::new(|| {
    let opts = HistogramOpts::new(
        format!("{METRICS_NAMESPACE}_cloudflare_request_duration_seconds"),
        "Latency of Cloudflare API requests in seconds by operation",
    )
    .buckets(vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]);
    let histogram = HistogramVec::new(opts, &["operation"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(histogram.clone()))
        .unwrap();
    histogram
});

// ============================================================================
// Deletion Metrics
// ============================================================================

/// Total number of remote objects deleted during finalization
///
/// Labels:
/// - `resource_type`: Kind of resource deleted
pub static RESOURCES_DELETED_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_resources_deleted_total"),
        "Total number of remote resources deleted by type",
    );
    let counter = CounterVec::new(opts, &["resource_type"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

/// Total number of resources finalized without remote deletion
///
/// Labels:
/// - `resource_type`: Kind of resource orphaned
pub static RESOURCES_ORPHANED_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_resources_orphaned_total"),
        "Total number of resources finalized without remote deletion by type",
    );
    let counter = CounterVec::new(opts, &["resource_type"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

/// Total number of failed remote deletion attempts
///
/// Labels:
/// - `resource_type`: Kind of resource
pub static DELETION_FAILURES_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_deletion_failures_total"),
        "Total number of failed remote deletion attempts by type",
    );
    let counter = CounterVec::new(opts, &["resource_type"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

// ============================================================================
// Helper Functions
// ============================================================================

/// Record a successful reconciliation
///
/// # Arguments
/// * `resource_type` - The kind of resource reconciled (e.g., `R2Bucket`)
/// * `duration` - Duration of the reconciliation
pub fn record_reconciliation_success(resource_type: &str, duration: Duration) {
    RECONCILIATION_TOTAL
        .with_label_values(&[resource_type, "success"])
        .inc();
    RECONCILIATION_DURATION_SECONDS
        .with_label_values(&[resource_type])
        .observe(duration.as_secs_f64());
}

/// Record a failed reconciliation
///
/// # Arguments
/// * `resource_type` - The kind of resource reconciled
/// * `error_class` - Class of the failure (`transient`, `configuration`, `permanent`)
/// * `duration` - Duration of the reconciliation before failure
pub fn record_reconciliation_error(resource_type: &str, error_class: &str, duration: Duration) {
    RECONCILIATION_TOTAL
        .with_label_values(&[resource_type, "error"])
        .inc();
    ERRORS_TOTAL
        .with_label_values(&[resource_type, error_class])
        .inc();
    RECONCILIATION_DURATION_SECONDS
        .with_label_values(&[resource_type])
        .observe(duration.as_secs_f64());
}

/// Record a reconciliation requeue
///
/// # Arguments
/// * `resource_type` - The kind of resource reconciled
/// * `reason` - Condition reason behind the requeue
pub fn record_reconciliation_requeue(resource_type: &str, reason: &str) {
    RECONCILIATION_TOTAL
        .with_label_values(&[resource_type, "requeue"])
        .inc();
    REQUEUE_TOTAL
        .with_label_values(&[resource_type, reason])
        .inc();
}

/// Record one Cloudflare API request attempt
///
/// # Arguments
/// * `operation` - Client operation name
/// * `outcome` - `success` or the error label
/// * `duration` - Latency of the attempt
pub fn record_cloudflare_request(operation: &str, outcome: &str, duration: Duration) {
    CLOUDFLARE_REQUESTS_TOTAL
        .with_label_values(&[operation, outcome])
        .inc();
    CLOUDFLARE_REQUEST_DURATION_SECONDS
        .with_label_values(&[operation])
        .observe(duration.as_secs_f64());
}

/// Record a remote deletion confirmed during finalization
pub fn record_resource_deleted(resource_type: &str) {
    RESOURCES_DELETED_TOTAL
        .with_label_values(&[resource_type])
        .inc();
}

/// Record a finalization that left the remote object in place
pub fn record_resource_orphaned(resource_type: &str) {
    RESOURCES_ORPHANED_TOTAL
        .with_label_values(&[resource_type])
        .inc();
}

/// Record a failed remote deletion attempt
pub fn record_deletion_failure(resource_type: &str) {
    DELETION_FAILURES_TOTAL
        .with_label_values(&[resource_type])
        .inc();
}

/// Gather and encode all metrics in Prometheus text format
///
/// # Returns
/// Prometheus-formatted metrics as a String
///
/// # Errors
/// Returns error if encoding fails
pub fn gather_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = METRICS_REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(format!("UTF-8 error: {e}")))
}

// ============================================================================
// HTTP Endpoints
// ============================================================================

async fn metrics_handler() -> Result<String, (StatusCode, String)> {
    gather_metrics().map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
}

async fn healthz_handler() -> &'static str {
    "ok"
}

/// Router serving `/metrics` and `/healthz`.
pub fn router() -> Router {
    Router::new()
        .route("/metrics", get(metrics_handler))
        .route("/healthz", get(healthz_handler))
}

/// Serve [`router`] on `addr` until the process exits.
///
/// # Errors
///
/// Returns an error if the address cannot be bound or the server fails.
pub async fn serve(addr: SocketAddr) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "Serving metrics");
    axum::serve(listener, router()).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_reconciliation_success() {
        let resource_type = "TestResource";

        record_reconciliation_success(resource_type, Duration::from_millis(500));

        let counter = RECONCILIATION_TOTAL.with_label_values(&[resource_type, "success"]);
        assert!(counter.get() > 0.0);

        let histogram = RECONCILIATION_DURATION_SECONDS.with_label_values(&[resource_type]);
        assert!(histogram.get_sample_count() > 0);
    }

    #[test]
    fn test_record_reconciliation_error_counts_class() {
        let resource_type = "TestResourceError";

        record_reconciliation_error(resource_type, "configuration", Duration::from_millis(250));

        let counter = RECONCILIATION_TOTAL.with_label_values(&[resource_type, "error"]);
        assert!(counter.get() > 0.0);
        let errors = ERRORS_TOTAL.with_label_values(&[resource_type, "configuration"]);
        assert!(errors.get() > 0.0);
    }

    #[test]
    fn test_record_cloudflare_request() {
        record_cloudflare_request("test_op", "rate_limited", Duration::from_millis(20));

        let counter = CLOUDFLARE_REQUESTS_TOTAL.with_label_values(&["test_op", "rate_limited"]);
        assert!(counter.get() > 0.0);
        let histogram = CLOUDFLARE_REQUEST_DURATION_SECONDS.with_label_values(&["test_op"]);
        assert!(histogram.get_sample_count() > 0);
    }

    #[test]
    fn test_gather_metrics() {
        record_reconciliation_success("GatherTest", Duration::from_millis(100));

        let metrics_text = gather_metrics().unwrap();
        assert!(metrics_text.contains("cloudflare_firestoned_io"));
        assert!(metrics_text.contains("reconciliations_total"));
    }

    #[tokio::test]
    async fn test_metrics_handler_renders_registry() {
        record_resource_deleted("HandlerTest");

        let body = metrics_handler().await.expect("metrics");
        assert!(body.contains("resources_deleted_total"));
        assert_eq!(healthz_handler().await, "ok");
    }
}
