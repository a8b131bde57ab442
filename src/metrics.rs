// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Prometheus metrics for the load balancer reconciliation engine.
//!
//! All metrics use the namespace prefix `lbsync_io_` (prometheus-safe version
//! of "lbsync.io").
//!
//! # Metrics Categories
//!
//! - **Reconciliation Metrics** - Passes per controller and their outcomes
//! - **Cloud Resource Metrics** - Target groups, listeners and certificates created, updated, deleted
//! - **Error Metrics** - Failures by controller and error reason
//! - **Admission Metrics** - Webhook decisions by operation
//!
//! # Example
//!
//! ```rust,no_run
//! use lbsync::metrics::{record_reconciliation_success, CONTROLLER_TARGET_GROUP_GROUP};
//!
//! record_reconciliation_success(CONTROLLER_TARGET_GROUP_GROUP, std::time::Duration::from_secs(1));
//! ```

use prometheus::{CounterVec, Encoder, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder};
use std::sync::LazyLock;
use std::time::Duration;

// ============================================================================
// Metric Name Constants
// ============================================================================

/// Namespace prefix for all metrics (prometheus-safe)
const METRICS_NAMESPACE: &str = "lbsync_io";

/// Controller label for target group group passes
pub const CONTROLLER_TARGET_GROUP_GROUP: &str = "TargetGroupGroup";

/// Controller label for listener group passes
pub const CONTROLLER_LISTENER_GROUP: &str = "ListenerGroup";

/// Controller label for listener synthesis over a resource graph
pub const CONTROLLER_LISTENER_SYNTHESIZER: &str = "ListenerSynthesizer";

/// Controller label for the `TargetGroupBinding` admission webhook
pub const CONTROLLER_ADMISSION_WEBHOOK: &str = "TargetGroupBindingWebhook";

/// Resource label for target groups
pub const RESOURCE_TARGET_GROUP: &str = "TargetGroup";

/// Resource label for listeners
pub const RESOURCE_LISTENER: &str = "Listener";

/// Resource label for extra listener certificates
pub const RESOURCE_LISTENER_CERTIFICATE: &str = "ListenerCertificate";

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

/// Total number of reconcile passes by controller and status
///
/// Labels:
/// - `controller`: Controller that ran the pass (e.g., `ListenerGroup`)
/// - `status`: Outcome (`success`, `error`)
pub static RECONCILIATION_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_reconciliations_total"),
        "Total number of reconcile passes by controller and status",
    );
    let counter = CounterVec::new(opts, &["controller", "status"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

/// Duration of reconcile passes in seconds
///
/// Labels:
/// - `controller`: Controller that ran the pass
pub static RECONCILIATION_DURATION_SECONDS: LazyLock<HistogramVec> = LazyLock::new(|| {
    let opts = HistogramOpts::new(
        format!("{METRICS_NAMESPACE}_reconciliation_duration_seconds"),
        "Duration of reconcile passes in seconds by controller",
    )
    .buckets(vec![0.01, 0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0, 60.0]);
    let histogram = HistogramVec::new(opts, &["controller"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(histogram.clone()))
        .unwrap();
    histogram
});

// ============================================================================
// Cloud Resource Metrics
// ============================================================================

/// Total number of cloud resources created
///
/// Labels:
/// - `resource_type`: `TargetGroup`, `Listener` or `ListenerCertificate`
pub static RESOURCES_CREATED_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_resources_created_total"),
        "Total number of cloud resources created by type",
    );
    let counter = CounterVec::new(opts, &["resource_type"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

/// Total number of cloud resources modified in place
///
/// Labels:
/// - `resource_type`: Kind of resource updated
pub static RESOURCES_UPDATED_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_resources_updated_total"),
        "Total number of cloud resources modified by type",
    );
    let counter = CounterVec::new(opts, &["resource_type"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

/// Total number of cloud resources deleted
///
/// Labels:
/// - `resource_type`: Kind of resource deleted
pub static RESOURCES_DELETED_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_resources_deleted_total"),
        "Total number of cloud resources deleted by type",
    );
    let counter = CounterVec::new(opts, &["resource_type"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

// ============================================================================
// Error Metrics
// ============================================================================

/// Total number of errors by controller and reason
///
/// Labels:
/// - `controller`: Controller where the error surfaced
/// - `reason`: [`LbError::reason`](crate::errors::LbError::reason) value
pub static ERRORS_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_errors_total"),
        "Total number of errors by controller and reason",
    );
    let counter = CounterVec::new(opts, &["controller", "reason"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

// ============================================================================
// Admission Metrics
// ============================================================================

/// Total number of admission decisions
///
/// Labels:
/// - `operation`: `CREATE`, `UPDATE` or `DELETE`
/// - `decision`: `allowed` or `denied`
pub static ADMISSION_DECISIONS_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_admission_decisions_total"),
        "Total number of TargetGroupBinding admission decisions by operation",
    );
    let counter = CounterVec::new(opts, &["operation", "decision"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

// ============================================================================
// Helper Functions
// ============================================================================

/// Record a successful reconcile pass
pub fn record_reconciliation_success(controller: &str, duration: Duration) {
    RECONCILIATION_TOTAL
        .with_label_values(&[controller, "success"])
        .inc();
    RECONCILIATION_DURATION_SECONDS
        .with_label_values(&[controller])
        .observe(duration.as_secs_f64());
}

/// Record a failed reconcile pass together with its error reason
pub fn record_reconciliation_error(controller: &str, reason: &str, duration: Duration) {
    RECONCILIATION_TOTAL
        .with_label_values(&[controller, "error"])
        .inc();
    RECONCILIATION_DURATION_SECONDS
        .with_label_values(&[controller])
        .observe(duration.as_secs_f64());
    record_error(controller, reason);
}

/// Record a cloud resource creation
pub fn record_resource_created(resource_type: &str) {
    RESOURCES_CREATED_TOTAL
        .with_label_values(&[resource_type])
        .inc();
}

/// Record an in-place cloud resource modification
pub fn record_resource_updated(resource_type: &str) {
    RESOURCES_UPDATED_TOTAL
        .with_label_values(&[resource_type])
        .inc();
}

/// Record a cloud resource deletion
pub fn record_resource_deleted(resource_type: &str) {
    RESOURCES_DELETED_TOTAL
        .with_label_values(&[resource_type])
        .inc();
}

/// Record an error
pub fn record_error(controller: &str, reason: &str) {
    ERRORS_TOTAL.with_label_values(&[controller, reason]).inc();
}

/// Record an admission decision
pub fn record_admission(operation: &str, allowed: bool) {
    let decision = if allowed { "allowed" } else { "denied" };
    ADMISSION_DECISIONS_TOTAL
        .with_label_values(&[operation, decision])
        .inc();
}

/// Gather and encode all metrics in Prometheus text format
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
