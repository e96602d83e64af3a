//! # Metrics
//!
//! Prometheus metrics for monitoring the operator.
//!
//! ## Metrics Exposed
//!
//! - `nimbus_operator_reconciliations_total` - Total number of reconciliations by kind
//! - `nimbus_operator_reconciliation_errors_total` - Total number of reconciliation errors by kind
//! - `nimbus_operator_reconciliation_duration_seconds` - Duration of reconciliations by kind
//! - `nimbus_operator_deletions_total` - Total number of completed remote deletions by kind
//! - `nimbus_operator_remote_operations_total` - Total number of remote control-plane calls by operation

use anyhow::Result;
use prometheus::{Histogram, HistogramVec, IntCounterVec, Registry};
use std::sync::LazyLock;

pub(crate) static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

static RECONCILIATIONS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "nimbus_operator_reconciliations_total",
            "Total number of reconciliations by kind",
        ),
        &["kind"],
    )
    .expect("Failed to create RECONCILIATIONS_TOTAL metric - this should never happen")
});

static RECONCILIATION_ERRORS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "nimbus_operator_reconciliation_errors_total",
            "Total number of reconciliation errors by kind",
        ),
        &["kind"],
    )
    .expect("Failed to create RECONCILIATION_ERRORS_TOTAL metric - this should never happen")
});

static RECONCILIATION_DURATION: LazyLock<HistogramVec> = LazyLock::new(|| {
    HistogramVec::new(
        prometheus::HistogramOpts::new(
            "nimbus_operator_reconciliation_duration_seconds",
            "Duration of reconciliations in seconds by kind",
        )
        .buckets(vec![0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0]),
        &["kind"],
    )
    .expect("Failed to create RECONCILIATION_DURATION metric - this should never happen")
});

static DELETIONS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "nimbus_operator_deletions_total",
            "Total number of completed remote deletions by kind",
        ),
        &["kind"],
    )
    .expect("Failed to create DELETIONS_TOTAL metric - this should never happen")
});

static REMOTE_OPERATIONS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "nimbus_operator_remote_operations_total",
            "Total number of remote control-plane calls by operation",
        ),
        &["operation"],
    )
    .expect("Failed to create REMOTE_OPERATIONS_TOTAL metric - this should never happen")
});

static REMOTE_OPERATION_DURATION: LazyLock<Histogram> = LazyLock::new(|| {
    Histogram::with_opts(
        prometheus::HistogramOpts::new(
            "nimbus_operator_remote_operation_duration_seconds",
            "Duration of remote control-plane calls in seconds",
        )
        .buckets(vec![0.1, 0.5, 1.0, 2.0, 5.0]),
    )
    .expect("Failed to create REMOTE_OPERATION_DURATION metric - this should never happen")
});

pub fn register_metrics() -> Result<()> {
    REGISTRY.register(Box::new(RECONCILIATIONS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(RECONCILIATION_ERRORS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(RECONCILIATION_DURATION.clone()))?;
    REGISTRY.register(Box::new(DELETIONS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(REMOTE_OPERATIONS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(REMOTE_OPERATION_DURATION.clone()))?;

    Ok(())
}

pub fn increment_reconciliations(kind: &str) {
    RECONCILIATIONS_TOTAL.with_label_values(&[kind]).inc();
}

pub fn increment_reconciliation_errors(kind: &str) {
    RECONCILIATION_ERRORS_TOTAL.with_label_values(&[kind]).inc();
}

pub fn observe_reconciliation_duration(kind: &str, duration: f64) {
    RECONCILIATION_DURATION
        .with_label_values(&[kind])
        .observe(duration);
}

pub fn increment_deletions(kind: &str) {
    DELETIONS_TOTAL.with_label_values(&[kind]).inc();
}

pub fn increment_remote_operations(operation: &str) {
    REMOTE_OPERATIONS_TOTAL.with_label_values(&[operation]).inc();
}

pub fn observe_remote_operation_duration(duration: f64) {
    REMOTE_OPERATION_DURATION.observe(duration);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_metrics() {
        assert!(register_metrics().is_ok());
    }

    #[test]
    fn test_increment_reconciliations() {
        let before = RECONCILIATIONS_TOTAL.with_label_values(&["Database"]).get();
        increment_reconciliations("Database");
        let after = RECONCILIATIONS_TOTAL.with_label_values(&["Database"]).get();
        assert_eq!(after, before + 1u64);
    }

    #[test]
    fn test_increment_reconciliation_errors() {
        let before = RECONCILIATION_ERRORS_TOTAL
            .with_label_values(&["Stream"])
            .get();
        increment_reconciliation_errors("Stream");
        let after = RECONCILIATION_ERRORS_TOTAL
            .with_label_values(&["Stream"])
            .get();
        assert_eq!(after, before + 1u64);
    }

    #[test]
    fn test_increment_remote_operations() {
        let before = REMOTE_OPERATIONS_TOTAL.with_label_values(&["get"]).get();
        increment_remote_operations("get");
        let after = REMOTE_OPERATIONS_TOTAL.with_label_values(&["get"]).get();
        assert_eq!(after, before + 1u64);
    }

    #[test]
    fn test_observe_reconciliation_duration() {
        observe_reconciliation_duration("Database", 1.5);
        // Just verify it doesn't panic - histogram observation doesn't return a value
    }
}
