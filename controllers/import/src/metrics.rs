//! Prometheus metrics for the import controller.
//!
//! # Metrics
//! - `turtles_reconciliations_total{result}`: reconciles by result
//!   (`success`, `error`, `skipped`)
//! - `turtles_reconcile_duration_seconds`: reconcile duration
//! - `turtles_manifest_objects_total{outcome}`: manifest objects by outcome
//!   (`created`, `already_exists`)
//! - `turtles_rancher_clusters_created_total`: Rancher clusters created
//!
//! Recording is a no-op until `init_global_metrics` has run.

use crate::manifest::ApplyOutcome;
use prometheus::{Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};
use std::sync::OnceLock;
use std::time::Duration;

const DURATION_BUCKETS: &[f64] = &[0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0];

/// Import controller metrics registry.
pub struct Metrics {
    registry: Registry,
    pub reconciliations: IntCounterVec,
    pub reconcile_duration: Histogram,
    pub manifest_objects: IntCounterVec,
    pub rancher_clusters_created: IntCounter,
}

impl Metrics {
    /// Create a new registry with all metrics registered.
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let reconciliations = IntCounterVec::new(
            Opts::new("turtles_reconciliations_total", "Total CAPI cluster reconciliations"),
            &["result"],
        )?;
        let reconcile_duration = Histogram::with_opts(
            HistogramOpts::new(
                "turtles_reconcile_duration_seconds",
                "Duration of CAPI cluster reconciliations",
            )
            .buckets(DURATION_BUCKETS.to_vec()),
        )?;
        let manifest_objects = IntCounterVec::new(
            Opts::new(
                "turtles_manifest_objects_total",
                "Import manifest objects applied to workload clusters",
            ),
            &["outcome"],
        )?;
        let rancher_clusters_created = IntCounter::new(
            "turtles_rancher_clusters_created_total",
            "Rancher clusters created for CAPI clusters",
        )?;

        registry.register(Box::new(reconciliations.clone()))?;
        registry.register(Box::new(reconcile_duration.clone()))?;
        registry.register(Box::new(manifest_objects.clone()))?;
        registry.register(Box::new(rancher_clusters_created.clone()))?;

        Ok(Self {
            registry,
            reconciliations,
            reconcile_duration,
            manifest_objects,
            rancher_clusters_created,
        })
    }

    /// Record a finished reconcile.
    pub fn record_reconcile(&self, result: &str, duration: Duration) {
        self.reconciliations.with_label_values(&[result]).inc();
        self.reconcile_duration.observe(duration.as_secs_f64());
    }

    /// Record the objects handled while applying a manifest.
    pub fn record_manifest(&self, outcome: &ApplyOutcome) {
        self.manifest_objects
            .with_label_values(&["created"])
            .inc_by(outcome.created as u64);
        self.manifest_objects
            .with_label_values(&["already_exists"])
            .inc_by(outcome.already_existing as u64);
    }

    /// Encode all metrics in Prometheus text format.
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        TextEncoder::new().encode_to_string(&self.registry.gather())
    }
}

static GLOBAL_METRICS: OnceLock<Metrics> = OnceLock::new();

/// Initialize the global metrics instance.
pub fn init_global_metrics() -> Result<&'static Metrics, prometheus::Error> {
    if let Some(metrics) = GLOBAL_METRICS.get() {
        return Ok(metrics);
    }
    let metrics = Metrics::new()?;
    Ok(GLOBAL_METRICS.get_or_init(|| metrics))
}

/// Get the global metrics instance, if initialized.
pub fn global_metrics() -> Option<&'static Metrics> {
    GLOBAL_METRICS.get()
}

pub fn record_reconcile(result: &str, duration: Duration) {
    if let Some(metrics) = global_metrics() {
        metrics.record_reconcile(result, duration);
    }
}

pub fn record_manifest_outcome(outcome: &ApplyOutcome) {
    if let Some(metrics) = global_metrics() {
        metrics.record_manifest(outcome);
    }
}

pub fn record_rancher_cluster_created() {
    if let Some(metrics) = global_metrics() {
        metrics.rancher_clusters_created.inc();
    }
}
