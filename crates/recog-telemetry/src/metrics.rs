//! Metrics collection and reporting

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Total inference requests
pub const INFERENCES_TOTAL: &str = "recog_inferences_total";
/// Inference requests that returned an error
pub const INFERENCE_ERRORS_TOTAL: &str = "recog_inference_errors_total";
/// Engine + ranking latency per inference
pub const INFERENCE_LATENCY_US: &str = "recog_inference_latency_us";
/// Models successfully created through the trainer
pub const MODELS_CREATED_TOTAL: &str = "recog_models_created_total";
/// Models removed through explicit deletion
pub const MODELS_DELETED_TOTAL: &str = "recog_models_deleted_total";
/// Models currently in the catalog
pub const MODELS_LOADED: &str = "recog_models_loaded";

/// `model` label for requests naming no catalog entry
pub const UNKNOWN_MODEL_LABEL: &str = "unknown";

/// Register metric descriptions with the installed recorder
pub fn describe_metrics() {
    metrics::describe_counter!(INFERENCES_TOTAL, "Total number of inference requests");
    metrics::describe_counter!(
        INFERENCE_ERRORS_TOTAL,
        "Total number of failed inference requests by error kind"
    );
    metrics::describe_histogram!(
        INFERENCE_LATENCY_US,
        metrics::Unit::Microseconds,
        "Inference latency in microseconds by model"
    );
    metrics::describe_counter!(MODELS_CREATED_TOTAL, "Total number of models created");
    metrics::describe_counter!(MODELS_DELETED_TOTAL, "Total number of models deleted");
    metrics::describe_gauge!(MODELS_LOADED, "Number of models in the catalog");
}

/// In-process counters for registry activity
#[derive(Clone)]
pub struct MetricsCollector {
    inner: Arc<MetricsInner>,
}

struct MetricsInner {
    inferences: AtomicU64,
    inference_errors: AtomicU64,
    inference_latency_us: AtomicU64,
    creates: AtomicU64,
    create_rollbacks: AtomicU64,
    deletes: AtomicU64,
}

impl MetricsCollector {
    /// Create a new metrics collector
    pub fn new() -> Self {
        Self {
            inner: Arc::new(MetricsInner {
                inferences: AtomicU64::new(0),
                inference_errors: AtomicU64::new(0),
                inference_latency_us: AtomicU64::new(0),
                creates: AtomicU64::new(0),
                create_rollbacks: AtomicU64::new(0),
                deletes: AtomicU64::new(0),
            }),
        }
    }

    /// Record a completed inference
    pub fn record_inference(&self, model: &str, latency_us: u64) {
        self.inner.inferences.fetch_add(1, Ordering::Relaxed);
        self.inner
            .inference_latency_us
            .fetch_add(latency_us, Ordering::Relaxed);

        metrics::counter!(INFERENCES_TOTAL, "model" => model.to_string()).increment(1);
        metrics::histogram!(INFERENCE_LATENCY_US, "model" => model.to_string())
            .record(latency_us as f64);
    }

    /// Record a failed inference.
    ///
    /// `model` is `None` when the request named no catalog entry; those are
    /// labelled [`UNKNOWN_MODEL_LABEL`] so caller input never becomes a series.
    pub fn record_inference_error(&self, model: Option<&str>, kind: &'static str) {
        self.inner.inferences.fetch_add(1, Ordering::Relaxed);
        self.inner.inference_errors.fetch_add(1, Ordering::Relaxed);

        let model = model.unwrap_or(UNKNOWN_MODEL_LABEL);
        metrics::counter!(INFERENCES_TOTAL, "model" => model.to_string()).increment(1);
        metrics::counter!(INFERENCE_ERRORS_TOTAL, "model" => model.to_string(), "kind" => kind)
            .increment(1);
    }

    /// Record a successful model creation
    pub fn record_create(&self) {
        self.inner.creates.fetch_add(1, Ordering::Relaxed);
        metrics::counter!(MODELS_CREATED_TOTAL).increment(1);
    }

    /// Record a creation that was rolled back
    pub fn record_create_rollback(&self) {
        self.inner.create_rollbacks.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a model deletion
    pub fn record_delete(&self) {
        self.inner.deletes.fetch_add(1, Ordering::Relaxed);
        metrics::counter!(MODELS_DELETED_TOTAL).increment(1);
    }

    /// Publish the current catalog size
    pub fn set_models_loaded(&self, count: usize) {
        metrics::gauge!(MODELS_LOADED).set(count as f64);
    }

    /// Get current metrics snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            inferences: self.inner.inferences.load(Ordering::Relaxed),
            inference_errors: self.inner.inference_errors.load(Ordering::Relaxed),
            inference_latency_us: self.inner.inference_latency_us.load(Ordering::Relaxed),
            creates: self.inner.creates.load(Ordering::Relaxed),
            create_rollbacks: self.inner.create_rollbacks.load(Ordering::Relaxed),
            deletes: self.inner.deletes.load(Ordering::Relaxed),
        }
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of current metrics
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub inferences: u64,
    pub inference_errors: u64,
    pub inference_latency_us: u64,
    pub creates: u64,
    pub create_rollbacks: u64,
    pub deletes: u64,
}

impl MetricsSnapshot {
    /// Average latency over successful inferences
    pub fn avg_inference_latency_us(&self) -> u64 {
        let ok = self.inferences.saturating_sub(self.inference_errors);
        if ok == 0 {
            0
        } else {
            self.inference_latency_us / ok
        }
    }

    /// Fraction of inferences that failed
    pub fn error_rate(&self) -> f64 {
        if self.inferences == 0 {
            0.0
        } else {
            self.inference_errors as f64 / self.inferences as f64
        }
    }
}
