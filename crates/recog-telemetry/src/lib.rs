//! Recog Telemetry
//!
//! Logging and metrics for the recog model registry.
//!
//! Provides:
//! - Tracing subscriber initialization
//! - Metric names and descriptions for the `metrics` facade
//! - An in-process counter snapshot for health reporting

pub mod logging;
pub mod metrics;

pub use logging::{init_tracing, init_tracing_json};
pub use metrics::{describe_metrics, MetricsCollector, MetricsSnapshot};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::metrics::{MetricsCollector, MetricsSnapshot};
}
