//! Dispatch metrics.
//!
//! Recording functions go through the `metrics` facade and are no-ops until
//! a recorder is installed; [`init_metrics`] installs a Prometheus recorder
//! without an HTTP listener; serving the rendered text is up to the host.

use crate::error::TelemetryError;
use crate::TelemetryResult;
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;
use std::time::Duration;

/// Completed dispatch cycles.
pub const DISPATCH_TOTAL: &str = "arbor_dispatch_total";
/// Dispatch latency.
pub const DISPATCH_DURATION: &str = "arbor_dispatch_duration_seconds";
/// Dispatches in progress.
pub const DISPATCH_IN_FLIGHT: &str = "arbor_dispatch_in_flight";
/// Internal forwards.
pub const INTERNAL_FORWARDS: &str = "arbor_internal_forwards_total";
/// Validation failures.
pub const VALIDATION_FAILURES: &str = "arbor_validation_failures_total";

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Metrics configuration.
#[derive(Debug, Clone)]
pub struct MetricsConfig {
    /// Histogram buckets, in seconds.
    pub duration_buckets: Vec<f64>,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            // 1ms .. 10s
            duration_buckets: vec![
                0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
            ],
        }
    }
}

/// Handle onto the installed recorder.
#[derive(Debug, Clone)]
pub struct MetricsRegistry {
    handle: PrometheusHandle,
}

impl MetricsRegistry {
    /// Renders all metrics in Prometheus text format.
    #[must_use]
    pub fn render(&self) -> String {
        self.handle.render()
    }
}

/// Installs the Prometheus recorder.
///
/// Calling it again returns the already installed registry.
///
/// # Errors
///
/// Returns [`TelemetryError::MetricsInit`] if the buckets are invalid or
/// another recorder is already installed.
pub fn init_metrics(config: &MetricsConfig) -> TelemetryResult<MetricsRegistry> {
    if let Some(handle) = METRICS_HANDLE.get() {
        return Ok(MetricsRegistry {
            handle: handle.clone(),
        });
    }

    let handle = PrometheusBuilder::new()
        .set_buckets(&config.duration_buckets)
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?
        .install_recorder()
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;

    let handle = METRICS_HANDLE.get_or_init(|| handle).clone();
    describe_metrics();

    Ok(MetricsRegistry { handle })
}

/// Renders metrics, or `None` before [`init_metrics`].
#[must_use]
pub fn render_metrics() -> Option<String> {
    METRICS_HANDLE.get().map(PrometheusHandle::render)
}

fn describe_metrics() {
    describe_counter!(DISPATCH_TOTAL, "Completed dispatch cycles by handler and status");
    describe_histogram!(DISPATCH_DURATION, "Dispatch duration in seconds");
    describe_gauge!(DISPATCH_IN_FLIGHT, "Dispatch cycles in progress");
    describe_counter!(INTERNAL_FORWARDS, "Internal forwards replayed");
    describe_counter!(VALIDATION_FAILURES, "Inputs rejected by a validation schema");
}

/// Records a completed dispatch.
pub fn record_dispatch(handler: &str, status: u16, duration: Duration) {
    counter!(
        DISPATCH_TOTAL,
        "handler" => handler.to_string(),
        "status" => status.to_string()
    )
    .increment(1);

    histogram!(DISPATCH_DURATION, "handler" => handler.to_string())
        .record(duration.as_secs_f64());
}

/// Records an internal forward.
pub fn record_forward() {
    counter!(INTERNAL_FORWARDS).increment(1);
}

/// Records a validation failure.
pub fn record_validation_failure(handler: &str) {
    counter!(VALIDATION_FAILURES, "handler" => handler.to_string()).increment(1);
}

/// Tracks one in-flight dispatch; decrements the gauge on drop.
#[derive(Debug)]
pub struct InFlightGuard {
    _private: (),
}

impl InFlightGuard {
    /// Increments the in-flight gauge.
    #[must_use]
    pub fn new() -> Self {
        gauge!(DISPATCH_IN_FLIGHT).increment(1.0);
        Self { _private: () }
    }
}

impl Default for InFlightGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        gauge!(DISPATCH_IN_FLIGHT).decrement(1.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_buckets_ascend() {
        let config = MetricsConfig::default();
        assert!(config.duration_buckets.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_recording_without_recorder() {
        record_dispatch("index", 200, Duration::from_millis(3));
        record_forward();
        record_validation_failure("save");
        drop(InFlightGuard::new());
    }

    #[test]
    fn test_init_and_render() {
        let registry = init_metrics(&MetricsConfig::default()).unwrap();
        record_dispatch("render_sample", 404, Duration::from_millis(1));
        let text = registry.render();
        assert!(text.contains(DISPATCH_TOTAL));
        assert!(text.contains("render_sample"));

        let again = init_metrics(&MetricsConfig::default()).unwrap();
        assert!(again.render().contains("render_sample"));
        assert!(render_metrics().is_some());
    }
}
