//! Observability for Arbor.
//!
//! - **Logging**: `tracing-subscriber` registry with an env filter and a
//!   JSON or pretty formatter
//! - **Metrics**: dispatch counters and histograms through the `metrics`
//!   facade, exported in Prometheus text format
//!
//! # Standard Metrics
//!
//! | Metric | Type | Labels | Description |
//! |--------|------|--------|-------------|
//! | `arbor_dispatch_total` | Counter | `handler`, `status` | Completed dispatch cycles |
//! | `arbor_dispatch_duration_seconds` | Histogram | `handler` | Dispatch latency |
//! | `arbor_dispatch_in_flight` | Gauge | - | Dispatches in progress |
//! | `arbor_internal_forwards_total` | Counter | - | Internal forwards replayed |
//! | `arbor_validation_failures_total` | Counter | `handler` | Rejected inputs |
//!
//! # Example
//!
//! ```rust,ignore
//! use arbor_telemetry::{init_logging, init_metrics, LogConfig, MetricsConfig};
//!
//! init_logging(&LogConfig::development())?;
//! let metrics = init_metrics(&MetricsConfig::default())?;
//!
//! // ... dispatch requests ...
//!
//! println!("{}", metrics.render());
//! ```

#![doc(html_root_url = "https://docs.rs/arbor-telemetry/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod error;
pub mod logging;
pub mod metrics;

pub use error::TelemetryError;
pub use logging::{init_logging, LogConfig};
pub use metrics::{init_metrics, InFlightGuard, MetricsConfig, MetricsRegistry};

/// Result type for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;
