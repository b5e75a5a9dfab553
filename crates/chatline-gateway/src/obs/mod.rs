//! Observability: atomics-backed metrics and the periodic connection reporter.
//!
//! Metrics are rendered in Prometheus text format by the `/metrics` handler.

pub mod metrics;
pub mod reporter;

pub use metrics::GatewayMetrics;
