//! # Observability Infrastructure
//!
//! Structured logging and rotation metrics.

pub mod logging;
pub mod metrics;

pub use logging::{init_logging, log_config_info};
pub use metrics::{describe_metrics, record_phase};
