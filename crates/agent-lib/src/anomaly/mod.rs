//! Anomaly detection for cloud resource metrics
//!
//! This module provides:
//! - Per-metric threshold rules selected by metric name
//! - A detector that queries the metrics provider and reports violations

mod detector;

pub use detector::{report, AnomalyDetector, Detection, MetricRule, ANOMALY_REPORT_PREFIX};
