//! Typed stage results and their thread rendering
//!
//! Stages hand each other these values directly. Marker text only appears
//! when an outcome is rendered into the thread.

use crate::anomaly;
use crate::models::{ActionResult, Anomaly, Recommendation};

/// Substring that identifies an anomaly report in the thread
pub const ANOMALY_MARKER: &str = "Anomaly";

/// Substring that identifies an optimization report in the thread
pub const OPTIMIZATION_MARKER: &str = "🛠️";

pub const OPTIMIZATION_PREFIX: &str = "🛠️ Optimization: ";

pub const ALERT_PREFIX: &str = "ALERT: ";

/// Optimization text used when no numeric value could be extracted
pub const NO_METRICS_PARSED: &str = "no numeric metrics parsed; simulated recommendation";

/// Result of the optimization stage
#[derive(Debug, Clone, PartialEq)]
pub enum OptimizationReport {
    Evaluated {
        /// Metric category the rules were applied to
        metric: String,
        value: f64,
        recommendation: Recommendation,
        result: ActionResult,
    },
    /// Input carried no usable metric value
    NoMetricsParsed,
}

impl OptimizationReport {
    pub fn render(&self) -> String {
        match self {
            OptimizationReport::Evaluated { result, .. } => {
                format!("{}{}", OPTIMIZATION_PREFIX, result.message)
            }
            OptimizationReport::NoMetricsParsed => {
                format!("{}{}", OPTIMIZATION_PREFIX, NO_METRICS_PARSED)
            }
        }
    }
}

/// Outcome of a pipeline stage
#[derive(Debug, Clone, PartialEq)]
pub enum StageOutcome {
    NoFinding,
    AnomalyFound(Vec<Anomaly>),
    OptimizationFound(OptimizationReport),
}

impl StageOutcome {
    /// Thread text for this outcome; `None` for `NoFinding`
    pub fn render(&self) -> Option<String> {
        match self {
            StageOutcome::NoFinding => None,
            StageOutcome::AnomalyFound(anomalies) => Some(anomaly::report(anomalies)),
            StageOutcome::OptimizationFound(report) => Some(report.render()),
        }
    }
}
