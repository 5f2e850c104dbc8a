//! Metric to action rule table

use crate::config::RecommendationThresholds;
use crate::models::{Action, Recommendation};

/// Metric family a recommendation rule applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricCategory {
    Cpu,
    Memory,
    Disk,
}

impl MetricCategory {
    /// Case-insensitive substring match; CPU, memory, then disk
    pub fn classify(category: &str) -> Option<Self> {
        let lower = category.to_lowercase();
        if lower.contains("cpu") {
            Some(MetricCategory::Cpu)
        } else if lower.contains("memory") {
            Some(MetricCategory::Memory)
        } else if lower.contains("disk") {
            Some(MetricCategory::Disk)
        } else {
            None
        }
    }
}

/// Map a metric category and value to a recommendation
pub fn recommend(category: &str, value: f64, thresholds: &RecommendationThresholds) -> Recommendation {
    let (action, reason) = match MetricCategory::classify(category) {
        Some(MetricCategory::Cpu) if value > thresholds.cpu_resize_above => {
            (Action::RecommendResize, format!("High CPU {}%", value))
        }
        Some(MetricCategory::Cpu) if value > thresholds.cpu_restart_above => {
            (Action::RecommendRestart, format!("Moderate CPU {}%", value))
        }
        Some(MetricCategory::Cpu) => (Action::NoAction, format!("CPU normal {}%", value)),

        Some(MetricCategory::Memory) if value < thresholds.memory_resize_below => {
            (Action::RecommendResize, format!("Low memory {} bytes", value))
        }
        Some(MetricCategory::Memory) => {
            (Action::NoAction, format!("Memory normal {} bytes", value))
        }

        Some(MetricCategory::Disk) if value > thresholds.disk_cleanup_above => {
            (Action::RecommendCleanup, format!("High disk I/O {}", value))
        }
        Some(MetricCategory::Disk) => (Action::NoAction, format!("Disk I/O normal {}", value)),

        None => (Action::UnknownMetric, "No rule for this metric".to_string()),
    };

    Recommendation { action, reason }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn action(category: &str, value: f64) -> Action {
        recommend(category, value, &RecommendationThresholds::default()).action
    }

    #[test]
    fn test_cpu_bands() {
        assert_eq!(action("cpu", 85.0), Action::RecommendResize);
        assert_eq!(action("Percentage CPU", 80.0), Action::RecommendRestart);
        assert_eq!(action("cpu", 61.0), Action::RecommendRestart);
        assert_eq!(action("cpu", 60.0), Action::NoAction);
        assert_eq!(action("cpu", 50.0), Action::NoAction);
    }

    #[test]
    fn test_memory_and_disk() {
        assert_eq!(action("Available Memory Bytes", 5e8), Action::RecommendResize);
        assert_eq!(action("memory", 1e9), Action::NoAction);
        assert_eq!(action("Disk Read Bytes", 6e7), Action::RecommendCleanup);
        assert_eq!(action("disk", 5e7), Action::NoAction);
    }

    #[test]
    fn test_unknown_category() {
        let rec = recommend("Network In", 1.0, &RecommendationThresholds::default());
        assert_eq!(rec.action, Action::UnknownMetric);
        assert_eq!(rec.reason, "No rule for this metric");
    }

    #[test]
    fn test_reason_text() {
        let t = RecommendationThresholds::default();
        assert_eq!(recommend("cpu", 85.0, &t).reason, "High CPU 85%");
        assert_eq!(recommend("cpu", 70.5, &t).reason, "Moderate CPU 70.5%");
        assert_eq!(recommend("memory", 5e8, &t).reason, "Low memory 500000000 bytes");
        assert_eq!(recommend("disk", 1.0, &t).reason, "Disk I/O normal 1");
    }
}
