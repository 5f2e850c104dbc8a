//! Threshold-based anomaly detection over the configured metric set
//!
//! Each metric is queried once per run over a fixed lookback window and
//! checked against every rule its name selects. Missing samples and
//! provider failures skip the metric; evaluation always continues.

use crate::config::DetectionThresholds;
use crate::error::ProviderError;
use crate::health::{components, HealthRegistry};
use crate::models::{Anomaly, Message, MetricSample};
use crate::observability::{AgentMetrics, StructuredLogger, AUTHORIZATION_HINT};
use crate::providers::{MetricQuery, MetricsProvider};
use crate::resilience::{retry, RetryPolicy};
use std::sync::Arc;

/// Fixed prefix of the anomaly report message
pub const ANOMALY_REPORT_PREFIX: &str = "⚠️ Anomaly report:";

/// Rule applied to a metric, chosen by case-sensitive keywords in its name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricRule {
    /// Anomaly when the value is above the CPU threshold
    Cpu,
    /// Anomaly when the value is below the memory threshold
    Memory,
    /// Anomaly when the value is above the disk threshold
    Disk,
}

impl MetricRule {
    const ALL: [MetricRule; 3] = [MetricRule::Cpu, MetricRule::Memory, MetricRule::Disk];

    fn keyword(&self) -> &'static str {
        match self {
            MetricRule::Cpu => "CPU",
            MetricRule::Memory => "Memory",
            MetricRule::Disk => "Disk",
        }
    }

    /// Every rule whose keyword appears in the metric name, in CPU, Memory, Disk order
    pub fn matching(metric_name: &str) -> Vec<Self> {
        Self::ALL
            .into_iter()
            .filter(|rule| metric_name.contains(rule.keyword()))
            .collect()
    }

    /// Describe the violation, or `None` when the value is within bounds
    fn violation(&self, value: f64, thresholds: &DetectionThresholds) -> Option<String> {
        match self {
            MetricRule::Cpu if value > thresholds.cpu_above => {
                Some(format!("CPU {} above {}", value, thresholds.cpu_above))
            }
            MetricRule::Memory if value < thresholds.memory_below => {
                Some(format!("memory {} below {}", value, thresholds.memory_below))
            }
            MetricRule::Disk if value > thresholds.disk_above => {
                Some(format!("disk {} above {}", value, thresholds.disk_above))
            }
            _ => None,
        }
    }
}

/// How a metric query ended, as far as detection cares
#[derive(Debug, Clone, PartialEq)]
enum SampleOutcome {
    Value(f64),
    /// No data, or the metric does not exist for the resource
    Missing,
    /// Query error; authorization failures carry a remediation hint
    Failed {
        error: String,
        hint: Option<&'static str>,
    },
}

impl From<Result<Option<f64>, ProviderError>> for SampleOutcome {
    fn from(result: Result<Option<f64>, ProviderError>) -> Self {
        match result {
            Ok(Some(value)) => SampleOutcome::Value(value),
            Ok(None) | Err(ProviderError::Unavailable(_)) => SampleOutcome::Missing,
            Err(e) => SampleOutcome::Failed {
                hint: e.is_authorization().then_some(AUTHORIZATION_HINT),
                error: e.to_string(),
            },
        }
    }
}

/// Result of one detection pass
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Detection {
    /// Anomalies in metric order
    pub anomalies: Vec<Anomaly>,
    /// Report to append to the thread; `None` when nothing was found
    pub message: Option<Message>,
}

impl Detection {
    pub fn is_empty(&self) -> bool {
        self.anomalies.is_empty()
    }
}

/// Render anomalies as the thread report
pub fn report(anomalies: &[Anomaly]) -> String {
    let mut content = String::from(ANOMALY_REPORT_PREFIX);
    for anomaly in anomalies {
        content.push('\n');
        content.push_str(&anomaly.report_line());
    }
    content
}

/// Evaluates metrics against per-metric rules
pub struct AnomalyDetector {
    provider: Arc<dyn MetricsProvider>,
    thresholds: DetectionThresholds,
    query: MetricQuery,
    retry_policy: RetryPolicy,
    metrics: AgentMetrics,
    logger: StructuredLogger,
    health: Option<HealthRegistry>,
}

impl AnomalyDetector {
    pub fn new(
        provider: Arc<dyn MetricsProvider>,
        thresholds: DetectionThresholds,
        metrics: AgentMetrics,
        logger: StructuredLogger,
    ) -> Self {
        Self {
            provider,
            thresholds,
            query: MetricQuery::default(),
            retry_policy: RetryPolicy::default(),
            metrics,
            logger,
            health: None,
        }
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    /// Report provider call outcomes to `health`
    pub fn with_health(mut self, health: HealthRegistry) -> Self {
        self.health = Some(health);
        self
    }

    /// Check a single value against every rule matching `metric_name`;
    /// the first violated rule describes the anomaly
    pub fn evaluate(&self, metric_name: &str, value: f64) -> Option<Anomaly> {
        MetricRule::matching(metric_name)
            .iter()
            .find_map(|rule| rule.violation(value, &self.thresholds))
            .map(|description| Anomaly {
                metric: metric_name.to_string(),
                value,
                description,
            })
    }

    /// Query and evaluate every metric in order
    pub async fn detect(&self, resource_id: &str, metric_names: &[String]) -> Detection {
        let mut anomalies = Vec::new();

        for metric in metric_names {
            let Some(value) = self.sample(resource_id, metric).await.value else {
                continue;
            };

            if let Some(anomaly) = self.evaluate(metric, value) {
                self.logger
                    .log_anomaly(&anomaly.metric, anomaly.value, &anomaly.description);
                anomalies.push(anomaly);
            }
        }

        if anomalies.is_empty() {
            self.logger.log_no_anomalies(metric_names.len());
            return Detection::default();
        }

        self.metrics.add_anomalies_detected(anomalies.len() as u64);
        let message = Message::agent(report(&anomalies));
        Detection {
            anomalies,
            message: Some(message),
        }
    }

    /// Latest value of one metric; the value is absent when missing or the query failed
    pub async fn sample(&self, resource_id: &str, metric: &str) -> MetricSample {
        let provider = &self.provider;
        let query = &self.query;
        let result = retry("metrics", &self.retry_policy, &self.metrics, move || {
            provider.query(resource_id, metric, query)
        })
        .await;

        self.record_health(&result).await;

        let value = match SampleOutcome::from(result) {
            SampleOutcome::Value(value) => Some(value),
            SampleOutcome::Missing => {
                self.logger.log_metric_unavailable(metric);
                None
            }
            SampleOutcome::Failed { error, hint } => {
                self.logger.log_metric_query_failed(metric, &error, hint);
                None
            }
        };

        MetricSample {
            metric_name: metric.to_string(),
            value,
            resource_id: resource_id.to_string(),
        }
    }

    async fn record_health(&self, result: &Result<Option<f64>, ProviderError>) {
        if let Some(health) = &self.health {
            health
                .record_call(components::METRICS_PROVIDER, result.as_ref().map(|_| ()))
                .await;
        }
    }
}
