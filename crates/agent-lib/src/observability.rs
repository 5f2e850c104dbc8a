//! Observability infrastructure for the triage agent
//!
//! Provides:
//! - Prometheus metrics (runs, anomalies, recommendations, provider errors, run latency)
//! - Structured JSON logging with tracing

use prometheus::{
    register_histogram, register_int_counter, register_int_counter_vec, Histogram, IntCounter,
    IntCounterVec,
};
use std::sync::OnceLock;
use tracing::{info, warn};

/// Histogram buckets for run latency (in seconds)
const RUN_LATENCY_BUCKETS: &[f64] = &[0.001, 0.005, 0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0];

/// Hint attached to metric authorization failures
pub const AUTHORIZATION_HINT: &str = "the identity used for metric queries needs 'Microsoft.Insights/metrics/read' permission on the resource (assign Monitoring Reader or a similar role); if access was just granted, refresh the credentials";

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<AgentMetricsInner> = OnceLock::new();

struct AgentMetricsInner {
    runs: IntCounter,
    run_failures: IntCounter,
    run_duration_seconds: Histogram,
    anomalies_detected: IntCounter,
    recommendations: IntCounterVec,
    actions: IntCounterVec,
    alerts_sent: IntCounter,
    provider_errors: IntCounterVec,
    provider_retries: IntCounterVec,
    registrations: IntCounterVec,
}

impl AgentMetricsInner {
    fn new() -> Self {
        Self {
            runs: register_int_counter!("triage_runs_total", "Total number of pipeline runs")
                .expect("Failed to register runs_total"),

            run_failures: register_int_counter!(
                "triage_run_failures_total",
                "Pipeline runs aborted by an internal fault"
            )
            .expect("Failed to register run_failures_total"),

            run_duration_seconds: register_histogram!(
                "triage_run_duration_seconds",
                "Wall time of a full pipeline run",
                RUN_LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register run_duration_seconds"),

            anomalies_detected: register_int_counter!(
                "triage_anomalies_detected_total",
                "Total number of anomalies detected"
            )
            .expect("Failed to register anomalies_detected_total"),

            recommendations: register_int_counter_vec!(
                "triage_recommendations_total",
                "Recommendations generated, by action",
                &["action"]
            )
            .expect("Failed to register recommendations_total"),

            actions: register_int_counter_vec!(
                "triage_actions_total",
                "Applied or simulated actions, by result status",
                &["status"]
            )
            .expect("Failed to register actions_total"),

            alerts_sent: register_int_counter!(
                "triage_alerts_sent_total",
                "Alerts handed to the alert channel"
            )
            .expect("Failed to register alerts_sent_total"),

            provider_errors: register_int_counter_vec!(
                "triage_provider_errors_total",
                "External provider failures, by provider and kind",
                &["provider", "kind"]
            )
            .expect("Failed to register provider_errors_total"),

            provider_retries: register_int_counter_vec!(
                "triage_provider_retries_total",
                "Retried provider calls, by provider",
                &["provider"]
            )
            .expect("Failed to register provider_retries_total"),

            registrations: register_int_counter_vec!(
                "triage_registrations_total",
                "Agent registration attempts, by outcome",
                &["outcome"]
            )
            .expect("Failed to register registrations_total"),
        }
    }
}

/// Agent metrics for Prometheus exposition
///
/// This is a lightweight handle to the global metrics instance.
/// Multiple clones share the same underlying metrics.
#[derive(Clone)]
pub struct AgentMetrics {
    _private: (),
}

impl Default for AgentMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for AgentMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AgentMetrics")
    }
}

impl AgentMetrics {
    /// Create a new metrics handle (initializes global metrics if needed)
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(AgentMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &AgentMetricsInner {
        GLOBAL_METRICS.get_or_init(AgentMetricsInner::new)
    }

    pub fn inc_runs(&self) {
        self.inner().runs.inc();
    }

    pub fn inc_run_failures(&self) {
        self.inner().run_failures.inc();
    }

    pub fn observe_run_duration(&self, duration_secs: f64) {
        self.inner().run_duration_seconds.observe(duration_secs);
    }

    pub fn add_anomalies_detected(&self, count: u64) {
        self.inner().anomalies_detected.inc_by(count);
    }

    pub fn inc_recommendation(&self, action: &str) {
        self.inner().recommendations.with_label_values(&[action]).inc();
    }

    pub fn inc_action(&self, status: &str) {
        self.inner().actions.with_label_values(&[status]).inc();
    }

    pub fn inc_alerts_sent(&self) {
        self.inner().alerts_sent.inc();
    }

    pub fn inc_provider_error(&self, provider: &str, kind: &str) {
        self.inner()
            .provider_errors
            .with_label_values(&[provider, kind])
            .inc();
    }

    pub fn inc_provider_retry(&self, provider: &str) {
        self.inner().provider_retries.with_label_values(&[provider]).inc();
    }

    pub fn inc_registration(&self, outcome: &str) {
        self.inner().registrations.with_label_values(&[outcome]).inc();
    }
}

/// Structured logger for pipeline events
///
/// Provides consistent JSON-formatted logging for detections,
/// recommendations, alerts and other significant events.
#[derive(Debug, Clone)]
pub struct StructuredLogger {
    resource: String,
}

impl StructuredLogger {
    pub fn new(resource: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
        }
    }

    pub fn log_run_started(&self, run_id: u64, input_len: usize) {
        info!(
            event = "run_started",
            resource = %self.resource,
            run_id = run_id,
            input_len = input_len,
            "Pipeline run started"
        );
    }

    pub fn log_anomaly(&self, metric: &str, value: f64, description: &str) {
        warn!(
            event = "anomaly_detected",
            resource = %self.resource,
            metric = %metric,
            value = value,
            details = %description,
            "Anomaly detected"
        );
    }

    pub fn log_no_anomalies(&self, metrics_checked: usize) {
        info!(
            event = "no_anomalies",
            resource = %self.resource,
            metrics_checked = metrics_checked,
            "No anomalies detected"
        );
    }

    pub fn log_metric_unavailable(&self, metric: &str) {
        info!(
            event = "metric_unavailable",
            resource = %self.resource,
            metric = %metric,
            "No sample available, skipping metric"
        );
    }

    /// Log a failed metric query, with an actionable hint when one applies
    pub fn log_metric_query_failed(&self, metric: &str, error: &str, hint: Option<&str>) {
        if let Some(hint) = hint {
            warn!(
                event = "metric_query_failed",
                resource = %self.resource,
                metric = %metric,
                error = %error,
                kind = "authorization",
                hint = %hint,
                "Authorization error querying metric"
            );
        } else {
            warn!(
                event = "metric_query_failed",
                resource = %self.resource,
                metric = %metric,
                error = %error,
                "Error querying metric"
            );
        }
    }

    pub fn log_recommendation(&self, metric: &str, value: f64, action: &str, reason: &str) {
        info!(
            event = "recommendation_generated",
            resource = %self.resource,
            metric = %metric,
            value = value,
            action = %action,
            reason = %reason,
            "Generated recommendation"
        );
    }

    pub fn log_action(&self, action: &str, status: &str, message: &str) {
        if status == "error" {
            warn!(
                event = "action_applied",
                resource = %self.resource,
                action = %action,
                status = %status,
                message = %message,
                "Action failed"
            );
        } else {
            info!(
                event = "action_applied",
                resource = %self.resource,
                action = %action,
                status = %status,
                message = %message,
                "Action processed"
            );
        }
    }

    pub fn log_alert(&self, severity: &str, message: &str) {
        info!(
            event = "alert_sent",
            resource = %self.resource,
            severity = %severity,
            message = %message,
            "Alert handed to channel"
        );
    }

    pub fn log_registration(&self, agent: &str, outcome: &str, detail: Option<&str>) {
        if outcome == "failed" {
            warn!(
                event = "agent_registration",
                agent = %agent,
                outcome = %outcome,
                detail = ?detail,
                "Agent registration failed, continuing without it"
            );
        } else {
            info!(
                event = "agent_registration",
                agent = %agent,
                outcome = %outcome,
                detail = ?detail,
                "Agent registered"
            );
        }
    }

    /// Log agent startup
    pub fn log_startup(&self, version: &str, dry_run: bool, metrics: &[String]) {
        info!(
            event = "agent_started",
            resource = %self.resource,
            agent_version = %version,
            dry_run = dry_run,
            metrics = ?metrics,
            "Triage agent started"
        );
    }

    /// Log agent shutdown
    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "agent_shutdown",
            resource = %self.resource,
            reason = %reason,
            "Triage agent shutting down"
        );
    }
}
