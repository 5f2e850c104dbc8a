//! Pipeline orchestration
//!
//! Runs one user request through detection, optimization and alerting over
//! a thread owned by that request. Stages run strictly in order and gate on
//! typed outcomes; the thread only ever sees rendered text.

mod legacy;
mod outcome;

#[cfg(test)]
mod tests;

pub use legacy::{parse_representative, DEFAULT_CATEGORY};
pub use outcome::{
    OptimizationReport, StageOutcome, ALERT_PREFIX, ANOMALY_MARKER, NO_METRICS_PARSED,
    OPTIMIZATION_MARKER, OPTIMIZATION_PREFIX,
};

use crate::alert::AlertFormatter;
use crate::anomaly::AnomalyDetector;
use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::health::HealthRegistry;
use crate::models::{Anomaly, Message};
use crate::observability::{AgentMetrics, StructuredLogger};
use crate::optimizer::RecommendationEngine;
use crate::providers::{AlertChannel, ComputeProvider, MetricsProvider};
use crate::resilience::RetryPolicy;
use crate::thread::ConversationThread;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, warn};

/// Collaborators injected at process start
pub struct Providers {
    pub metrics: Arc<dyn MetricsProvider>,
    /// `None` runs the optimizer in simulation mode
    pub compute: Option<Arc<dyn ComputeProvider>>,
    pub alerts: Arc<dyn AlertChannel>,
}

/// Input handed to the optimization stage
#[derive(Debug, Clone, PartialEq)]
enum OptimizerInput {
    Anomalies(Vec<Anomaly>),
    /// Thread text matched by the compatibility scan
    Text(String),
}

/// Drives a request through the stage pipeline
pub struct Orchestrator {
    config: PipelineConfig,
    detector: AnomalyDetector,
    engine: RecommendationEngine,
    formatter: AlertFormatter,
    metrics: AgentMetrics,
    logger: StructuredLogger,
    next_run: AtomicU64,
}

impl Orchestrator {
    pub fn new(
        config: PipelineConfig,
        detector: AnomalyDetector,
        engine: RecommendationEngine,
        formatter: AlertFormatter,
        metrics: AgentMetrics,
        logger: StructuredLogger,
    ) -> Self {
        Self {
            config,
            detector,
            engine,
            formatter,
            metrics,
            logger,
            next_run: AtomicU64::new(1),
        }
    }

    /// Build every stage from injected providers
    pub fn assemble(
        config: PipelineConfig,
        providers: Providers,
        retry_policy: RetryPolicy,
        health: Option<HealthRegistry>,
    ) -> Self {
        let metrics = AgentMetrics::new();
        let logger = StructuredLogger::new(config.resource.name.clone());

        let mut detector = AnomalyDetector::new(
            providers.metrics,
            config.thresholds.detection,
            metrics.clone(),
            logger.clone(),
        )
        .with_retry_policy(retry_policy.clone());

        let mut engine = RecommendationEngine::new(
            config.resource.clone(),
            config.thresholds.recommendation,
            metrics.clone(),
            logger.clone(),
        )
        .with_retry_policy(retry_policy);
        if let Some(compute) = providers.compute {
            engine = engine.with_compute(compute);
        }

        if let Some(health) = health {
            detector = detector.with_health(health.clone());
            engine = engine.with_health(health);
        }

        let formatter = AlertFormatter::new(providers.alerts, metrics.clone(), logger.clone());

        Self::new(config, detector, engine, formatter, metrics, logger)
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run one request and return its transcript as `"{role}: {content}"` lines
    ///
    /// Provider failures degrade inside the run; only an internal fault
    /// aborts it.
    pub async fn handle(&self, input: &str) -> Result<Vec<String>, PipelineError> {
        let run_id = self.next_run.fetch_add(1, Ordering::Relaxed);
        let started = Instant::now();
        self.metrics.inc_runs();
        self.logger.log_run_started(run_id, input.len());

        let result = self.run(input).await;
        self.metrics
            .observe_run_duration(started.elapsed().as_secs_f64());

        if let Err(e) = &result {
            self.metrics.inc_run_failures();
            error!(run_id = run_id, error = %e, "Pipeline run aborted");
        }
        result
    }

    async fn run(&self, input: &str) -> Result<Vec<String>, PipelineError> {
        let mut thread = ConversationThread::new();
        thread.append(Message::user(input))?;

        let detection = self
            .detector
            .detect(&self.config.resource.id, &self.config.metrics)
            .await;
        let anomalies = match detection.message {
            Some(message) => {
                thread.append(message)?;
                StageOutcome::AnomalyFound(detection.anomalies)
            }
            None => StageOutcome::NoFinding,
        };

        if let Some(optimizer_input) = Self::anomaly_gate(&anomalies, &thread) {
            let optimization = self.optimize(optimizer_input).await;
            if let Some(content) = optimization.render() {
                thread.append(Message::agent(content))?;
            }

            if let Some(content) = Self::optimization_gate(&optimization, &thread) {
                self.alert(&content);
                thread.append(Message::agent(format!("{}{}", ALERT_PREFIX, content)))?;
            }
        }

        let transcript = thread.transcript();
        thread.seal();
        Ok(transcript)
    }

    /// Gate 1: structured anomalies, else any thread message carrying the marker
    fn anomaly_gate(outcome: &StageOutcome, thread: &ConversationThread) -> Option<OptimizerInput> {
        match outcome {
            StageOutcome::AnomalyFound(anomalies) => Some(OptimizerInput::Anomalies(anomalies.clone())),
            _ => thread.find(ANOMALY_MARKER).map(|m| {
                debug!("Anomaly marker found in thread text, using numeric extraction");
                OptimizerInput::Text(m.content.clone())
            }),
        }
    }

    /// Gate 2: an optimization report, else any thread message carrying the marker
    fn optimization_gate(outcome: &StageOutcome, thread: &ConversationThread) -> Option<String> {
        match outcome {
            StageOutcome::OptimizationFound(report) => Some(report.render()),
            _ => thread.find(OPTIMIZATION_MARKER).map(|m| m.content.clone()),
        }
    }

    async fn optimize(&self, input: OptimizerInput) -> StageOutcome {
        let representative = match input {
            OptimizerInput::Anomalies(anomalies) => {
                anomalies.first().map(|a| (a.metric.clone(), a.value))
            }
            OptimizerInput::Text(text) => parse_representative(&text),
        };

        let Some((metric, value)) = representative else {
            warn!("No numeric metric value in anomaly input, simulating recommendation");
            return StageOutcome::OptimizationFound(OptimizationReport::NoMetricsParsed);
        };

        let recommendation = self.engine.recommend(&metric, value);
        let result = self.engine.apply(&recommendation, self.config.dry_run).await;

        StageOutcome::OptimizationFound(OptimizationReport::Evaluated {
            metric,
            value,
            recommendation,
            result,
        })
    }

    fn alert(&self, content: &str) {
        let alert = self
            .formatter
            .format(&serde_json::json!({ "message": content }));
        self.formatter.send(alert);
    }
}
