//! Recommendation engine: rule evaluation plus simulated or live apply

use super::rules;
use crate::config::{RecommendationThresholds, ResourceRef};
use crate::error::ProviderError;
use crate::health::{components, HealthRegistry};
use crate::models::{Action, ActionResult, ActionStatus, Recommendation};
use crate::observability::{AgentMetrics, StructuredLogger};
use crate::providers::{ComputeProvider, VmSnapshot};
use crate::resilience::{retry, RetryPolicy};
use std::sync::Arc;
use tracing::warn;

/// Size every resize targets
pub const RESIZE_TARGET_SIZE: &str = "Standard_D8s_v3";

/// Size reported for the simulated VM
pub const SIMULATED_VM_SIZE: &str = "Standard_D4s_v3";

/// Maps metrics to actions and applies them through an optional compute backend
pub struct RecommendationEngine {
    resource: ResourceRef,
    thresholds: RecommendationThresholds,
    /// `None` runs in simulation mode
    compute: Option<Arc<dyn ComputeProvider>>,
    retry_policy: RetryPolicy,
    metrics: AgentMetrics,
    logger: StructuredLogger,
    health: Option<HealthRegistry>,
}

impl RecommendationEngine {
    pub fn new(
        resource: ResourceRef,
        thresholds: RecommendationThresholds,
        metrics: AgentMetrics,
        logger: StructuredLogger,
    ) -> Self {
        Self {
            resource,
            thresholds,
            compute: None,
            retry_policy: RetryPolicy::default(),
            metrics,
            logger,
            health: None,
        }
    }

    /// Attach a live compute backend
    pub fn with_compute(mut self, compute: Arc<dyn ComputeProvider>) -> Self {
        self.compute = Some(compute);
        self
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    pub fn with_health(mut self, health: HealthRegistry) -> Self {
        self.health = Some(health);
        self
    }

    pub fn is_live(&self) -> bool {
        self.compute.is_some()
    }

    pub fn recommend(&self, category: &str, value: f64) -> Recommendation {
        let recommendation = rules::recommend(category, value, &self.thresholds);
        self.metrics.inc_recommendation(recommendation.action.as_str());
        self.logger.log_recommendation(
            category,
            value,
            recommendation.action.as_str(),
            &recommendation.reason,
        );
        recommendation
    }

    /// Apply or simulate a recommendation
    ///
    /// Restart and resize only reach the compute backend when `dry_run` is
    /// false and a backend is configured. Backend failures become an `error`
    /// result, never an `Err`.
    pub async fn apply(&self, recommendation: &Recommendation, dry_run: bool) -> ActionResult {
        let result = match recommendation.action {
            Action::NoAction => ActionResult::new(ActionStatus::Ok, recommendation.reason.clone()),
            Action::RecommendCleanup => {
                let vm = self.vm_snapshot().await;
                ActionResult::new(
                    ActionStatus::Recommended,
                    format!("Recommend disk cleanup on {}: {}", vm.name, recommendation.reason),
                )
            }
            Action::RecommendRestart => {
                let vm = self.vm_snapshot().await;
                let message = format!("Recommend restarting VM {}: {}", vm.name, recommendation.reason);
                self.execute(message, dry_run, |compute, id| async move {
                    compute.restart(&id).await
                })
                .await
            }
            Action::RecommendResize => {
                let vm = self.vm_snapshot().await;
                let message = format!(
                    "Recommend resizing VM {} to {}: {}",
                    vm.name, RESIZE_TARGET_SIZE, recommendation.reason
                );
                self.execute(message, dry_run, |compute, id| async move {
                    compute.resize(&id, RESIZE_TARGET_SIZE).await
                })
                .await
            }
            other => ActionResult::new(
                ActionStatus::UnknownAction,
                format!("Action {} not supported", other),
            ),
        };

        self.metrics.inc_action(result.status.as_str());
        self.logger.log_action(
            recommendation.action.as_str(),
            result.status.as_str(),
            &result.message,
        );
        result
    }

    /// Run a live compute operation, or report it as simulated
    async fn execute<F, Fut>(&self, message: String, dry_run: bool, op: F) -> ActionResult
    where
        F: Fn(Arc<dyn ComputeProvider>, String) -> Fut,
        Fut: std::future::Future<Output = Result<(), ProviderError>>,
    {
        let compute = match &self.compute {
            Some(compute) if !dry_run => compute.clone(),
            _ => return ActionResult::new(ActionStatus::Simulated, message),
        };

        let id = self.resource.id.clone();
        let outcome = retry("compute", &self.retry_policy, &self.metrics, || {
            op(compute.clone(), id.clone())
        })
        .await;
        self.record_health(outcome.as_ref().map(|_| ())).await;

        match outcome {
            Ok(()) => ActionResult::new(ActionStatus::Applied, message),
            Err(e) => ActionResult::new(ActionStatus::Error, e.to_string()),
        }
    }

    /// Describe the target VM, falling back to a simulated snapshot
    pub async fn vm_snapshot(&self) -> VmSnapshot {
        let simulated = VmSnapshot {
            name: self.resource.name.clone(),
            vm_size: Some(SIMULATED_VM_SIZE.to_string()),
            power_state: "running".to_string(),
        };

        let Some(compute) = &self.compute else {
            return simulated;
        };
        if self.resource.id.is_empty() {
            return simulated;
        }

        let id = self.resource.id.as_str();
        let result = retry("compute", &self.retry_policy, &self.metrics, move || {
            compute.describe(id)
        })
        .await;
        self.record_health(result.as_ref().map(|_| ())).await;

        match result {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(
                    resource = %self.resource.name,
                    error = %e,
                    "Could not describe VM, using simulated snapshot"
                );
                simulated
            }
        }
    }

    async fn record_health(&self, outcome: Result<(), &ProviderError>) {
        if let Some(health) = &self.health {
            health.record_call(components::COMPUTE_PROVIDER, outcome).await;
        }
    }
}
