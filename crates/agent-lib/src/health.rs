//! Health tracking for the pipeline's external collaborators
//!
//! Every provider the pipeline depends on is a component. Provider failures
//! degrade a component instead of failing the process, so `/healthz` stays
//! green while runs fall back to simulated outcomes.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Health status of a component
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentStatus {
    Healthy,
    /// Working in a fallback mode (simulation, skipped metrics)
    Degraded,
    Unhealthy,
}

impl ComponentStatus {
    pub fn is_operational(&self) -> bool {
        matches!(self, ComponentStatus::Healthy | ComponentStatus::Degraded)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ComponentStatus::Healthy => "healthy",
            ComponentStatus::Degraded => "degraded",
            ComponentStatus::Unhealthy => "unhealthy",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub status: ComponentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub last_check_timestamp: i64,
}

impl ComponentHealth {
    pub fn healthy() -> Self {
        Self {
            status: ComponentStatus::Healthy,
            message: None,
            last_check_timestamp: chrono::Utc::now().timestamp(),
        }
    }

    pub fn degraded(message: impl Into<String>) -> Self {
        Self {
            status: ComponentStatus::Degraded,
            message: Some(message.into()),
            last_check_timestamp: chrono::Utc::now().timestamp(),
        }
    }

    pub fn unhealthy(message: impl Into<String>) -> Self {
        Self {
            status: ComponentStatus::Unhealthy,
            message: Some(message.into()),
            last_check_timestamp: chrono::Utc::now().timestamp(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: ComponentStatus,
    pub components: HashMap<String, ComponentHealth>,
}

impl HealthResponse {
    /// Worst component status wins
    pub fn compute_status(components: &HashMap<String, ComponentHealth>) -> ComponentStatus {
        let mut has_degraded = false;

        for health in components.values() {
            match health.status {
                ComponentStatus::Unhealthy => return ComponentStatus::Unhealthy,
                ComponentStatus::Degraded => has_degraded = true,
                ComponentStatus::Healthy => {}
            }
        }

        if has_degraded {
            ComponentStatus::Degraded
        } else {
            ComponentStatus::Healthy
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadinessResponse {
    pub ready: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Component names for health tracking
pub mod components {
    pub const METRICS_PROVIDER: &str = "metrics_provider";
    pub const COMPUTE_PROVIDER: &str = "compute_provider";
    pub const AGENT_REGISTRY: &str = "agent_registry";
    pub const ALERT_CHANNEL: &str = "alert_channel";

    pub const ALL: [&str; 4] = [METRICS_PROVIDER, COMPUTE_PROVIDER, AGENT_REGISTRY, ALERT_CHANNEL];
}

/// Shared registry of component health; clones share state
#[derive(Debug, Clone)]
pub struct HealthRegistry {
    components: Arc<RwLock<HashMap<String, ComponentHealth>>>,
    ready: Arc<RwLock<bool>>,
}

impl Default for HealthRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl HealthRegistry {
    pub fn new() -> Self {
        Self {
            components: Arc::new(RwLock::new(HashMap::new())),
            ready: Arc::new(RwLock::new(false)),
        }
    }

    /// Register a component with initial healthy status
    pub async fn register(&self, name: &str) {
        let mut components = self.components.write().await;
        components.insert(name.to_string(), ComponentHealth::healthy());
    }

    pub async fn update(&self, name: &str, health: ComponentHealth) {
        let mut components = self.components.write().await;
        components.insert(name.to_string(), health);
    }

    pub async fn set_healthy(&self, name: &str) {
        self.update(name, ComponentHealth::healthy()).await;
    }

    pub async fn set_degraded(&self, name: &str, message: impl Into<String>) {
        self.update(name, ComponentHealth::degraded(message)).await;
    }

    pub async fn set_unhealthy(&self, name: &str, message: impl Into<String>) {
        self.update(name, ComponentHealth::unhealthy(message)).await;
    }

    /// Record the outcome of a provider call
    ///
    /// A success only clears a degradation recorded by an earlier call
    /// failure; a degradation set at startup (e.g. simulation mode) is kept.
    pub async fn record_call<E: std::fmt::Display>(&self, name: &str, outcome: Result<(), &E>) {
        let mut components = self.components.write().await;
        match outcome {
            Ok(()) => {
                let clear = components
                    .get(name)
                    .map(|h| {
                        h.status == ComponentStatus::Degraded
                            && h.message.as_deref().is_some_and(|m| m.starts_with(CALL_FAILED_PREFIX))
                    })
                    .unwrap_or(true);
                if clear {
                    components.insert(name.to_string(), ComponentHealth::healthy());
                }
            }
            Err(e) => {
                components.insert(
                    name.to_string(),
                    ComponentHealth::degraded(format!("{}{}", CALL_FAILED_PREFIX, e)),
                );
            }
        }
    }

    pub async fn set_ready(&self, ready: bool) {
        let mut r = self.ready.write().await;
        *r = ready;
    }

    pub async fn health(&self) -> HealthResponse {
        let components = self.components.read().await.clone();
        let status = HealthResponse::compute_status(&components);
        HealthResponse { status, components }
    }

    pub async fn readiness(&self) -> ReadinessResponse {
        let ready = *self.ready.read().await;
        let health = self.health().await;

        if !ready {
            ReadinessResponse {
                ready: false,
                reason: Some("Agent not yet initialized".to_string()),
            }
        } else if !health.status.is_operational() {
            ReadinessResponse {
                ready: false,
                reason: Some("Critical component unhealthy".to_string()),
            }
        } else {
            ReadinessResponse {
                ready: true,
                reason: None,
            }
        }
    }
}

const CALL_FAILED_PREFIX: &str = "last call failed: ";

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProviderError;

    #[tokio::test]
    async fn test_health_registry_initial_state() {
        let registry = HealthRegistry::new();
        let health = registry.health().await;

        assert_eq!(health.status, ComponentStatus::Healthy);
        assert!(health.components.is_empty());
    }

    #[tokio::test]
    async fn test_degraded_component_keeps_service_operational() {
        let registry = HealthRegistry::new();
        for name in components::ALL {
            registry.register(name).await;
        }
        registry
            .set_degraded(components::COMPUTE_PROVIDER, "simulation mode")
            .await;
        registry.set_ready(true).await;

        let health = registry.health().await;
        assert_eq!(health.status, ComponentStatus::Degraded);
        assert!(registry.readiness().await.ready);
    }

    #[tokio::test]
    async fn test_unhealthy_component_fails_readiness() {
        let registry = HealthRegistry::new();
        registry.register(components::ALERT_CHANNEL).await;
        registry.set_ready(true).await;
        registry
            .set_unhealthy(components::ALERT_CHANNEL, "sink closed")
            .await;

        let readiness = registry.readiness().await;
        assert!(!readiness.ready);
        assert_eq!(health_status(&registry).await, ComponentStatus::Unhealthy);
    }

    #[tokio::test]
    async fn test_readiness_not_ready_initially() {
        let registry = HealthRegistry::new();
        let readiness = registry.readiness().await;

        assert!(!readiness.ready);
        assert!(readiness.reason.is_some());
    }

    #[tokio::test]
    async fn test_record_call_failure_then_recovery() {
        let registry = HealthRegistry::new();
        registry.register(components::METRICS_PROVIDER).await;

        let err = ProviderError::Request("503".into());
        registry
            .record_call(components::METRICS_PROVIDER, Err(&err))
            .await;
        assert_eq!(health_status(&registry).await, ComponentStatus::Degraded);

        registry
            .record_call::<ProviderError>(components::METRICS_PROVIDER, Ok(()))
            .await;
        assert_eq!(health_status(&registry).await, ComponentStatus::Healthy);
    }

    #[tokio::test]
    async fn test_record_call_success_keeps_startup_degradation() {
        let registry = HealthRegistry::new();
        registry
            .set_degraded(components::COMPUTE_PROVIDER, "simulation mode")
            .await;

        registry
            .record_call::<ProviderError>(components::COMPUTE_PROVIDER, Ok(()))
            .await;
        assert_eq!(health_status(&registry).await, ComponentStatus::Degraded);
    }

    async fn health_status(registry: &HealthRegistry) -> ComponentStatus {
        registry.health().await.status
    }
}
