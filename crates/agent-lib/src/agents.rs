//! Built-in agent descriptors and best-effort registration

use crate::health::{components, HealthRegistry};
use crate::models::AgentDescriptor;
use crate::observability::{AgentMetrics, StructuredLogger};
use crate::providers::{AgentRegistry, Registration};
use std::collections::BTreeSet;

pub const ANOMALY_DETECTOR_AGENT: &str = "AnomalyDetectorAgent";
pub const RESOURCE_OPTIMIZER_AGENT: &str = "ResourceOptimizerAgent";
pub const ALERT_MANAGER_AGENT: &str = "AlertManagerAgent";

fn descriptor(name: &str, model: &str, instructions: &str, description: &str) -> AgentDescriptor {
    AgentDescriptor {
        name: name.to_string(),
        model: model.to_string(),
        instructions: instructions.to_string(),
        tools: BTreeSet::new(),
        description: description.to_string(),
    }
}

/// Descriptors of the three pipeline stages, in pipeline order
pub fn builtin_descriptors(model: &str) -> Vec<AgentDescriptor> {
    vec![
        descriptor(
            ANOMALY_DETECTOR_AGENT,
            model,
            "Detect anomalies in Azure metrics like CPU, memory, and disk I/O.",
            "Agent that checks resource metrics against thresholds and reports anomalies.",
        ),
        descriptor(
            RESOURCE_OPTIMIZER_AGENT,
            model,
            "Monitor VM metrics and recommend or apply resource optimizations (resize/restart/cleanup).",
            "Agent that analyzes Azure VM metrics and suggests or applies optimizations to improve performance and reduce cost.",
        ),
        descriptor(
            ALERT_MANAGER_AGENT,
            model,
            "Monitor threads for critical events and notify stakeholders. Escalate unresolved issues.",
            "Agent that formats and sends alerts based on anomaly and optimization outputs.",
        ),
    ]
}

/// Register every descriptor; failures are logged and returned, never raised
pub async fn register_all(
    registry: &dyn AgentRegistry,
    descriptors: &[AgentDescriptor],
    metrics: &AgentMetrics,
    logger: &StructuredLogger,
    health: Option<&HealthRegistry>,
) -> Vec<(String, Registration)> {
    let mut outcomes = Vec::with_capacity(descriptors.len());

    for descriptor in descriptors {
        let registration = registry.register(descriptor).await;

        let detail = match &registration {
            Registration::Registered(id) => Some(id.as_str()),
            Registration::Failed(reason) => Some(reason.as_str()),
            Registration::Accepted => None,
        };
        logger.log_registration(&descriptor.name, registration.label(), detail);
        metrics.inc_registration(registration.label());

        outcomes.push((descriptor.name.clone(), registration));
    }

    if let Some(health) = health {
        let failed: Vec<&str> = outcomes
            .iter()
            .filter(|(_, r)| !r.is_success())
            .map(|(name, _)| name.as_str())
            .collect();
        if failed.is_empty() {
            health.set_healthy(components::AGENT_REGISTRY).await;
        } else {
            health
                .set_degraded(
                    components::AGENT_REGISTRY,
                    format!("registration failed for {}", failed.join(", ")),
                )
                .await;
        }
    }

    outcomes
}
