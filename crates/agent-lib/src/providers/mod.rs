//! Narrow interfaces to the pipeline's external collaborators
//!
//! The core only talks to these traits. Concrete clients are chosen once at
//! process start and injected; nothing here checks for availability.

mod azure;
mod registry;
mod simulated;

#[cfg(test)]
mod tests;

pub use azure::{AzureCompute, AzureMonitorMetrics, ArmClient, COMPUTE_API_VERSION, METRICS_API_VERSION};
pub use registry::{HttpAgentRegistry, LocalRegistry, DEFAULT_REGISTRY_API_VERSION};
pub use simulated::{
    ComputeCall, FixedMetrics, LogChannel, MemoryChannel, RecordingCompute, UnavailableMetrics,
};

use crate::error::ProviderError;
use crate::models::{AgentDescriptor, Alert};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub use async_trait::async_trait;

/// Lookback window used for metric queries
pub const DEFAULT_METRIC_WINDOW: Duration = Duration::from_secs(5 * 60);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Aggregation {
    Average,
}

impl Aggregation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Aggregation::Average => "Average",
        }
    }
}

/// Window and aggregation of a metric query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricQuery {
    pub window: Duration,
    pub aggregation: Aggregation,
}

impl Default for MetricQuery {
    fn default() -> Self {
        Self {
            window: DEFAULT_METRIC_WINDOW,
            aggregation: Aggregation::Average,
        }
    }
}

/// Source of the latest metric values
#[async_trait]
pub trait MetricsProvider: Send + Sync {
    /// Latest aggregated value, or `None` when no sample exists in the window
    async fn query(
        &self,
        resource_id: &str,
        metric_name: &str,
        query: &MetricQuery,
    ) -> Result<Option<f64>, ProviderError>;
}

/// Point-in-time view of a virtual machine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VmSnapshot {
    pub name: String,
    pub vm_size: Option<String>,
    pub power_state: String,
}

/// Backend able to act on a compute resource
#[async_trait]
pub trait ComputeProvider: Send + Sync {
    async fn restart(&self, resource_id: &str) -> Result<(), ProviderError>;

    async fn resize(&self, resource_id: &str, target_size: &str) -> Result<(), ProviderError>;

    async fn describe(&self, resource_id: &str) -> Result<VmSnapshot, ProviderError>;
}

/// Result of a registration attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "detail", rename_all = "snake_case")]
pub enum Registration {
    /// Backend created the agent and returned its id
    Registered(String),
    /// Accepted without a backend id (local registry)
    Accepted,
    Failed(String),
}

impl Registration {
    pub fn is_success(&self) -> bool {
        !matches!(self, Registration::Failed(_))
    }

    pub fn label(&self) -> &'static str {
        match self {
            Registration::Registered(_) => "registered",
            Registration::Accepted => "accepted",
            Registration::Failed(_) => "failed",
        }
    }
}

/// Orchestration backend that agent descriptors are registered with
///
/// Implementations must never fail across this boundary: provider errors are
/// reported as `Registration::Failed`.
#[async_trait]
pub trait AgentRegistry: Send + Sync {
    async fn register(&self, descriptor: &AgentDescriptor) -> Registration;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryAck {
    pub channel: String,
}

/// Sink that receives formatted alerts
pub trait AlertChannel: Send + Sync {
    fn deliver(&self, alert: &Alert) -> DeliveryAck;
}

/// Map a failed HTTP response to a provider error
pub(crate) fn classify_status(status: reqwest::StatusCode, body: &str) -> ProviderError {
    let detail = if body.is_empty() {
        status.to_string()
    } else {
        format!("{}: {}", status, body)
    };

    if status == reqwest::StatusCode::UNAUTHORIZED
        || status == reqwest::StatusCode::FORBIDDEN
        || body.contains("AuthorizationFailed")
        || body.contains("does not have authorization")
    {
        ProviderError::Authorization(detail)
    } else if status.is_server_error() || status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        ProviderError::Request(detail)
    } else {
        ProviderError::Unavailable(detail)
    }
}
