//! Agent library for cloud resource triage
//!
//! This crate provides the core functionality for:
//! - Anomaly detection over cloud resource metrics
//! - Rule-based optimization recommendations, simulated or applied
//! - Alert formatting and hand-off
//! - Pipeline orchestration over a per-request conversation thread
//! - Provider interfaces with Azure and in-process implementations
//! - Health checks and observability

pub mod agents;
pub mod alert;
pub mod anomaly;
pub mod config;
pub mod error;
pub mod health;
pub mod models;
pub mod observability;
pub mod optimizer;
pub mod orchestrator;
pub mod providers;
pub mod resilience;
pub mod thread;

pub use config::{PipelineConfig, ResourceKind, ResourceRef, Thresholds};
pub use error::{ConfigError, PipelineError, ProviderError};
pub use health::{
    ComponentHealth, ComponentStatus, HealthRegistry, HealthResponse, ReadinessResponse,
};
pub use models::*;
pub use observability::{AgentMetrics, StructuredLogger};
pub use orchestrator::{Orchestrator, Providers, StageOutcome};
pub use resilience::RetryPolicy;
