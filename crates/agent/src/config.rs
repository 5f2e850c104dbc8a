//! Agent configuration

use agent_lib::{
    config::{PipelineConfig, ResourceRef, Thresholds},
    error::ConfigError,
    providers::DEFAULT_REGISTRY_API_VERSION,
    resilience::RetryPolicy,
};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::time::Duration;

/// Default config file, overridden by `TRIAGE_CONFIG`
const DEFAULT_CONFIG_FILE: &str = "triage.toml";

/// Agent configuration
///
/// Loaded once at startup from an optional TOML file layered under
/// `TRIAGE_*` environment variables (`__` separates nested keys).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// API server port for the handle endpoint, health and metrics
    pub api_port: u16,

    pub subscription_id: String,
    pub resource_group: String,
    /// Resource name, or a full `/subscriptions/...` resource id
    pub resource_name: String,
    pub resource_type: String,

    /// Metric names evaluated on every run, in order
    pub metrics: Vec<String>,

    /// Report actions without executing them
    pub dry_run: bool,

    /// Azure Resource Manager endpoint
    pub management_endpoint: String,

    /// Bearer token for ARM calls; absent runs without live metrics or compute
    pub access_token: Option<String>,

    /// Agents service endpoint; absent registers locally
    pub registry_endpoint: Option<String>,
    pub registry_api_version: String,

    /// Model recorded in agent descriptors
    pub model: String,

    /// Per-attempt timeout for provider calls
    pub provider_timeout_secs: u64,
    /// Attempts per provider call, including the first
    pub max_retries: u32,

    pub thresholds: Thresholds,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            api_port: 8080,
            subscription_id: String::new(),
            resource_group: String::new(),
            resource_name: String::new(),
            resource_type: "webapp".to_string(),
            metrics: Vec::new(),
            dry_run: true,
            management_endpoint: "https://management.azure.com".to_string(),
            access_token: None,
            registry_endpoint: None,
            registry_api_version: DEFAULT_REGISTRY_API_VERSION.to_string(),
            model: "gpt-35-turbo".to_string(),
            provider_timeout_secs: 10,
            max_retries: 3,
            thresholds: Thresholds::default(),
        }
    }
}

impl AgentConfig {
    /// Load configuration from environment and config file
    pub fn load() -> Result<Self> {
        let path =
            std::env::var("TRIAGE_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name(&path).required(false))
            .add_source(
                config::Environment::with_prefix("TRIAGE")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("metrics"),
            )
            .build()
            .context("failed to read configuration")?;

        config
            .try_deserialize()
            .context("invalid configuration values")
    }

    /// Resolve the immutable configuration shared by every run
    pub fn pipeline_config(&self) -> Result<PipelineConfig, ConfigError> {
        let resource = if self.resource_name.trim().is_empty() {
            ResourceRef::simulated()
        } else {
            ResourceRef::resolve(
                &self.subscription_id,
                &self.resource_group,
                &self.resource_name,
                &self.resource_type,
            )?
        };

        self.thresholds.validate()?;

        let metrics = self
            .metrics
            .iter()
            .map(|m| m.trim())
            .filter(|m| !m.is_empty())
            .map(str::to_string)
            .collect();

        Ok(PipelineConfig::new(resource, metrics)
            .with_dry_run(self.dry_run)
            .with_thresholds(self.thresholds))
    }

    pub fn provider_timeout(&self) -> Duration {
        Duration::from_secs(self.provider_timeout_secs)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::default()
            .with_max_attempts(self.max_retries.max(1))
            .with_timeout(self.provider_timeout())
    }

    /// Access token, if one is configured and non-empty
    pub fn token(&self) -> Option<&str> {
        self.access_token
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }
}
