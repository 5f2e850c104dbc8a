//! Triage Agent - cloud resource anomaly triage service
//!
//! Resolves configuration once, wires providers into the pipeline and
//! serves the handle endpoint alongside health and metrics.

use agent_lib::{
    agents::{builtin_descriptors, register_all},
    health::{components, HealthRegistry},
    observability::{AgentMetrics, StructuredLogger},
    orchestrator::{Orchestrator, Providers},
    providers::{
        AgentRegistry, ArmClient, AzureCompute, AzureMonitorMetrics, ComputeProvider,
        HttpAgentRegistry, LocalRegistry, LogChannel, UnavailableMetrics,
    },
    ResourceKind,
};
use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod api;
mod config;

const AGENT_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting triage-agent");

    let config = config::AgentConfig::load()?;
    let pipeline = config
        .pipeline_config()
        .context("invalid pipeline configuration")?;
    info!(
        resource = %pipeline.resource.name,
        resource_id = %pipeline.resource.id,
        "Agent configured"
    );

    let health_registry = HealthRegistry::new();
    for name in components::ALL {
        health_registry.register(name).await;
    }

    let metrics = AgentMetrics::new();
    let logger = StructuredLogger::new(pipeline.resource.name.clone());
    logger.log_startup(AGENT_VERSION, pipeline.dry_run, &pipeline.metrics);

    let providers = build_providers(&config, pipeline.resource.kind, &health_registry).await?;

    let registry = build_registry(&config);
    register_all(
        registry.as_ref(),
        &builtin_descriptors(&config.model),
        &metrics,
        &logger,
        Some(&health_registry),
    )
    .await;

    let orchestrator = Arc::new(Orchestrator::assemble(
        pipeline,
        providers,
        config.retry_policy(),
        Some(health_registry.clone()),
    ));
    let app_state = Arc::new(api::AppState::new(health_registry.clone(), orchestrator));

    // Mark agent as ready after initialization
    health_registry.set_ready(true).await;

    let api_handle = tokio::spawn(api::serve(config.api_port, app_state));

    tokio::select! {
        signal = tokio::signal::ctrl_c() => {
            signal?;
            logger.log_shutdown("SIGINT received");
        }
        served = api_handle => {
            logger.log_shutdown("API server stopped");
            served.context("API server task panicked")??;
        }
    }

    info!("Shutting down");
    Ok(())
}

/// Choose metrics and compute providers from configuration
async fn build_providers(
    config: &config::AgentConfig,
    kind: ResourceKind,
    health: &HealthRegistry,
) -> Result<Providers> {
    let alerts = Arc::new(LogChannel);

    let Some(token) = config.token() else {
        warn!("No access token configured, running in simulation mode");
        health
            .set_degraded(components::METRICS_PROVIDER, "no access token configured")
            .await;
        health
            .set_degraded(components::COMPUTE_PROVIDER, "simulation mode")
            .await;
        return Ok(Providers {
            metrics: Arc::new(UnavailableMetrics),
            compute: None,
            alerts,
        });
    };

    let arm = ArmClient::new(
        config.management_endpoint.as_str(),
        token,
        config.provider_timeout(),
    )
    .context("failed to build ARM client")?;

    let compute = match kind {
        ResourceKind::VirtualMachine | ResourceKind::Explicit => {
            Some(Arc::new(AzureCompute::new(arm.clone())) as Arc<dyn ComputeProvider>)
        }
        _ => {
            health
                .set_degraded(
                    components::COMPUTE_PROVIDER,
                    "resource is not a virtual machine; actions are simulated",
                )
                .await;
            None
        }
    };

    Ok(Providers {
        metrics: Arc::new(AzureMonitorMetrics::new(arm)),
        compute,
        alerts,
    })
}

fn build_registry(config: &config::AgentConfig) -> Box<dyn AgentRegistry> {
    match (&config.registry_endpoint, config.token()) {
        (Some(endpoint), Some(token)) if !endpoint.trim().is_empty() => Box::new(
            HttpAgentRegistry::new(endpoint.as_str(), token, config.provider_timeout())
                .with_api_version(config.registry_api_version.as_str())
                .with_retry_policy(config.retry_policy()),
        ),
        (Some(_), None) => {
            warn!("Registry endpoint configured without an access token, registering locally");
            Box::new(LocalRegistry)
        }
        _ => Box::new(LocalRegistry),
    }
}
