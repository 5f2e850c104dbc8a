//! Agent registration backends

use super::{async_trait, classify_status, AgentRegistry, Registration};
use crate::error::ProviderError;
use crate::models::AgentDescriptor;
use crate::observability::AgentMetrics;
use crate::resilience::{retry, RetryPolicy};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_REGISTRY_API_VERSION: &str = "2025-05-01";

#[derive(Debug, Serialize)]
struct CreateAgentRequest<'a> {
    model: &'a str,
    name: &'a str,
    instructions: &'a str,
    description: &'a str,
    tools: Vec<ToolRef<'a>>,
}

#[derive(Debug, Serialize)]
struct ToolRef<'a> {
    #[serde(rename = "type")]
    kind: &'a str,
}

#[derive(Debug, Deserialize)]
struct CreateAgentResponse {
    id: Option<String>,
}

/// Registers agents with a remote agents service over HTTP
pub struct HttpAgentRegistry {
    client: Option<Client>,
    endpoint: String,
    token: String,
    api_version: String,
    retry_policy: RetryPolicy,
    metrics: AgentMetrics,
}

impl HttpAgentRegistry {
    /// Build the registry; a client that cannot be built turns every
    /// registration into a failure instead of an error here
    pub fn new(endpoint: impl Into<String>, token: impl Into<String>, timeout: Duration) -> Self {
        let client = Client::builder().timeout(timeout).build().ok();
        Self {
            client,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            token: token.into(),
            api_version: DEFAULT_REGISTRY_API_VERSION.to_string(),
            retry_policy: RetryPolicy::default(),
            metrics: AgentMetrics::new(),
        }
    }

    pub fn with_api_version(mut self, api_version: impl Into<String>) -> Self {
        self.api_version = api_version.into();
        self
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    async fn create_agent(&self, descriptor: &AgentDescriptor) -> Result<Registration, ProviderError> {
        let client = self
            .client
            .as_ref()
            .ok_or_else(|| ProviderError::Unavailable("HTTP client unavailable".to_string()))?;

        let body = CreateAgentRequest {
            model: &descriptor.model,
            name: &descriptor.name,
            instructions: &descriptor.instructions,
            description: &descriptor.description,
            tools: descriptor.tools.iter().map(|t| ToolRef { kind: t }).collect(),
        };

        let url = format!("{}/assistants", self.endpoint);
        debug!(url = %url, agent = %descriptor.name, "Registering agent");

        let response = client
            .post(&url)
            .query(&[("api-version", self.api_version.as_str())])
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(classify_status(status, &text));
        }

        let parsed: CreateAgentResponse = serde_json::from_str(&text)
            .map_err(|e| ProviderError::Request(format!("unexpected response body: {}", e)))?;
        Ok(match parsed.id {
            Some(id) => Registration::Registered(id),
            None => Registration::Accepted,
        })
    }
}

#[async_trait]
impl AgentRegistry for HttpAgentRegistry {
    async fn register(&self, descriptor: &AgentDescriptor) -> Registration {
        let result = retry("registry", &self.retry_policy, &self.metrics, || {
            self.create_agent(descriptor)
        })
        .await;

        match result {
            Ok(registration) => registration,
            Err(e) => Registration::Failed(e.to_string()),
        }
    }
}

/// In-process registry used when no agents service is configured
#[derive(Debug, Default, Clone)]
pub struct LocalRegistry;

#[async_trait]
impl AgentRegistry for LocalRegistry {
    async fn register(&self, descriptor: &AgentDescriptor) -> Registration {
        debug!(agent = %descriptor.name, "Local registration");
        Registration::Accepted
    }
}
