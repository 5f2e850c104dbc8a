//! API client for communicating with a running triage agent

use anyhow::{Context, Result};
use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use url::Url;

pub use agent_lib::health::HealthResponse;

/// API client for the triage agent
pub struct ApiClient {
    client: Client,
    base_url: Url,
}

impl ApiClient {
    /// Create a new API client
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        let base_url = Url::parse(base_url).context("Invalid API URL")?;

        Ok(Self { client, base_url })
    }

    /// Make a GET request
    ///
    /// Health checks answer 503 with a full body, so any status that
    /// carries a parseable payload is accepted when `allow_error_body` is set.
    pub async fn get<T: DeserializeOwned>(&self, path: &str, allow_error_body: bool) -> Result<T> {
        let url = self.base_url.join(path).context("Invalid path")?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("Failed to send request")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            if allow_error_body {
                if let Ok(parsed) = serde_json::from_str(&body) {
                    return Ok(parsed);
                }
            }
            anyhow::bail!("API error ({}): {}", status, body);
        }

        response.json().await.context("Failed to parse response")
    }

    /// Make a POST request with JSON body
    pub async fn post<T: DeserializeOwned, B: Serialize>(&self, path: &str, body: &B) -> Result<T> {
        let url = self.base_url.join(path).context("Invalid path")?;

        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .context("Failed to send request")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("API error ({}): {}", status, body);
        }

        response.json().await.context("Failed to parse response")
    }

    /// Run one request through the agent pipeline
    pub async fn handle(&self, input: &str) -> Result<HandleResponse> {
        self.post(
            "api/v1/handle",
            &HandleRequest {
                input: input.to_string(),
            },
        )
        .await
    }

    pub async fn health(&self) -> Result<HealthResponse> {
        self.get("healthz", true).await
    }
}

// API request and response types

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HandleRequest {
    pub input: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HandleResponse {
    pub messages: Vec<String>,
}
