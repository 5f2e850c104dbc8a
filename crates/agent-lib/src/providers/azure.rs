//! Azure Resource Manager clients for metrics and compute
//!
//! Thin REST clients over `reqwest`. Credentials are a bearer token resolved
//! by the caller; token acquisition and refresh happen outside the core.

use super::{
    async_trait, classify_status, ComputeProvider, MetricQuery, MetricsProvider, VmSnapshot,
};
use crate::error::ProviderError;
use reqwest::{Client, Method};
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;
use url::Url;

pub const METRICS_API_VERSION: &str = "2018-01-01";
pub const COMPUTE_API_VERSION: &str = "2023-03-01";

/// Authenticated ARM REST client shared by the metrics and compute providers
#[derive(Clone)]
pub struct ArmClient {
    client: Client,
    endpoint: String,
    token: String,
}

impl std::fmt::Debug for ArmClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArmClient")
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

impl ArmClient {
    pub fn new(
        endpoint: impl Into<String>,
        token: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ProviderError::Unavailable(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            token: token.into(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn url(&self, path: &str, query: &[(&str, &str)]) -> Result<Url, ProviderError> {
        let mut url = Url::parse(&format!("{}{}", self.endpoint, path))
            .map_err(|e| ProviderError::Unavailable(format!("invalid resource url: {}", e)))?;
        url.query_pairs_mut().extend_pairs(query);
        Ok(url)
    }

    /// Send a request and return the response body of a successful call
    async fn send(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, &str)],
        body: Option<&serde_json::Value>,
    ) -> Result<String, ProviderError> {
        let url = self.url(path, query)?;
        debug!(method = %method, url = %url, "ARM request");

        let mut request = self.client.request(method, url).bearer_auth(&self.token);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await.unwrap_or_default();

        if !status.is_success() {
            return Err(classify_status(status, &text));
        }
        Ok(text)
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, ProviderError> {
        let text = self.send(Method::GET, path, query, None).await?;
        serde_json::from_str(&text)
            .map_err(|e| ProviderError::Request(format!("unexpected response body: {}", e)))
    }
}

/// Format a window as an ISO-8601 duration (`PT5M`)
fn iso_duration(window: Duration) -> String {
    let secs = window.as_secs();
    if secs > 0 && secs % 60 == 0 {
        format!("PT{}M", secs / 60)
    } else {
        format!("PT{}S", secs)
    }
}

#[derive(Debug, Deserialize)]
struct MetricsResponse {
    #[serde(default)]
    value: Vec<MetricEntry>,
}

#[derive(Debug, Deserialize)]
struct MetricEntry {
    #[serde(default)]
    timeseries: Vec<TimeSeries>,
}

#[derive(Debug, Deserialize)]
struct TimeSeries {
    #[serde(default)]
    data: Vec<DataPoint>,
}

#[derive(Debug, Deserialize)]
struct DataPoint {
    average: Option<f64>,
}

/// Azure Monitor metrics source
#[derive(Debug, Clone)]
pub struct AzureMonitorMetrics {
    arm: ArmClient,
}

impl AzureMonitorMetrics {
    pub fn new(arm: ArmClient) -> Self {
        Self { arm }
    }
}

#[async_trait]
impl MetricsProvider for AzureMonitorMetrics {
    async fn query(
        &self,
        resource_id: &str,
        metric_name: &str,
        query: &MetricQuery,
    ) -> Result<Option<f64>, ProviderError> {
        if resource_id.is_empty() {
            return Err(ProviderError::Unavailable("no resource id configured".to_string()));
        }

        let timespan = iso_duration(query.window);
        let path = format!("{}/providers/microsoft.insights/metrics", resource_id);
        let response: MetricsResponse = self
            .arm
            .get_json(
                &path,
                &[
                    ("api-version", METRICS_API_VERSION),
                    ("metricnames", metric_name),
                    ("timespan", timespan.as_str()),
                    ("aggregation", query.aggregation.as_str()),
                ],
            )
            .await?;

        // First point carrying an average
        let value = response
            .value
            .iter()
            .flat_map(|m| m.timeseries.iter())
            .flat_map(|t| t.data.iter())
            .find_map(|d| d.average);

        Ok(value)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VmResource {
    name: Option<String>,
    #[serde(default)]
    properties: VmProperties,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VmProperties {
    hardware_profile: Option<HardwareProfile>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HardwareProfile {
    vm_size: Option<String>,
}

#[derive(Debug, Deserialize)]
struct InstanceView {
    #[serde(default)]
    statuses: Vec<InstanceStatus>,
}

#[derive(Debug, Deserialize)]
struct InstanceStatus {
    code: Option<String>,
}

fn power_state(view: &InstanceView) -> String {
    let codes: Vec<&str> = view.statuses.iter().filter_map(|s| s.code.as_deref()).collect();
    codes
        .iter()
        .find_map(|c| {
            c.to_lowercase()
                .starts_with("powerstate/")
                .then(|| c.split_once('/').map(|(_, s)| s.to_string()))
                .flatten()
        })
        .unwrap_or_else(|| codes.join(","))
}

/// Azure virtual machine control
// TODO: poll the Azure-AsyncOperation header so `applied` means the operation finished, not just accepted
#[derive(Debug, Clone)]
pub struct AzureCompute {
    arm: ArmClient,
}

impl AzureCompute {
    pub fn new(arm: ArmClient) -> Self {
        Self { arm }
    }
}

#[async_trait]
impl ComputeProvider for AzureCompute {
    async fn restart(&self, resource_id: &str) -> Result<(), ProviderError> {
        self.arm
            .send(
                Method::POST,
                &format!("{}/restart", resource_id),
                &[("api-version", COMPUTE_API_VERSION)],
                None,
            )
            .await?;
        Ok(())
    }

    async fn resize(&self, resource_id: &str, target_size: &str) -> Result<(), ProviderError> {
        let body = serde_json::json!({
            "properties": { "hardwareProfile": { "vmSize": target_size } }
        });
        self.arm
            .send(
                Method::PATCH,
                resource_id,
                &[("api-version", COMPUTE_API_VERSION)],
                Some(&body),
            )
            .await?;
        Ok(())
    }

    async fn describe(&self, resource_id: &str) -> Result<VmSnapshot, ProviderError> {
        let query = [("api-version", COMPUTE_API_VERSION)];
        let vm: VmResource = self.arm.get_json(resource_id, &query).await?;
        let view: InstanceView = self
            .arm
            .get_json(&format!("{}/instanceView", resource_id), &query)
            .await?;

        let fallback_name = resource_id.rsplit('/').next().unwrap_or_default().to_string();
        Ok(VmSnapshot {
            name: vm.name.unwrap_or(fallback_name),
            vm_size: vm.properties.hardware_profile.and_then(|h| h.vm_size),
            power_state: power_state(&view),
        })
    }
}
