//! In-process providers for simulation mode and tests

use super::{
    async_trait, AlertChannel, ComputeProvider, DeliveryAck, MetricQuery, MetricsProvider,
    VmSnapshot,
};
use crate::error::ProviderError;
use crate::models::Alert;
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::info;

/// Metrics source used when nothing is configured: every query is unavailable
#[derive(Debug, Default, Clone)]
pub struct UnavailableMetrics;

#[async_trait]
impl MetricsProvider for UnavailableMetrics {
    async fn query(
        &self,
        _resource_id: &str,
        metric_name: &str,
        _query: &MetricQuery,
    ) -> Result<Option<f64>, ProviderError> {
        Err(ProviderError::Unavailable(format!(
            "no metrics source configured for '{}'",
            metric_name
        )))
    }
}

/// Metrics source answering from a fixed table
///
/// Metrics not in the table have no sample.
#[derive(Debug, Default)]
pub struct FixedMetrics {
    answers: HashMap<String, Result<Option<f64>, ProviderError>>,
    queried: Mutex<Vec<String>>,
}

impl FixedMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_value(mut self, metric: impl Into<String>, value: f64) -> Self {
        self.answers.insert(metric.into(), Ok(Some(value)));
        self
    }

    pub fn with_error(mut self, metric: impl Into<String>, error: ProviderError) -> Self {
        self.answers.insert(metric.into(), Err(error));
        self
    }

    /// Metric names queried so far, in call order
    pub fn queried(&self) -> Vec<String> {
        self.queried.lock().map(|q| q.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl MetricsProvider for FixedMetrics {
    async fn query(
        &self,
        _resource_id: &str,
        metric_name: &str,
        _query: &MetricQuery,
    ) -> Result<Option<f64>, ProviderError> {
        if let Ok(mut queried) = self.queried.lock() {
            queried.push(metric_name.to_string());
        }
        self.answers
            .get(metric_name)
            .cloned()
            .unwrap_or(Ok(None))
    }
}

/// A call received by [`RecordingCompute`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComputeCall {
    Restart(String),
    Resize { resource_id: String, target_size: String },
}

/// Compute backend that records calls and answers from configuration
#[derive(Debug, Default)]
pub struct RecordingCompute {
    calls: Mutex<Vec<ComputeCall>>,
    failure: Option<ProviderError>,
    snapshot: Option<VmSnapshot>,
}

impl RecordingCompute {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every restart/resize with `error`
    pub fn failing(error: ProviderError) -> Self {
        Self {
            failure: Some(error),
            ..Self::default()
        }
    }

    pub fn with_snapshot(mut self, snapshot: VmSnapshot) -> Self {
        self.snapshot = Some(snapshot);
        self
    }

    pub fn calls(&self) -> Vec<ComputeCall> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    fn record(&self, call: ComputeCall) -> Result<(), ProviderError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(call);
        }
        match &self.failure {
            Some(e) => Err(e.clone()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl ComputeProvider for RecordingCompute {
    async fn restart(&self, resource_id: &str) -> Result<(), ProviderError> {
        self.record(ComputeCall::Restart(resource_id.to_string()))
    }

    async fn resize(&self, resource_id: &str, target_size: &str) -> Result<(), ProviderError> {
        self.record(ComputeCall::Resize {
            resource_id: resource_id.to_string(),
            target_size: target_size.to_string(),
        })
    }

    async fn describe(&self, resource_id: &str) -> Result<VmSnapshot, ProviderError> {
        self.snapshot.clone().ok_or_else(|| {
            ProviderError::Unavailable(format!("no snapshot recorded for '{}'", resource_id))
        })
    }
}

/// Channel that logs the alert payload
#[derive(Debug, Default, Clone)]
pub struct LogChannel;

impl AlertChannel for LogChannel {
    fn deliver(&self, alert: &Alert) -> DeliveryAck {
        let payload = serde_json::to_string(alert).unwrap_or_else(|_| alert.message.clone());
        info!(
            event = "alert_delivered",
            channel = "log",
            severity = %alert.severity,
            payload = %payload,
            "Sending alert"
        );
        DeliveryAck {
            channel: "log".to_string(),
        }
    }
}

/// Channel that keeps delivered alerts in memory
#[derive(Debug, Default)]
pub struct MemoryChannel {
    delivered: Mutex<Vec<Alert>>,
}

impl MemoryChannel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn delivered(&self) -> Vec<Alert> {
        self.delivered.lock().map(|d| d.clone()).unwrap_or_default()
    }
}

impl AlertChannel for MemoryChannel {
    fn deliver(&self, alert: &Alert) -> DeliveryAck {
        if let Ok(mut delivered) = self.delivered.lock() {
            delivered.push(alert.clone());
        }
        DeliveryAck {
            channel: "memory".to_string(),
        }
    }
}
