//! End-to-end pipeline scenarios
//!
//! These tests verify:
//! - Transcript order and marker text for a full run
//! - Gating: no optimization or alert without an anomaly
//! - Compatibility scan of thread text for legacy inputs
//! - Degradation on provider failures
//! - Independent threads for concurrent requests

use super::*;
use crate::config::{ResourceKind, ResourceRef};
use crate::error::ProviderError;
use crate::models::AlertSeverity;
use crate::providers::{ComputeCall, FixedMetrics, MemoryChannel, RecordingCompute};
use std::time::Duration;

const VM_ID: &str = "/subscriptions/sub/resourceGroups/rg/providers/Microsoft.Compute/virtualMachines/vm-01";

fn config(metrics: &[&str]) -> PipelineConfig {
    PipelineConfig::new(
        ResourceRef {
            id: VM_ID.to_string(),
            name: "vm-01".to_string(),
            kind: ResourceKind::VirtualMachine,
        },
        metrics.iter().map(|m| m.to_string()).collect(),
    )
}

struct Harness {
    orchestrator: Orchestrator,
    alerts: Arc<MemoryChannel>,
}

fn harness(config: PipelineConfig, metrics: FixedMetrics, compute: Option<Arc<RecordingCompute>>) -> Harness {
    let alerts = Arc::new(MemoryChannel::new());
    let providers = Providers {
        metrics: Arc::new(metrics),
        compute: compute.map(|c| c as Arc<dyn ComputeProvider>),
        alerts: alerts.clone(),
    };
    let orchestrator = Orchestrator::assemble(
        config,
        providers,
        RetryPolicy::no_retry(Duration::from_secs(1)),
        None,
    );
    Harness { orchestrator, alerts }
}

#[tokio::test]
async fn test_cpu_anomaly_runs_every_stage() {
    let h = harness(
        config(&["Percentage CPU"]),
        FixedMetrics::new().with_value("Percentage CPU", 85.0),
        None,
    );

    let transcript = h.orchestrator.handle("Check CPU usage").await.unwrap();

    assert_eq!(
        transcript,
        vec![
            "user: Check CPU usage".to_string(),
            "agent: ⚠️ Anomaly report:\nPercentage CPU = 85".to_string(),
            "agent: 🛠️ Optimization: Recommend resizing VM vm-01 to Standard_D8s_v3: High CPU 85%"
                .to_string(),
            "agent: ALERT: 🛠️ Optimization: Recommend resizing VM vm-01 to Standard_D8s_v3: High CPU 85%"
                .to_string(),
        ]
    );

    let delivered = h.alerts.delivered();
    assert_eq!(delivered.len(), 1);
    assert_eq!(delivered[0].severity, AlertSeverity::High);
    assert!(delivered[0].message.starts_with("🚨 Alert: 🛠️ Optimization:"));
}

#[tokio::test]
async fn test_no_anomaly_stops_after_detection() {
    let h = harness(
        config(&["Percentage CPU"]),
        FixedMetrics::new().with_value("Percentage CPU", 50.0),
        None,
    );

    let transcript = h.orchestrator.handle("Check CPU usage").await.unwrap();

    assert_eq!(transcript, vec!["user: Check CPU usage".to_string()]);
    assert!(transcript.iter().all(|line| !line.contains(OPTIMIZATION_MARKER)));
    assert!(h.alerts.delivered().is_empty());
}

#[tokio::test]
async fn test_no_metrics_configured() {
    let h = harness(config(&[]), FixedMetrics::new(), None);

    let transcript = h.orchestrator.handle("").await.unwrap();

    assert_eq!(transcript, vec!["user: ".to_string()]);
}

#[tokio::test]
async fn test_first_anomaly_is_representative() {
    let h = harness(
        config(&["Disk Read Bytes", "Percentage CPU"]),
        FixedMetrics::new()
            .with_value("Disk Read Bytes", 6e7)
            .with_value("Percentage CPU", 99.0),
        None,
    );

    let transcript = h.orchestrator.handle("status").await.unwrap();

    assert_eq!(transcript.len(), 4);
    assert_eq!(
        transcript[2],
        "agent: 🛠️ Optimization: Recommend disk cleanup on vm-01: High disk I/O 60000000"
    );
}

#[tokio::test]
async fn test_user_text_with_marker_uses_numeric_extraction() {
    let h = harness(config(&["Percentage CPU"]), FixedMetrics::new(), None);

    let transcript = h
        .orchestrator
        .handle("Anomaly seen, CPU at 70 percent")
        .await
        .unwrap();

    assert_eq!(transcript.len(), 3);
    assert_eq!(
        transcript[1],
        "agent: 🛠️ Optimization: Recommend restarting VM vm-01: Moderate CPU 70%"
    );
    assert!(transcript[2].starts_with("agent: ALERT: 🛠️"));
}

#[tokio::test]
async fn test_marker_without_number_is_simulated() {
    let h = harness(config(&[]), FixedMetrics::new(), None);

    let transcript = h.orchestrator.handle("Anomaly check please").await.unwrap();

    assert_eq!(
        transcript,
        vec![
            "user: Anomaly check please".to_string(),
            "agent: 🛠️ Optimization: no numeric metrics parsed; simulated recommendation"
                .to_string(),
            "agent: ALERT: 🛠️ Optimization: no numeric metrics parsed; simulated recommendation"
                .to_string(),
        ]
    );
}

#[tokio::test]
async fn test_marker_is_case_sensitive() {
    let h = harness(config(&[]), FixedMetrics::new(), None);

    let transcript = h.orchestrator.handle("anomaly at 95").await.unwrap();

    assert_eq!(transcript.len(), 1);
}

#[tokio::test]
async fn test_optimization_marker_alone_does_not_pass_first_gate() {
    let h = harness(config(&[]), FixedMetrics::new(), None);

    let transcript = h.orchestrator.handle("🛠️ please fix").await.unwrap();

    assert_eq!(transcript, vec!["user: 🛠️ please fix".to_string()]);
    assert!(h.alerts.delivered().is_empty());
}

#[tokio::test]
async fn test_provider_failures_degrade_without_aborting() {
    let metrics = FixedMetrics::new()
        .with_error(
            "Percentage CPU",
            ProviderError::Authorization("AuthorizationFailed".into()),
        )
        .with_error("Disk Read Bytes", ProviderError::Request("503".into()))
        .with_value("Available Memory Bytes", 5e8);
    let h = harness(
        config(&["Percentage CPU", "Disk Read Bytes", "Available Memory Bytes"]),
        metrics,
        None,
    );

    let transcript = h.orchestrator.handle("Check everything").await.unwrap();

    assert_eq!(transcript.len(), 4);
    assert_eq!(
        transcript[1],
        "agent: ⚠️ Anomaly report:\nAvailable Memory Bytes = 500000000"
    );
    assert!(transcript[2].contains("Low memory 500000000 bytes"));
}

#[tokio::test]
async fn test_live_mode_applies_through_compute() {
    let compute = Arc::new(RecordingCompute::new());
    let h = harness(
        config(&["Percentage CPU"]).with_dry_run(false),
        FixedMetrics::new().with_value("Percentage CPU", 65.0),
        Some(compute.clone()),
    );

    let transcript = h.orchestrator.handle("Check CPU usage").await.unwrap();

    assert_eq!(compute.calls(), vec![ComputeCall::Restart(VM_ID.to_string())]);
    assert_eq!(
        transcript[2],
        "agent: 🛠️ Optimization: Recommend restarting VM vm-01: Moderate CPU 65%"
    );
}

#[tokio::test]
async fn test_compute_failure_still_produces_transcript() {
    let compute = Arc::new(RecordingCompute::failing(ProviderError::Request(
        "conflict".into(),
    )));
    let h = harness(
        config(&["Percentage CPU"]).with_dry_run(false),
        FixedMetrics::new().with_value("Percentage CPU", 95.0),
        Some(compute),
    );

    let transcript = h.orchestrator.handle("Check CPU usage").await.unwrap();

    assert_eq!(transcript.len(), 4);
    assert!(transcript[2].contains("conflict"));
    assert!(transcript[3].starts_with("agent: ALERT: "));
}

#[tokio::test]
async fn test_concurrent_requests_get_independent_threads() {
    let h = harness(
        config(&["Percentage CPU"]),
        FixedMetrics::new().with_value("Percentage CPU", 85.0),
        None,
    );
    let orchestrator = Arc::new(h.orchestrator);

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let orchestrator = orchestrator.clone();
            tokio::spawn(async move { orchestrator.handle(&format!("request {}", i)).await })
        })
        .collect();

    for (i, handle) in handles.into_iter().enumerate() {
        let transcript = handle.await.unwrap().unwrap();
        assert_eq!(transcript.len(), 4);
        assert_eq!(transcript[0], format!("user: request {}", i));
    }
    assert_eq!(h.alerts.delivered().len(), 8);
}
