//! HTTP provider tests against a mock ARM / agents service
//!
//! These tests verify:
//! - Metric value extraction and query parameters
//! - Error classification (authorization vs transient vs unavailable)
//! - Compute restart/resize/describe requests
//! - Registration never failing across the boundary

use super::*;
use crate::models::AgentDescriptor;
use mockito::{Matcher, Server};
use std::collections::BTreeSet;
use std::time::Duration;

const VM_ID: &str = "/subscriptions/sub-1/resourceGroups/rg-1/providers/Microsoft.Compute/virtualMachines/vm-01";

fn arm(server: &Server) -> ArmClient {
    ArmClient::new(server.url(), "test-token", Duration::from_secs(5)).unwrap()
}

fn metrics_path() -> String {
    format!("{}/providers/microsoft.insights/metrics", VM_ID)
}

fn descriptor() -> AgentDescriptor {
    AgentDescriptor {
        name: "AnomalyDetectorAgent".to_string(),
        model: "gpt-35-turbo".to_string(),
        instructions: "Detect anomalies".to_string(),
        tools: BTreeSet::new(),
        description: "test".to_string(),
    }
}

mod monitor_tests {
    use super::*;

    #[tokio::test]
    async fn test_query_returns_first_average() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", metrics_path().as_str())
            .match_header("authorization", "Bearer test-token")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("metricnames".into(), "Percentage CPU".into()),
                Matcher::UrlEncoded("timespan".into(), "PT5M".into()),
                Matcher::UrlEncoded("aggregation".into(), "Average".into()),
                Matcher::UrlEncoded("api-version".into(), METRICS_API_VERSION.into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"value":[{"name":{"value":"Percentage CPU"},"timeseries":[{"data":[
                    {"timeStamp":"2024-01-01T00:00:00Z"},
                    {"timeStamp":"2024-01-01T00:01:00Z","average":null},
                    {"timeStamp":"2024-01-01T00:02:00Z","average":85.0},
                    {"timeStamp":"2024-01-01T00:03:00Z","average":12.0}
                ]}]}]}"#,
            )
            .create_async()
            .await;

        let provider = AzureMonitorMetrics::new(arm(&server));
        let value = provider
            .query(VM_ID, "Percentage CPU", &MetricQuery::default())
            .await
            .unwrap();

        assert_eq!(value, Some(85.0));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_query_without_datapoints_is_none() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", metrics_path().as_str())
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"value":[{"timeseries":[]}]}"#)
            .create_async()
            .await;

        let provider = AzureMonitorMetrics::new(arm(&server));
        let value = provider
            .query(VM_ID, "Available Memory Bytes", &MetricQuery::default())
            .await
            .unwrap();

        assert_eq!(value, None);
    }

    #[tokio::test]
    async fn test_authorization_failure_is_classified() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", metrics_path().as_str())
            .match_query(Matcher::Any)
            .with_status(403)
            .with_body(r#"{"error":{"code":"AuthorizationFailed","message":"The client does not have authorization"}}"#)
            .create_async()
            .await;

        let provider = AzureMonitorMetrics::new(arm(&server));
        let err = provider
            .query(VM_ID, "Percentage CPU", &MetricQuery::default())
            .await
            .unwrap_err();

        assert!(err.is_authorization(), "got {err:?}");
    }

    #[tokio::test]
    async fn test_server_error_is_transient() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", metrics_path().as_str())
            .match_query(Matcher::Any)
            .with_status(503)
            .create_async()
            .await;

        let provider = AzureMonitorMetrics::new(arm(&server));
        let err = provider
            .query(VM_ID, "Percentage CPU", &MetricQuery::default())
            .await
            .unwrap_err();

        assert!(err.is_transient(), "got {err:?}");
    }

    #[tokio::test]
    async fn test_missing_resource_id_is_unavailable() {
        let server = Server::new_async().await;
        let provider = AzureMonitorMetrics::new(arm(&server));

        let err = provider
            .query("", "Percentage CPU", &MetricQuery::default())
            .await
            .unwrap_err();

        assert!(matches!(err, ProviderError::Unavailable(_)));
    }
}

mod compute_tests {
    use super::*;

    #[tokio::test]
    async fn test_restart_posts_to_restart_endpoint() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", format!("{}/restart", VM_ID).as_str())
            .match_query(Matcher::UrlEncoded("api-version".into(), COMPUTE_API_VERSION.into()))
            .with_status(202)
            .create_async()
            .await;

        let compute = AzureCompute::new(arm(&server));
        compute.restart(VM_ID).await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_resize_patches_vm_size() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("PATCH", VM_ID)
            .match_query(Matcher::Any)
            .match_body(Matcher::PartialJsonString(
                r#"{"properties":{"hardwareProfile":{"vmSize":"Standard_D8s_v3"}}}"#.to_string(),
            ))
            .with_status(200)
            .with_body("{}")
            .create_async()
            .await;

        let compute = AzureCompute::new(arm(&server));
        compute.resize(VM_ID, "Standard_D8s_v3").await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_resize_conflict_is_reported() {
        let mut server = Server::new_async().await;
        server
            .mock("PATCH", VM_ID)
            .match_query(Matcher::Any)
            .with_status(409)
            .with_body(r#"{"error":{"code":"OperationNotAllowed"}}"#)
            .create_async()
            .await;

        let compute = AzureCompute::new(arm(&server));
        let err = compute.resize(VM_ID, "Standard_D8s_v3").await.unwrap_err();

        assert!(err.to_string().contains("OperationNotAllowed"));
        assert!(!err.is_transient());
    }

    #[tokio::test]
    async fn test_describe_reads_size_and_power_state() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", VM_ID)
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"name":"vm-01","properties":{"hardwareProfile":{"vmSize":"Standard_D4s_v3"}}}"#)
            .create_async()
            .await;
        server
            .mock("GET", format!("{}/instanceView", VM_ID).as_str())
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"statuses":[{"code":"ProvisioningState/succeeded"},{"code":"PowerState/running"}]}"#)
            .create_async()
            .await;

        let compute = AzureCompute::new(arm(&server));
        let snapshot = compute.describe(VM_ID).await.unwrap();

        assert_eq!(snapshot.name, "vm-01");
        assert_eq!(snapshot.vm_size.as_deref(), Some("Standard_D4s_v3"));
        assert_eq!(snapshot.power_state, "running");
    }
}

mod registry_tests {
    use super::*;
    use crate::resilience::RetryPolicy;

    fn fast_retry() -> RetryPolicy {
        RetryPolicy::default().with_backoff(Duration::from_millis(10), Duration::from_millis(20))
    }

    #[tokio::test]
    async fn test_http_registry_returns_backend_id() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/assistants")
            .match_query(Matcher::UrlEncoded("api-version".into(), DEFAULT_REGISTRY_API_VERSION.into()))
            .match_body(Matcher::PartialJsonString(
                r#"{"name":"AnomalyDetectorAgent","model":"gpt-35-turbo"}"#.to_string(),
            ))
            .with_status(200)
            .with_body(r#"{"id":"asst_123","object":"assistant"}"#)
            .create_async()
            .await;

        let registry = HttpAgentRegistry::new(server.url(), "token", Duration::from_secs(5));
        let outcome = registry.register(&descriptor()).await;

        assert_eq!(outcome, Registration::Registered("asst_123".to_string()));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_http_registry_failure_is_a_value() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/assistants")
            .match_query(Matcher::Any)
            .with_status(500)
            .with_body("boom")
            .expect(3)
            .create_async()
            .await;

        let registry = HttpAgentRegistry::new(server.url(), "token", Duration::from_secs(5))
            .with_retry_policy(fast_retry());
        let outcome = registry.register(&descriptor()).await;

        assert!(matches!(outcome, Registration::Failed(ref reason) if reason.contains("boom")));
        assert!(!outcome.is_success());
    }

    #[tokio::test]
    async fn test_http_registry_retries_transient_failure() {
        let mut server = Server::new_async().await;
        let unavailable = server
            .mock("POST", "/assistants")
            .match_query(Matcher::Any)
            .with_status(503)
            .with_body("Service Unavailable")
            .expect(1)
            .create_async()
            .await;
        let created = server
            .mock("POST", "/assistants")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"id":"asst_456"}"#)
            .expect(1)
            .create_async()
            .await;

        let registry = HttpAgentRegistry::new(server.url(), "token", Duration::from_secs(5))
            .with_retry_policy(fast_retry());
        let outcome = registry.register(&descriptor()).await;

        assert_eq!(outcome, Registration::Registered("asst_456".to_string()));
        unavailable.assert_async().await;
        created.assert_async().await;
    }

    #[tokio::test]
    async fn test_http_registry_does_not_retry_authorization_failure() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/assistants")
            .match_query(Matcher::Any)
            .with_status(401)
            .with_body("unauthorized")
            .expect(1)
            .create_async()
            .await;

        let registry = HttpAgentRegistry::new(server.url(), "token", Duration::from_secs(5))
            .with_retry_policy(fast_retry());
        let outcome = registry.register(&descriptor()).await;

        assert_eq!(outcome.label(), "failed");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_unreachable_registry_fails_without_panicking() {
        let registry = HttpAgentRegistry::new("http://127.0.0.1:9", "token", Duration::from_millis(500))
            .with_retry_policy(fast_retry());
        let outcome = registry.register(&descriptor()).await;
        assert_eq!(outcome.label(), "failed");
    }

    #[tokio::test]
    async fn test_local_registry_accepts() {
        let outcome = LocalRegistry.register(&descriptor()).await;
        assert_eq!(outcome, Registration::Accepted);
    }
}

mod simulated_tests {
    use super::*;

    #[tokio::test]
    async fn test_fixed_metrics_records_queries() {
        let metrics = FixedMetrics::new().with_value("Percentage CPU", 85.0);

        let cpu = metrics
            .query(VM_ID, "Percentage CPU", &MetricQuery::default())
            .await
            .unwrap();
        let disk = metrics
            .query(VM_ID, "Disk Read Bytes", &MetricQuery::default())
            .await
            .unwrap();

        assert_eq!(cpu, Some(85.0));
        assert_eq!(disk, None);
        assert_eq!(metrics.queried(), vec!["Percentage CPU", "Disk Read Bytes"]);
    }

    #[tokio::test]
    async fn test_unavailable_metrics() {
        let err = UnavailableMetrics
            .query(VM_ID, "Percentage CPU", &MetricQuery::default())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "unavailable");
    }

    #[test]
    fn test_memory_channel_keeps_alerts() {
        let channel = MemoryChannel::new();
        let alert = crate::models::Alert {
            severity: crate::models::AlertSeverity::High,
            message: "🚨 Alert: test".to_string(),
            action: "Notify stakeholders".to_string(),
            status: crate::models::AlertStatus::Pending,
        };

        let ack = channel.deliver(&alert);
        assert_eq!(ack.channel, "memory");
        assert_eq!(channel.delivered(), vec![alert]);
    }
}
