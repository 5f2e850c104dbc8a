//! Event to alert normalization

use crate::models::{Alert, AlertSeverity, AlertStatus};
use crate::observability::{AgentMetrics, StructuredLogger};
use crate::providers::AlertChannel;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

/// Prefix of every alert message
pub const ALERT_MESSAGE_PREFIX: &str = "🚨 Alert: ";

pub const DEFAULT_ALERT_ACTION: &str = "Notify stakeholders";

/// Message used when the event carries none
pub const UNSPECIFIED_EVENT: &str = "unspecified event";

/// Result of handing an alert to the channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SendReceipt {
    pub status: AlertStatus,
    pub alert: Alert,
}

/// Render a JSON value as text; strings are taken verbatim
fn text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Build an alert from a free-form event record
///
/// Fields present in the event override the defaults. Non-object events
/// are treated as empty, and unknown severity or status values fall back
/// to their defaults.
pub fn format_event(event: &Value) -> Alert {
    let field = |name: &str| {
        event
            .as_object()
            .and_then(|o| o.get(name))
            .filter(|v| !v.is_null())
    };

    let message = field("message")
        .map(text)
        .unwrap_or_else(|| UNSPECIFIED_EVENT.to_string());

    Alert {
        severity: field("severity")
            .and_then(Value::as_str)
            .and_then(AlertSeverity::parse)
            .unwrap_or_default(),
        message: format!("{}{}", ALERT_MESSAGE_PREFIX, message),
        action: field("action")
            .map(text)
            .unwrap_or_else(|| DEFAULT_ALERT_ACTION.to_string()),
        status: field("status")
            .and_then(Value::as_str)
            .and_then(AlertStatus::parse)
            .unwrap_or_default(),
    }
}

/// Formats events and hands the resulting alerts to a channel
pub struct AlertFormatter {
    channel: Arc<dyn AlertChannel>,
    metrics: AgentMetrics,
    logger: StructuredLogger,
}

impl AlertFormatter {
    pub fn new(channel: Arc<dyn AlertChannel>, metrics: AgentMetrics, logger: StructuredLogger) -> Self {
        Self {
            channel,
            metrics,
            logger,
        }
    }

    pub fn format(&self, event: &Value) -> Alert {
        format_event(event)
    }

    /// Hand the alert to the channel; delivery is the channel's concern
    pub fn send(&self, alert: Alert) -> SendReceipt {
        let ack = self.channel.deliver(&alert);
        self.metrics.inc_alerts_sent();
        self.logger.log_alert(&alert.severity.to_string(), &alert.message);
        tracing::debug!(channel = %ack.channel, "Alert delivered");

        SendReceipt {
            status: AlertStatus::Sent,
            alert,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::MemoryChannel;
    use serde_json::json;

    #[test]
    fn test_format_applies_defaults() {
        let alert = format_event(&json!({"message": "High CPU on vm-01", "severity": "critical"}));

        assert_eq!(
            alert,
            Alert {
                severity: AlertSeverity::Critical,
                message: "🚨 Alert: High CPU on vm-01".to_string(),
                action: "Notify stakeholders".to_string(),
                status: AlertStatus::Pending,
            }
        );
        assert_eq!(
            serde_json::to_value(&alert).unwrap(),
            json!({
                "severity": "critical",
                "message": "🚨 Alert: High CPU on vm-01",
                "action": "Notify stakeholders",
                "status": "pending"
            })
        );
    }

    #[test]
    fn test_format_empty_event() {
        let alert = format_event(&json!({}));
        assert_eq!(alert.severity, AlertSeverity::High);
        assert_eq!(alert.message, "🚨 Alert: unspecified event");
        assert_eq!(alert.action, DEFAULT_ALERT_ACTION);
        assert_eq!(alert.status, AlertStatus::Pending);

        assert_eq!(format_event(&json!("not an object")), alert);
        assert_eq!(format_event(&json!({"message": null})), alert);
    }

    #[test]
    fn test_present_fields_override_defaults() {
        let alert = format_event(&json!({
            "message": 42,
            "severity": "LOW",
            "action": "Page on-call",
            "status": "sent"
        }));

        assert_eq!(alert.severity, AlertSeverity::Low);
        assert_eq!(alert.message, "🚨 Alert: 42");
        assert_eq!(alert.action, "Page on-call");
        assert_eq!(alert.status, AlertStatus::Sent);
    }

    #[test]
    fn test_unknown_severity_falls_back() {
        let alert = format_event(&json!({"message": "x", "severity": "sev0", "status": "lost"}));
        assert_eq!(alert.severity, AlertSeverity::High);
        assert_eq!(alert.status, AlertStatus::Pending);
    }

    #[test]
    fn test_format_is_idempotent() {
        let event = json!({"message": "Disk full", "severity": "medium"});
        assert_eq!(format_event(&event), format_event(&event));
    }

    #[test]
    fn test_send_hands_off_to_channel() {
        let channel = Arc::new(MemoryChannel::new());
        let formatter = AlertFormatter::new(
            channel.clone(),
            AgentMetrics::new(),
            StructuredLogger::new("vm-01"),
        );

        let alert = formatter.format(&json!({"message": "High CPU on vm-01"}));
        let receipt = formatter.send(alert.clone());

        assert_eq!(receipt.status, AlertStatus::Sent);
        assert_eq!(receipt.alert, alert);
        assert_eq!(channel.delivered(), vec![alert]);
    }
}
