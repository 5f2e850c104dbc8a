//! Commands that run pipeline stages in-process
//!
//! Nothing here reaches a cloud backend: metrics come from the command
//! line, alerts land in memory and compute actions stay simulated.

use agent_lib::{
    alert::{format_event, AlertFormatter, SendReceipt},
    config::{PipelineConfig, RecommendationThresholds, ResourceRef},
    models::{ActionResult, Alert, Recommendation},
    observability::{AgentMetrics, StructuredLogger},
    optimizer::RecommendationEngine,
    orchestrator::{Orchestrator, Providers},
    providers::{FixedMetrics, MemoryChannel},
    resilience::RetryPolicy,
};
use anyhow::{Context, Result};
use colored::Colorize;
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;
use tabled::Tabled;

use super::print_transcript;
use crate::output::{
    color_status, print_info, print_json, print_success, print_table, print_warning, OutputFormat,
};

const LOCAL_CALL_TIMEOUT: Duration = Duration::from_secs(5);

/// Parse a `METRIC=VALUE` sample; the metric may itself contain spaces
pub fn parse_sample(raw: &str) -> Result<(String, f64), String> {
    let (metric, value) = raw
        .rsplit_once('=')
        .ok_or_else(|| format!("expected METRIC=VALUE, got '{}'", raw))?;
    let metric = metric.trim();
    if metric.is_empty() {
        return Err(format!("missing metric name in '{}'", raw));
    }
    let value = value
        .trim()
        .parse::<f64>()
        .map_err(|e| format!("invalid value in '{}': {}", raw, e))?;
    Ok((metric.to_string(), value))
}

#[derive(Serialize)]
struct RunOutput {
    messages: Vec<String>,
    alerts: Vec<Alert>,
}

/// Row for delivered alerts
#[derive(Tabled)]
struct AlertRow {
    #[tabled(rename = "Severity")]
    severity: String,
    #[tabled(rename = "Message")]
    message: String,
    #[tabled(rename = "Action")]
    action: String,
    #[tabled(rename = "Status")]
    status: String,
}

impl From<&Alert> for AlertRow {
    fn from(alert: &Alert) -> Self {
        Self {
            severity: color_status(&alert.severity.to_string()),
            message: alert.message.clone(),
            action: alert.action.clone(),
            status: color_status(&alert.status.to_string()),
        }
    }
}

/// Build an orchestrator over fixed sample values and an in-memory channel
fn local_orchestrator(
    samples: Vec<(String, f64)>,
    live_apply: bool,
) -> (Orchestrator, Arc<MemoryChannel>) {
    let metrics = samples.iter().map(|(name, _)| name.clone()).collect();
    let provider = samples
        .into_iter()
        .fold(FixedMetrics::new(), |provider, (name, value)| {
            provider.with_value(name, value)
        });
    let channel = Arc::new(MemoryChannel::new());

    let config = PipelineConfig::new(ResourceRef::simulated(), metrics).with_dry_run(!live_apply);
    let providers = Providers {
        metrics: Arc::new(provider),
        compute: None,
        alerts: channel.clone(),
    };

    let orchestrator = Orchestrator::assemble(
        config,
        providers,
        RetryPolicy::no_retry(LOCAL_CALL_TIMEOUT),
        None,
    );
    (orchestrator, channel)
}

/// Run the full pipeline locally
pub async fn run(
    input: &str,
    samples: Vec<(String, f64)>,
    live_apply: bool,
    format: OutputFormat,
) -> Result<()> {
    if live_apply {
        print_warning("No compute backend in local runs; actions are simulated");
    }

    let (orchestrator, channel) = local_orchestrator(samples, live_apply);
    let messages = orchestrator
        .handle(input)
        .await
        .context("Pipeline run failed")?;
    let alerts = channel.delivered();

    match format {
        OutputFormat::Json => print_json(&RunOutput { messages, alerts })?,
        OutputFormat::Table => {
            print_transcript(&messages);
            println!();
            if alerts.is_empty() {
                print_info("No alerts raised");
            } else {
                println!("{}", "Delivered alerts".bold());
                let rows: Vec<AlertRow> = alerts.iter().map(AlertRow::from).collect();
                print_table(&rows);
            }
        }
    }

    Ok(())
}

#[derive(Serialize)]
struct RecommendOutput {
    metric: String,
    value: f64,
    recommendation: Recommendation,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<ActionResult>,
}

/// Evaluate the recommendation rules, optionally applying in simulation mode
pub async fn recommend(metric: &str, value: f64, apply: bool, format: OutputFormat) -> Result<()> {
    let resource = ResourceRef::simulated();
    let logger = StructuredLogger::new(resource.name.clone());
    let engine = RecommendationEngine::new(
        resource,
        RecommendationThresholds::default(),
        AgentMetrics::new(),
        logger,
    )
    .with_retry_policy(RetryPolicy::no_retry(LOCAL_CALL_TIMEOUT));

    let recommendation = engine.recommend(metric, value);
    let result = if apply {
        Some(engine.apply(&recommendation, true).await)
    } else {
        None
    };

    match format {
        OutputFormat::Json => print_json(&RecommendOutput {
            metric: metric.to_string(),
            value,
            recommendation,
            result,
        })?,
        OutputFormat::Table => {
            println!("{}", "Recommendation".bold());
            println!("{}", "=".repeat(50));
            println!("Metric:  {}", metric.cyan());
            println!("Value:   {}", value);
            println!("Action:  {}", recommendation.action.as_str().cyan());
            println!("Reason:  {}", recommendation.reason);
            if let Some(result) = result {
                println!();
                println!("Status:  {}", color_status(result.status.as_str()));
                print_success(&result.message);
            }
        }
    }

    Ok(())
}

/// Build the event record handed to the formatter; absent flags keep the defaults
fn alert_event(message: &str, severity: Option<String>, action: Option<String>) -> Value {
    let mut event = Map::new();
    event.insert("message".to_string(), Value::String(message.to_string()));
    if let Some(severity) = severity {
        event.insert("severity".to_string(), Value::String(severity));
    }
    if let Some(action) = action {
        event.insert("action".to_string(), Value::String(action));
    }
    Value::Object(event)
}

/// Format an alert and send it to an in-memory channel
pub fn alert(
    message: &str,
    severity: Option<String>,
    action: Option<String>,
    format: OutputFormat,
) -> Result<()> {
    let formatter = AlertFormatter::new(
        Arc::new(MemoryChannel::new()),
        AgentMetrics::new(),
        StructuredLogger::new(ResourceRef::simulated().name),
    );
    let alert = format_event(&alert_event(message, severity, action));
    let receipt: SendReceipt = formatter.send(alert);

    match format {
        OutputFormat::Json => print_json(&receipt)?,
        OutputFormat::Table => {
            print_success(&format!("Alert {}", receipt.status));
            print_table(&[AlertRow::from(&receipt.alert)]);
        }
    }

    Ok(())
}
