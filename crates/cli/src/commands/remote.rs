//! Commands that talk to a running agent

use anyhow::Result;
use colored::Colorize;
use tabled::Tabled;

use super::print_transcript;
use crate::client::ApiClient;
use crate::output::{color_status, print_json, print_table, print_warning, OutputFormat};

/// Row for the component health table
#[derive(Tabled)]
struct ComponentRow {
    #[tabled(rename = "Component")]
    name: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Message")]
    message: String,
}

/// Send a request to the agent and print the transcript
pub async fn ask(client: &ApiClient, input: &str, format: OutputFormat) -> Result<()> {
    let response = client.handle(input).await?;

    match format {
        OutputFormat::Json => print_json(&response)?,
        OutputFormat::Table => {
            print_transcript(&response.messages);
            if response.messages.len() <= 1 {
                print_warning("No anomaly detected");
            }
        }
    }

    Ok(())
}

/// Show agent component health
pub async fn health(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let health = client.health().await?;

    match format {
        OutputFormat::Json => print_json(&health)?,
        OutputFormat::Table => {
            println!(
                "{} {}",
                "Agent status:".bold(),
                color_status(health.status.as_str())
            );

            let mut rows: Vec<ComponentRow> = health
                .components
                .iter()
                .map(|(name, component)| ComponentRow {
                    name: name.clone(),
                    status: color_status(component.status.as_str()),
                    message: component.message.clone().unwrap_or_default(),
                })
                .collect();
            rows.sort_by(|a, b| a.name.cmp(&b.name));
            print_table(&rows);
        }
    }

    Ok(())
}
