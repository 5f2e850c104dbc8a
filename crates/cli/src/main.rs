//! Triage CLI
//!
//! A command-line tool for sending requests to a running triage agent and
//! for exercising the pipeline stages locally against sample metrics.

mod client;
mod commands;
mod config;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{local, remote};
use tracing_subscriber::EnvFilter;

const DEFAULT_API_URL: &str = "http://localhost:8080";

/// Triage CLI
#[derive(Parser)]
#[command(name = "triage")]
#[command(author, version, about = "CLI for the Triage resource agent", long_about = None)]
pub struct Cli {
    /// API endpoint URL (can also be set via TRIAGE_API_URL env var)
    #[arg(long, env = "TRIAGE_API_URL")]
    pub api_url: Option<String>,

    /// Output format
    #[arg(long, short, default_value = "table")]
    pub format: output::OutputFormat,

    /// Print pipeline logs to stderr
    #[arg(long, short)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Send a request to the agent and print the transcript
    Ask {
        /// Request text
        input: String,
    },

    /// Show agent component health
    Health,

    /// Run the pipeline locally against sample metric values
    Run {
        /// Request text
        input: String,

        /// Sample value as METRIC=VALUE (repeatable, evaluated in order)
        #[arg(long = "sample", short, value_parser = local::parse_sample)]
        samples: Vec<(String, f64)>,

        /// Disable dry-run; without a compute backend actions stay simulated
        #[arg(long)]
        live_apply: bool,
    },

    /// Evaluate the recommendation rules for one metric value
    Recommend {
        /// Metric name, classified as cpu, memory or disk
        #[arg(long, short)]
        metric: String,

        /// Observed value
        #[arg(long, short, allow_negative_numbers = true)]
        value: f64,

        /// Also apply the recommendation in simulation mode
        #[arg(long)]
        apply: bool,
    },

    /// Format an alert and send it to an in-memory channel
    Alert {
        /// Alert message
        #[arg(long, short)]
        message: String,

        /// Severity (low, medium, high, critical)
        #[arg(long, short)]
        severity: Option<String>,

        /// Recommended action
        #[arg(long, short)]
        action: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.verbose {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
            )
            .with_writer(std::io::stderr)
            .init();
    }

    match cli.command {
        Commands::Ask { input } => {
            let client = client::ApiClient::new(&resolve_api_url(cli.api_url)?)?;
            remote::ask(&client, &input, cli.format).await?;
        }
        Commands::Health => {
            let client = client::ApiClient::new(&resolve_api_url(cli.api_url)?)?;
            remote::health(&client, cli.format).await?;
        }
        Commands::Run {
            input,
            samples,
            live_apply,
        } => {
            local::run(&input, samples, live_apply, cli.format).await?;
        }
        Commands::Recommend {
            metric,
            value,
            apply,
        } => {
            local::recommend(&metric, value, apply, cli.format).await?;
        }
        Commands::Alert {
            message,
            severity,
            action,
        } => {
            local::alert(&message, severity, action, cli.format)?;
        }
    }

    Ok(())
}

/// Flag or env var first, then the config file, then the local default
fn resolve_api_url(flag: Option<String>) -> Result<String> {
    if let Some(url) = flag {
        return Ok(url);
    }
    let config = config::Config::load()?;
    Ok(config
        .api_url
        .unwrap_or_else(|| DEFAULT_API_URL.to_string()))
}
