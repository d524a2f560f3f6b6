//! CLI for bqr.

mod commands;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::time::Duration;

use bqr_core::client::Client;
use bqr_core::config::{self, BqrConfig};

use commands::{run_access, run_classify, run_revoke, TransportKind};

/// Top-level CLI for bqr.
#[derive(Debug, Parser)]
#[command(name = "bqr")]
#[command(about = "bqr: BigQuery dataset access tools with transient-error retry", long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: CliCommand,
}

/// Overrides for values from config.toml.
#[derive(Debug, Args)]
pub struct GlobalArgs {
    /// Project for dataset ids given without one.
    #[arg(long, global = true)]
    pub project: Option<String>,

    /// REST endpoint (e.g. a local emulator).
    #[arg(long, global = true)]
    pub endpoint: Option<String>,

    /// OAuth2 access token sent as a bearer token.
    #[arg(long, global = true, env = "BQR_ACCESS_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Give up retrying transient errors after this many seconds.
    #[arg(long, global = true, value_name = "SECS", value_parser = parse_secs)]
    pub deadline: Option<Duration>,
}

fn parse_secs(s: &str) -> std::result::Result<Duration, String> {
    let secs: f64 = s.parse().map_err(|e| format!("{e}"))?;
    Duration::try_from_secs_f64(secs).map_err(|e| format!("{e}"))
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Revoke an entity's access to a dataset.
    Revoke {
        /// Dataset id: `project.dataset`, or `dataset` with --project.
        dataset: String,
        /// Email, domain, special group or IAM member to remove.
        entity_id: String,
    },

    /// List the access entries of a dataset.
    Access {
        /// Dataset id: `project.dataset`, or `dataset` with --project.
        dataset: String,
    },

    /// Show whether a synthetic error would be retried.
    Classify {
        /// HTTP status of the error.
        #[arg(long, conflicts_with = "transport")]
        status: Option<u16>,
        /// Transport failure kind (no HTTP response).
        #[arg(long, value_enum)]
        transport: Option<TransportKind>,
        /// Reason codes of the structured sub-errors, in order.
        #[arg(long = "reason", value_name = "REASON")]
        reasons: Vec<String>,
    },
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();

        match cli.command {
            CliCommand::Classify {
                status,
                transport,
                reasons,
            } => run_classify(status, transport, &reasons)?,
            CliCommand::Revoke { dataset, entity_id } => {
                let client = build_client(&config::load_or_init()?, &cli.global)?;
                run_revoke(&client, &dataset, &entity_id).await?;
            }
            CliCommand::Access { dataset } => {
                let client = build_client(&config::load_or_init()?, &cli.global)?;
                run_access(&client, &dataset).await?;
            }
        }

        Ok(())
    }
}

/// Client from config with command-line overrides applied.
fn build_client(cfg: &BqrConfig, global: &GlobalArgs) -> Result<Client> {
    tracing::debug!("loaded config: {:?}", cfg);
    let mut cfg = cfg.clone();
    if let Some(endpoint) = &global.endpoint {
        cfg.endpoint = endpoint.clone();
    }
    if let Some(project) = &global.project {
        cfg.project = Some(project.clone());
    }

    let mut client = Client::from_config(&cfg)?;
    if let Some(deadline) = global.deadline {
        let retry = client.retry().with_deadline(deadline);
        client = client.with_retry(retry);
    }
    if let Some(token) = &global.token {
        client = client.with_token(token.as_str());
    }
    Ok(client)
}

#[cfg(test)]
mod tests;
