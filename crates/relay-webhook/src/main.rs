//! Slack slash-command relay for Mailgun delivery statistics.
//!
//! Receives the slash-command webhook, verifies the shared secret, queries
//! Mailgun's stats endpoint for the requested window, and answers with a
//! channel-visible summary message.

mod bootstrap_helpers;
mod webhook_server;

use anyhow::Result;
use clap::Parser;

use crate::bootstrap_helpers::init_tracing;
use crate::webhook_server::{run_webhook_server, RelayConfig};

fn parse_positive_u64(value: &str) -> Result<u64, String> {
    let parsed = value
        .parse::<u64>()
        .map_err(|error| format!("failed to parse integer: {error}"))?;
    if parsed == 0 {
        return Err("value must be greater than 0".to_string());
    }
    Ok(parsed)
}

#[derive(Debug, Parser)]
#[command(
    name = "mailgun-stats-relay",
    about = "Relay Slack slash commands to Mailgun delivery statistics",
    version
)]
struct RelayArgs {
    /// Address the webhook server listens on.
    #[arg(long, env = "RELAY_BIND", default_value = "127.0.0.1:8080")]
    bind: String,

    /// Shared secret Slack sends with every slash-command request.
    #[arg(long, env = "SLACK_TOKEN")]
    slack_token: String,

    /// Mailgun private API key.
    #[arg(long, env = "MAILGUN_API_KEY")]
    mailgun_api_key: String,

    /// Mailgun sending domain the stats query is scoped to.
    #[arg(long, env = "MAILGUN_DOMAIN")]
    mailgun_domain: String,

    /// Mailgun API base URL.
    #[arg(
        long,
        env = "MAILGUN_API_BASE",
        default_value = "https://api.mailgun.net/v3"
    )]
    mailgun_api_base: String,

    /// Timeout for the outbound Mailgun request, in milliseconds.
    #[arg(
        long,
        env = "RELAY_REQUEST_TIMEOUT_MS",
        default_value_t = 10_000,
        value_parser = parse_positive_u64
    )]
    request_timeout_ms: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let args = RelayArgs::parse();

    let config = RelayConfig {
        bind: args.bind,
        slack_token: args.slack_token,
        mailgun_api_key: args.mailgun_api_key,
        mailgun_domain: args.mailgun_domain,
        mailgun_api_base: args.mailgun_api_base,
        request_timeout_ms: args.request_timeout_ms,
    };

    run_webhook_server(config).await
}
