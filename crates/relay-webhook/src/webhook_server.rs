//! Axum webhook server: shared-secret verification, the stats relay
//! handler, and error-to-status mapping.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{any, get};
use axum::{Json, Router};
use relay_core::{aggregate_stat_totals, parse_stats_command, render_slack_message};
use relay_mailgun::MailgunClient;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tracing::{error, info, warn};

#[cfg(test)]
mod tests;

const STATS_ENDPOINT: &str = "/stats";
const HEALTHZ_ENDPOINT: &str = "/healthz";

/// Process-wide relay configuration, built once at startup from CLI/env.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub bind: String,
    pub slack_token: String,
    pub mailgun_api_key: String,
    pub mailgun_domain: String,
    pub mailgun_api_base: String,
    pub request_timeout_ms: u64,
}

struct WebhookServerState {
    slack_token: String,
    mailgun: MailgunClient,
}

/// Inbound slash-command payload. `text` is kept as a raw JSON value so a
/// non-string field degrades to the default query rather than a decode
/// failure.
#[derive(Debug, Deserialize)]
struct StatsWebhookRequest {
    token: Option<String>,
    #[serde(default)]
    text: Option<Value>,
}

/// Error payload mapped to an HTTP response envelope.
#[derive(Debug)]
struct WebhookApiError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl WebhookApiError {
    fn method_not_allowed() -> Self {
        Self {
            status: StatusCode::METHOD_NOT_ALLOWED,
            code: "method_not_allowed",
            message: "only POST requests are accepted".to_string(),
        }
    }

    fn unauthorized() -> Self {
        Self {
            status: StatusCode::UNAUTHORIZED,
            code: "invalid_credentials",
            message: "missing or invalid verification token".to_string(),
        }
    }

    fn upstream(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            code: "mailgun_error",
            message: message.into(),
        }
    }
}

impl IntoResponse for WebhookApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(json!({
                "error": {
                    "code": self.code,
                    "message": self.message,
                }
            })),
        )
            .into_response()
    }
}

pub async fn run_webhook_server(config: RelayConfig) -> Result<()> {
    let bind_addr = config
        .bind
        .parse::<SocketAddr>()
        .with_context(|| format!("invalid --bind '{}'", config.bind))?;

    let mailgun = MailgunClient::new(
        config.mailgun_api_base.clone(),
        config.mailgun_domain.clone(),
        config.mailgun_api_key.clone(),
        config.request_timeout_ms,
    )
    .context("failed to create mailgun client")?;

    let listener = TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("failed to bind webhook server on {bind_addr}"))?;
    let local_addr = listener
        .local_addr()
        .context("failed to resolve bound webhook server address")?;
    info!(%local_addr, endpoint = STATS_ENDPOINT, "stats webhook server listening");

    let state = Arc::new(WebhookServerState {
        slack_token: config.slack_token,
        mailgun,
    });
    axum::serve(listener, build_webhook_router(state))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
        .context("stats webhook server exited unexpectedly")
}

fn build_webhook_router(state: Arc<WebhookServerState>) -> Router {
    // `any` so the handler owns the 405 path; rejection order is fixed as
    // method first, then token.
    Router::new()
        .route(STATS_ENDPOINT, any(handle_stats_command))
        .route(HEALTHZ_ENDPOINT, get(handle_healthz))
        .with_state(state)
}

async fn handle_healthz() -> Json<Value> {
    Json(json!({ "ok": true }))
}

async fn handle_stats_command(
    State(state): State<Arc<WebhookServerState>>,
    method: Method,
    body: Bytes,
) -> Response {
    if method != Method::POST {
        warn!(%method, "rejected stats webhook with unsupported method");
        return WebhookApiError::method_not_allowed().into_response();
    }

    let request = match serde_json::from_slice::<StatsWebhookRequest>(&body) {
        Ok(request) => request,
        Err(decode_error) => {
            warn!(%decode_error, "rejected stats webhook with undecodable body");
            return WebhookApiError::unauthorized().into_response();
        }
    };
    if request.token.as_deref() != Some(state.slack_token.as_str()) {
        warn!("rejected stats webhook with missing or mismatched token");
        return WebhookApiError::unauthorized().into_response();
    }

    let query = parse_stats_command(request.text.as_ref().and_then(Value::as_str));
    let stats = match state.mailgun.fetch_stats_totals(&query).await {
        Ok(response) => response,
        Err(mailgun_error) => {
            error!(%mailgun_error, duration = %query.duration, "mailgun stats request failed");
            return WebhookApiError::upstream(mailgun_error.to_string()).into_response();
        }
    };

    let totals = aggregate_stat_totals(&stats.stats);
    let message = render_slack_message(&totals, &stats.start, &stats.end);
    Json(message).into_response()
}
