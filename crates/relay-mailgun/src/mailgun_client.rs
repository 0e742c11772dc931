//! HTTP client for Mailgun's `/{domain}/stats/total` endpoint.

use std::time::Duration;

use relay_core::{StatRecord, StatsQuery};
use serde::Deserialize;
use thiserror::Error;


const ERROR_BODY_SNIPPET_LIMIT: usize = 600;

#[derive(Debug, Error)]
/// Enumerates supported `MailgunError` values.
pub enum MailgunError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("mailgun returned non-success status {status}: {body}")]
    HttpStatus { status: u16, body: String },
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/// Stats payload as returned by Mailgun. Fields the relay does not use
/// (`resolution`, `description`) are ignored on decode.
#[derive(Debug, Clone, Deserialize)]
pub struct MailgunStatsResponse {
    pub start: String,
    pub end: String,
    #[serde(default)]
    pub stats: Vec<StatRecord>,
}

#[derive(Clone)]
pub struct MailgunClient {
    http: reqwest::Client,
    api_base: String,
    domain: String,
    api_key: String,
}

impl MailgunClient {
    pub fn new(
        api_base: String,
        domain: String,
        api_key: String,
        request_timeout_ms: u64,
    ) -> Result<Self, MailgunError> {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::USER_AGENT,
            reqwest::header::HeaderValue::from_static("mailgun-stats-relay"),
        );
        headers.insert(
            reqwest::header::ACCEPT,
            reqwest::header::HeaderValue::from_static("application/json"),
        );
        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_millis(request_timeout_ms.max(1)))
            .build()?;

        Ok(Self {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
            domain: domain.trim().to_string(),
            api_key,
        })
    }

    /// Fetches the totals series for one duration and event set. A single
    /// awaited call, no retries: the caller maps any failure straight to an
    /// error response.
    pub async fn fetch_stats_totals(
        &self,
        query: &StatsQuery,
    ) -> Result<MailgunStatsResponse, MailgunError> {
        let mut params: Vec<(&str, &str)> = vec![("duration", query.duration.as_str())];
        for event in &query.events {
            params.push(("event", event.as_str()));
        }

        let response = self
            .http
            .get(format!("{}/{}/stats/total", self.api_base, self.domain))
            .basic_auth("api", Some(&self.api_key))
            .query(&params)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(MailgunError::HttpStatus {
                status: status.as_u16(),
                body: truncate_for_error(&body),
            });
        }

        serde_json::from_str(&body).map_err(|error| {
            MailgunError::InvalidResponse(format!("failed to decode mailgun stats payload: {error}"))
        })
    }
}

fn truncate_for_error(body: &str) -> String {
    if body.len() <= ERROR_BODY_SNIPPET_LIMIT {
        return body.to_string();
    }
    let mut cut = ERROR_BODY_SNIPPET_LIMIT;
    while !body.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}...", &body[..cut])
}
