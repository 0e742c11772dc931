//! Webhook server tests grouped by rejection path and relay behavior.

use std::time::Duration;

use httpmock::prelude::*;
use reqwest::Client;
use serde_json::json;

use super::*;

async fn spawn_test_server(
    state: Arc<WebhookServerState>,
) -> Result<(SocketAddr, tokio::task::JoinHandle<()>)> {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .context("bind ephemeral listener")?;
    let addr = listener.local_addr().context("resolve listener addr")?;
    let app = build_webhook_router(state);
    let handle = tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    tokio::time::sleep(Duration::from_millis(20)).await;
    Ok((addr, handle))
}

fn test_state(mailgun_base: &str) -> Arc<WebhookServerState> {
    let mailgun = MailgunClient::new(
        mailgun_base.to_string(),
        "example.com".to_string(),
        "mg-key".to_string(),
        2_000,
    )
    .expect("create mailgun client");
    Arc::new(WebhookServerState {
        slack_token: "slack-secret".to_string(),
        mailgun,
    })
}

fn stats_fixture() -> serde_json::Value {
    json!({
        "start": "Mon, 06 Jan 2020 00:00:00 UTC",
        "end": "Mon, 13 Jan 2020 00:00:00 UTC",
        "resolution": "day",
        "stats": [
            {
                "time": "Mon, 06 Jan 2020 00:00:00 UTC",
                "accepted": { "incoming": 2, "outgoing": 1 },
                "failed": {
                    "temporary": { "espblock": 1 },
                    "permanent": { "bounce": 4 },
                },
            },
            {
                "time": "Tue, 07 Jan 2020 00:00:00 UTC",
                "accepted": { "incoming": 3 },
            },
        ],
    })
}

#[tokio::test]
async fn non_post_methods_are_rejected_with_405_before_token_checks() {
    let mailgun = MockServer::start_async().await;
    let (addr, handle) = spawn_test_server(test_state(&mailgun.base_url()))
        .await
        .expect("spawn server");
    let client = Client::new();
    let url = format!("http://{addr}{STATS_ENDPOINT}");

    let get_response = client.get(&url).send().await.expect("send GET");
    assert_eq!(get_response.status(), StatusCode::METHOD_NOT_ALLOWED);

    // A valid token does not rescue a wrong-method request.
    let put_response = client
        .put(&url)
        .json(&json!({ "token": "slack-secret", "text": "24h" }))
        .send()
        .await
        .expect("send PUT");
    assert_eq!(put_response.status(), StatusCode::METHOD_NOT_ALLOWED);

    let delete_response = client.delete(&url).send().await.expect("send DELETE");
    assert_eq!(delete_response.status(), StatusCode::METHOD_NOT_ALLOWED);

    handle.abort();
}

#[tokio::test]
async fn missing_or_mismatched_token_yields_401_without_reaching_mailgun() {
    let mailgun = MockServer::start_async().await;
    let stats_mock = mailgun
        .mock_async(|when, then| {
            when.method(GET).path("/example.com/stats/total");
            then.status(200).json_body(stats_fixture());
        })
        .await;
    let (addr, handle) = spawn_test_server(test_state(&mailgun.base_url()))
        .await
        .expect("spawn server");
    let client = Client::new();
    let url = format!("http://{addr}{STATS_ENDPOINT}");

    let missing = client
        .post(&url)
        .json(&json!({ "text": "24h" }))
        .send()
        .await
        .expect("send request without token");
    assert_eq!(missing.status(), StatusCode::UNAUTHORIZED);

    let mismatched = client
        .post(&url)
        .json(&json!({ "token": "wrong", "text": "24h" }))
        .send()
        .await
        .expect("send request with wrong token");
    assert_eq!(mismatched.status(), StatusCode::UNAUTHORIZED);

    let undecodable = client
        .post(&url)
        .body("not json")
        .send()
        .await
        .expect("send undecodable body");
    assert_eq!(undecodable.status(), StatusCode::UNAUTHORIZED);

    assert_eq!(stats_mock.hits_async().await, 0);
    handle.abort();
}

#[tokio::test]
async fn valid_command_relays_aggregated_totals_as_slack_message() {
    let mailgun = MockServer::start_async().await;
    let stats_mock = mailgun
        .mock_async(|when, then| {
            when.method(GET)
                .path("/example.com/stats/total")
                .query_param("duration", "7d")
                .query_param("event", "accepted")
                .query_param("event", "failed");
            then.status(200).json_body(stats_fixture());
        })
        .await;
    let (addr, handle) = spawn_test_server(test_state(&mailgun.base_url()))
        .await
        .expect("spawn server");

    let response = Client::new()
        .post(format!("http://{addr}{STATS_ENDPOINT}"))
        .json(&json!({ "token": "slack-secret", "text": "7d accepted,failed" }))
        .send()
        .await
        .expect("send stats command");
    assert_eq!(response.status(), StatusCode::OK);

    let payload = response.json::<Value>().await.expect("parse response body");
    assert_eq!(payload["response_type"], "in_channel");
    assert_eq!(
        payload["text"],
        "Mailgun totals from Mon, 06 Jan 2020 00:00:00 UTC to Mon, 13 Jan 2020 00:00:00 UTC"
    );

    let attachments = payload["attachments"]
        .as_array()
        .expect("attachments array");
    let titles: Vec<&str> = attachments
        .iter()
        .filter_map(|attachment| attachment["title"].as_str())
        .collect();
    assert_eq!(titles, vec!["accepted", "temporary", "permanent"]);
    assert_eq!(attachments[0]["text"], "_incoming:_ 5\n_outgoing:_ 1\n");
    assert_eq!(attachments[1]["color"], "#d9a8aa");
    assert_eq!(attachments[2]["text"], "_bounce:_ 4\n");

    stats_mock.assert_async().await;
    handle.abort();
}

#[tokio::test]
async fn command_without_text_falls_back_to_default_query() {
    let mailgun = MockServer::start_async().await;
    let stats_mock = mailgun
        .mock_async(|when, then| {
            when.method(GET)
                .path("/example.com/stats/total")
                .query_param("duration", "24h")
                .query_param("event", "accepted")
                .query_param("event", "delivered")
                .query_param("event", "failed");
            then.status(200).json_body(json!({
                "start": "2020-01-01",
                "end": "2020-01-01",
                "stats": [],
            }));
        })
        .await;
    let (addr, handle) = spawn_test_server(test_state(&mailgun.base_url()))
        .await
        .expect("spawn server");

    // Non-string text degrades to the defaults as well.
    let response = Client::new()
        .post(format!("http://{addr}{STATS_ENDPOINT}"))
        .json(&json!({ "token": "slack-secret", "text": 42 }))
        .send()
        .await
        .expect("send stats command");
    assert_eq!(response.status(), StatusCode::OK);

    let payload = response.json::<Value>().await.expect("parse response body");
    assert_eq!(payload["text"], "Mailgun totals for 2020-01-01");
    assert_eq!(payload["attachments"], json!([]));

    stats_mock.assert_async().await;
    handle.abort();
}

#[tokio::test]
async fn mailgun_failure_maps_to_500_with_error_detail() {
    let mailgun = MockServer::start_async().await;
    mailgun
        .mock_async(|when, then| {
            when.method(GET).path("/example.com/stats/total");
            then.status(502).body("bad upstream");
        })
        .await;
    let (addr, handle) = spawn_test_server(test_state(&mailgun.base_url()))
        .await
        .expect("spawn server");

    let response = Client::new()
        .post(format!("http://{addr}{STATS_ENDPOINT}"))
        .json(&json!({ "token": "slack-secret", "text": "24h" }))
        .send()
        .await
        .expect("send stats command");
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let payload = response.json::<Value>().await.expect("parse error body");
    assert_eq!(payload["error"]["code"], "mailgun_error");
    let message = payload["error"]["message"].as_str().unwrap_or_default();
    assert!(message.contains("502"), "missing status in: {message}");
    assert!(message.contains("bad upstream"), "missing body in: {message}");

    handle.abort();
}

#[tokio::test]
async fn healthz_answers_without_a_token() {
    let mailgun = MockServer::start_async().await;
    let (addr, handle) = spawn_test_server(test_state(&mailgun.base_url()))
        .await
        .expect("spawn server");

    let response = Client::new()
        .get(format!("http://{addr}{HEALTHZ_ENDPOINT}"))
        .send()
        .await
        .expect("send healthz request");
    assert_eq!(response.status(), StatusCode::OK);
    let payload = response.json::<Value>().await.expect("parse healthz body");
    assert_eq!(payload, json!({ "ok": true }));

    handle.abort();
}
