//! Integration test: start the webhook server on a free port and POST chat events to it.
//! The server task is aborted when each test ends.

use echobot::config::Config;
use echobot::webhook;
use std::time::Duration;

fn free_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind free port");
    listener.local_addr().expect("local_addr").port()
}

/// Start the server and wait until GET /health answers. Returns the base URL and the server task.
async fn start_server(mut config: Config) -> (String, tokio::task::JoinHandle<()>) {
    let port = free_port();
    config.server.port = port;
    config.server.bind = "127.0.0.1".to_string();
    let handle = tokio::spawn(async move {
        let _ = webhook::run_server(config).await;
    });

    let base = format!("http://127.0.0.1:{}", port);
    let client = reqwest::Client::new();
    let mut last_err = None;
    for _ in 0..100 {
        match client.get(format!("{}/health", base)).send().await {
            Ok(resp) if resp.status().is_success() => {
                let json: serde_json::Value = resp.json().await.expect("parse JSON");
                assert_eq!(json.get("runtime").and_then(|v| v.as_str()), Some("running"));
                assert_eq!(json.get("port").and_then(|v| v.as_u64()), Some(port as u64));
                return (base, handle);
            }
            Ok(_) => {}
            Err(e) => last_err = Some(e),
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    handle.abort();
    panic!(
        "GET {}/health did not return 200 within 5s; last error: {:?}",
        base, last_err
    );
}

async fn post(url: &str, body: &'static str) -> reqwest::Response {
    post_with(url, "application/json", body.to_string()).await
}

async fn post_with(url: &str, content_type: &str, body: String) -> reqwest::Response {
    reqwest::Client::new()
        .post(url)
        .header("Content-Type", content_type)
        .body(body)
        .send()
        .await
        .expect("POST event")
}

#[tokio::test]
async fn webhook_replies_to_chat_events() {
    let (base, handle) = start_server(Config::default()).await;
    let url = format!("{}/", base);

    let resp = post(&url, r#"{"type": "ADDED_TO_SPACE"}"#).await;
    assert_eq!(resp.status().as_u16(), 200);
    assert_eq!(
        resp.headers().get("content-type").and_then(|v| v.to_str().ok()),
        Some("application/json; charset=utf-8")
    );
    let json: serde_json::Value = resp.json().await.expect("parse JSON");
    assert_eq!(json, serde_json::json!({ "text": "Hi!" }));

    let resp = post(&url, r#"{"type": "MESSAGE", "message": {"text": "  hello  "}}"#).await;
    assert_eq!(resp.status().as_u16(), 200);
    let json: serde_json::Value = resp.json().await.expect("parse JSON");
    assert_eq!(json, serde_json::json!({ "text": "hello" }));

    let resp = post(&url, r#"{"type": "SOMETHING_ELSE"}"#).await;
    assert_eq!(resp.status().as_u16(), 200);
    assert_eq!(resp.text().await.expect("body"), "");

    let resp = post(&url, r#"{"type": "MESSAGE"}"#).await;
    assert_eq!(resp.status().as_u16(), 200);
    assert_eq!(resp.text().await.expect("body"), "");

    handle.abort();
}

#[tokio::test]
async fn webhook_rejects_bad_bodies() {
    let (base, handle) = start_server(Config::default()).await;
    let url = format!("{}/", base);

    for body in ["", "not json", "{}"] {
        let resp = post(&url, body).await;
        assert_eq!(resp.status().as_u16(), 400, "body {:?}", body);
        assert_eq!(resp.text().await.expect("body"), "Bad Request");
    }

    handle.abort();
}

#[tokio::test]
async fn webhook_uses_configured_path_and_greeting() {
    let mut config = Config::default();
    config.server.path = "/chat/events".to_string();
    config.bot.greeting = "Hello, space!".to_string();
    let (base, handle) = start_server(config).await;

    let resp = post(&format!("{}/chat/events", base), r#"{"type": "ADDED_TO_SPACE"}"#).await;
    assert_eq!(resp.status().as_u16(), 200);
    let json: serde_json::Value = resp.json().await.expect("parse JSON");
    assert_eq!(json["text"], "Hello, space!");

    let resp = post(&format!("{}/", base), r#"{"type": "ADDED_TO_SPACE"}"#).await;
    assert_eq!(resp.status().as_u16(), 404);

    handle.abort();
}

#[tokio::test]
async fn webhook_accepts_bodies_over_two_megabytes() {
    let (base, handle) = start_server(Config::default()).await;
    let text = "a".repeat(3 * 1024 * 1024);
    let body = serde_json::json!({ "type": "MESSAGE", "message": { "text": format!("  {}  ", text) } })
        .to_string();

    let resp = post_with(&format!("{}/", base), "application/json", body).await;
    assert_eq!(resp.status().as_u16(), 200);
    let json: serde_json::Value = resp.json().await.expect("parse JSON");
    assert_eq!(json["text"].as_str().map(str::len), Some(text.len()));
    assert_eq!(json["text"], text.as_str());

    handle.abort();
}

#[tokio::test]
async fn webhook_parses_json_regardless_of_content_type() {
    let (base, handle) = start_server(Config::default()).await;
    let url = format!("{}/", base);

    let resp = post_with(
        &url,
        "text/plain",
        r#"{"type": "MESSAGE", "message": {"text": " plain "}}"#.to_string(),
    )
    .await;
    assert_eq!(resp.status().as_u16(), 200);
    let json: serde_json::Value = resp.json().await.expect("parse JSON");
    assert_eq!(json, serde_json::json!({ "text": "plain" }));

    let resp = post_with(&url, "text/plain", "hello".to_string()).await;
    assert_eq!(resp.status().as_u16(), 400);
    assert_eq!(resp.text().await.expect("body"), "Bad Request");

    handle.abort();
}
