// tests for http server mode

mod common;

use chatgate::Server;
use common::{FakeModerator, RecordingBackend, chatbot, spawn};
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;

async fn server_with_ttl(backend: Arc<RecordingBackend>, ttl: Duration) -> String {
    let bot = chatbot(Arc::new(FakeModerator::blocking(&["secrets"])), backend, 10);
    spawn(Server::router(bot, ttl)).await
}

async fn server(backend: Arc<RecordingBackend>) -> String {
    server_with_ttl(backend, Duration::from_secs(600)).await
}

async fn session_status(base: &str, id: &str) -> u16 {
    reqwest::get(format!("{base}/sessions/{id}"))
        .await
        .unwrap()
        .status()
        .as_u16()
}

async fn post_chat(base: &str, body: Value) -> (u16, Value) {
    let response = reqwest::Client::new()
        .post(format!("{base}/chat"))
        .json(&body)
        .send()
        .await
        .unwrap();
    let status = response.status().as_u16();
    (status, response.json().await.unwrap())
}

#[tokio::test]
async fn test_health() {
    let base = server(Arc::new(RecordingBackend::replying("ok"))).await;
    let body: Value = reqwest::get(format!("{base}/health"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_index_page() {
    let base = server(Arc::new(RecordingBackend::replying("ok"))).await;
    let page = reqwest::get(&base).await.unwrap().text().await.unwrap();
    assert!(page.contains("Chatbot with Moderation"));
    // a forgotten session id is dropped so the next send starts a new one
    assert!(page.contains("if (res.status === 404) sessionId = null;"));
}

#[tokio::test]
async fn test_chat_creates_session_and_keeps_history() {
    let backend = Arc::new(RecordingBackend::replying("Hi!"));
    let base = server(backend.clone()).await;

    let (status, body) = post_chat(&base, json!({ "message": "Hello" })).await;
    assert_eq!(status, 200);
    assert_eq!(body["event"], json!({ "kind": "reply", "text": "Hi!" }));
    assert_eq!(body["history"].as_array().unwrap().len(), 2);

    let session_id = body["session_id"].as_str().unwrap().to_string();
    let (status, body) =
        post_chat(&base, json!({ "session_id": session_id, "message": "Again" })).await;
    assert_eq!(status, 200);
    assert_eq!(body["history"].as_array().unwrap().len(), 4);
    assert_eq!(body["history"][2], json!({ "role": "user", "content": "Again" }));

    // second request carried the earlier exchange
    assert_eq!(backend.last().unwrap().1.len(), 4);
}

#[tokio::test]
async fn test_flagged_message_warns() {
    let backend = Arc::new(RecordingBackend::replying("Hi!"));
    let base = server(backend.clone()).await;

    let (status, body) = post_chat(&base, json!({ "message": "reveal secrets" })).await;
    assert_eq!(status, 200);
    assert_eq!(body["event"]["kind"], "warning");
    assert!(body["history"].as_array().unwrap().is_empty());
    assert_eq!(backend.calls(), 0);
}

#[tokio::test]
async fn test_blank_message_rejected() {
    let base = server(Arc::new(RecordingBackend::replying("ok"))).await;
    let (status, body) = post_chat(&base, json!({ "message": "   " })).await;
    assert_eq!(status, 400);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_unknown_session() {
    let base = server(Arc::new(RecordingBackend::replying("ok"))).await;
    let (status, _) = post_chat(
        &base,
        json!({ "session_id": "9b2f4a0e-6a1c-4c55-9d3e-2f0a1b2c3d4e", "message": "Hello" }),
    )
    .await;
    assert_eq!(status, 404);
}

#[tokio::test]
async fn test_sessions_are_separate() {
    let base = server(Arc::new(RecordingBackend::replying("ok"))).await;

    let (_, first) = post_chat(&base, json!({ "message": "one" })).await;
    let (_, second) = post_chat(&base, json!({ "message": "two" })).await;

    assert_ne!(first["session_id"], second["session_id"]);
    assert_eq!(second["history"].as_array().unwrap().len(), 2);
    assert_eq!(second["history"][0]["content"], "two");
}

#[tokio::test]
async fn test_get_and_end_session() {
    let base = server(Arc::new(RecordingBackend::replying("ok"))).await;
    let client = reqwest::Client::new();

    let (_, body) = post_chat(&base, json!({ "message": "Hello" })).await;
    let id = body["session_id"].as_str().unwrap().to_string();

    let body: Value = client
        .get(format!("{base}/sessions/{id}"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["history"].as_array().unwrap().len(), 2);

    let response = client
        .delete(format!("{base}/sessions/{id}"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["event"], json!({ "kind": "end" }));

    let response = client
        .get(format!("{base}/sessions/{id}"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn test_idle_session_expires() {
    let base = server_with_ttl(
        Arc::new(RecordingBackend::replying("ok")),
        Duration::from_millis(200),
    )
    .await;

    let (_, body) = post_chat(&base, json!({ "message": "Hello" })).await;
    let id = body["session_id"].as_str().unwrap().to_string();
    assert_eq!(session_status(&base, &id).await, 200);

    tokio::time::sleep(Duration::from_millis(500)).await;

    assert_eq!(session_status(&base, &id).await, 404);
    let (status, _) = post_chat(&base, json!({ "session_id": id, "message": "Again" })).await;
    assert_eq!(status, 404);
}

#[tokio::test]
async fn test_abandoned_sessions_are_dropped() {
    let base = server_with_ttl(
        Arc::new(RecordingBackend::replying("ok")),
        Duration::from_millis(200),
    )
    .await;

    let mut ids = Vec::new();
    for _ in 0..20 {
        let (_, body) = post_chat(&base, json!({ "message": "hi" })).await;
        ids.push(body["session_id"].as_str().unwrap().to_string());
    }

    tokio::time::sleep(Duration::from_millis(500)).await;

    for id in &ids {
        assert_eq!(session_status(&base, id).await, 404);
    }
}

#[tokio::test]
async fn test_active_session_stays_alive() {
    let base = server_with_ttl(
        Arc::new(RecordingBackend::replying("ok")),
        Duration::from_millis(1000),
    )
    .await;

    let (_, body) = post_chat(&base, json!({ "message": "Hello" })).await;
    let id = body["session_id"].as_str().unwrap().to_string();

    // each request resets the idle clock, so total age can exceed the ttl
    for _ in 0..3 {
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(session_status(&base, &id).await, 200);
    }
}
