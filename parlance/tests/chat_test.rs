use parlance::prelude::*;
use parlance::SessionConfig;
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn sse_body(chunks: &[&str]) -> String {
    let mut body = String::new();
    for chunk in chunks {
        let event = json!({"candidates": [{"content": {"parts": [{"text": chunk}]}}]});
        body.push_str(&format!("data: {event}\n\n"));
    }
    body
}

async fn chat_against(server: &MockServer) -> Chat {
    ChatBuilder::new()
        .api_key("test-key")
        .base_url(format!("{}/v1beta", server.uri()))
        .in_memory()
        .session_config(SessionConfig::new().with_persist_debounce(Duration::from_millis(50)))
        .build()
        .await
        .unwrap()
}

#[tokio::test]
async fn test_ask_returns_streamed_reply() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-2.5-flash:streamGenerateContent"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(sse_body(&["Bra", "sília"]), "text/event-stream"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let chat = chat_against(&server).await;
    let answer = chat.ask("What is the capital of Brazil?").await.unwrap();

    assert_eq!(answer, "Brasília");
    let snapshot = chat.session().snapshot();
    assert_eq!(snapshot.threads[0].title, "What is the capital of Brazil?");
    chat.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_ask_surfaces_api_errors() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(403)
                .set_body_string(r#"{"error":{"code":403,"message":"API key not valid."}}"#),
        )
        .mount(&server)
        .await;

    let chat = chat_against(&server).await;
    let err = chat.ask("Hello").await.unwrap_err();

    assert_eq!(err.to_string(), "API error (403): API key not valid.");
    assert_eq!(chat.session().snapshot().messages.len(), 1);
}

#[tokio::test]
async fn test_builder_applies_preferences() {
    let chat = ChatBuilder::new()
        .in_memory()
        .model("models/gemini-2.0-flash")
        .system_prompt("Be brief")
        .safety(SafetyPreset::Off)
        .build()
        .await
        .unwrap();

    let snapshot = chat
        .session()
        .wait_for(|s| s.safety_preset == SafetyPreset::Off)
        .await
        .unwrap();
    assert_eq!(snapshot.selected_model, "gemini-2.0-flash");
    assert_eq!(snapshot.system_prompt, "Be brief");
    assert!(!snapshot.has_api_key);
}

#[tokio::test]
async fn test_history_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(sse_body(&["Hi!"]), "text/event-stream"),
        )
        .mount(&server)
        .await;

    let chat = ChatBuilder::new()
        .api_key("test-key")
        .base_url(format!("{}/v1beta", server.uri()))
        .data_dir(dir.path())
        .build()
        .await
        .unwrap();
    chat.ask("Hello").await.unwrap();
    chat.shutdown().await.unwrap();

    let reopened = ChatBuilder::new().data_dir(dir.path()).build().await.unwrap();
    let snapshot = reopened.session().snapshot();

    assert!(snapshot.has_api_key);
    assert_eq!(snapshot.messages.len(), 2);
    assert_eq!(snapshot.last_reply(), Some("Hi!"));
    assert!(dir.path().join("threads.json").exists());
}

#[test]
fn test_ask_without_key_fails_fast() {
    tokio_test::block_on(async {
        let chat = ChatBuilder::new().in_memory().build().await.unwrap();
        let err = chat.ask("Hello").await.unwrap_err();
        assert_eq!(err.to_string(), "No API key configured");
    });
}

#[test]
fn test_blank_message_is_rejected() {
    tokio_test::block_on(async {
        let chat = ChatBuilder::new()
            .api_key("k")
            .in_memory()
            .build()
            .await
            .unwrap();
        assert!(chat.ask("  ").await.is_err());
    });
}
