mod common;

use common::{FakeClient, StreamScript};
use parlance_llm::GenerationError;
use parlance_persist::{
    InMemorySecretStore, InMemorySettingsStore, InMemoryThreadStore, PersistClient, SecretStore,
    SettingsStore, API_KEY_HANDLE, SELECTED_MODEL_KEY,
};
use parlance_session::{SessionBuilder, SessionConfig, SessionError, SessionHandle};
use parlance_types::{ConnectionStatus, Message, Thread};
use std::sync::Arc;
use std::time::Duration;

struct Harness {
    handle: SessionHandle,
    store: Arc<InMemoryThreadStore>,
    settings: Arc<InMemorySettingsStore>,
    client: Arc<FakeClient>,
}

async fn start(client: FakeClient, store: InMemoryThreadStore, api_key: Option<&str>) -> Harness {
    start_with_debounce(client, store, api_key, Duration::from_secs(30)).await
}

async fn start_with_debounce(
    client: FakeClient,
    store: InMemoryThreadStore,
    api_key: Option<&str>,
    debounce: Duration,
) -> Harness {
    let store = Arc::new(store);
    let settings = Arc::new(InMemorySettingsStore::new());
    let secrets = Arc::new(InMemorySecretStore::new());
    if let Some(key) = api_key {
        secrets.save_secret(API_KEY_HANDLE, key).unwrap();
    }

    let persist = PersistClient::builder()
        .in_memory()
        .thread_store(store.clone())
        .settings_store(settings.clone())
        .secret_store(secrets)
        .build()
        .unwrap();

    let client = Arc::new(client);
    let handle = SessionBuilder::new()
        .client(client.clone())
        .persist(persist)
        .config(SessionConfig::new().with_persist_debounce(debounce))
        .spawn()
        .await
        .unwrap();

    Harness {
        handle,
        store,
        settings,
        client,
    }
}

fn saves_with_reply(store: &InMemoryThreadStore, text: &str) -> usize {
    store
        .snapshots()
        .iter()
        .filter(|threads| {
            threads
                .iter()
                .flat_map(|t| &t.messages)
                .any(|m| !m.is_user() && m.text == text)
        })
        .count()
}

#[tokio::test]
async fn test_streamed_reply_lands_in_history_once() {
    let h = start(
        FakeClient::new().with_stream(StreamScript::chunks(&["H", "He", "Hel", "Hello"])),
        InMemoryThreadStore::new(),
        Some("test-key"),
    )
    .await;

    assert!(h.handle.send_message("Hello").await.unwrap());
    let snapshot = h.handle.wait_until_idle().await.unwrap();

    assert_eq!(snapshot.messages.len(), 2);
    assert!(snapshot.messages[0].is_user());
    assert_eq!(snapshot.messages[1].text, "Hello");
    assert_eq!(snapshot.messages[1].model_name.as_deref(), Some("gemini-2.5-flash"));
    assert_eq!(snapshot.draft, "");
    assert_eq!(snapshot.error_message, None);
    assert_eq!(snapshot.threads[0].title, "Hello");

    assert_eq!(saves_with_reply(&h.store, "Hello"), 1);
    assert_eq!(h.client.stream_requests()[0].api_key, "test-key");
}

#[tokio::test]
async fn test_send_without_api_key_is_ignored() {
    let h = start(FakeClient::new(), InMemoryThreadStore::new(), None).await;

    assert!(!h.handle.send_message("Hello").await.unwrap());

    let snapshot = h.handle.snapshot();
    assert!(!snapshot.has_api_key);
    assert_eq!(snapshot.draft, "Hello");
    assert!(snapshot.messages.is_empty());
    assert_eq!(h.store.save_count(), 0);
}

#[tokio::test]
async fn test_blank_draft_is_not_sent() {
    let h = start(FakeClient::new(), InMemoryThreadStore::new(), Some("k")).await;

    assert!(!h.handle.send_message("   \n ").await.unwrap());
    assert!(h.handle.snapshot().messages.is_empty());
    assert!(h.client.stream_requests().is_empty());
}

#[tokio::test]
async fn test_failure_before_any_text_reports_error() {
    let body = r#"{"error":{"code":403,"message":"API key not valid."}}"#;
    let h = start(
        FakeClient::new().with_stream(StreamScript::Reject(GenerationError::api(403, body))),
        InMemoryThreadStore::new(),
        Some("bad-key"),
    )
    .await;

    h.handle.send_message("Hello").await.unwrap();
    let snapshot = h.handle.wait_until_idle().await.unwrap();

    assert_eq!(snapshot.messages.len(), 1);
    assert_eq!(
        snapshot.error_message.as_deref(),
        Some("API error (403): API key not valid.")
    );
    let persisted = h.store.current();
    assert_eq!(persisted[0].messages.len(), 1);
}

#[tokio::test]
async fn test_cancel_keeps_partial_reply() {
    let h = start(
        FakeClient::new().with_stream(StreamScript::Stall(vec![Ok("Partial".to_string())])),
        InMemoryThreadStore::new(),
        Some("k"),
    )
    .await;

    h.handle.send_message("Hello").await.unwrap();
    h.handle
        .wait_for(|s| s.last_reply() == Some("Partial"))
        .await
        .unwrap();
    h.handle.cancel_response().unwrap();
    let snapshot = h.handle.wait_until_idle().await.unwrap();

    assert_eq!(snapshot.messages.len(), 2);
    assert_eq!(snapshot.messages[1].text, "Partial");
    assert_eq!(snapshot.error_message, None);
    assert!(snapshot.can_manage_history);
}

#[tokio::test(start_paused = true)]
async fn test_streamed_progress_is_saved_once_after_quiet_window() {
    let h = start_with_debounce(
        FakeClient::new().with_stream(StreamScript::PacedStall(vec![
            (Duration::ZERO, "Par".to_string()),
            (Duration::from_millis(300), "Partial".to_string()),
        ])),
        InMemoryThreadStore::new(),
        Some("k"),
        Duration::from_secs(1),
    )
    .await;

    assert!(h.handle.send_message("Hello").await.unwrap());
    assert_eq!(h.store.save_count(), 1);

    // progress began at 0 ms and last arrived near 330 ms, so only the
    // newest timer may fire, one second after that
    tokio::time::sleep(Duration::from_millis(1200)).await;
    assert_eq!(h.handle.snapshot().last_reply(), Some("Partial"));
    assert_eq!(h.store.save_count(), 1);

    tokio::time::sleep(Duration::from_millis(800)).await;
    assert_eq!(h.store.save_count(), 2);
    assert_eq!(saves_with_reply(&h.store, "Partial"), 1);
    assert!(h.handle.snapshot().is_sending);

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(h.store.save_count(), 2);

    h.handle.cancel_response().unwrap();
    h.handle.wait_until_idle().await.unwrap();
    assert_eq!(h.store.save_count(), 3);
}

#[tokio::test]
async fn test_cancel_before_text_removes_placeholder() {
    let h = start(
        FakeClient::new().with_stream(StreamScript::Stall(Vec::new())),
        InMemoryThreadStore::new(),
        Some("k"),
    )
    .await;

    h.handle.send_message("Hello").await.unwrap();
    h.handle.cancel_response().unwrap();
    let snapshot = h.handle.wait_until_idle().await.unwrap();

    assert_eq!(snapshot.messages.len(), 1);
    assert_eq!(snapshot.error_message, None);
    assert_eq!(h.store.current()[0].messages.len(), 1);
}

#[tokio::test]
async fn test_history_is_locked_while_sending() {
    let h = start(
        FakeClient::new().with_stream(StreamScript::Stall(Vec::new())),
        InMemoryThreadStore::new(),
        Some("k"),
    )
    .await;

    h.handle.send_message("Hello").await.unwrap();
    assert!(!h.handle.snapshot().can_manage_history);
    assert_eq!(
        h.handle.start_new_chat().await,
        Err(SessionError::HistoryLocked)
    );
    assert!(!h.handle.send_message("Again").await.unwrap());

    h.handle.cancel_response().unwrap();
    h.handle.wait_until_idle().await.unwrap();
    assert!(h.handle.start_new_chat().await.is_ok());
}

#[tokio::test]
async fn test_unreadable_history_starts_empty_with_warning() {
    let h = start(
        FakeClient::new(),
        InMemoryThreadStore::new().fail_loads(),
        Some("k"),
    )
    .await;

    let snapshot = h.handle.snapshot();
    assert!(snapshot
        .history_warning
        .as_deref()
        .unwrap()
        .starts_with("Could not load chat history"));
    assert_eq!(snapshot.threads.len(), 1);
    assert!(snapshot.messages.is_empty());
}

#[tokio::test]
async fn test_failed_save_warns_but_keeps_reply() {
    let h = start(
        FakeClient::new().with_stream(StreamScript::chunks(&["Hi"])),
        InMemoryThreadStore::new().fail_saves(),
        Some("k"),
    )
    .await;

    h.handle.send_message("Hello").await.unwrap();
    let snapshot = h.handle.wait_until_idle().await.unwrap();

    assert_eq!(snapshot.last_reply(), Some("Hi"));
    assert!(snapshot
        .history_warning
        .as_deref()
        .unwrap()
        .starts_with("Could not save chat history"));
}

#[tokio::test]
async fn test_missing_model_switches_selection() {
    let h = start(
        FakeClient::new()
            .with_stream(StreamScript::Reject(GenerationError::api(404, "not found")))
            .with_stream(StreamScript::chunks(&["Hello"]))
            .with_models(&["gemini-2.0-flash", "gemini-2.5-flash"]),
        InMemoryThreadStore::new(),
        Some("k"),
    )
    .await;

    h.handle.set_model("models/gemini-1.0-pro").unwrap();
    h.handle.send_message("Hello").await.unwrap();
    let snapshot = h.handle.wait_until_idle().await.unwrap();

    assert_eq!(snapshot.selected_model, "gemini-2.5-flash");
    assert_eq!(snapshot.available_models, vec!["gemini-2.0-flash", "gemini-2.5-flash"]);
    let notice = snapshot.notice.unwrap();
    assert!(notice.contains("gemini-1.0-pro"));
    assert!(notice.contains("gemini-2.5-flash"));
    assert_eq!(
        h.settings.get(SELECTED_MODEL_KEY).unwrap().as_deref(),
        Some("gemini-2.5-flash")
    );
}

#[tokio::test]
async fn test_connection_check_reports_model_count() {
    let h = start(
        FakeClient::new().with_models(&["gemini-2.0-flash", "gemini-2.5-flash"]),
        InMemoryThreadStore::new(),
        None,
    )
    .await;
    assert_eq!(h.handle.snapshot().connection, ConnectionStatus::NotConfigured);

    h.handle.set_api_key("  new-key ").await.unwrap();
    assert_eq!(h.handle.snapshot().connection, ConnectionStatus::NotChecked);

    h.handle.check_connection().unwrap();
    let snapshot = h
        .handle
        .wait_for(|s| s.connection.is_connected())
        .await
        .unwrap();

    assert_eq!(snapshot.connection, ConnectionStatus::Connected { model_count: 2 });
    assert_eq!(snapshot.available_models.len(), 2);
    assert!(snapshot.has_api_key);

    h.handle.clear_api_key().await.unwrap();
    let snapshot = h.handle.snapshot();
    assert!(!snapshot.has_api_key);
    assert!(snapshot.available_models.is_empty());
}

#[tokio::test]
async fn test_chats_can_be_switched_and_deleted() {
    let mut earlier = Thread::new();
    earlier.set_messages(vec![Message::user("Earlier question")]);
    let earlier_id = earlier.id;

    let h = start(
        FakeClient::new(),
        InMemoryThreadStore::with_threads(vec![earlier]),
        Some("k"),
    )
    .await;
    assert_eq!(h.handle.snapshot().current_thread_id, earlier_id);

    let fresh = h.handle.start_new_chat().await.unwrap();
    let snapshot = h.handle.snapshot();
    assert_eq!(snapshot.current_thread_id, fresh);
    assert!(snapshot.messages.is_empty());
    assert_eq!(snapshot.threads.len(), 2);

    h.handle.open_chat(earlier_id).await.unwrap();
    assert_eq!(h.handle.snapshot().messages[0].text, "Earlier question");

    h.handle.delete_chat(earlier_id).await.unwrap();
    let snapshot = h.handle.snapshot();
    assert_eq!(snapshot.threads.len(), 1);
    assert_eq!(snapshot.current_thread_id, fresh);
    assert_eq!(h.store.current().len(), 1);
}

#[tokio::test]
async fn test_shutdown_persists_and_closes() {
    let h = start(FakeClient::new(), InMemoryThreadStore::new(), Some("k")).await;

    h.handle.shutdown().await.unwrap();

    assert!(h.store.save_count() >= 1);
    assert_eq!(h.handle.flush().await, Err(SessionError::Closed));
}
