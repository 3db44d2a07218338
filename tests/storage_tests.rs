//! JSON store tests
//!
//! Exercises the repositories through the service provider, against a temporary data
//! directory, and checks what actually lands on disk.

use character_chat_api::build_provider;
use character_chat_api::error::PlatformError;
use character_chat_api::infrastructure::entities::{Conversation, MessageRole, User};
use character_chat_api::infrastructure::settings::Settings;
use character_chat_api::infrastructure::traits::{
    CharacterRepository, ConversationRepository, UserRepository,
};
use chrono::{Duration, Utc};
use di::{Ref, ServiceProvider};
use serde_json::Value;
use std::time::Duration as StdDuration;
use tempfile::TempDir;
use uuid::Uuid;

fn setup() -> (ServiceProvider, TempDir) {
    setup_with(|_| {})
}

fn setup_with(configure: impl FnOnce(&mut Settings)) -> (ServiceProvider, TempDir) {
    let data_dir = tempfile::tempdir().unwrap();
    let mut settings = Settings {
        data_dir: data_dir.path().to_path_buf(),
        ..Settings::default()
    };
    configure(&mut settings);
    (build_provider(settings).unwrap(), data_dir)
}

fn conversations(provider: &ServiceProvider) -> Ref<dyn ConversationRepository> {
    provider.get_required::<dyn ConversationRepository>()
}

fn characters(provider: &ServiceProvider) -> Ref<dyn CharacterRepository> {
    provider.get_required::<dyn CharacterRepository>()
}

fn users(provider: &ServiceProvider) -> Ref<dyn UserRepository> {
    provider.get_required::<dyn UserRepository>()
}

// =============================================================================
// Character Store
// =============================================================================

#[tokio::test]
async fn test_defaults_are_seeded_on_first_read() {
    let (provider, dir) = setup();

    let list = characters(&provider).list_characters().await.unwrap();

    assert_eq!(list.len(), 1);
    assert_eq!(list[0].id, "coach");
    assert!(dir.path().join("characters.json").exists());
}

#[tokio::test]
async fn test_characters_keep_file_order() {
    let (provider, dir) = setup();
    std::fs::write(
        dir.path().join("characters.json"),
        r#"[
            {"id":"b","name":"B","description":"","personality":"","system_prompt":"sb"},
            {"id":"a","name":"A","description":"","personality":"","system_prompt":"sa"}
        ]"#,
    )
    .unwrap();

    let ids: Vec<String> = characters(&provider)
        .list_characters()
        .await
        .unwrap()
        .into_iter()
        .map(|c| c.id)
        .collect();

    assert_eq!(ids, vec!["b", "a"]);
}

#[tokio::test]
async fn test_character_file_edits_are_picked_up() {
    let (provider, dir) = setup();
    let store = characters(&provider);
    store.list_characters().await.unwrap();

    std::fs::write(
        dir.path().join("characters.json"),
        r#"[{"id":"poet","name":"Poet","description":"","personality":"","system_prompt":"rhyme"}]"#,
    )
    .unwrap();

    assert_eq!(store.get_character("poet").await.unwrap().name, "Poet");
    assert!(matches!(
        store.get_character("coach").await,
        Err(PlatformError::NotFound { .. })
    ));
}

#[tokio::test]
async fn test_malformed_character_file_is_a_storage_error() {
    let (provider, dir) = setup();
    std::fs::write(dir.path().join("characters.json"), r#"[{"id":"x"}]"#).unwrap();

    let err = characters(&provider).list_characters().await.unwrap_err();

    assert!(matches!(err, PlatformError::Storage(_)));
    assert!(err.to_string().contains("characters.json"));
}

#[tokio::test]
async fn test_created_character_is_persisted_after_defaults() {
    let (provider, dir) = setup();

    let created = characters(&provider)
        .create_character("gardening", &["patient".into(), "cheerful".into()])
        .await
        .unwrap();

    let on_disk: Value =
        serde_json::from_str(&std::fs::read_to_string(dir.path().join("characters.json")).unwrap())
            .unwrap();
    let on_disk = on_disk.as_array().unwrap();
    assert_eq!(on_disk.len(), 2);
    assert_eq!(on_disk[0]["id"], "coach");
    assert_eq!(on_disk[1]["id"], created.id.as_str());
    assert_eq!(on_disk[1]["personality"], "patient, cheerful");
}

#[tokio::test]
async fn test_invalid_character_request_writes_nothing() {
    let (provider, dir) = setup();

    let err = characters(&provider)
        .create_character("", &["odd".into()])
        .await
        .unwrap_err();

    assert!(matches!(err, PlatformError::Validation(_)));
    assert!(!dir.path().join("characters.json").exists());
}

// =============================================================================
// Conversation Store
// =============================================================================

#[tokio::test]
async fn test_new_conversation_is_empty_and_unsaved() {
    let (provider, dir) = setup();

    let conversation = conversations(&provider)
        .get_or_create("u1", "coach", None)
        .await
        .unwrap();

    assert!(conversation.messages.is_empty());
    assert_eq!(conversation.user_id, "u1");
    assert_eq!(conversation.character_id, "coach");
    assert!(Uuid::parse_str(&conversation.id).is_ok());
    assert!(!dir.path().join("conversations").exists());
}

#[tokio::test]
async fn test_save_then_reload_keeps_message_order() {
    let (provider, dir) = setup();
    let store = conversations(&provider);

    let mut conversation = store.get_or_create("u1", "coach", None).await.unwrap();
    store.append_message(&mut conversation, MessageRole::User, "hello".into());
    store.append_message(&mut conversation, MessageRole::Character, "hi".into());
    store.save(&conversation).await.unwrap();

    assert!(
        dir.path()
            .join("conversations")
            .join(format!("{}.json", conversation.id))
            .exists()
    );

    let reloaded = store
        .get_or_create("u1", "coach", Some(&conversation.id))
        .await
        .unwrap();
    assert_eq!(reloaded, conversation);
    assert_eq!(reloaded.messages[0].role, MessageRole::User);
    assert_eq!(reloaded.messages[1].role, MessageRole::Character);
}

#[tokio::test]
async fn test_save_overwrites_whole_file() {
    let (provider, _dir) = setup();
    let store = conversations(&provider);

    let mut conversation = store.get_or_create("u1", "coach", None).await.unwrap();
    store.append_message(&mut conversation, MessageRole::User, "first".into());
    store.save(&conversation).await.unwrap();

    // A stale copy saved later wins: last write wins.
    let mut stale = store
        .get_or_create("u1", "coach", Some(&conversation.id))
        .await
        .unwrap();
    store.append_message(&mut conversation, MessageRole::Character, "lost".into());
    store.save(&conversation).await.unwrap();
    store.append_message(&mut stale, MessageRole::Character, "kept".into());
    store.save(&stale).await.unwrap();

    let reloaded = store.load("u1", &conversation.id).await.unwrap();
    let texts: Vec<&str> = reloaded.messages.iter().map(|m| m.text.as_str()).collect();
    assert_eq!(texts, vec!["first", "kept"]);
}

#[tokio::test]
async fn test_get_or_create_rejects_missing_and_mismatched() {
    let (provider, _dir) = setup();
    let store = conversations(&provider);

    let mut conversation = store.get_or_create("u1", "coach", None).await.unwrap();
    store.append_message(&mut conversation, MessageRole::User, "x".into());
    store.save(&conversation).await.unwrap();

    let missing = Uuid::new_v4().to_string();
    for (user, character, id) in [
        ("u1", "coach", missing.as_str()),
        ("u2", "coach", conversation.id.as_str()),
        ("u1", "poet", conversation.id.as_str()),
        ("u1", "coach", "../characters"),
    ] {
        let result = store.get_or_create(user, character, Some(id)).await;
        assert!(
            matches!(result, Err(PlatformError::NotFound { .. })),
            "expected NotFound for ({user}, {character}, {id})"
        );
    }
}

#[tokio::test]
async fn test_list_for_user_sorted_by_recency_and_skips_bad_files() {
    let (provider, dir) = setup();
    let store = conversations(&provider);
    let now = Utc::now();

    let mut older = Conversation::new(Uuid::new_v4().to_string(), "u1", "coach");
    older.push(MessageRole::User, "old".into());
    older.last_activity = now - Duration::minutes(10);
    store.save(&older).await.unwrap();

    let mut newer = Conversation::new(Uuid::new_v4().to_string(), "u1", "coach");
    newer.push(MessageRole::User, "x".repeat(150));
    store.save(&newer).await.unwrap();

    let mut foreign = Conversation::new(Uuid::new_v4().to_string(), "u2", "coach");
    foreign.push(MessageRole::User, "not yours".into());
    store.save(&foreign).await.unwrap();

    std::fs::write(
        dir.path().join("conversations").join("broken.json"),
        "{ nope",
    )
    .unwrap();

    let summaries = store.list_for_user("u1").await.unwrap();

    assert_eq!(summaries.len(), 2);
    assert_eq!(summaries[0].id, newer.id);
    assert_eq!(summaries[1].id, older.id);
    assert_eq!(summaries[0].preview, format!("{}...", "x".repeat(100)));
    assert_eq!(summaries[1].preview, "old");
    assert_eq!(summaries[1].message_count, 1);
}

#[tokio::test]
async fn test_list_for_user_marks_inactive_conversations() {
    let (provider, _dir) = setup_with(|s| s.inactivity_timeout = StdDuration::from_secs(60));
    let store = conversations(&provider);

    let mut stale = Conversation::new(Uuid::new_v4().to_string(), "u1", "coach");
    stale.push(MessageRole::User, "hello?".into());
    stale.last_activity = Utc::now() - Duration::minutes(5);
    store.save(&stale).await.unwrap();

    let summaries = store.list_for_user("u1").await.unwrap();

    assert_eq!(summaries.len(), 1);
    assert!(!summaries[0].active);
}

#[tokio::test]
async fn test_list_for_user_without_any_conversations() {
    let (provider, _dir) = setup();

    assert!(
        conversations(&provider)
            .list_for_user("nobody")
            .await
            .unwrap()
            .is_empty()
    );
}

// =============================================================================
// User Store
// =============================================================================

#[tokio::test]
async fn test_user_save_is_an_upsert() {
    let (provider, _dir) = setup();
    let store = users(&provider);
    let now = Utc::now();

    let mut user = User {
        id: Uuid::new_v4().to_string(),
        username: "grace".into(),
        password_hash: "h".into(),
        created_at: now,
        last_login: now,
    };
    store.save_user(&user).await.unwrap();
    user.last_login = now + Duration::seconds(5);
    store.save_user(&user).await.unwrap();

    let found = store.find_by_username("grace").await.unwrap().unwrap();
    assert_eq!(found, user);
    assert!(store.find_by_username("linus").await.unwrap().is_none());
}
