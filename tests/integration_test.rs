//! Integration tests for convo-memory
//!
//! These tests drive the public API end to end: store, sweeping, and
//! persistence through the storage backends.

use convo_memory::memory::ManualClock;
use convo_memory::{
    CachedStorage, ConversationStorage, ConversationStore, FileSystemStorage, MemoryError,
    MemoryLimits, SharedConversationStore,
};
use std::sync::Arc;
use std::time::Duration;
use tempfile::tempdir;

fn store(clock: &ManualClock, limits: MemoryLimits) -> ConversationStore {
    ConversationStore::with_clock(limits, Arc::new(clock.clone()))
}

#[test]
fn test_hundred_and_one_messages() {
    let clock = ManualClock::default();
    let mut store = store(&clock, MemoryLimits::default());
    let c1 = store.create_conversation().unwrap();

    for i in 1..=101 {
        clock.advance(Duration::from_secs(1));
        store.add_message(&c1, "user", &format!("#{}", i)).unwrap();
    }

    let messages = store.get_messages(&c1);
    assert_eq!(messages.len(), 100);
    assert_eq!(messages[0].content(), "#2");
    assert_eq!(store.get_conversation_stats(&c1).unwrap().message_count, 101);
}

#[test]
fn test_error_scenarios() {
    let clock = ManualClock::default();
    let mut store = store(&clock, MemoryLimits::default());

    assert_eq!(
        store.add_message("", "user", "hi").unwrap_err(),
        MemoryError::InvalidConversationId
    );
    assert_eq!(
        store.validator().validate("narrator", "hello").unwrap_err(),
        MemoryError::InvalidRole("narrator".to_string())
    );
    assert_eq!(
        store.validator().validate("user", "   ").unwrap_err(),
        MemoryError::EmptyContent
    );
    assert!(matches!(
        store.add_message("c", "user", &"x".repeat(4097)),
        Err(MemoryError::ContentTooLarge { len: 4097, max: 4096 })
    ));
}

#[test]
fn test_retention_lifecycle() {
    let clock = ManualClock::default();
    let limits = MemoryLimits {
        max_conversations: 3,
        conversation_timeout: Duration::from_secs(3600),
        cleanup_interval: Duration::from_secs(300),
        ..MemoryLimits::default()
    };
    let mut store = store(&clock, limits);

    store.add_message("quiet", "user", "hello").unwrap();
    clock.advance(Duration::from_secs(1800));
    store.add_message("busy", "user", "hello").unwrap();

    clock.advance(Duration::from_secs(1900));
    store.add_message("busy", "assistant", "still here").unwrap();

    assert!(!store.contains("quiet"));
    assert!(store.contains("busy"));
    assert_eq!(store.store_stats().admitted_messages, 2);
}

#[tokio::test]
async fn test_filesystem_round_trip_through_cache() {
    let dir = tempdir().unwrap();
    let backend = FileSystemStorage::new(dir.path().to_path_buf()).await.unwrap();
    let storage = CachedStorage::new(Arc::new(backend), 10);
    let clock = ManualClock::default();

    let shared = SharedConversationStore::new(store(&clock, MemoryLimits::default()));
    shared.add_message("chat-1", "system", "You are helpful").await.unwrap();
    shared.add_message("chat-1", "user", "Is 2 < 3?").await.unwrap();
    shared.add_message("chat-1", "assistant", "Yes").await.unwrap();
    assert!(shared.persist("chat-1", &storage).await.unwrap());

    let raw = std::fs::read_to_string(dir.path().join("chat-1.json")).unwrap();
    let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(json["conversation_id"], "chat-1");
    assert_eq!(json["messages"][1]["content"], "Is 2 &lt; 3?");

    storage.invalidate_all().await;
    let restored = SharedConversationStore::new(store(&clock, MemoryLimits::default()));
    assert!(restored.load_from("chat-1", &storage).await.unwrap());

    let context = restored.context_messages("chat-1", 10).await;
    assert_eq!(context.len(), 3);
    assert_eq!(context[0].role, "system");
    assert_eq!(context[2].content, "Yes");
    assert_eq!(storage.list_conversations().await.unwrap(), vec!["chat-1".to_string()]);
}
