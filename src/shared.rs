//! Shared Conversation Store
//!
//! Information Hiding:
//! - The single lock guarding the store is hidden behind async methods
//! - Persistence round-trips go through `ConversationStorage` only
//! - The optional periodic sweeper runs as a detached task with its own shutdown

use crate::memory::{
    ChatMessage, ConversationStats, ConversationStore, MemoryResult, Message, SearchHit,
    StoreStats, SweepReport,
};
use crate::storage::ConversationStorage;
use anyhow::{bail, Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{oneshot, RwLock};
use tokio::task::JoinHandle;
use uuid::Uuid;

/// Cloneable handle to one `ConversationStore`. All mutations take the write lock.
#[derive(Clone)]
pub struct SharedConversationStore {
    inner: Arc<RwLock<ConversationStore>>,
}

impl SharedConversationStore {
    pub fn new(store: ConversationStore) -> Self {
        Self {
            inner: Arc::new(RwLock::new(store)),
        }
    }

    pub async fn create_conversation(&self) -> MemoryResult<String> {
        self.inner.write().await.create_conversation()
    }

    pub async fn add_message(
        &self,
        conversation_id: &str,
        role: &str,
        content: &str,
    ) -> MemoryResult<Uuid> {
        self.inner
            .write()
            .await
            .add_message(conversation_id, role, content)
    }

    pub async fn get_messages(&self, conversation_id: &str) -> Vec<Message> {
        self.inner.read().await.get_messages(conversation_id)
    }

    pub async fn get_recent_messages(&self, conversation_id: &str, n: usize) -> Vec<Message> {
        self.inner.read().await.get_recent_messages(conversation_id, n)
    }

    pub async fn context_messages(&self, conversation_id: &str, n: usize) -> Vec<ChatMessage> {
        self.inner.read().await.context_messages(conversation_id, n)
    }

    pub async fn search_messages(&self, conversation_id: &str, query: &str) -> Vec<Message> {
        self.inner.read().await.search_messages(conversation_id, query)
    }

    pub async fn search_conversations(&self, query: &str) -> Vec<SearchHit> {
        self.inner.read().await.search_conversations(query)
    }

    pub async fn clear_conversation(&self, conversation_id: &str) -> MemoryResult<()> {
        self.inner.write().await.clear_conversation(conversation_id)
    }

    pub async fn delete_conversation(&self, conversation_id: &str) -> bool {
        self.inner.write().await.delete_conversation(conversation_id)
    }

    pub async fn get_conversation_stats(
        &self,
        conversation_id: &str,
    ) -> MemoryResult<ConversationStats> {
        self.inner.read().await.get_conversation_stats(conversation_id)
    }

    pub async fn store_stats(&self) -> StoreStats {
        self.inner.read().await.store_stats()
    }

    pub async fn conversation_ids(&self) -> Vec<String> {
        self.inner.read().await.conversation_ids()
    }

    pub async fn maybe_sweep(&self) -> Option<SweepReport> {
        self.inner.write().await.maybe_sweep()
    }

    pub async fn sweep_now(&self) -> SweepReport {
        self.inner.write().await.sweep_now()
    }

    /// Write one conversation to `storage`. Returns false if it is not in memory.
    pub async fn persist(
        &self,
        conversation_id: &str,
        storage: &dyn ConversationStorage,
    ) -> Result<bool> {
        let record = match self.inner.read().await.export(conversation_id) {
            Some(record) => record,
            None => return Ok(false),
        };
        storage
            .save(&record)
            .await
            .context(format!("Failed to persist conversation '{}'", conversation_id))?;
        Ok(true)
    }

    /// Load one conversation from `storage` into memory. Returns false if it was never saved.
    ///
    /// Fails if the stored record carries a different id than the one requested.
    pub async fn load_from(
        &self,
        conversation_id: &str,
        storage: &dyn ConversationStorage,
    ) -> Result<bool> {
        let record = match storage.load(conversation_id).await? {
            Some(record) => record,
            None => return Ok(false),
        };
        if record.conversation_id != conversation_id {
            bail!(
                "Stored conversation '{}' contains record for '{}'",
                conversation_id,
                record.conversation_id
            );
        }
        self.inner.write().await.restore(record)?;
        Ok(true)
    }

    /// Sweep every `interval` until the handle is shut down.
    ///
    /// Each tick runs a full sweep, so `interval` is the sweep period. Sweeping
    /// is otherwise only driven by store calls; this keeps retention moving for
    /// stores that go quiet. Requires a running tokio runtime.
    pub fn spawn_sweeper(&self, interval: Duration) -> SweeperHandle {
        let store = self.clone();
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel();

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            tracing::info!("[Sweeper] Periodic sweeper started ({:?})", interval);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let report = store.sweep_now().await;
                        if !report.is_empty() {
                            tracing::debug!("[Sweeper] Removed {} conversations", report.removed());
                        }
                    }
                    _ = &mut shutdown_rx => {
                        tracing::info!("[Sweeper] Received shutdown signal");
                        break;
                    }
                }
            }
        });

        SweeperHandle {
            shutdown_tx: Some(shutdown_tx),
            task,
        }
    }
}

pub struct SweeperHandle {
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl SweeperHandle {
    /// Stop the sweeper and wait for it to exit.
    pub async fn shutdown(mut self) -> Result<()> {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        (&mut self.task).await.context("Sweeper task failed")?;
        Ok(())
    }
}

impl Drop for SweeperHandle {
    fn drop(&mut self) {
        if self.shutdown_tx.is_some() {
            self.task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{ManualClock, MemoryLimits};
    use crate::storage::{ConversationRecord, InMemoryStorage};

    fn shared(clock: &ManualClock, limits: MemoryLimits) -> SharedConversationStore {
        SharedConversationStore::new(ConversationStore::with_clock(limits, Arc::new(clock.clone())))
    }

    fn short_limits() -> MemoryLimits {
        MemoryLimits {
            conversation_timeout: Duration::from_secs(60),
            cleanup_interval: Duration::from_secs(10),
            ..MemoryLimits::default()
        }
    }

    #[tokio::test]
    async fn test_concurrent_adds_are_all_counted() {
        let store = shared(&ManualClock::default(), MemoryLimits::default());
        let id = store.create_conversation().await.unwrap();

        let mut tasks = Vec::new();
        for i in 0..20 {
            let store = store.clone();
            let id = id.clone();
            tasks.push(tokio::spawn(async move {
                store.add_message(&id, "user", &format!("msg {}", i)).await.unwrap();
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        let stats = store.get_conversation_stats(&id).await.unwrap();
        assert_eq!(stats.message_count, 20);
        assert_eq!(store.get_messages(&id).await.len(), 20);
    }

    #[tokio::test]
    async fn test_persist_and_load_round_trip() {
        let clock = ManualClock::default();
        let storage = InMemoryStorage::new();

        let first = shared(&clock, MemoryLimits::default());
        first.add_message("chat", "user", "remember <this>").await.unwrap();
        assert!(first.persist("chat", &storage).await.unwrap());
        assert!(!first.persist("missing", &storage).await.unwrap());

        let second = shared(&clock, MemoryLimits::default());
        assert!(second.load_from("chat", &storage).await.unwrap());
        assert!(!second.load_from("missing", &storage).await.unwrap());

        let messages = second.get_messages("chat").await;
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].content(), "remember &lt;this&gt;");
    }

    #[tokio::test]
    async fn test_spawned_sweeper_expires_idle_conversations() {
        let clock = ManualClock::default();
        let store = shared(&clock, short_limits());
        store.add_message("idle", "user", "hello").await.unwrap();

        clock.advance(Duration::from_secs(120));
        let handle = store.spawn_sweeper(Duration::from_millis(10));

        let mut removed = false;
        for _ in 0..100 {
            if store.conversation_ids().await.is_empty() {
                removed = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        handle.shutdown().await.unwrap();

        assert!(removed);
    }

    #[tokio::test]
    async fn test_spawned_sweeper_ignores_store_cleanup_interval() {
        let clock = ManualClock::default();
        let store = shared(
            &clock,
            MemoryLimits {
                conversation_timeout: Duration::from_secs(60),
                cleanup_interval: Duration::from_secs(3600),
                ..MemoryLimits::default()
            },
        );
        store.add_message("idle", "user", "hello").await.unwrap();

        clock.advance(Duration::from_secs(120));
        assert!(store.maybe_sweep().await.is_none());

        let handle = store.spawn_sweeper(Duration::from_millis(10));
        let mut removed = false;
        for _ in 0..100 {
            if store.conversation_ids().await.is_empty() {
                removed = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        handle.shutdown().await.unwrap();

        assert!(removed);
    }

    /// Storage that answers every load with the same record.
    struct FixedRecordStorage {
        record: ConversationRecord,
    }

    #[async_trait::async_trait]
    impl ConversationStorage for FixedRecordStorage {
        async fn save(&self, _record: &ConversationRecord) -> Result<()> {
            Ok(())
        }

        async fn load(&self, _conversation_id: &str) -> Result<Option<ConversationRecord>> {
            Ok(Some(self.record.clone()))
        }

        async fn delete(&self, _conversation_id: &str) -> Result<()> {
            Ok(())
        }

        async fn list_conversations(&self) -> Result<Vec<String>> {
            Ok(vec![self.record.conversation_id.clone()])
        }
    }

    #[tokio::test]
    async fn test_load_from_rejects_mismatched_record_id() {
        let clock = ManualClock::default();
        let source = shared(&clock, MemoryLimits::default());
        source.add_message("b", "user", "hello").await.unwrap();
        let record = source.inner.read().await.export("b").unwrap();

        let target = shared(&clock, MemoryLimits::default());
        let storage = FixedRecordStorage { record };
        let err = target.load_from("a", &storage).await.unwrap_err();

        assert!(err.to_string().contains("'a'"));
        assert!(err.to_string().contains("'b'"));
        assert!(target.conversation_ids().await.is_empty());
        assert!(target.load_from("b", &storage).await.unwrap());
    }

    #[tokio::test]
    async fn test_sweep_now_through_handle() {
        let clock = ManualClock::default();
        let store = shared(&clock, short_limits());
        store.add_message("a", "user", "x").await.unwrap();

        clock.advance(Duration::from_secs(61));
        let report = store.sweep_now().await;

        assert_eq!(report.expired, vec!["a".to_string()]);
        assert_eq!(store.store_stats().await.conversations, 0);
    }
}
