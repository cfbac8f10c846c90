//! Process-local record storage
//!
//! Keeps serialized `ConversationRecord`s keyed by conversation id. Useful as
//! a persistence target in tests and for sessions that only need to survive
//! a store being rebuilt, not the process exiting.

use super::{ConversationRecord, ConversationStorage};
use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Records held in a map; a save replaces the whole record for that id
pub struct InMemoryStorage {
    records: RwLock<HashMap<String, ConversationRecord>>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ConversationStorage for InMemoryStorage {
    async fn save(&self, record: &ConversationRecord) -> Result<()> {
        let replaced = self
            .records
            .write()
            .await
            .insert(record.conversation_id.clone(), record.clone());
        tracing::debug!(
            "[InMemoryStorage] Stored record '{}' ({} messages, created {}, replaced: {})",
            record.conversation_id,
            record.messages.len(),
            record.created_at.to_rfc3339(),
            replaced.is_some()
        );
        Ok(())
    }

    async fn load(&self, conversation_id: &str) -> Result<Option<ConversationRecord>> {
        let record = self.records.read().await.get(conversation_id).cloned();
        match &record {
            Some(r) => tracing::debug!(
                "[InMemoryStorage] Found record '{}' with {} messages",
                conversation_id,
                r.messages.len()
            ),
            None => tracing::debug!("[InMemoryStorage] No record for '{}'", conversation_id),
        }
        Ok(record)
    }

    async fn delete(&self, conversation_id: &str) -> Result<()> {
        if self.records.write().await.remove(conversation_id).is_some() {
            tracing::debug!("[InMemoryStorage] Dropped record '{}'", conversation_id);
        }
        Ok(())
    }

    async fn list_conversations(&self) -> Result<Vec<String>> {
        let mut ids: Vec<String> = self.records.read().await.keys().cloned().collect();
        ids.sort();
        Ok(ids)
    }

    async fn exists(&self, conversation_id: &str) -> Result<bool> {
        Ok(self.records.read().await.contains_key(conversation_id))
    }
}
