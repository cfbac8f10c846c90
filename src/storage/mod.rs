//! Conversation Persistence Abstraction
//!
//! Information Hiding:
//! - Storage backend implementation details hidden behind trait
//! - Allows swapping between memory, filesystem or a cached backend without API changes
//! - The in-memory store never touches disk itself; it hands records to these backends

use crate::memory::{Message, Role};
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub mod cache;
pub mod filesystem;
pub mod memory;

pub use cache::CachedStorage;
pub use filesystem::{CleanupReport, FileSystemStorage};
pub use memory::InMemoryStorage;

/// Serialized form of a conversation, keyed by `conversation_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationRecord {
    pub conversation_id: String,
    pub created_at: DateTime<Utc>,
    pub messages: Vec<MessageRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageRecord {
    pub id: Uuid,
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl From<&Message> for MessageRecord {
    fn from(message: &Message) -> Self {
        Self {
            id: message.id(),
            role: message.role(),
            content: message.content().to_string(),
            timestamp: message.timestamp(),
        }
    }
}

impl ConversationRecord {
    /// True if any message contains `query`, ignoring case.
    pub fn matches(&self, query: &str) -> bool {
        let query = query.to_lowercase();
        !query.is_empty()
            && self
                .messages
                .iter()
                .any(|m| m.content.to_lowercase().contains(&query))
    }
}

/// Trait defining conversation persistence
/// Implementations can use different backends (memory, file, cache)
#[async_trait]
pub trait ConversationStorage: Send + Sync {
    /// Save a conversation, replacing any previous record with the same id
    async fn save(&self, record: &ConversationRecord) -> Result<()>;

    /// Load a conversation
    /// Returns None if it was never saved
    async fn load(&self, conversation_id: &str) -> Result<Option<ConversationRecord>>;

    /// Delete a conversation
    async fn delete(&self, conversation_id: &str) -> Result<()>;

    /// List all conversation IDs
    async fn list_conversations(&self) -> Result<Vec<String>>;

    /// Check if a conversation exists
    async fn exists(&self, conversation_id: &str) -> Result<bool> {
        Ok(self.load(conversation_id).await?.is_some())
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    pub fn record(conversation_id: &str, contents: &[&str]) -> ConversationRecord {
        let now = Utc::now();
        ConversationRecord {
            conversation_id: conversation_id.to_string(),
            created_at: now,
            messages: contents
                .iter()
                .enumerate()
                .map(|(i, content)| MessageRecord {
                    id: Uuid::new_v4(),
                    role: if i % 2 == 0 { Role::User } else { Role::Assistant },
                    content: content.to_string(),
                    timestamp: now,
                })
                .collect(),
        }
    }
}
