//! Conversation Store
//!
//! Information Hiding:
//! - Conversation map, eviction and sweeping hidden behind id-based operations
//! - Callers only ever receive owned snapshots of messages and stats
//!
//! The store has a single owner. Share it across tasks through
//! `SharedConversationStore`, which serializes access with one lock.

use super::clock::{Clock, SystemClock};
use super::conversation::{preview, Conversation};
use super::error::{MemoryError, MemoryResult};
use super::message::{ChatMessage, Message, MessageValidator};
use super::stats::{ConversationStats, StatsReporter, StoreStats};
use super::sweeper::{RetentionSweeper, SweepReport};
use crate::storage::ConversationRecord;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// What `add_message` does with an id the store has never seen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnknownConversationPolicy {
    /// Create the conversation under the caller's id.
    #[default]
    AutoCreate,
    /// Fail with `MemoryError::NotFound`.
    Reject,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryLimits {
    pub max_messages_per_conversation: usize,
    pub max_conversations: usize,
    pub conversation_timeout: Duration,
    pub cleanup_interval: Duration,
    pub max_content_len: usize,
    pub unknown_conversation: UnknownConversationPolicy,
}

impl Default for MemoryLimits {
    fn default() -> Self {
        Self {
            max_messages_per_conversation: 100,
            max_conversations: 1000,
            conversation_timeout: Duration::from_secs(24 * 60 * 60),
            cleanup_interval: Duration::from_secs(5 * 60),
            max_content_len: 4096,
            unknown_conversation: UnknownConversationPolicy::AutoCreate,
        }
    }
}

/// A conversation that matched a cross-conversation search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchHit {
    pub conversation_id: String,
    pub preview: String,
}

pub struct ConversationStore {
    conversations: HashMap<String, Conversation>,
    limits: MemoryLimits,
    validator: MessageValidator,
    sweeper: RetentionSweeper,
    clock: Arc<dyn Clock>,
}

impl ConversationStore {
    pub fn new(limits: MemoryLimits) -> Self {
        Self::with_clock(limits, Arc::new(SystemClock))
    }

    pub fn with_clock(limits: MemoryLimits, clock: Arc<dyn Clock>) -> Self {
        let validator = MessageValidator::new(limits.max_content_len, clock.clone());
        let sweeper = RetentionSweeper::new(
            limits.conversation_timeout,
            limits.cleanup_interval,
            limits.max_conversations,
            clock.now(),
        );

        tracing::info!(
            "[ConversationStore] Initialized (max {} conversations, {} messages each)",
            limits.max_conversations,
            limits.max_messages_per_conversation
        );

        Self {
            conversations: HashMap::new(),
            limits,
            validator,
            sweeper,
            clock,
        }
    }

    pub fn limits(&self) -> &MemoryLimits {
        &self.limits
    }

    pub fn validator(&self) -> &MessageValidator {
        &self.validator
    }

    /// Create an empty conversation under a fresh id.
    pub fn create_conversation(&mut self) -> MemoryResult<String> {
        self.maybe_sweep();
        self.ensure_capacity()?;

        let conversation_id = Uuid::new_v4().to_string();
        self.insert_new(conversation_id.clone());
        Ok(conversation_id)
    }

    /// Validate and append a message. Returns the new message id.
    pub fn add_message(
        &mut self,
        conversation_id: &str,
        role: &str,
        content: &str,
    ) -> MemoryResult<Uuid> {
        validate_conversation_id(conversation_id)?;
        self.maybe_sweep();

        let message = self.validator.validate(role, content)?;

        if !self.conversations.contains_key(conversation_id) {
            match self.limits.unknown_conversation {
                UnknownConversationPolicy::AutoCreate => {
                    self.ensure_capacity()?;
                    self.insert_new(conversation_id.to_string());
                }
                UnknownConversationPolicy::Reject => {
                    return Err(MemoryError::NotFound(conversation_id.to_string()));
                }
            }
        }

        let now = self.clock.now();
        let message_id = message.id();
        let role = message.role();
        let conv = self
            .conversations
            .get_mut(conversation_id)
            .ok_or_else(|| MemoryError::NotFound(conversation_id.to_string()))?;

        if let Some(evicted) = conv.push(message, now) {
            tracing::debug!(
                "[ConversationStore] Evicted oldest message {} from '{}'",
                evicted.id(),
                conversation_id
            );
        }

        tracing::debug!(
            "[ConversationStore] Added {} message {} to '{}' ({} retained)",
            role,
            message_id,
            conversation_id,
            conv.len()
        );
        Ok(message_id)
    }

    /// All retained messages, oldest first. Empty for unknown ids.
    pub fn get_messages(&self, conversation_id: &str) -> Vec<Message> {
        self.conversations
            .get(conversation_id)
            .map(|c| c.messages().cloned().collect())
            .unwrap_or_default()
    }

    /// The last `n` retained messages, oldest first.
    pub fn get_recent_messages(&self, conversation_id: &str, n: usize) -> Vec<Message> {
        self.conversations
            .get(conversation_id)
            .map(|c| c.recent(n))
            .unwrap_or_default()
    }

    /// The last `n` messages as role/content pairs for an LLM request.
    pub fn context_messages(&self, conversation_id: &str, n: usize) -> Vec<ChatMessage> {
        self.get_recent_messages(conversation_id, n)
            .iter()
            .map(Message::to_chat_message)
            .collect()
    }

    pub fn search_messages(&self, conversation_id: &str, query: &str) -> Vec<Message> {
        self.conversations
            .get(conversation_id)
            .map(|c| c.search(query))
            .unwrap_or_default()
    }

    /// One hit per conversation with at least one matching message, ordered by id.
    pub fn search_conversations(&self, query: &str) -> Vec<SearchHit> {
        let mut hits: Vec<SearchHit> = self
            .conversations
            .values()
            .filter_map(|c| {
                c.search(query).first().map(|m| SearchHit {
                    conversation_id: c.conversation_id().to_string(),
                    preview: preview(m.content()),
                })
            })
            .collect();
        hits.sort_by(|a, b| a.conversation_id.cmp(&b.conversation_id));
        hits
    }

    /// Drop all messages of a conversation. No-op for unknown ids.
    pub fn clear_conversation(&mut self, conversation_id: &str) -> MemoryResult<()> {
        validate_conversation_id(conversation_id)?;
        let now = self.clock.now();
        if let Some(conv) = self.conversations.get_mut(conversation_id) {
            conv.clear(now);
            tracing::info!("[ConversationStore] Cleared conversation '{}'", conversation_id);
        }
        Ok(())
    }

    /// Remove a conversation entirely. Returns whether it existed.
    pub fn delete_conversation(&mut self, conversation_id: &str) -> bool {
        let removed = self.conversations.remove(conversation_id).is_some();
        if removed {
            tracing::info!("[ConversationStore] Deleted conversation '{}'", conversation_id);
        }
        removed
    }

    pub fn get_conversation_stats(&self, conversation_id: &str) -> MemoryResult<ConversationStats> {
        validate_conversation_id(conversation_id)?;
        self.conversations
            .get(conversation_id)
            .map(StatsReporter::conversation)
            .ok_or_else(|| MemoryError::NotFound(conversation_id.to_string()))
    }

    pub fn store_stats(&self) -> StoreStats {
        StatsReporter::store(self.conversations.values())
    }

    pub fn contains(&self, conversation_id: &str) -> bool {
        self.conversations.contains_key(conversation_id)
    }

    pub fn active_conversations(&self) -> usize {
        self.conversations.len()
    }

    pub fn conversation_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.conversations.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Run a sweep if the cleanup interval has elapsed.
    pub fn maybe_sweep(&mut self) -> Option<SweepReport> {
        let now = self.clock.now();
        self.sweeper.maybe_sweep(&mut self.conversations, now)
    }

    /// Run a sweep now, regardless of when the last one ran.
    pub fn sweep_now(&mut self) -> SweepReport {
        let now = self.clock.now();
        self.sweeper.sweep(&mut self.conversations, now)
    }

    /// Persistable copy of a conversation.
    pub fn export(&self, conversation_id: &str) -> Option<ConversationRecord> {
        self.conversations.get(conversation_id).map(Conversation::to_record)
    }

    /// Load a persisted conversation, replacing any in-memory one with the same id.
    ///
    /// Content is taken as already sanitized, so it is neither escaped nor
    /// length-checked again. Only the newest messages up to the per-conversation
    /// limit are kept.
    pub fn restore(&mut self, record: ConversationRecord) -> MemoryResult<()> {
        validate_conversation_id(&record.conversation_id)?;

        let mut messages = Vec::with_capacity(record.messages.len());
        for m in record.messages {
            if m.content.trim().is_empty() {
                return Err(MemoryError::EmptyContent);
            }
            messages.push(Message::from_parts(m.id, m.role, m.content, m.timestamp));
        }

        if !self.conversations.contains_key(&record.conversation_id) {
            self.maybe_sweep();
            self.ensure_capacity()?;
        }

        let conv = Conversation::from_parts(
            record.conversation_id.clone(),
            self.limits.max_messages_per_conversation,
            record.created_at,
            messages,
        );
        tracing::info!(
            "[ConversationStore] Restored conversation '{}' with {} messages",
            record.conversation_id,
            conv.len()
        );
        self.conversations.insert(record.conversation_id, conv);
        Ok(())
    }

    fn ensure_capacity(&self) -> MemoryResult<()> {
        if self.conversations.len() >= self.limits.max_conversations {
            tracing::warn!(
                "[ConversationStore] Conversation limit reached ({})",
                self.limits.max_conversations
            );
            return Err(MemoryError::CapacityExceeded {
                max: self.limits.max_conversations,
            });
        }
        Ok(())
    }

    fn insert_new(&mut self, conversation_id: String) {
        let conv = Conversation::new(
            conversation_id.clone(),
            self.limits.max_messages_per_conversation,
            self.clock.now(),
        );
        tracing::info!("[ConversationStore] Created conversation '{}'", conversation_id);
        self.conversations.insert(conversation_id, conv);
    }
}

impl Default for ConversationStore {
    fn default() -> Self {
        Self::new(MemoryLimits::default())
    }
}

fn validate_conversation_id(conversation_id: &str) -> MemoryResult<()> {
    if conversation_id.trim().is_empty() {
        return Err(MemoryError::InvalidConversationId);
    }
    Ok(())
}
