//! convo-memory - Bounded conversation memory for LLM chat applications
//!
//! This library keeps per-conversation message history in memory with
//! bounded retention: a message cap per conversation, a conversation cap
//! per store, and idle expiry. Persistence backends are optional
//! collaborators reached through the `ConversationStorage` trait.

pub mod config;
pub mod memory;
pub mod shared;
pub mod storage;
pub mod utils;

pub mod cli;

pub use crate::config::Settings;

pub use memory::{
    ChatMessage, ConversationStats, ConversationStore, MemoryError, MemoryLimits, Message, Role,
    StoreStats, SweepReport, UnknownConversationPolicy,
};

pub use shared::{SharedConversationStore, SweeperHandle};

pub use storage::{
    CachedStorage, ConversationRecord, ConversationStorage, FileSystemStorage, InMemoryStorage,
};

/// Build an empty store from loaded settings.
pub fn store_from_settings(settings: &Settings) -> ConversationStore {
    ConversationStore::new(settings.memory.limits())
}
