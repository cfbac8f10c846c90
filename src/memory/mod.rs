//! Bounded in-memory conversation memory
//!
//! Information Hiding:
//! - Message admission rules live in `message`
//! - Per-conversation bounds live in `conversation`
//! - Retention policy lives in `sweeper`
//! - `store` ties them together behind id-based operations

pub mod clock;
pub mod conversation;
pub mod error;
pub mod message;
pub mod stats;
pub mod store;
pub mod sweeper;

pub use clock::{Clock, ManualClock, SystemClock};
pub use conversation::Conversation;
pub use error::{MemoryError, MemoryResult};
pub use message::{escape_html, ChatMessage, Message, MessageValidator, Role};
pub use stats::{ConversationStats, StatsReporter, StoreStats};
pub use store::{ConversationStore, MemoryLimits, SearchHit, UnknownConversationPolicy};
pub use sweeper::{RetentionSweeper, SweepReport};
