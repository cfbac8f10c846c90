//! Read-only aggregates over store state. Every value returned here is an
//! owned snapshot; later mutations do not show through.

use super::clock::elapsed;
use super::conversation::Conversation;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConversationStats {
    pub conversation_id: String,
    /// Messages ever admitted since creation or the last clear.
    pub message_count: u64,
    /// Messages currently held.
    pub retained_messages: usize,
    pub created_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
    /// `last_activity - created_at`.
    pub duration: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct StoreStats {
    pub conversations: usize,
    pub retained_messages: usize,
    pub admitted_messages: u64,
    pub oldest_activity: Option<DateTime<Utc>>,
    pub newest_activity: Option<DateTime<Utc>>,
}

pub struct StatsReporter;

impl StatsReporter {
    pub fn conversation(conv: &Conversation) -> ConversationStats {
        ConversationStats {
            conversation_id: conv.conversation_id().to_string(),
            message_count: conv.message_count(),
            retained_messages: conv.len(),
            created_at: conv.created_at(),
            last_activity: conv.last_activity(),
            duration: elapsed(conv.created_at(), conv.last_activity()).unwrap_or_default(),
        }
    }

    pub fn store<'a>(conversations: impl IntoIterator<Item = &'a Conversation>) -> StoreStats {
        conversations
            .into_iter()
            .fold(StoreStats::default(), |mut stats, conv| {
                let activity = conv.last_activity();
                stats.conversations += 1;
                stats.retained_messages += conv.len();
                stats.admitted_messages += conv.message_count();
                stats.oldest_activity = Some(stats.oldest_activity.map_or(activity, |t| t.min(activity)));
                stats.newest_activity = Some(stats.newest_activity.map_or(activity, |t| t.max(activity)));
                stats
            })
    }
}
