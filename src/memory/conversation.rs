use super::message::Message;
use crate::storage::{ConversationRecord, MessageRecord};
use chrono::{DateTime, Utc};
use std::collections::VecDeque;

const PREVIEW_CHARS: usize = 100;

/// Ordered, bounded message history plus activity metadata.
#[derive(Debug, Clone)]
pub struct Conversation {
    conversation_id: String,
    messages: VecDeque<Message>,
    max_messages: usize,
    created_at: DateTime<Utc>,
    last_activity: DateTime<Utc>,
    message_count: u64,
}

impl Conversation {
    pub(crate) fn new(conversation_id: String, max_messages: usize, now: DateTime<Utc>) -> Self {
        Self {
            conversation_id,
            messages: VecDeque::with_capacity(max_messages.min(64)),
            max_messages,
            created_at: now,
            last_activity: now,
            message_count: 0,
        }
    }

    pub fn conversation_id(&self) -> &str {
        &self.conversation_id
    }

    pub fn messages(&self) -> impl Iterator<Item = &Message> {
        self.messages.iter()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn last_activity(&self) -> DateTime<Utc> {
        self.last_activity
    }

    /// Messages ever admitted, including ones evicted since.
    pub fn message_count(&self) -> u64 {
        self.message_count
    }

    /// Append a message, evicting the oldest one when full.
    /// Returns the evicted message, if any.
    pub(crate) fn push(&mut self, message: Message, now: DateTime<Utc>) -> Option<Message> {
        let evicted = if self.messages.len() >= self.max_messages {
            self.messages.pop_front()
        } else {
            None
        };

        if self.max_messages > 0 {
            self.messages.push_back(message);
        }
        self.message_count += 1;
        self.touch(now);
        evicted
    }

    pub(crate) fn clear(&mut self, now: DateTime<Utc>) {
        self.messages.clear();
        self.message_count = 0;
        self.touch(now);
    }

    fn touch(&mut self, now: DateTime<Utc>) {
        if now > self.last_activity {
            self.last_activity = now;
        }
    }

    /// The last `n` messages, oldest first.
    pub fn recent(&self, n: usize) -> Vec<Message> {
        let skip = self.messages.len().saturating_sub(n);
        self.messages.iter().skip(skip).cloned().collect()
    }

    /// Messages whose content contains `query`, ignoring case.
    pub fn search(&self, query: &str) -> Vec<Message> {
        if query.is_empty() {
            return Vec::new();
        }
        let query = query.to_lowercase();
        self.messages
            .iter()
            .filter(|m| m.content().to_lowercase().contains(&query))
            .cloned()
            .collect()
    }

    pub fn to_record(&self) -> ConversationRecord {
        ConversationRecord {
            conversation_id: self.conversation_id.clone(),
            created_at: self.created_at,
            messages: self.messages.iter().map(MessageRecord::from).collect(),
        }
    }

    /// Rebuild from persisted parts. Keeps only the newest `max_messages`.
    pub(crate) fn from_parts(
        conversation_id: String,
        max_messages: usize,
        created_at: DateTime<Utc>,
        messages: Vec<Message>,
    ) -> Self {
        let message_count = messages.len() as u64;
        let last_activity = messages
            .iter()
            .map(Message::timestamp)
            .fold(created_at, |acc, ts| acc.max(ts));
        let skip = messages.len().saturating_sub(max_messages);

        Self {
            conversation_id,
            messages: messages.into_iter().skip(skip).collect(),
            max_messages,
            created_at,
            last_activity,
            message_count,
        }
    }
}

/// First `PREVIEW_CHARS` characters of `content`, with `...` appended.
pub(crate) fn preview(content: &str) -> String {
    let mut out: String = content.chars().take(PREVIEW_CHARS).collect();
    out.push_str("...");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::clock::{Clock, ManualClock};
    use crate::memory::message::MessageValidator;
    use std::sync::Arc;
    use std::time::Duration;

    fn setup() -> (ManualClock, MessageValidator) {
        let clock = ManualClock::default();
        let validator = MessageValidator::new(4096, Arc::new(clock.clone()));
        (clock, validator)
    }

    #[test]
    fn test_push_evicts_oldest_when_full() {
        let (clock, v) = setup();
        let mut conv = Conversation::new("c".into(), 3, clock.now());

        for i in 0..5 {
            conv.push(v.validate("user", &format!("m{}", i)).unwrap(), clock.now());
        }

        let contents: Vec<_> = conv.messages().map(|m| m.content().to_string()).collect();
        assert_eq!(contents, vec!["m2", "m3", "m4"]);
        assert_eq!(conv.message_count(), 5);
    }

    #[test]
    fn test_last_activity_never_moves_back() {
        let (clock, v) = setup();
        let start = clock.now();
        let mut conv = Conversation::new("c".into(), 10, start);

        clock.advance(Duration::from_secs(60));
        conv.push(v.validate("user", "later").unwrap(), clock.now());
        let after = conv.last_activity();

        conv.push(v.validate("user", "skewed").unwrap(), start);
        assert_eq!(conv.last_activity(), after);
    }

    #[test]
    fn test_clear_resets_count() {
        let (clock, v) = setup();
        let mut conv = Conversation::new("c".into(), 10, clock.now());
        conv.push(v.validate("user", "hi").unwrap(), clock.now());

        clock.advance(Duration::from_secs(5));
        conv.clear(clock.now());

        assert!(conv.is_empty());
        assert_eq!(conv.message_count(), 0);
        assert_eq!(conv.last_activity(), clock.now());
    }

    #[test]
    fn test_recent_and_search() {
        let (clock, v) = setup();
        let mut conv = Conversation::new("c".into(), 10, clock.now());
        for text in ["What's the weather?", "No idea", "Weather is sunny"] {
            conv.push(v.validate("user", text).unwrap(), clock.now());
        }

        let recent = conv.recent(2);
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].content(), "No idea");
        assert_eq!(conv.recent(50).len(), 3);

        assert_eq!(conv.search("WEATHER").len(), 2);
        assert!(conv.search("").is_empty());
    }

    #[test]
    fn test_from_parts_keeps_newest() {
        let (clock, v) = setup();
        let created = clock.now();
        let mut messages = Vec::new();
        for i in 0..4 {
            clock.advance(Duration::from_secs(1));
            messages.push(v.validate("user", &format!("m{}", i)).unwrap());
        }

        let conv = Conversation::from_parts("c".into(), 2, created, messages);
        assert_eq!(conv.len(), 2);
        assert_eq!(conv.recent(1)[0].content(), "m3");
        assert_eq!(conv.message_count(), 4);
        assert_eq!(conv.last_activity(), clock.now());
    }

    #[test]
    fn test_preview_truncates() {
        let long = "x".repeat(150);
        assert_eq!(preview(&long).chars().count(), 103);
        assert_eq!(preview("short"), "short...");
    }
}
