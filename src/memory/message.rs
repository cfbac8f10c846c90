//! Messages and admission checks
//!
//! Information Hiding:
//! - Role parsing and HTML escaping hidden behind `MessageValidator::validate`
//! - `Message` fields are read-only once built

use super::clock::Clock;
use super::error::{MemoryError, MemoryResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::System => "system",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = MemoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Role::User),
            "assistant" => Ok(Role::Assistant),
            "system" => Ok(Role::System),
            other => Err(MemoryError::InvalidRole(other.to_string())),
        }
    }
}

/// A single admitted message. Content is already trimmed and HTML-escaped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    id: Uuid,
    role: Role,
    content: String,
    timestamp: DateTime<Utc>,
}

impl Message {
    /// Rebuilds a message from persisted fields without escaping again.
    pub(crate) fn from_parts(
        id: Uuid,
        role: Role,
        content: String,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            role,
            content,
            timestamp,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn to_chat_message(&self) -> ChatMessage {
        ChatMessage {
            role: self.role.as_str().to_string(),
            content: self.content.clone(),
        }
    }
}

/// Role/content pair handed to an LLM client when building a prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

/// Checks role and content before a message enters a conversation.
#[derive(Clone)]
pub struct MessageValidator {
    max_content_len: usize,
    clock: Arc<dyn Clock>,
}

impl MessageValidator {
    pub fn new(max_content_len: usize, clock: Arc<dyn Clock>) -> Self {
        Self {
            max_content_len,
            clock,
        }
    }

    pub fn max_content_len(&self) -> usize {
        self.max_content_len
    }

    /// Validate `role` and `content` and build a sanitized message.
    ///
    /// Length is measured in characters on the trimmed text, before escaping.
    pub fn validate(&self, role: &str, content: &str) -> MemoryResult<Message> {
        let role = role.parse::<Role>()?;
        let trimmed = self.check_content(content)?;

        Ok(Message {
            id: Uuid::new_v4(),
            role,
            content: escape_html(trimmed),
            timestamp: self.clock.now(),
        })
    }

    /// Trim and bound-check content. Returns the trimmed slice.
    pub(crate) fn check_content<'a>(&self, content: &'a str) -> MemoryResult<&'a str> {
        let trimmed = content.trim();
        if trimmed.is_empty() {
            return Err(MemoryError::EmptyContent);
        }

        let len = trimmed.chars().count();
        if len > self.max_content_len {
            return Err(MemoryError::ContentTooLarge {
                len,
                max: self.max_content_len,
            });
        }

        Ok(trimmed)
    }
}

/// Escape `& < > " '` so stored content is safe to render as HTML.
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}
