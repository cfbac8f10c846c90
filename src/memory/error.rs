use thiserror::Error;

/// Errors surfaced by the conversation store.
///
/// Nothing is retried internally; the caller decides whether to correct the
/// input, report it, or drop the operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MemoryError {
    #[error("invalid role '{0}': must be one of user, assistant, system")]
    InvalidRole(String),

    #[error("message content cannot be empty")]
    EmptyContent,

    #[error("message content is {len} characters, maximum is {max}")]
    ContentTooLarge { len: usize, max: usize },

    #[error("conversation id cannot be empty")]
    InvalidConversationId,

    #[error("conversation '{0}' not found")]
    NotFound(String),

    #[error("maximum number of conversations reached ({max})")]
    CapacityExceeded { max: usize },
}

impl MemoryError {
    /// True for errors the caller can fix by correcting the message input.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            MemoryError::InvalidRole(_)
                | MemoryError::EmptyContent
                | MemoryError::ContentTooLarge { .. }
        )
    }
}

pub type MemoryResult<T> = std::result::Result<T, MemoryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_errors_are_flagged() {
        assert!(MemoryError::EmptyContent.is_validation());
        assert!(MemoryError::InvalidRole("narrator".into()).is_validation());
        assert!(MemoryError::ContentTooLarge { len: 5000, max: 4096 }.is_validation());
        assert!(!MemoryError::InvalidConversationId.is_validation());
        assert!(!MemoryError::CapacityExceeded { max: 1 }.is_validation());
    }

    #[test]
    fn test_error_messages() {
        let err = MemoryError::ContentTooLarge { len: 5000, max: 4096 };
        assert_eq!(
            err.to_string(),
            "message content is 5000 characters, maximum is 4096"
        );
        assert_eq!(
            MemoryError::NotFound("abc".into()).to_string(),
            "conversation 'abc' not found"
        );
    }
}
