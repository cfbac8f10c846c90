use crate::memory::{MemoryLimits, UnknownConversationPolicy};
use anyhow::Result;
use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub memory: MemoryConfig,
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    pub max_messages_per_conversation: usize,
    pub max_conversations: usize,
    pub conversation_timeout_secs: u64,
    pub cleanup_interval_secs: u64,
    pub max_content_len: usize,
    pub unknown_conversation: UnknownConversationPolicy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub dir: PathBuf,
    pub cache_capacity: usize,
    pub max_age_days: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let config_env = env::var("CONFIG_ENV").unwrap_or_else(|_| "default".to_string());

        let config = Self::with_defaults(Config::builder())?
            .add_source(File::with_name(&format!("config/{}", config_env)).required(false))
            .add_source(Environment::with_prefix("APP").separator("__"))
            .build()?;

        config.try_deserialize()
    }

    fn with_defaults(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> Result<config::ConfigBuilder<config::builder::DefaultState>, ConfigError> {
        let limits = MemoryLimits::default();
        builder
            .set_default(
                "memory.max_messages_per_conversation",
                limits.max_messages_per_conversation as u64,
            )?
            .set_default("memory.max_conversations", limits.max_conversations as u64)?
            .set_default(
                "memory.conversation_timeout_secs",
                limits.conversation_timeout.as_secs(),
            )?
            .set_default("memory.cleanup_interval_secs", limits.cleanup_interval.as_secs())?
            .set_default("memory.max_content_len", limits.max_content_len as u64)?
            .set_default("memory.unknown_conversation", "auto_create")?
            .set_default("storage.dir", "./conversation_history")?
            .set_default("storage.cache_capacity", 100u64)?
            .set_default("storage.max_age_days", 30u64)?
            .set_default("logging.level", "info")
    }
}

impl MemoryConfig {
    pub fn limits(&self) -> MemoryLimits {
        MemoryLimits {
            max_messages_per_conversation: self.max_messages_per_conversation,
            max_conversations: self.max_conversations,
            conversation_timeout: Duration::from_secs(self.conversation_timeout_secs),
            cleanup_interval: Duration::from_secs(self.cleanup_interval_secs),
            max_content_len: self.max_content_len,
            unknown_conversation: self.unknown_conversation,
        }
    }
}

impl StorageConfig {
    pub fn max_age(&self) -> Duration {
        Duration::from_secs(self.max_age_days.saturating_mul(24 * 60 * 60))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn from_toml(toml: &str) -> Settings {
        Settings::with_defaults(Config::builder())
            .unwrap()
            .add_source(File::from_str(toml, config::FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap()
    }

    #[test]
    fn test_defaults_match_memory_limits() {
        let settings = from_toml("");
        assert_eq!(settings.memory.limits(), MemoryLimits::default());
        assert_eq!(settings.storage.cache_capacity, 100);
        assert_eq!(settings.storage.max_age(), Duration::from_secs(30 * 86_400));
        assert_eq!(settings.logging.level, "info");
    }

    #[test]
    fn test_overrides() {
        let settings = from_toml(
            r#"
            [memory]
            max_messages_per_conversation = 10
            conversation_timeout_secs = 60
            unknown_conversation = "reject"

            [storage]
            dir = "/tmp/conversations"
            "#,
        );

        let limits = settings.memory.limits();
        assert_eq!(limits.max_messages_per_conversation, 10);
        assert_eq!(limits.max_conversations, 1000);
        assert_eq!(limits.conversation_timeout, Duration::from_secs(60));
        assert_eq!(limits.unknown_conversation, UnknownConversationPolicy::Reject);
        assert_eq!(settings.storage.dir, PathBuf::from("/tmp/conversations"));
    }
}
