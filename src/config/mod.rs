mod settings;

pub use settings::{LoggingConfig, MemoryConfig, Settings, StorageConfig};
