//! File System Conversation Persistence
//!
//! Information Hiding:
//! - File paths and JSON serialization format hidden from users
//! - Directory structure management hidden behind interface
//! - Retention of old and unreadable files handled by `cleanup`

use super::{ConversationRecord, ConversationStorage};
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tokio::fs;

/// Outcome of a cleanup pass over the storage directory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CleanupReport {
    pub total: usize,
    pub deleted: usize,
    pub corrupted: usize,
}

/// File system storage - each conversation is a JSON file
/// Files are stored as {base_path}/{conversation_id}.json
pub struct FileSystemStorage {
    base_path: PathBuf,
}

impl FileSystemStorage {
    pub async fn new(base_path: PathBuf) -> Result<Self> {
        // Create base directory if it doesn't exist
        fs::create_dir_all(&base_path)
            .await
            .context("Failed to create storage directory")?;

        Ok(Self { base_path })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn conversation_path(&self, conversation_id: &str) -> Result<PathBuf> {
        check_file_id(conversation_id)?;
        Ok(self.base_path.join(format!("{}.json", conversation_id)))
    }

    /// Delete files older than `max_age` and files that are not valid records.
    /// With `dry_run` nothing is removed, only counted.
    pub async fn cleanup(&self, max_age: Duration, dry_run: bool) -> Result<CleanupReport> {
        let mut report = CleanupReport::default();
        let now = SystemTime::now();

        for path in self.json_files().await? {
            report.total += 1;

            let contents = match fs::read_to_string(&path).await {
                Ok(contents) => contents,
                Err(e) => {
                    tracing::error!("[FileSystemStorage] Error reading {:?}: {}", path, e);
                    continue;
                }
            };

            if serde_json::from_str::<ConversationRecord>(&contents).is_err() {
                tracing::warn!("[FileSystemStorage] Corrupted conversation file: {:?}", path);
                if !dry_run {
                    fs::remove_file(&path)
                        .await
                        .context(format!("Failed to delete corrupted file: {:?}", path))?;
                }
                report.corrupted += 1;
                continue;
            }

            let modified = fs::metadata(&path)
                .await
                .and_then(|m| m.modified())
                .context(format!("Failed to read modification time: {:?}", path))?;
            let is_old = now
                .duration_since(modified)
                .map(|age| age > max_age)
                .unwrap_or(false);

            if is_old {
                if !dry_run {
                    fs::remove_file(&path)
                        .await
                        .context(format!("Failed to delete old conversation: {:?}", path))?;
                }
                report.deleted += 1;
                tracing::info!("[FileSystemStorage] Deleted old conversation: {:?}", path);
            }
        }

        tracing::info!(
            "[FileSystemStorage] Cleanup{} complete: {} total, {} deleted, {} corrupted",
            if dry_run { " (dry run)" } else { "" },
            report.total,
            report.deleted,
            report.corrupted
        );
        Ok(report)
    }

    /// Ids of stored conversations with a message containing `query`.
    /// Unreadable files are skipped.
    pub async fn search(&self, query: &str) -> Result<Vec<String>> {
        let mut hits = Vec::new();
        for id in self.list_conversations().await? {
            match self.load(&id).await {
                Ok(Some(record)) if record.matches(query) => hits.push(id),
                Ok(_) => {}
                Err(e) => tracing::warn!("[FileSystemStorage] Skipping '{}': {:#}", id, e),
            }
        }
        Ok(hits)
    }

    async fn json_files(&self) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        let mut entries = fs::read_dir(&self.base_path)
            .await
            .context("Failed to read storage directory")?;

        while let Some(entry) = entries
            .next_entry()
            .await
            .context("Failed to read directory entry")?
        {
            let path = entry.path();
            if path.extension().and_then(|s| s.to_str()) == Some("json") {
                files.push(path);
            }
        }

        files.sort();
        Ok(files)
    }
}

#[async_trait]
impl ConversationStorage for FileSystemStorage {
    async fn save(&self, record: &ConversationRecord) -> Result<()> {
        let path = self.conversation_path(&record.conversation_id)?;
        let json = serde_json::to_string_pretty(record)
            .context("Failed to serialize conversation")?;

        fs::write(&path, json)
            .await
            .context(format!("Failed to write conversation file: {:?}", path))?;

        tracing::debug!(
            "[FileSystemStorage] Saved {} messages for conversation '{}' to {:?}",
            record.messages.len(),
            record.conversation_id,
            path
        );
        Ok(())
    }

    async fn load(&self, conversation_id: &str) -> Result<Option<ConversationRecord>> {
        let path = self.conversation_path(conversation_id)?;

        if !path.exists() {
            tracing::debug!("[FileSystemStorage] Conversation '{}' does not exist", conversation_id);
            return Ok(None);
        }

        let json = fs::read_to_string(&path)
            .await
            .context(format!("Failed to read conversation file: {:?}", path))?;

        let record: ConversationRecord =
            serde_json::from_str(&json).context("Failed to deserialize conversation")?;

        tracing::debug!(
            "[FileSystemStorage] Loaded {} messages for conversation '{}' from {:?}",
            record.messages.len(),
            conversation_id,
            path
        );
        Ok(Some(record))
    }

    async fn delete(&self, conversation_id: &str) -> Result<()> {
        let path = self.conversation_path(conversation_id)?;

        if path.exists() {
            fs::remove_file(&path)
                .await
                .context(format!("Failed to delete conversation file: {:?}", path))?;
            tracing::debug!("[FileSystemStorage] Deleted conversation '{}' at {:?}", conversation_id, path);
        } else {
            tracing::debug!(
                "[FileSystemStorage] Conversation '{}' does not exist, nothing to delete",
                conversation_id
            );
        }

        Ok(())
    }

    async fn list_conversations(&self) -> Result<Vec<String>> {
        let ids: Vec<String> = self
            .json_files()
            .await?
            .iter()
            .filter_map(|path| path.file_stem().and_then(|s| s.to_str()))
            .map(str::to_string)
            .collect();

        tracing::debug!("[FileSystemStorage] Listed {} conversations", ids.len());
        Ok(ids)
    }

    async fn exists(&self, conversation_id: &str) -> Result<bool> {
        Ok(self.conversation_path(conversation_id)?.exists())
    }
}

/// Ids become file names, so only `[A-Za-z0-9_-]` is accepted.
fn check_file_id(conversation_id: &str) -> Result<()> {
    let valid = !conversation_id.is_empty()
        && conversation_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if !valid {
        bail!("Invalid conversation id for file storage: {:?}", conversation_id);
    }
    Ok(())
}
