//! Read-through cache in front of another storage backend.
//!
//! Loaded records are kept in a bounded least-recently-used cache. The cache
//! lock is held across every backend call made through this wrapper, so a slow
//! load can never put back a record that a later `save` or `delete` replaced.
//! Changes made to the backend behind the wrapper's back need an explicit
//! `invalidate`.

use super::{ConversationRecord, ConversationStorage};
use anyhow::Result;
use async_trait::async_trait;
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::Arc;
use tokio::sync::Mutex;

pub struct CachedStorage {
    inner: Arc<dyn ConversationStorage>,
    /// `None` when the capacity is zero and caching is disabled.
    cache: Mutex<Option<LruCache<String, ConversationRecord>>>,
}

impl CachedStorage {
    pub fn new(inner: Arc<dyn ConversationStorage>, capacity: usize) -> Self {
        Self {
            inner,
            cache: Mutex::new(NonZeroUsize::new(capacity).map(LruCache::new)),
        }
    }

    /// Drop the cached copy of one conversation.
    pub async fn invalidate(&self, conversation_id: &str) {
        if let Some(cache) = self.cache.lock().await.as_mut() {
            cache.pop(conversation_id);
        }
        tracing::debug!("[CachedStorage] Invalidated '{}'", conversation_id);
    }

    /// Drop every cached record.
    pub async fn invalidate_all(&self) {
        if let Some(cache) = self.cache.lock().await.as_mut() {
            cache.clear();
        }
        tracing::debug!("[CachedStorage] Invalidated all entries");
    }

    pub async fn cached_len(&self) -> usize {
        self.cache.lock().await.as_ref().map_or(0, LruCache::len)
    }
}

#[async_trait]
impl ConversationStorage for CachedStorage {
    async fn save(&self, record: &ConversationRecord) -> Result<()> {
        let mut cache = self.cache.lock().await;
        self.inner.save(record).await?;
        if let Some(cache) = cache.as_mut() {
            cache.put(record.conversation_id.clone(), record.clone());
        }
        Ok(())
    }

    async fn load(&self, conversation_id: &str) -> Result<Option<ConversationRecord>> {
        let mut cache = self.cache.lock().await;
        if let Some(record) = cache.as_mut().and_then(|c| c.get(conversation_id)) {
            tracing::debug!("[CachedStorage] Cache hit for '{}'", conversation_id);
            return Ok(Some(record.clone()));
        }

        let record = self.inner.load(conversation_id).await?;
        if let (Some(cache), Some(record)) = (cache.as_mut(), &record) {
            cache.put(conversation_id.to_string(), record.clone());
        }
        Ok(record)
    }

    async fn delete(&self, conversation_id: &str) -> Result<()> {
        let mut cache = self.cache.lock().await;
        self.inner.delete(conversation_id).await?;
        if let Some(cache) = cache.as_mut() {
            cache.pop(conversation_id);
        }
        Ok(())
    }

    async fn list_conversations(&self) -> Result<Vec<String>> {
        self.inner.list_conversations().await
    }

    async fn exists(&self, conversation_id: &str) -> Result<bool> {
        let cache = self.cache.lock().await;
        if cache.as_ref().is_some_and(|c| c.contains(conversation_id)) {
            return Ok(true);
        }
        self.inner.exists(conversation_id).await
    }
}
