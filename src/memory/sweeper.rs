//! Retention sweeping
//!
//! Removes whole conversations that have gone idle past the timeout, then
//! trims the least recently active ones while the store is over capacity.
//! Sweeps are rate limited by the cleanup interval and are only triggered
//! by store calls; nothing here runs on its own timer.

use super::clock::elapsed;
use super::conversation::Conversation;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::time::Duration;

/// Ids removed by one sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    pub expired: Vec<String>,
    pub evicted: Vec<String>,
}

impl SweepReport {
    pub fn removed(&self) -> usize {
        self.expired.len() + self.evicted.len()
    }

    pub fn is_empty(&self) -> bool {
        self.removed() == 0
    }
}

#[derive(Debug, Clone)]
pub struct RetentionSweeper {
    conversation_timeout: Duration,
    cleanup_interval: Duration,
    max_conversations: usize,
    last_sweep: DateTime<Utc>,
}

impl RetentionSweeper {
    pub fn new(
        conversation_timeout: Duration,
        cleanup_interval: Duration,
        max_conversations: usize,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            conversation_timeout,
            cleanup_interval,
            max_conversations,
            last_sweep: now,
        }
    }

    pub fn last_sweep(&self) -> DateTime<Utc> {
        self.last_sweep
    }

    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        elapsed(self.last_sweep, now).is_some_and(|since| since > self.cleanup_interval)
    }

    /// Sweep if more than the cleanup interval has passed since the last run.
    pub fn maybe_sweep(
        &mut self,
        conversations: &mut HashMap<String, Conversation>,
        now: DateTime<Utc>,
    ) -> Option<SweepReport> {
        if !self.is_due(now) {
            return None;
        }
        Some(self.sweep(conversations, now))
    }

    /// Sweep unconditionally.
    pub fn sweep(
        &mut self,
        conversations: &mut HashMap<String, Conversation>,
        now: DateTime<Utc>,
    ) -> SweepReport {
        self.last_sweep = now;
        let mut report = SweepReport::default();

        let timeout = self.conversation_timeout;
        let mut expired: Vec<String> = conversations
            .values()
            .filter(|c| elapsed(c.last_activity(), now).is_some_and(|idle| idle > timeout))
            .map(|c| c.conversation_id().to_string())
            .collect();
        expired.sort();

        for id in expired {
            conversations.remove(&id);
            tracing::info!("[RetentionSweeper] Removed expired conversation '{}'", id);
            report.expired.push(id);
        }

        if conversations.len() > self.max_conversations {
            let excess = conversations.len() - self.max_conversations;
            let mut by_activity: Vec<(DateTime<Utc>, String)> = conversations
                .values()
                .map(|c| (c.last_activity(), c.conversation_id().to_string()))
                .collect();
            by_activity.sort();

            for (_, id) in by_activity.into_iter().take(excess) {
                conversations.remove(&id);
                tracing::info!("[RetentionSweeper] Evicted least recently active conversation '{}'", id);
                report.evicted.push(id);
            }
        }

        if !report.is_empty() {
            tracing::debug!(
                "[RetentionSweeper] Sweep removed {} conversations ({} remaining)",
                report.removed(),
                conversations.len()
            );
        }

        report
    }
}
