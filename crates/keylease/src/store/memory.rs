// In-process lock store with per-key expiry
// Backs leases within a single process and drives the lease tests

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio::time::Instant;
use tracing::{debug, info};

use super::{DeleteOutcome, LockStore, SetOutcome};
use crate::error::{StoreError, StoreResult};

/// A stored value and the instant it stops being visible
#[derive(Debug, Clone)]
struct StoredEntry {
    value: String,
    expires_at: Instant,
}

impl StoredEntry {
    fn new(value: &str, ttl: Duration) -> StoreResult<Self> {
        Ok(Self {
            value: value.to_string(),
            expires_at: deadline(Instant::now(), ttl)?,
        })
    }

    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

fn deadline(now: Instant, ttl: Duration) -> StoreResult<Instant> {
    now.checked_add(ttl)
        .ok_or_else(|| StoreError::Backend(format!("ttl {:?} is out of range", ttl)))
}

/// In-memory [`LockStore`] using DashMap.
///
/// Expired entries are invisible to every operation even before they are
/// swept, so expiry is exact regardless of whether the sweep task runs.
/// Deadlines use the tokio clock and follow a paused test runtime.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: DashMap<String, StoredEntry>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current live value of `key`
    pub fn get(&self, key: &str) -> Option<String> {
        let now = Instant::now();
        self.entries
            .get(key)
            .filter(|entry| !entry.is_expired(now))
            .map(|entry| entry.value.clone())
    }

    /// Remaining time before `key` expires
    pub fn ttl(&self, key: &str) -> Option<Duration> {
        let now = Instant::now();
        self.entries
            .get(key)
            .filter(|entry| !entry.is_expired(now))
            .map(|entry| entry.expires_at - now)
    }

    /// Number of live entries
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.entries
            .iter()
            .filter(|entry| !entry.value().is_expired(now))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Unconditionally write `key := value`, replacing any current holder
    pub fn force_set(&self, key: &str, value: &str, ttl: Duration) -> StoreResult<()> {
        self.entries
            .insert(key.to_string(), StoredEntry::new(value, ttl)?);
        Ok(())
    }

    /// Drop expired entries, returning how many were removed
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired(now));
        let removed = before.saturating_sub(self.entries.len());

        if removed > 0 {
            debug!(count = removed, "Purged expired lock entries");
        }
        removed
    }

    /// Start a background task that periodically purges expired entries
    pub fn start_expiry_task(self: Arc<Self>, interval: Duration) -> tokio::task::JoinHandle<()> {
        info!(interval = ?interval, "Starting memory store expiry task");

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            loop {
                ticker.tick().await;
                self.purge_expired();
            }
        })
    }
}

#[async_trait]
impl LockStore for MemoryStore {
    async fn set_if_absent(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> StoreResult<SetOutcome> {
        let now = Instant::now();
        let entry = StoredEntry::new(value, ttl)?;

        match self.entries.entry(key.to_string()) {
            Entry::Occupied(mut occupied) => {
                if !occupied.get().is_expired(now) {
                    return Ok(SetOutcome::AlreadyExists);
                }
                occupied.insert(entry);
            }
            Entry::Vacant(vacant) => {
                vacant.insert(entry);
            }
        }

        Ok(SetOutcome::Created)
    }

    async fn compare_and_delete(&self, key: &str, expected: &str) -> StoreResult<DeleteOutcome> {
        let now = Instant::now();

        let removed = self
            .entries
            .remove_if(key, |_, entry| {
                !entry.is_expired(now) && entry.value == expected
            });

        Ok(match removed {
            Some(_) => DeleteOutcome::Deleted,
            None => DeleteOutcome::NotMatched,
        })
    }

    async fn refresh_ttl(&self, key: &str, ttl: Duration) -> StoreResult<bool> {
        let now = Instant::now();
        let expires_at = deadline(now, ttl)?;

        if let Some(mut entry) = self.entries.get_mut(key)
            && !entry.is_expired(now)
        {
            entry.expires_at = expires_at;
            return Ok(true);
        }

        // Guard must be released before removing from the same shard
        self.entries.remove_if(key, |_, entry| entry.is_expired(now));
        Ok(false)
    }
}
