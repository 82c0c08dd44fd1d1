/// In-process cache of issued redirect URLs
///
/// Maps `item_id:media_source_id` to the last signed URL minted for it.
/// The cache only saves origin round trips: a hit is still re-validated by
/// decoding the token embedded in the URL, and a lost entry costs one extra
/// origin call, never a wrong answer.
///
/// Backed by a sharded `DashMap`, so lookups on unrelated keys do not contend.
/// Same-key writes are last-writer-wins.
use dashmap::DashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info};

/// Power of two, as `DashMap` requires
const SHARD_AMOUNT: usize = 256;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CacheError {
    #[error("cache entry of {size} bytes exceeds the {max} byte limit")]
    EntryTooLarge { size: usize, max: usize },
}

#[derive(Debug, Clone)]
struct CacheEntry {
    url: String,
    expires_at: Instant,
}

impl CacheEntry {
    #[inline]
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

pub struct UrlCache {
    entries: Arc<DashMap<String, CacheEntry>>,
    ttl: Duration,
    max_entry_size: usize,
    sweeper: Mutex<Option<JoinHandle<()>>>,
}

impl UrlCache {
    pub fn new(ttl: Duration, max_entry_size: usize) -> Self {
        debug!(
            ttl_secs = ttl.as_secs(),
            max_entry_size, "Initializing URL cache"
        );

        Self {
            entries: Arc::new(DashMap::with_shard_amount(SHARD_AMOUNT)),
            ttl,
            max_entry_size,
            sweeper: Mutex::new(None),
        }
    }

    /// Fingerprint of a playback request
    pub fn fingerprint(item_id: &str, media_source_id: &str) -> String {
        format!("{}:{}", item_id, media_source_id)
    }

    pub fn get(&self, key: &str) -> Option<String> {
        let now = Instant::now();
        if let Some(entry) = self.entries.get(key) {
            if !entry.is_expired(now) {
                return Some(entry.url.clone());
            }
        } else {
            return None;
        }

        // Expired: the read guard is gone, drop the entry unless it was just rewritten
        self.entries.remove_if(key, |_, entry| entry.is_expired(now));
        None
    }

    pub fn set(&self, key: &str, url: &str) -> Result<(), CacheError> {
        let size = key.len() + url.len();
        if size > self.max_entry_size {
            return Err(CacheError::EntryTooLarge {
                size,
                max: self.max_entry_size,
            });
        }

        self.entries.insert(
            key.to_string(),
            CacheEntry {
                url: url.to_string(),
                expires_at: Instant::now() + self.ttl,
            },
        );
        Ok(())
    }

    pub fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.entries.remove(key);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every expired entry, returning how many were removed
    pub fn purge_expired(&self) -> usize {
        purge(&self.entries, Instant::now())
    }

    /// Start the background sweep; runs every half TTL until [`UrlCache::shutdown`]
    pub fn start_sweeper(&self) {
        let mut slot = self.sweeper.lock().unwrap_or_else(|e| e.into_inner());
        if slot.is_some() {
            return;
        }

        let entries = Arc::clone(&self.entries);
        let period = (self.ttl / 2).max(Duration::from_secs(1));
        *slot = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            // First tick completes immediately
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let removed = purge(&entries, Instant::now());
                if removed > 0 {
                    debug!(removed, remaining = entries.len(), "URL cache sweep");
                }
            }
        }));
        info!(period_secs = period.as_secs(), "URL cache sweeper started");
    }

    pub fn shutdown(&self) {
        if let Some(handle) = self
            .sweeper
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take()
        {
            handle.abort();
            info!(entries = self.entries.len(), "URL cache sweeper stopped");
        }
    }
}

impl Drop for UrlCache {
    fn drop(&mut self) {
        if let Some(handle) = self
            .sweeper
            .get_mut()
            .unwrap_or_else(|e| e.into_inner())
            .take()
        {
            handle.abort();
        }
    }
}

fn purge(entries: &DashMap<String, CacheEntry>, now: Instant) -> usize {
    let before = entries.len();
    entries.retain(|_, entry| !entry.is_expired(now));
    before.saturating_sub(entries.len())
}
