//! Time-boxed in-memory transcript cache.
//!
//! Entries expire lazily: a `get` that finds a stale entry removes it and
//! reports a miss. There is no capacity bound. The map is sharded and safe to
//! share between concurrent requests, but there is no single-flight: two
//! concurrent misses on the same key will both go upstream.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::time::Duration;
use tokio::time::Instant;

use crate::tiers::TierName;

/// A cached transcript and the tier that produced it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedTranscript {
    pub text: String,
    pub tier: TierName,
}

#[derive(Debug, Clone)]
struct CacheEntry {
    value: CachedTranscript,
    created_at: Instant,
}

/// Shared transcript cache keyed by `video_id:lang`
#[derive(Debug)]
pub struct TranscriptCache {
    entries: DashMap<String, CacheEntry>,
    ttl: Duration,
}

impl TranscriptCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    /// Build the cache key for a request
    pub fn key(video_id: &str, lang: &str) -> String {
        format!("{}:{}", video_id, lang)
    }

    /// Look up a key, dropping the entry if it has outlived the TTL.
    ///
    /// The check and the removal happen under the key's shard lock.
    pub fn get(&self, key: &str) -> Option<CachedTranscript> {
        match self.entries.entry(key.to_string()) {
            Entry::Occupied(entry) => {
                if entry.get().created_at.elapsed() > self.ttl {
                    tracing::debug!("Cache entry expired: {}", key);
                    entry.remove();
                    None
                } else {
                    Some(entry.get().value.clone())
                }
            }
            Entry::Vacant(_) => None,
        }
    }

    pub fn set(&self, key: impl Into<String>, value: CachedTranscript) {
        self.entries.insert(
            key.into(),
            CacheEntry {
                value,
                created_at: Instant::now(),
            },
        );
    }

    /// Drop every expired entry; returns how many were removed
    pub fn purge_expired(&self) -> usize {
        let before = self.entries.len();
        let ttl = self.ttl;
        self.entries.retain(|_, entry| entry.created_at.elapsed() <= ttl);
        before.saturating_sub(self.entries.len())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }
}
