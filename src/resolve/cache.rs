//! Status cache with a freshness window
//!
//! Entries are never evicted; a stale entry is simply not served. The number
//! of entries is bounded by the distinct identifiers seen during one session.

use crate::ticket::{Identifier, Status};
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;

/// Freshness window used when none is configured, in seconds
pub const DEFAULT_FRESHNESS_SECS: i64 = 300;

/// A cached status and when it was resolved
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry<V = Status> {
    pub status: V,
    pub resolved_at: DateTime<Utc>,
}

/// Identifier → status, the single source of truth for known statuses
///
/// The fetching side of the messaging bridge keeps its own cache of raw
/// resolver answers, hence the value parameter.
#[derive(Debug)]
pub struct StatusCache<V = Status> {
    entries: DashMap<Identifier, CacheEntry<V>>,
    freshness: Duration,
}

impl<V: Clone> Default for StatusCache<V> {
    fn default() -> Self {
        Self::new(Duration::seconds(DEFAULT_FRESHNESS_SECS))
    }
}

impl<V: Clone> StatusCache<V> {
    pub fn new(freshness: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            freshness,
        }
    }

    pub fn freshness(&self) -> Duration {
        self.freshness
    }

    /// Fresh status for `id`, or `None` if absent or stale
    pub fn get(&self, id: &Identifier) -> Option<V> {
        self.get_at(id, Utc::now())
    }

    /// Like [`StatusCache::get`], judged at `now`
    pub fn get_at(&self, id: &Identifier, now: DateTime<Utc>) -> Option<V> {
        let entry = self.entries.get(id)?;
        if now - entry.resolved_at < self.freshness {
            Some(entry.status.clone())
        } else {
            None
        }
    }

    /// Store `status`, stamped now, replacing any previous entry
    pub fn put(&self, id: Identifier, status: V) {
        self.put_at(id, status, Utc::now());
    }

    pub fn put_at(&self, id: Identifier, status: V, resolved_at: DateTime<Utc>) {
        self.entries.insert(id, CacheEntry { status, resolved_at });
    }

    /// Raw entry, stale or not
    pub fn entry(&self, id: &Identifier) -> Option<CacheEntry<V>> {
        self.entries.get(id).map(|r| r.clone())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
