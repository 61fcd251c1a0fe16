//! Identity cache: owner id → resolved label, icon and canonical package.
//!
//! Entries are written whole under a write lock, so a hit always returns a
//! fully populated detail. The cache is unbounded and only cleared
//! explicitly, when the owner-to-package mapping may have changed.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::resources::Icon;
use crate::sipper::OwnerId;

/// Resolved display detail for one owner id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OwnerDetail {
    /// Display label.
    pub label: String,
    /// Display icon.
    pub icon: Icon,
    /// Package the icon was taken from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package_name: Option<String>,
    /// When the detail was resolved.
    pub resolved_at: DateTime<Utc>,
}

impl OwnerDetail {
    /// Creates a detail stamped with the current time.
    #[must_use]
    pub fn new(label: impl Into<String>, icon: Icon, package_name: Option<String>) -> Self {
        Self {
            label: label.into(),
            icon,
            package_name,
            resolved_at: Utc::now(),
        }
    }
}

/// Point-in-time cache counters.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
}

/// Concurrent owner-id cache.
#[derive(Debug, Default)]
pub struct IdentityCache {
    entries: RwLock<HashMap<String, OwnerDetail>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl IdentityCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn key(owner: OwnerId) -> String {
        owner.to_string()
    }

    /// Returns the cached detail for `owner`.
    pub fn get(&self, owner: OwnerId) -> Option<OwnerDetail> {
        let found = self
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&Self::key(owner))
            .cloned();
        if found.is_some() {
            self.hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
        }
        found
    }

    /// Stores the detail for `owner`, replacing any previous one.
    pub fn put(&self, owner: OwnerId, detail: OwnerDetail) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(Self::key(owner), detail);
    }

    /// Returns true if `owner` has a cached detail. Does not count as a lookup.
    #[must_use]
    pub fn contains(&self, owner: OwnerId) -> bool {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(&Self::key(owner))
    }

    /// Drops every cached detail.
    pub fn clear(&self) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Number of cached owners.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Returns true if nothing is cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns current counters.
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detail(label: &str) -> OwnerDetail {
        OwnerDetail::new(label, Icon::DefaultActivity, Some("com.example.app".to_string()))
    }

    #[test]
    fn get_put_roundtrip_counts_hits_and_misses() {
        let cache = IdentityCache::new();
        let owner = OwnerId::new(10_001);

        assert!(cache.get(owner).is_none());
        cache.put(owner, detail("Example"));
        let hit = cache.get(owner).unwrap();
        assert_eq!(hit.label, "Example");
        assert_eq!(hit.package_name.as_deref(), Some("com.example.app"));

        let stats = cache.stats();
        assert_eq!(stats.entries, 1);
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
    }

    #[test]
    fn put_replaces_whole_detail() {
        let cache = IdentityCache::new();
        let owner = OwnerId::new(3);
        cache.put(owner, detail("Old"));
        cache.put(owner, OwnerDetail::new("New", Icon::DefaultActivity, None));

        let got = cache.get(owner).unwrap();
        assert_eq!(got.label, "New");
        assert!(got.package_name.is_none());
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn clear_empties_cache() {
        let cache = IdentityCache::new();
        cache.put(OwnerId::new(1), detail("a"));
        cache.put(OwnerId::new(2), detail("b"));
        assert!(cache.contains(OwnerId::new(2)));

        cache.clear();
        assert!(cache.is_empty());
        assert!(!cache.contains(OwnerId::new(2)));
    }

    #[test]
    fn owner_detail_serializes_icon_tag() {
        let json = serde_json::to_value(detail("Example")).unwrap();
        assert_eq!(json["icon"]["type"], "default_activity");
        assert_eq!(json["label"], "Example");
    }
}
