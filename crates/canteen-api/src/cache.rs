// crates/canteen-api/src/cache.rs
// ============================================================================
// Module: Listing Cache
// Description: In-process TTL cache for read-heavy listings.
// Purpose: Serve repeated catalog and stats reads without hitting the store.
// Dependencies: canteen-core, serde_json
// ============================================================================

//! ## Overview
//! Values are stored as JSON under a `(namespace, key)` pair and expire after
//! a fixed TTL. Writers invalidate whole namespaces. When the cache is full the
//! entry closest to expiry is evicted. A disabled cache always misses.
//!
//! Each namespace carries a generation that every invalidation bumps. A load
//! only stores its result when the generation it started under is still
//! current, so a listing read before a write cannot outlive that write.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;

use canteen_config::CacheConfig;
use canteen_core::Clock;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use time::Duration;
use time::OffsetDateTime;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Cache namespaces, one per cached listing family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheNamespace {
    /// Filtered menu item pages.
    Items,
    /// Menu items of one category.
    ItemsByCategory,
    /// Category pages.
    Categories,
    /// Order status counts.
    OrderStats,
    /// Customer search pages.
    UserSearch,
}

impl CacheNamespace {
    /// Every namespace.
    pub const ALL: [Self; 5] =
        [Self::Items, Self::ItemsByCategory, Self::Categories, Self::OrderStats, Self::UserSearch];

    /// Returns the namespace label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Items => "items",
            Self::ItemsByCategory => "itemsByCategory",
            Self::Categories => "categories",
            Self::OrderStats => "orderStats",
            Self::UserSearch => "userSearch",
        }
    }
}

/// Cached value with its expiry.
struct CacheEntry {
    /// Serialized value.
    value: Value,
    /// Instant after which the entry is stale.
    expires_at: OffsetDateTime,
}

/// Entries plus the per-namespace invalidation generations.
#[derive(Default)]
struct CacheState {
    /// Entries keyed by namespace and key.
    entries: HashMap<(CacheNamespace, String), CacheEntry>,
    /// Invalidation count per namespace; absent means zero.
    generations: HashMap<CacheNamespace, u64>,
}

impl CacheState {
    /// Returns the current generation of a namespace.
    fn generation(&self, namespace: CacheNamespace) -> u64 {
        self.generations.get(&namespace).copied().unwrap_or(0)
    }

    /// Drops a namespace's entries and starts a new generation.
    fn invalidate(&mut self, namespace: CacheNamespace) {
        self.entries.retain(|(entry_namespace, _), _| *entry_namespace != namespace);
        let generation = self.generations.entry(namespace).or_insert(0);
        *generation = generation.wrapping_add(1);
    }
}

/// Namespaced TTL cache.
pub struct TtlCache {
    /// Whether lookups may hit.
    enabled: bool,
    /// Entry lifetime.
    ttl: Duration,
    /// Maximum number of live entries.
    max_entries: usize,
    /// Time source for expiry.
    clock: Arc<dyn Clock>,
    /// Entries and generations.
    state: Mutex<CacheState>,
}

impl TtlCache {
    /// Builds a cache from configuration.
    #[must_use]
    pub fn from_config(config: &CacheConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            enabled: config.enabled,
            ttl: Duration::seconds(i64::try_from(config.ttl_secs).unwrap_or(i64::MAX)),
            max_entries: config.max_entries,
            clock,
            state: Mutex::new(CacheState::default()),
        }
    }

    /// Returns the cached value for `key`, or loads, stores, and returns it.
    ///
    /// Values that fail to round-trip through JSON are returned uncached, as
    /// are values whose namespace was invalidated while they were loading.
    ///
    /// # Errors
    ///
    /// Returns the loader's error; failures are never cached.
    pub fn get_or_insert_with<T, E>(
        &self,
        namespace: CacheNamespace,
        key: &str,
        load: impl FnOnce() -> Result<T, E>,
    ) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
    {
        if let Some(hit) = self.get(namespace, key) {
            return Ok(hit);
        }
        let generation = self.generation(namespace);
        let value = load()?;
        if let (Some(generation), Ok(json)) = (generation, serde_json::to_value(&value)) {
            self.insert(namespace, key, json, generation);
        }
        Ok(value)
    }

    /// Drops every entry of a namespace.
    pub fn invalidate(&self, namespace: CacheNamespace) {
        if let Ok(mut state) = self.state.lock() {
            state.invalidate(namespace);
        }
    }

    /// Drops every entry of several namespaces.
    pub fn invalidate_all(&self, namespaces: &[CacheNamespace]) {
        if let Ok(mut state) = self.state.lock() {
            for namespace in namespaces {
                state.invalidate(*namespace);
            }
        }
    }

    /// Drops every entry.
    pub fn clear(&self) {
        self.invalidate_all(&CacheNamespace::ALL);
    }

    /// Returns the number of stored entries, including stale ones.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.lock().map_or(0, |state| state.entries.len())
    }

    /// Returns true when nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Looks up a live entry.
    fn get<T: DeserializeOwned>(&self, namespace: CacheNamespace, key: &str) -> Option<T> {
        if !self.enabled {
            return None;
        }
        let now = self.clock.now();
        let mut state = self.state.lock().ok()?;
        let lookup = (namespace, key.to_string());
        let entry = state.entries.get(&lookup)?;
        if entry.expires_at <= now {
            state.entries.remove(&lookup);
            return None;
        }
        serde_json::from_value(entry.value.clone()).ok()
    }

    /// Returns the namespace generation a load starts under.
    fn generation(&self, namespace: CacheNamespace) -> Option<u64> {
        self.state.lock().ok().map(|state| state.generation(namespace))
    }

    /// Stores an entry loaded under `generation`, evicting stale and then
    /// soonest-expiring entries.
    fn insert(&self, namespace: CacheNamespace, key: &str, value: Value, generation: u64) {
        if !self.enabled || self.max_entries == 0 {
            return;
        }
        let now = self.clock.now();
        let Some(expires_at) = now.checked_add(self.ttl) else {
            return;
        };
        let Ok(mut state) = self.state.lock() else {
            return;
        };
        if state.generation(namespace) != generation {
            return;
        }
        let entries = &mut state.entries;
        let lookup = (namespace, key.to_string());
        if !entries.contains_key(&lookup) && entries.len() >= self.max_entries {
            entries.retain(|_, entry| entry.expires_at > now);
            while entries.len() >= self.max_entries {
                let Some(oldest) = entries
                    .iter()
                    .min_by_key(|(_, entry)| entry.expires_at)
                    .map(|(candidate, _)| candidate.clone())
                else {
                    break;
                };
                entries.remove(&oldest);
            }
        }
        entries.insert(lookup, CacheEntry {
            value,
            expires_at,
        });
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, reason = "Test-only assertions.")]

    use std::cell::Cell;

    use canteen_core::FixedClock;
    use time::macros::datetime;

    use super::*;

    fn cache(enabled: bool, max_entries: usize) -> (Arc<FixedClock>, TtlCache) {
        let clock = Arc::new(FixedClock::new(datetime!(2024-03-01 10:00 UTC)));
        let config = CacheConfig {
            enabled,
            ttl_secs: 60,
            max_entries,
        };
        let cache = TtlCache::from_config(&config, clock.clone());
        (clock, cache)
    }

    fn load_counting(calls: &Cell<u32>, value: u32) -> Result<u32, String> {
        calls.set(calls.get() + 1);
        Ok(value)
    }

    #[test]
    fn second_read_is_served_from_cache() {
        let (_, cache) = cache(true, 8);
        let calls = Cell::new(0);
        let first = cache.get_or_insert_with(CacheNamespace::Items, "k", || load_counting(&calls, 7));
        let second =
            cache.get_or_insert_with(CacheNamespace::Items, "k", || load_counting(&calls, 9));
        assert_eq!(first.unwrap(), 7);
        assert_eq!(second.unwrap(), 7);
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn entries_expire_after_ttl() {
        let (clock, cache) = cache(true, 8);
        let calls = Cell::new(0);
        cache.get_or_insert_with(CacheNamespace::Items, "k", || load_counting(&calls, 1)).unwrap();
        clock.advance(Duration::seconds(61));
        let value =
            cache.get_or_insert_with(CacheNamespace::Items, "k", || load_counting(&calls, 2));
        assert_eq!(value.unwrap(), 2);
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn invalidation_is_scoped_to_namespace() {
        let (_, cache) = cache(true, 8);
        let calls = Cell::new(0);
        cache.get_or_insert_with(CacheNamespace::Items, "a", || load_counting(&calls, 1)).unwrap();
        cache
            .get_or_insert_with(CacheNamespace::Categories, "a", || load_counting(&calls, 2))
            .unwrap();
        cache.invalidate(CacheNamespace::Items);
        assert_eq!(cache.len(), 1);
        let categories =
            cache.get_or_insert_with(CacheNamespace::Categories, "a", || load_counting(&calls, 3));
        assert_eq!(categories.unwrap(), 2);
    }

    #[test]
    fn errors_are_not_cached() {
        let (_, cache) = cache(true, 8);
        let failed: Result<u32, String> =
            cache.get_or_insert_with(CacheNamespace::OrderStats, "all", || Err("boom".to_string()));
        assert!(failed.is_err());
        assert!(cache.is_empty());
    }

    #[test]
    fn full_cache_evicts_soonest_expiring() {
        let (clock, cache) = cache(true, 2);
        let calls = Cell::new(0);
        cache.get_or_insert_with(CacheNamespace::Items, "a", || load_counting(&calls, 1)).unwrap();
        clock.advance(Duration::seconds(5));
        cache.get_or_insert_with(CacheNamespace::Items, "b", || load_counting(&calls, 2)).unwrap();
        cache.get_or_insert_with(CacheNamespace::Items, "c", || load_counting(&calls, 3)).unwrap();
        assert_eq!(cache.len(), 2);
        let a = cache.get_or_insert_with(CacheNamespace::Items, "a", || load_counting(&calls, 10));
        assert_eq!(a.unwrap(), 10);
    }

    #[test]
    fn load_overlapping_an_invalidation_is_not_stored() {
        let (_, cache) = cache(true, 8);
        let calls = Cell::new(0);
        let stale = cache.get_or_insert_with(CacheNamespace::Items, "k", || {
            let value = load_counting(&calls, 1);
            cache.invalidate(CacheNamespace::Items);
            value
        });
        assert_eq!(stale.unwrap(), 1);
        assert!(cache.is_empty());
        let fresh = cache.get_or_insert_with(CacheNamespace::Items, "k", || load_counting(&calls, 2));
        assert_eq!(fresh.unwrap(), 2);
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn clear_also_discards_loads_in_flight() {
        let (_, cache) = cache(true, 8);
        let calls = Cell::new(0);
        cache
            .get_or_insert_with(CacheNamespace::UserSearch, "q", || {
                let value = load_counting(&calls, 1);
                cache.clear();
                value
            })
            .unwrap();
        cache.get_or_insert_with(CacheNamespace::Items, "k", || load_counting(&calls, 2)).unwrap();
        assert_eq!(cache.len(), 1);
        let search =
            cache.get_or_insert_with(CacheNamespace::UserSearch, "q", || load_counting(&calls, 3));
        assert_eq!(search.unwrap(), 3);
    }

    #[test]
    fn unrepresentable_expiry_skips_caching() {
        let clock = Arc::new(FixedClock::new(datetime!(2024-03-01 10:00 UTC)));
        let config = CacheConfig {
            enabled: true,
            ttl_secs: u64::MAX,
            max_entries: 8,
        };
        let cache = TtlCache::from_config(&config, clock);
        let calls = Cell::new(0);
        let value = cache.get_or_insert_with(CacheNamespace::Items, "k", || load_counting(&calls, 4));
        assert_eq!(value.unwrap(), 4);
        assert!(cache.is_empty());
    }

    #[test]
    fn disabled_cache_always_misses() {
        let (_, cache) = cache(false, 8);
        let calls = Cell::new(0);
        cache.get_or_insert_with(CacheNamespace::Items, "k", || load_counting(&calls, 1)).unwrap();
        cache.get_or_insert_with(CacheNamespace::Items, "k", || load_counting(&calls, 1)).unwrap();
        assert_eq!(calls.get(), 2);
        assert!(cache.is_empty());
    }
}
