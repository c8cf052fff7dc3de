//! Listing cache: TTL-bound listing pages keyed by (bucket, prefix).
//!
//! The cache is a passive store. It never talks to the network; the
//! [`crate::listing::ListingService`] fetches pages and writes them here.
//! Staleness is discovered lazily on [`ListingCache::get`], and mutations
//! invalidate a key together with all of its ancestors.

mod clock;
mod entry;

pub use clock::{Clock, ManualClock, SystemClock};
pub use entry::{CacheEntry, ListingKey, ListingPage, ObjectEntry, PrefixEntry};

use chrono::TimeDelta;
use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

/// Default time-to-live for a cached listing
pub const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);

/// Diagnostic snapshot of the cache
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub size: usize,
    /// Cached keys, sorted
    pub keys: Vec<ListingKey>,
    pub hits: u64,
    pub misses: u64,
    /// Entries dropped because they went stale
    pub evictions: u64,
}

#[derive(Default)]
struct CacheState {
    entries: HashMap<ListingKey, CacheEntry>,
    hits: u64,
    misses: u64,
    evictions: u64,
}

/// Shared handle to the listing cache.
///
/// Cloning is cheap and every clone sees the same entries.
#[derive(Clone)]
pub struct ListingCache {
    state: Arc<RwLock<CacheState>>,
    ttl: TimeDelta,
    clock: Arc<dyn Clock>,
}

impl ListingCache {
    /// Create a cache with the given TTL using the wall clock
    pub fn new(ttl: Duration) -> Self {
        Self::with_clock(ttl, Arc::new(SystemClock))
    }

    /// Create a cache reading time from `clock`
    pub fn with_clock(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        ListingCache {
            state: Arc::new(RwLock::new(CacheState::default())),
            ttl: TimeDelta::from_std(ttl).unwrap_or(TimeDelta::MAX),
            clock,
        }
    }

    // A poisoned lock still holds consistent data: every mutation below is
    // a single map operation.
    fn write(&self) -> RwLockWriteGuard<'_, CacheState> {
        self.state.write().unwrap_or_else(|e| e.into_inner())
    }

    fn read(&self) -> RwLockReadGuard<'_, CacheState> {
        self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    /// Configured time-to-live
    pub fn ttl(&self) -> Duration {
        self.ttl.to_std().unwrap_or(Duration::MAX)
    }

    /// Get the entry for a key if present and fresh.
    ///
    /// A stale entry is removed as a side effect.
    pub fn get(&self, bucket: &str, prefix: Option<&str>) -> Option<CacheEntry> {
        let key = ListingKey::new(bucket, prefix);
        let now = self.clock.now();
        let mut state = self.write();

        match state.entries.get(&key).map(|e| e.is_fresh(now, self.ttl)) {
            Some(true) => {
                state.hits += 1;
                log::debug!("cache hit for {key}");
                state.entries.get(&key).cloned()
            }
            Some(false) => {
                state.entries.remove(&key);
                state.misses += 1;
                state.evictions += 1;
                log::debug!("evicted stale entry for {key}");
                None
            }
            None => {
                state.misses += 1;
                log::debug!("cache miss for {key}");
                None
            }
        }
    }

    /// Replace the entry for a key with a first page
    pub fn set(&self, bucket: &str, prefix: Option<&str>, page: ListingPage) -> CacheEntry {
        let key = ListingKey::new(bucket, prefix);
        let entry = CacheEntry::from_page(page, self.clock.now());
        log::debug!(
            "caching {} objects, {} prefixes for {key} (truncated: {})",
            entry.objects.len(),
            entry.prefixes.len(),
            entry.is_truncated
        );
        self.write().entries.insert(key, entry.clone());
        entry
    }

    /// Merge a continuation page into the entry for a key.
    ///
    /// Objects and prefixes already present keep their position and later
    /// duplicates are dropped, so retrying the same page is harmless. With
    /// no existing entry this behaves like [`ListingCache::set`].
    pub fn append(&self, bucket: &str, prefix: Option<&str>, page: ListingPage) -> CacheEntry {
        let key = ListingKey::new(bucket, prefix);
        let now = self.clock.now();
        let mut state = self.write();

        match state.entries.get_mut(&key) {
            Some(entry) => {
                entry.merge(page, now);
                log::debug!(
                    "appended page to {key}: {} objects, {} prefixes",
                    entry.objects.len(),
                    entry.prefixes.len()
                );
                entry.clone()
            }
            None => {
                let entry = CacheEntry::from_page(page, now);
                state.entries.insert(key, entry.clone());
                entry
            }
        }
    }

    /// Invalidate cached listings.
    ///
    /// With a prefix (or object key), removes exactly that key and every
    /// ancestor up to the bucket root, since any of them may list a folder
    /// whose contents just changed. Without a prefix, removes every entry of
    /// the bucket. Returns the number of entries removed.
    pub fn invalidate(&self, bucket: &str, prefix: Option<&str>) -> usize {
        let mut state = self.write();
        let before = state.entries.len();

        match prefix {
            Some(path) => {
                state.entries.remove(&ListingKey::new(bucket, Some(path)));
                for ancestor in ancestor_prefixes(path) {
                    state
                        .entries
                        .remove(&ListingKey::new(bucket, Some(&ancestor)));
                }
            }
            None => state.entries.retain(|key, _| key.bucket != bucket),
        }

        let removed = before - state.entries.len();
        log::debug!(
            "invalidated {removed} entries for s3://{bucket}/{}",
            prefix.unwrap_or("")
        );
        removed
    }

    /// Drop every entry for every bucket
    pub fn invalidate_all(&self) {
        let mut state = self.write();
        let removed = state.entries.len();
        state.entries.clear();
        log::debug!("cleared listing cache ({removed} entries)");
    }

    /// Remove every stale entry, returning how many were dropped
    pub fn sweep_expired(&self) -> usize {
        let now = self.clock.now();
        let ttl = self.ttl;
        let mut state = self.write();
        let before = state.entries.len();
        state.entries.retain(|_, entry| entry.is_fresh(now, ttl));
        let removed = before - state.entries.len();
        state.evictions += removed as u64;
        removed
    }

    /// Snapshot of size, keys and counters
    pub fn stats(&self) -> CacheStats {
        let state = self.read();
        let mut keys: Vec<ListingKey> = state.entries.keys().cloned().collect();
        keys.sort();
        CacheStats {
            size: keys.len(),
            keys,
            hits: state.hits,
            misses: state.misses,
            evictions: state.evictions,
        }
    }

    /// Number of cached keys
    pub fn len(&self) -> usize {
        self.read().entries.len()
    }

    /// Check if cache is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for ListingCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

/// Ancestor folder prefixes of a key or prefix, nearest first, ending with
/// the bucket root `""`.
///
/// `"a/c/x.txt"` yields `["a/c/", "a/", ""]`; `"a/b/"` yields `["a/", ""]`.
/// Empty segments are real prefixes: `"a//b"` yields `["a//", "a/", ""]`.
pub fn ancestor_prefixes(path: &str) -> Vec<String> {
    if path.is_empty() {
        return Vec::new();
    }

    let mut rest = path.strip_suffix('/').unwrap_or(path);
    let mut ancestors = Vec::new();
    while let Some(pos) = rest.rfind('/') {
        ancestors.push(rest[..=pos].to_string());
        rest = &rest[..pos];
    }
    ancestors.push(String::new());
    ancestors
}

/// Periodically drop stale entries so long-lived processes stay bounded
pub fn spawn_sweeper(cache: ListingCache, interval: Duration) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let removed = cache.sweep_expired();
            if removed > 0 {
                log::debug!("sweeper removed {removed} stale listings");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cache_with_clock() -> (ListingCache, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::default());
        let cache = ListingCache::with_clock(DEFAULT_TTL, clock.clone());
        (cache, clock)
    }

    #[test]
    fn test_ancestor_prefixes() {
        assert_eq!(ancestor_prefixes("a/c/x.txt"), vec!["a/c/", "a/", ""]);
        assert_eq!(ancestor_prefixes("a/b/"), vec!["a/", ""]);
        assert_eq!(ancestor_prefixes("top.txt"), vec![""]);
        assert!(ancestor_prefixes("").is_empty());
        assert_eq!(
            ancestor_prefixes("a//b/y.txt"),
            vec!["a//b/", "a//", "a/", ""]
        );
        assert_eq!(ancestor_prefixes("a//"), vec!["a/", ""]);
        assert_eq!(ancestor_prefixes("/x"), vec!["/", ""]);
    }

    #[test]
    fn test_get_miss_and_hit_counters() {
        let (cache, _clock) = cache_with_clock();
        assert!(cache.get("bkt", None).is_none());

        cache.set("bkt", None, ListingPage::default());
        assert!(cache.get("bkt", None).is_some());

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.evictions, 0);
    }

    #[test]
    fn test_root_key_matches_empty_prefix() {
        let (cache, _clock) = cache_with_clock();
        cache.set("bkt", Some(""), ListingPage::default());
        assert!(cache.get("bkt", None).is_some());
    }

    #[test]
    fn test_set_overwrites_wholesale() {
        let (cache, _clock) = cache_with_clock();
        cache.set(
            "bkt",
            None,
            ListingPage::truncated(vec![ObjectEntry::new("a", 1)], vec![], "tok"),
        );
        cache.set(
            "bkt",
            None,
            ListingPage::complete(vec![ObjectEntry::new("b", 2)], vec![]),
        );

        let entry = cache.get("bkt", None).unwrap();
        assert_eq!(entry.objects, vec![ObjectEntry::new("b", 2)]);
        assert!(!entry.is_truncated);
    }

    #[test]
    fn test_append_restamps_last_fetched() {
        let (cache, clock) = cache_with_clock();
        let first = cache.set(
            "bkt",
            None,
            ListingPage::truncated(vec![ObjectEntry::new("a", 1)], vec![], "tok"),
        );

        clock.advance(Duration::from_secs(200));
        let merged = cache.append(
            "bkt",
            None,
            ListingPage::complete(vec![ObjectEntry::new("b", 1)], vec![]),
        );
        assert!(merged.last_fetched > first.last_fetched);

        // Still fresh 200s after the append even though the first page is older than the TTL
        clock.advance(Duration::from_secs(200));
        assert!(cache.get("bkt", None).is_some());
    }

    #[test]
    fn test_append_without_entry_acts_as_set() {
        let (cache, _clock) = cache_with_clock();
        let entry = cache.append(
            "bkt",
            Some("a/"),
            ListingPage::complete(vec![ObjectEntry::new("a/x", 3)], vec![]),
        );
        assert_eq!(entry.objects.len(), 1);
        assert_eq!(cache.get("bkt", Some("a/")), Some(entry));
    }

    #[test]
    fn test_invalidate_exact_folder_key() {
        let (cache, _clock) = cache_with_clock();
        cache.set("bkt", Some("a/b/"), ListingPage::default());
        cache.set("bkt", Some("a/"), ListingPage::default());
        cache.set("bkt", Some("a/bb/"), ListingPage::default());

        let removed = cache.invalidate("bkt", Some("a/b/"));
        assert_eq!(removed, 2);
        assert_eq!(cache.stats().keys, vec![ListingKey::new("bkt", Some("a/bb/"))]);
    }

    #[test]
    fn test_sweep_expired() {
        let (cache, clock) = cache_with_clock();
        cache.set("bkt", Some("old/"), ListingPage::default());
        clock.advance(Duration::from_secs(200));
        cache.set("bkt", Some("new/"), ListingPage::default());
        clock.advance(Duration::from_secs(200));

        assert_eq!(cache.sweep_expired(), 1);
        assert_eq!(cache.stats().keys, vec![ListingKey::new("bkt", Some("new/"))]);
        assert_eq!(cache.stats().evictions, 1);
    }

    #[test]
    fn test_clones_share_state() {
        let (cache, _clock) = cache_with_clock();
        let other = cache.clone();
        cache.set("bkt", None, ListingPage::default());
        assert_eq!(other.len(), 1);
        other.invalidate_all();
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_sweeper_task() {
        let clock = Arc::new(ManualClock::default());
        let cache = ListingCache::with_clock(Duration::from_secs(10), clock.clone());
        cache.set("bkt", None, ListingPage::default());
        clock.advance(Duration::from_secs(11));

        let handle = spawn_sweeper(cache.clone(), Duration::from_millis(10));
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(cache.is_empty());
        handle.abort();
    }
}
