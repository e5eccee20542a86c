//! # TTL Cache Layer
//!
//! ## Purpose
//! Generic get-or-compute-with-expiry cells backing every cache tier in the
//! system, plus the [`CacheManager`] that owns all tiers. The manager is
//! constructed once at startup and passed by reference to every component;
//! there are no ambient singletons.
//!
//! ## Input/Output Specification
//! - **Input**: Cache keys, TTLs, async compute closures
//! - **Output**: Cached or freshly computed values
//! - **Invariants**: a read after expiry is a miss; one entry's expiry never
//!   affects another key; concurrent recomputation of the same expired key is
//!   tolerated (no single-flight guarantee) but never corrupts other entries
//!
//! ## Key Features
//! - Injectable clock for deterministic expiry tests
//! - Lock-free reads via `dashmap`
//! - Whole-system `clear_all` reset

use crate::config::CacheConfig;
use crate::index::ArchiveIndex;
use crate::metadata::YearlyMetadataSet;
use crate::{CaseRecord, Dataset};
use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Monotonic time source for cache expiry.
///
/// Reported as elapsed time since the clock's own origin so tests can drive
/// expiry deterministically.
pub trait Clock: Send + Sync {
    fn now(&self) -> Duration;
}

/// Wall clock backed by a monotonic [`Instant`]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// Manually advanced clock for tests
pub struct ManualClock {
    now: Mutex<Duration>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            now: Mutex::new(Duration::ZERO),
        }
    }

    /// Advance the clock by `delta`
    pub fn advance(&self, delta: Duration) {
        *self.now.lock() += delta;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        *self.now.lock()
    }
}

/// One cached value with its expiry instant
struct CacheEntry<V> {
    value: V,
    expires_at: Duration,
}

/// A single TTL-bounded cache tier
pub struct TtlCache<K, V> {
    entries: DashMap<K, CacheEntry<V>>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
            clock,
        }
    }

    /// Look up a live entry; an expired entry reads as a miss
    pub fn get(&self, key: &K) -> Option<V> {
        let entry = self.entries.get(key)?;
        if self.clock.now() < entry.expires_at {
            Some(entry.value.clone())
        } else {
            None
        }
    }

    /// Insert a value, stamping it with the tier TTL
    pub fn insert(&self, key: K, value: V) {
        let expires_at = self.clock.now() + self.ttl;
        self.entries.insert(key, CacheEntry { value, expires_at });
    }

    /// Return the cached value for `key`, computing and caching it on a miss.
    ///
    /// Concurrent callers racing on the same expired key may each run the
    /// compute closure; last write wins. The map guard is never held across
    /// the await point, so a slow computation cannot block other keys.
    pub async fn get_or_compute<F, Fut>(&self, key: K, compute: F) -> V
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = V>,
    {
        if let Some(value) = self.get(&key) {
            return value;
        }

        let value = compute().await;
        self.insert(key, value.clone());
        value
    }

    /// Drop every entry in this tier
    pub fn clear(&self) {
        self.entries.clear();
    }

    /// Number of entries, live or expired
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Owner of every cache tier in the system.
///
/// Negative lookups (`None` results) are cached alongside positive ones for
/// the tier's TTL, matching the source-of-record semantics: a year that is
/// absent today stays absent until the entry expires.
pub struct CacheManager {
    /// Per-year metadata tier (TTL ~1h)
    pub metadata: TtlCache<u16, Option<Arc<YearlyMetadataSet>>>,
    /// Per-(year, language) archive index tier (TTL ~2h)
    pub index: TtlCache<(u16, String), Option<Arc<ArchiveIndex>>>,
    /// Resolved case tier keyed by (requested year, normalized case id) (TTL ~1h)
    pub case: TtlCache<(u16, String), Option<Arc<CaseRecord>>>,
    /// Long-lived combined dataset singleton; manual invalidation only
    combined: RwLock<Option<Arc<Dataset>>>,
}

impl CacheManager {
    pub fn new(config: &CacheConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            metadata: TtlCache::new(
                Duration::from_secs(config.metadata_ttl_seconds),
                clock.clone(),
            ),
            index: TtlCache::new(Duration::from_secs(config.index_ttl_seconds), clock.clone()),
            case: TtlCache::new(Duration::from_secs(config.case_ttl_seconds), clock),
            combined: RwLock::new(None),
        }
    }

    /// The materialized combined dataset, if one has been built this process
    pub fn combined(&self) -> Option<Arc<Dataset>> {
        self.combined.read().clone()
    }

    /// Replace the combined dataset singleton
    pub fn set_combined(&self, dataset: Arc<Dataset>) {
        *self.combined.write() = Some(dataset);
    }

    /// Reset every tier, including the combined dataset singleton
    pub fn clear_all(&self) {
        self.metadata.clear();
        self.index.clear();
        self.case.clear();
        *self.combined.write() = None;
        tracing::info!("All cache tiers cleared");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn manual_cache(ttl_secs: u64) -> (TtlCache<String, u32>, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new());
        let cache = TtlCache::new(Duration::from_secs(ttl_secs), clock.clone());
        (cache, clock)
    }

    #[tokio::test]
    async fn test_computes_once_within_ttl() {
        let (cache, _clock) = manual_cache(60);
        let calls = AtomicUsize::new(0);

        for _ in 0..3 {
            let value = cache
                .get_or_compute("k".to_string(), || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    7u32
                })
                .await;
            assert_eq!(value, 7);
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_expiry_triggers_exactly_one_recompute() {
        let (cache, clock) = manual_cache(60);
        let calls = AtomicUsize::new(0);
        let compute = || {
            calls.fetch_add(1, Ordering::SeqCst);
            1u32
        };

        cache.get_or_compute("k".to_string(), || async { compute() }).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        // Just before expiry: still a hit
        clock.advance(Duration::from_secs(59));
        cache.get_or_compute("k".to_string(), || async { compute() }).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        // Past expiry: exactly one recomputation
        clock.advance(Duration::from_secs(2));
        cache.get_or_compute("k".to_string(), || async { compute() }).await;
        cache.get_or_compute("k".to_string(), || async { compute() }).await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_no_cross_key_interference() {
        let (cache, clock) = manual_cache(10);

        cache.insert("old".to_string(), 1);
        clock.advance(Duration::from_secs(8));
        cache.insert("new".to_string(), 2);
        clock.advance(Duration::from_secs(4));

        // "old" expired at t=10, "new" lives until t=18
        assert_eq!(cache.get(&"old".to_string()), None);
        assert_eq!(cache.get(&"new".to_string()), Some(2));
    }

    #[test]
    fn test_clear_resets_tier() {
        let (cache, _clock) = manual_cache(60);
        cache.insert("a".to_string(), 1);
        cache.insert("b".to_string(), 2);
        assert_eq!(cache.len(), 2);

        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.get(&"a".to_string()), None);
    }

    #[test]
    fn test_clear_all_drops_combined_singleton() {
        let manager = CacheManager::new(
            &crate::config::CacheConfig {
                metadata_ttl_seconds: 3600,
                index_ttl_seconds: 7200,
                case_ttl_seconds: 3600,
            },
            Arc::new(SystemClock::new()),
        );

        manager.set_combined(Arc::new(Dataset::from_rows(Vec::new())));
        assert!(manager.combined().is_some());

        manager.clear_all();
        assert!(manager.combined().is_none());
    }
}
