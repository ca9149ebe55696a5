//! Bounded memo table for join results.
//!
//! Entries are keyed by `(metric, sorted distinct experiment ids)` and
//! evicted first-in-first-out by insertion order once the capacity is
//! exceeded. Reads do not refresh an entry's position. The cache belongs to
//! exactly one [`Dataset`]; call [`ResultCache::clear`] whenever the dataset
//! is replaced. A build that was already running when `clear` was called
//! returns its rows to its caller but does not store them.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use dashmap::DashMap;
use tracing::debug;

use super::{build_join, JoinRow};
use crate::experiment::Dataset;

/// Default maximum number of cached join results
pub const DEFAULT_CACHE_CAPACITY: usize = 100;

/// Cache key: metric plus the requested experiments as a sorted set.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    metric: String,
    experiments: Vec<String>,
}

impl CacheKey {
    /// Build a key; experiment order and repeats do not matter.
    #[must_use]
    pub fn new<S: AsRef<str>>(metric_name: &str, experiment_ids: &[S]) -> Self {
        let mut experiments: Vec<String> = experiment_ids
            .iter()
            .map(|id| id.as_ref().to_string())
            .collect();
        experiments.sort();
        experiments.dedup();
        Self {
            metric: metric_name.to_string(),
            experiments,
        }
    }

    /// Metric name.
    #[must_use]
    pub fn metric(&self) -> &str {
        &self.metric
    }

    /// Sorted, distinct experiment IDs.
    #[must_use]
    pub fn experiments(&self) -> &[String] {
        &self.experiments
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.metric, self.experiments.join(","))
    }
}

/// Insertion order plus the number of clears so far.
#[derive(Debug)]
struct Order {
    keys: VecDeque<CacheKey>,
    generation: u64,
}

/// FIFO-bounded join result cache.
///
/// Thread-safe: lookups go through a concurrent map, while insertion,
/// eviction and clearing are serialized on the insertion-order queue.
///
/// # Example
///
/// ```rust
/// use trueno_metrics::experiment::{normalize, RawRecord};
/// use trueno_metrics::join::ResultCache;
///
/// let dataset = normalize(&[RawRecord::new("exp1", "loss", 0.0, 1.0)]);
/// let cache = ResultCache::new(100);
///
/// let rows = cache.get_or_build(&dataset, &["exp1"], "loss");
/// assert_eq!(rows.len(), 1);
/// assert_eq!(cache.len(), 1);
///
/// cache.clear();
/// assert!(cache.is_empty());
/// ```
#[derive(Debug)]
pub struct ResultCache {
    entries: DashMap<CacheKey, Arc<[JoinRow]>>,
    order: Mutex<Order>,
    capacity: usize,
}

impl ResultCache {
    /// Create a cache holding at most `capacity` entries (minimum one).
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: DashMap::with_capacity(capacity + 1),
            order: Mutex::new(Order {
                keys: VecDeque::with_capacity(capacity + 1),
                generation: 0,
            }),
            capacity,
        }
    }

    /// Maximum number of entries.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of cached entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the cache is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Check if a key is cached.
    #[must_use]
    pub fn contains(&self, key: &CacheKey) -> bool {
        self.entries.contains_key(key)
    }

    /// Cached rows for a key, if present. Does not affect eviction order.
    #[must_use]
    pub fn get(&self, key: &CacheKey) -> Option<Arc<[JoinRow]>> {
        self.entries.get(key).map(|entry| Arc::clone(entry.value()))
    }

    /// Return cached rows for the request, building and storing them on a miss.
    ///
    /// An empty experiment list returns no rows and is not cached.
    pub fn get_or_build<S: AsRef<str>>(
        &self,
        dataset: &Dataset,
        experiment_ids: &[S],
        metric_name: &str,
    ) -> Arc<[JoinRow]> {
        if experiment_ids.is_empty() {
            return Arc::from(Vec::new());
        }

        let key = CacheKey::new(metric_name, experiment_ids);
        let generation = self.generation();
        if let Some(rows) = self.get(&key) {
            debug!(%key, "join cache hit");
            return rows;
        }

        debug!(%key, "join cache miss");
        let rows: Arc<[JoinRow]> = build_join(dataset, experiment_ids, metric_name).into();
        self.insert_for_generation(key, rows, generation)
    }

    /// Store rows under a key, evicting the oldest insertions over capacity.
    ///
    /// If the key is already present the existing rows are kept and returned.
    pub fn insert(&self, key: CacheKey, rows: Arc<[JoinRow]>) -> Arc<[JoinRow]> {
        let generation = self.generation();
        self.insert_for_generation(key, rows, generation)
    }

    /// Store rows built while the cache was at `generation`.
    ///
    /// Rows are handed back unstored if [`ResultCache::clear`] ran since.
    fn insert_for_generation(
        &self,
        key: CacheKey,
        rows: Arc<[JoinRow]>,
        generation: u64,
    ) -> Arc<[JoinRow]> {
        let mut order = self.lock_order();
        if order.generation != generation {
            debug!(%key, "join cache cleared during build, result not stored");
            return rows;
        }
        if let Some(existing) = self.get(&key) {
            return existing;
        }

        self.entries.insert(key.clone(), Arc::clone(&rows));
        order.keys.push_back(key);

        while order.keys.len() > self.capacity {
            if let Some(oldest) = order.keys.pop_front() {
                self.entries.remove(&oldest);
                debug!(key = %oldest, "join cache evicted");
            }
        }
        rows
    }

    /// Drop every entry.
    ///
    /// Builds still in flight will not store their rows.
    pub fn clear(&self) {
        let mut order = self.lock_order();
        order.generation = order.generation.wrapping_add(1);
        order.keys.clear();
        self.entries.clear();
    }

    fn generation(&self) -> u64 {
        self.lock_order().generation
    }

    fn lock_order(&self) -> MutexGuard<'_, Order> {
        // Queue holds plain keys; a panic mid-update cannot break it.
        self.order.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for ResultCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY)
    }
}
