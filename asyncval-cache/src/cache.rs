//! The cache engine: concurrent get-or-add plus the maintenance pass.

use std::cmp::Reverse;
use std::future::Future;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dashmap::mapref::entry::Entry as MapEntry;
use dashmap::DashMap;
use parking_lot::Mutex;
use tracing::{debug, instrument, trace};

use asyncval_core::{CacheConfig, CacheError, CacheStats, ExpirationHandler};

use crate::entry::Entry;
use crate::time::Instant;
use crate::timer::ExpirationTimer;

/// In-process memoizing cache for asynchronously produced values.
///
/// Every key maps to a single [`Entry`] whose producer runs at most once, no matter
/// how many callers race on it. Entries leave the map only through
/// [`handle_expiration`](Self::handle_expiration) or [`clear`](Self::clear): an entry
/// past its TTL is still served until a maintenance pass sweeps it, and the entry
/// count may exceed `max_items` in between passes.
///
/// Failures are memoized like values. A key whose producer failed keeps returning
/// that failure until the entry expires or is evicted.
///
/// # Thread Safety
///
/// All operations take `&self` and can be called concurrently.
pub struct AsyncValueCache<K, V, E> {
    entries: DashMap<K, Arc<Entry<K, V, E>>>,
    config: CacheConfig,
    default_expiration: Duration,
    hits: AtomicU64,
    misses: AtomicU64,
    expirations: AtomicU64,
    evictions: AtomicU64,
    timer: Mutex<Option<ExpirationTimer>>,
}

impl<K, V, E> AsyncValueCache<K, V, E>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    /// Creates a new cache with default configuration.
    pub fn new() -> Self {
        Self::build(CacheConfig::default())
    }

    /// Creates a cache with custom configuration.
    ///
    /// The maintenance interval is ignored here; use [`shared`](Self::shared) to get
    /// a cache that sweeps itself.
    pub fn with_config(config: CacheConfig) -> asyncval_core::Result<Self> {
        config.validate()?;
        Ok(Self::build(config))
    }

    /// Creates a reference-counted cache, starting the expiration timer if the
    /// configuration asks for one.
    pub fn shared(config: CacheConfig) -> asyncval_core::Result<Arc<Self>> {
        let interval = config.maintenance_interval();
        let cache = Arc::new(Self::with_config(config)?);
        if let Some(interval) = interval {
            cache.start_expiration_timer(interval)?;
        }
        Ok(cache)
    }

    fn build(config: CacheConfig) -> Self {
        Self {
            entries: DashMap::with_capacity(config.max_items),
            default_expiration: config.default_expiration(),
            config,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            expirations: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
            timer: Mutex::new(None),
        }
    }

    /// Returns the configuration the cache was built with.
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Returns the value for `key`, computing it with `producer` if no entry exists.
    ///
    /// New entries use the cache-wide default TTL.
    pub async fn get_or_add<F, Fut>(&self, key: K, producer: F) -> Result<V, E>
    where
        F: FnOnce(K) -> Fut + Send + 'static,
        Fut: Future<Output = Result<V, E>> + Send + 'static,
    {
        self.resolve(key, producer, self.default_expiration).await
    }

    /// Like [`get_or_add`](Self::get_or_add), but a newly created entry expires
    /// `ttl` after creation. An existing entry keeps its own expiration.
    pub async fn get_or_add_with_ttl<F, Fut>(&self, key: K, producer: F, ttl: Duration) -> Result<V, E>
    where
        F: FnOnce(K) -> Fut + Send + 'static,
        Fut: Future<Output = Result<V, E>> + Send + 'static,
    {
        self.resolve(key, producer, ttl).await
    }

    async fn resolve<F, Fut>(&self, key: K, producer: F, ttl: Duration) -> Result<V, E>
    where
        F: FnOnce(K) -> Fut + Send + 'static,
        Fut: Future<Output = Result<V, E>> + Send + 'static,
    {
        let entry = self.get_or_install(key, producer, ttl);

        // Dropping this future leaves the shared computation intact for other callers.
        let result = entry.deferred().await;
        if result.is_ok() {
            entry.touch(Instant::now());
        }
        result
    }

    /// Finds the live entry for `key`, or installs a fresh one.
    ///
    /// The vacant-check and the insert happen under the shard lock, so racing
    /// callers all end up holding the same entry.
    fn get_or_install<F, Fut>(&self, key: K, producer: F, ttl: Duration) -> Arc<Entry<K, V, E>>
    where
        F: FnOnce(K) -> Fut + Send + 'static,
        Fut: Future<Output = Result<V, E>> + Send + 'static,
    {
        if let Some(existing) = self.entries.get(&key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Arc::clone(existing.value());
        }

        match self.entries.entry(key) {
            MapEntry::Occupied(occupied) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Arc::clone(occupied.get())
            }
            MapEntry::Vacant(vacant) => {
                let entry = Arc::new(Entry::new(
                    vacant.key().clone(),
                    producer,
                    ttl,
                    Instant::now(),
                ));
                vacant.insert(Arc::clone(&entry));
                self.misses.fetch_add(1, Ordering::Relaxed);
                trace!(?ttl, "installed cache entry");
                entry
            }
        }
    }

    /// Runs one maintenance pass.
    ///
    /// First removes every entry whose expiration is at or before now, then, if more
    /// than `max_items` entries remain, removes the least recently accessed ones
    /// until `max_items` are left. Both phases work from a snapshot taken when the
    /// pass starts; entries inserted meanwhile may or may not be considered.
    #[instrument(skip_all, fields(max_items = self.config.max_items))]
    pub fn handle_expiration(&self) {
        let now = Instant::now();
        let snapshot = self.entries();

        let (expired, mut live): (Vec<_>, Vec<_>) =
            snapshot.into_iter().partition(|entry| entry.is_expired_at(now));

        let expired_count = expired.iter().filter(|entry| self.remove_entry(entry)).count();

        let mut evicted_count = 0;
        if live.len() > self.config.max_items {
            live.sort_by_cached_key(|entry| Reverse(entry.last_accessed()));
            evicted_count = live[self.config.max_items..]
                .iter()
                .filter(|entry| self.remove_entry(entry))
                .count();
        }

        self.expirations.fetch_add(expired_count as u64, Ordering::Relaxed);
        self.evictions.fetch_add(evicted_count as u64, Ordering::Relaxed);

        debug!(
            expired = expired_count,
            evicted = evicted_count,
            remaining = self.entries.len(),
            "Maintenance pass complete"
        );
    }

    /// Removes `entry` only if it is still the one installed under its key.
    fn remove_entry(&self, entry: &Arc<Entry<K, V, E>>) -> bool {
        self.entries
            .remove_if(entry.key(), |_, current| Arc::ptr_eq(current, entry))
            .is_some()
    }

    /// Returns the entry for `key` without computing anything or recording an access.
    pub fn get(&self, key: &K) -> Option<Arc<Entry<K, V, E>>> {
        self.entries.get(key).map(|entry| Arc::clone(entry.value()))
    }

    /// Returns true if an entry is installed for `key`, expired or not.
    pub fn contains_key(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    /// Returns a snapshot of all installed entries.
    pub fn entries(&self) -> Vec<Arc<Entry<K, V, E>>> {
        self.entries
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect()
    }

    /// Returns a snapshot of all installed keys.
    pub fn keys(&self) -> Vec<K> {
        self.entries.iter().map(|entry| entry.key().clone()).collect()
    }

    /// Returns the number of installed entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Removes all entries.
    pub fn clear(&self) {
        self.entries.clear();
    }

    /// Returns cache statistics.
    pub fn stats(&self) -> CacheStats {
        let now = Instant::now();
        let snapshot = self.entries();
        let expired = snapshot.iter().filter(|entry| entry.is_expired_at(now)).count();

        CacheStats {
            total_entries: snapshot.len(),
            expired_entries: expired,
            valid_entries: snapshot.len().saturating_sub(expired),
            capacity: self.config.max_items,
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            expirations: self.expirations.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
        }
    }

    /// Starts running [`handle_expiration`](Self::handle_expiration) every `interval`.
    ///
    /// The timer only holds a weak reference, so it stops by itself once the last
    /// `Arc` to the cache is dropped.
    pub fn start_expiration_timer(self: &Arc<Self>, interval: Duration) -> asyncval_core::Result<()> {
        let mut slot = self.timer.lock();
        if slot.is_some() {
            return Err(CacheError::TimerAlreadyRunning);
        }
        *slot = Some(ExpirationTimer::start(Arc::downgrade(self), interval)?);
        Ok(())
    }

    /// Stops the expiration timer. Returns false if none was running.
    pub fn stop_expiration_timer(&self) -> bool {
        match self.timer.lock().take() {
            Some(timer) => {
                timer.stop();
                true
            }
            None => false,
        }
    }

    /// Returns true if an expiration timer is attached.
    pub fn has_expiration_timer(&self) -> bool {
        self.timer.lock().is_some()
    }

    /// Releases the expiration timer, if any.
    ///
    /// In-flight computations are left alone; callers awaiting them still get
    /// their values.
    pub fn dispose(&self) {
        if self.stop_expiration_timer() {
            debug!("Cache disposed; expiration timer stopped");
        }
    }
}

impl<K, V, E> Default for AsyncValueCache<K, V, E>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, E> ExpirationHandler for AsyncValueCache<K, V, E>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    fn handle_expiration(&self) {
        AsyncValueCache::handle_expiration(self);
    }
}
