// In-memory cache with a TTL per entry. A lookup that found nothing upstream is
// stored as `Cached::Absent`, which is different from having no entry at all.
use moka::Expiry;
use moka::sync::Cache;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;

#[derive(Clone, Debug, PartialEq)]
pub enum Cached<V> {
    Present(V),
    Absent,
}

impl<V> Cached<V> {
    pub fn as_present(&self) -> Option<&V> {
        match self {
            Cached::Present(value) => Some(value),
            Cached::Absent => None,
        }
    }
}

#[derive(Clone)]
struct Entry<V> {
    value: Cached<V>,
    ttl: Duration,
}

struct EntryTtl;

impl<V> Expiry<String, Entry<V>> for EntryTtl {
    fn expire_after_create(
        &self,
        _key: &String,
        entry: &Entry<V>,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(entry.ttl)
    }

    // Overwriting an entry restarts its TTL.
    fn expire_after_update(
        &self,
        _key: &String,
        entry: &Entry<V>,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(entry.ttl)
    }
}

#[derive(Clone)]
pub struct TtlCache<V> {
    cache: Cache<String, Entry<V>>,
}

impl<V> TtlCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    pub fn new(max_capacity: u64) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_capacity)
            .expire_after(EntryTtl)
            .build();

        TtlCache { cache }
    }

    /// `None` if the key was never stored or its entry has expired.
    pub fn get(&self, key: &str) -> Option<Cached<V>> {
        self.cache.get(key).map(|entry| entry.value)
    }

    pub fn set(&self, key: &str, value: Cached<V>, ttl: Duration) {
        self.cache.insert(key.to_string(), Entry { value, ttl });
    }

    pub fn delete(&self, key: &str) {
        self.cache.invalidate(key);
    }

    /// Drops expired entries. Reads never return expired entries, this only
    /// releases their memory.
    pub fn evict_expired(&self) {
        self.cache.run_pending_tasks();
    }

    pub fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }

    /// Runs `evict_expired` every `interval` until the returned task is aborted.
    pub fn spawn_eviction(&self, interval: Duration) -> JoinHandle<()> {
        let cache = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // The first tick completes immediately
            ticker.tick().await;
            loop {
                ticker.tick().await;
                cache.evict_expired();
                tracing::debug!(entries = cache.entry_count(), "Evicted expired cache entries");
            }
        })
    }
}
