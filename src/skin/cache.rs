/// Fetch Cache - in-flight deduplication and short-lived result cache
use crate::skin::FetchResult;
use dashmap::{DashMap, DashSet};
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant};
use tracing::debug;
use uuid::Uuid;

/// Delay before the first sweep
const SWEEP_INITIAL_DELAY: Duration = Duration::from_millis(5);

struct CacheEntry {
    result: FetchResult,
    written_at: Instant,
}

impl CacheEntry {
    fn is_fresh(&self, ttl: Duration) -> bool {
        self.written_at.elapsed() < ttl
    }
}

/// Identities currently being fetched, plus completed results kept for `ttl`
pub struct FetchCache {
    working: DashSet<Uuid>,
    entries: DashMap<Uuid, CacheEntry>,
    ttl: Duration,
    sweeper: Mutex<Option<JoinHandle<()>>>,
}

impl FetchCache {
    /// Create a cache without a background sweep
    pub fn new(ttl: Duration) -> Self {
        Self {
            working: DashSet::new(),
            entries: DashMap::new(),
            ttl,
            sweeper: Mutex::new(None),
        }
    }

    /// Create a cache and start its periodic sweep on the current runtime
    pub fn start(ttl: Duration, sweep_interval: Duration) -> Arc<Self> {
        let cache = Arc::new(Self::new(ttl));
        let handle = spawn_sweeper(Arc::downgrade(&cache), sweep_interval);
        if let Ok(mut sweeper) = cache.sweeper.lock() {
            *sweeper = Some(handle);
        }
        cache
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn is_working(&self, id: &Uuid) -> bool {
        self.working.contains(id)
    }

    pub fn mark_working(&self, id: Uuid) {
        self.working.insert(id);
    }

    pub fn clear_working(&self, id: &Uuid) {
        self.working.remove(id);
    }

    /// Check-and-mark in one step. Returns false if the id was already marked.
    pub fn try_mark_working(&self, id: Uuid) -> bool {
        self.working.insert(id)
    }

    /// Mark `id` as working for as long as the returned guard lives
    pub fn claim(&self, id: Uuid) -> Option<WorkingGuard<'_>> {
        if self.try_mark_working(id) {
            Some(WorkingGuard { cache: self, id })
        } else {
            None
        }
    }

    /// Get a cached result, if it was written less than `ttl` ago
    pub fn get_cached(&self, id: &Uuid) -> Option<FetchResult> {
        let expired = match self.entries.get(id) {
            Some(entry) if entry.is_fresh(self.ttl) => return Some(entry.result.clone()),
            Some(_) => true,
            None => false,
        };

        if expired {
            self.entries.remove_if(id, |_, entry| !entry.is_fresh(self.ttl));
        }
        None
    }

    /// Cache `result` under its identity. Results without an identity or
    /// texture are ignored; returns whether the result was stored.
    pub fn put(&self, result: &FetchResult) -> bool {
        if !result.is_cacheable() {
            return false;
        }
        let Some(id) = result.id() else {
            return false;
        };

        self.entries.insert(
            id,
            CacheEntry {
                result: result.clone(),
                written_at: Instant::now(),
            },
        );
        true
    }

    /// Drop every expired entry, returning how many were removed
    pub fn purge_expired(&self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.is_fresh(self.ttl));
        before.saturating_sub(self.entries.len())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Stop the background sweep
    pub fn shutdown(&self) {
        if let Ok(mut sweeper) = self.sweeper.lock() {
            if let Some(handle) = sweeper.take() {
                handle.abort();
            }
        }
    }
}

impl Drop for FetchCache {
    fn drop(&mut self) {
        if let Ok(sweeper) = self.sweeper.get_mut() {
            if let Some(handle) = sweeper.take() {
                handle.abort();
            }
        }
    }
}

/// Clears the working mark of an identity when dropped
pub struct WorkingGuard<'a> {
    cache: &'a FetchCache,
    id: Uuid,
}

impl WorkingGuard<'_> {
    pub fn id(&self) -> Uuid {
        self.id
    }
}

impl Drop for WorkingGuard<'_> {
    fn drop(&mut self) {
        self.cache.clear_working(&self.id);
    }
}

fn spawn_sweeper(cache: Weak<FetchCache>, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval_at(Instant::now() + SWEEP_INITIAL_DELAY, period);

        loop {
            ticker.tick().await;

            let Some(cache) = cache.upgrade() else {
                break;
            };
            let purged = cache.purge_expired();
            if purged > 0 {
                debug!("Fetch cache sweep removed {} expired entries", purged);
            }
        }
    })
}
