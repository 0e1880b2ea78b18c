/// Skin Resolver - orchestrates identity lookup, deduplicated fetches and caching
use crate::{
    error::SkinError,
    skin::{parse_identity, FetchCache, FetchResult, Resolution, SkinStore, TextureSource},
};
use std::sync::Arc;
use tracing::{debug, error};
use uuid::Uuid;

/// Main skin resolver - combines the in-flight cache with a texture source
#[derive(Clone)]
pub struct SkinResolver {
    source: Arc<dyn TextureSource>,
    cache: Arc<FetchCache>,
    store: SkinStore,
}

impl SkinResolver {
    /// Create a new skin resolver
    pub fn new(source: Arc<dyn TextureSource>, cache: Arc<FetchCache>, store: SkinStore) -> Self {
        Self {
            source,
            cache,
            store,
        }
    }

    pub fn cache(&self) -> &Arc<FetchCache> {
        &self.cache
    }

    pub fn store(&self) -> &SkinStore {
        &self.store
    }

    /// Resolve a player name or UUID to a skin
    ///
    /// Resolution order:
    /// 1. Parse the input as a UUID, or look the name up
    /// 2. Claim the identity; if another task holds it, report `InProgress`
    /// 3. Serve a cached result if one is fresh
    /// 4. Fetch from the texture source and cache the outcome
    pub async fn resolve(&self, name_or_id: &str) -> Resolution {
        self.resolve_inner(name_or_id, false).await
    }

    /// Same as [`resolve`](Self::resolve) but hard failures only reach debug logs
    pub async fn resolve_silently(&self, name_or_id: &str) -> Resolution {
        self.resolve_inner(name_or_id, true).await
    }

    /// Look a player up in the persistent store only, never touching the network
    pub async fn resolve_from_cache_only(&self, name: &str) -> Option<FetchResult> {
        match self.store.get_by_name(name).await {
            Ok(user) => user.map(|u| u.to_fetch_result()),
            Err(e) => {
                error!("Failed to read stored skin for {}: {}", name, e);
                None
            }
        }
    }

    async fn resolve_inner(&self, name_or_id: &str, silent: bool) -> Resolution {
        let id = match parse_identity(name_or_id) {
            Some(id) => id,
            None => match self.source.resolve_identity(name_or_id).await {
                Ok(id) => id,
                Err(e) => return Self::failed(name_or_id, e, silent),
            },
        };

        self.resolve_id(id, silent).await
    }

    async fn resolve_id(&self, id: Uuid, silent: bool) -> Resolution {
        // The guard clears the working mark on every exit path
        let Some(_guard) = self.cache.claim(id) else {
            debug!("Skin fetch for {} already in progress", id);
            return Resolution::InProgress;
        };

        if let Some(cached) = self.cache.get_cached(&id) {
            debug!("Fetch cache hit for {}", id);
            return Self::finish(cached);
        }

        debug!("Fetch cache miss for {}", id);
        match self.source.fetch_texture(id).await {
            Ok(result) => {
                self.cache.put(&result);
                Self::finish(result)
            }
            Err(e) => Self::failed(&id.to_string(), e, silent),
        }
    }

    fn finish(result: FetchResult) -> Resolution {
        match result {
            FetchResult::RateLimited { id } => {
                debug!("Can not fetch skin due to rate-limit for {}", id);
                Resolution::RateLimited(id)
            }
            found => Resolution::Found(found),
        }
    }

    fn failed(input: &str, e: SkinError, silent: bool) -> Resolution {
        match e {
            SkinError::UserNotFound(_) => {
                debug!("No skin found for {}", input);
                Resolution::NotFound
            }
            SkinError::RateLimited(id) => Resolution::RateLimited(id),
            e => {
                if silent {
                    debug!("Can not fetch skin for {}: {}", input, e);
                } else {
                    error!("Can not fetch skin for {}: {}", input, e);
                }
                Resolution::TransientError
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{db, error::SkinResult, skin::TextureProperty};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::sync::Notify;

    /// Texture source with canned answers and call counters
    #[derive(Default)]
    struct FakeSource {
        identity_calls: AtomicUsize,
        texture_calls: AtomicUsize,
        rate_limited: bool,
        failing: bool,
        /// When set, texture fetches wait for a notification
        gate: Option<Arc<Notify>>,
    }

    fn notch_id() -> Uuid {
        Uuid::parse_str("069a79f4-44e9-4726-a5be-fca90e38aaf5").unwrap()
    }

    fn texture() -> TextureProperty {
        TextureProperty::new("dGV4dHVyZQ==", "c2lnbmF0dXJl")
    }

    #[async_trait]
    impl TextureSource for FakeSource {
        async fn resolve_identity(&self, name: &str) -> SkinResult<Uuid> {
            self.identity_calls.fetch_add(1, Ordering::SeqCst);
            if name.eq_ignore_ascii_case("notch") {
                Ok(notch_id())
            } else {
                Err(SkinError::UserNotFound(name.to_string()))
            }
        }

        async fn fetch_texture(&self, id: Uuid) -> SkinResult<FetchResult> {
            self.texture_calls.fetch_add(1, Ordering::SeqCst);
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            if self.failing {
                return Err(SkinError::MalformedResponse("boom".to_string()));
            }
            if self.rate_limited {
                return Ok(FetchResult::RateLimited { id });
            }
            Ok(FetchResult::skin(id, texture()))
        }
    }

    async fn create_test_resolver(source: Arc<FakeSource>) -> SkinResolver {
        let store = SkinStore::new(db::memory_pool().await);
        let cache = Arc::new(FetchCache::new(Duration::from_secs(60)));
        SkinResolver::new(source, cache, store)
    }

    #[tokio::test]
    async fn test_resolve_by_name() {
        let source = Arc::new(FakeSource::default());
        let resolver = create_test_resolver(source.clone()).await;

        let resolution = resolver.resolve("Notch").await;

        assert_eq!(resolution, Resolution::Found(FetchResult::skin(notch_id(), texture())));
        assert!(resolver.cache().get_cached(&notch_id()).is_some());
        assert!(!resolver.cache().is_working(&notch_id()));
    }

    #[tokio::test]
    async fn test_uuid_input_skips_identity_lookup() {
        let source = Arc::new(FakeSource::default());
        let resolver = create_test_resolver(source.clone()).await;

        let resolution = resolver.resolve(&notch_id().to_string()).await;

        assert!(resolution.found().is_some());
        assert_eq!(source.identity_calls.load(Ordering::SeqCst), 0);
        assert_eq!(source.texture_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_cache_hit_skips_fetch() {
        let source = Arc::new(FakeSource::default());
        let resolver = create_test_resolver(source.clone()).await;

        resolver.resolve("Notch").await;
        resolver.resolve("Notch").await;

        assert_eq!(source.texture_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_unknown_name_is_not_found() {
        let source = Arc::new(FakeSource::default());
        let resolver = create_test_resolver(source.clone()).await;

        assert_eq!(resolver.resolve("Nobody").await, Resolution::NotFound);
        assert_eq!(source.texture_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_concurrent_requests_fetch_once() {
        let gate = Arc::new(Notify::new());
        let source = Arc::new(FakeSource {
            gate: Some(gate.clone()),
            ..FakeSource::default()
        });
        let resolver = create_test_resolver(source.clone()).await;

        let first = {
            let resolver = resolver.clone();
            tokio::spawn(async move { resolver.resolve("Notch").await })
        };

        // Wait until the first request holds the identity
        while !resolver.cache().is_working(&notch_id()) {
            tokio::task::yield_now().await;
        }

        let second = resolver.resolve("Notch").await;
        assert_eq!(second, Resolution::InProgress);

        gate.notify_one();
        let first = first.await.unwrap();

        assert!(first.found().is_some());
        assert_eq!(source.texture_calls.load(Ordering::SeqCst), 1);
        assert!(!resolver.cache().is_working(&notch_id()));
    }

    #[tokio::test]
    async fn test_failure_releases_working_mark() {
        let source = Arc::new(FakeSource {
            failing: true,
            ..FakeSource::default()
        });
        let resolver = create_test_resolver(source.clone()).await;

        assert_eq!(resolver.resolve("Notch").await, Resolution::TransientError);
        assert!(!resolver.cache().is_working(&notch_id()));
        assert!(resolver.cache().is_empty());

        // A second attempt fetches again instead of reporting InProgress
        assert_eq!(resolver.resolve_silently("Notch").await, Resolution::TransientError);
        assert_eq!(source.texture_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_cancelled_request_releases_working_mark() {
        let gate = Arc::new(Notify::new());
        let source = Arc::new(FakeSource {
            gate: Some(gate),
            ..FakeSource::default()
        });
        let resolver = create_test_resolver(source).await;

        let pending = {
            let resolver = resolver.clone();
            tokio::spawn(async move { resolver.resolve("Notch").await })
        };
        while !resolver.cache().is_working(&notch_id()) {
            tokio::task::yield_now().await;
        }

        pending.abort();
        let _ = pending.await;

        assert!(!resolver.cache().is_working(&notch_id()));
    }

    #[tokio::test]
    async fn test_rate_limited_sentinel_is_not_cached() {
        let source = Arc::new(FakeSource {
            rate_limited: true,
            ..FakeSource::default()
        });
        let resolver = create_test_resolver(source.clone()).await;

        assert_eq!(resolver.resolve("Notch").await, Resolution::RateLimited(notch_id()));
        assert!(resolver.cache().get_cached(&notch_id()).is_none());
    }

    #[tokio::test]
    async fn test_resolve_from_cache_only() {
        let source = Arc::new(FakeSource::default());
        let resolver = create_test_resolver(source.clone()).await;
        let stored = FetchResult::skin(Uuid::new_v4(), texture());
        resolver.store().upsert("Steve", &stored).await.unwrap();

        assert_eq!(resolver.resolve_from_cache_only("steve").await, Some(stored));
        assert_eq!(resolver.resolve_from_cache_only("Alex").await, None);
        assert_eq!(source.identity_calls.load(Ordering::SeqCst), 0);
        assert_eq!(source.texture_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_resolve_from_cache_only_with_closed_store() {
        let source = Arc::new(FakeSource::default());
        let resolver = create_test_resolver(source).await;
        resolver.store().close().await;

        assert_eq!(resolver.resolve_from_cache_only("Steve").await, None);
    }
}
