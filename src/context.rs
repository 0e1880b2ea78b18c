/// Application context and dependency injection
use crate::{
    config::SkinsConfig,
    db,
    error::SkinResult,
    jobs::WorkerPool,
    service::SkinService,
    skin::{DefaultSkinPool, FetchCache, SkinResolver, SkinStore, TextureFetcher},
};
use std::sync::Arc;
use tracing::info;

/// Application context holding all shared services
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<SkinsConfig>,
    pub store: SkinStore,
    pub cache: Arc<FetchCache>,
    pub resolver: SkinResolver,
    pub default_pool: Arc<DefaultSkinPool>,
    pub workers: Arc<WorkerPool>,
    pub service: Arc<SkinService>,
}

impl AppContext {
    /// Create a new application context from configuration
    pub async fn new(config: SkinsConfig) -> SkinResult<Self> {
        // Validate configuration
        config.validate()?;

        // Create data directory if it doesn't exist
        tokio::fs::create_dir_all(&config.storage.data_directory).await?;

        // Initialize users database
        let users_db =
            db::create_pool(&config.storage.users_db, db::DatabaseOptions::default()).await?;
        db::init_schema(&users_db).await?;
        db::test_connection(&users_db).await?;
        let store = SkinStore::new(users_db);

        // Initialize fetch pipeline
        let fetcher = Arc::new(TextureFetcher::new(config.endpoints.clone())?);
        let cache = FetchCache::start(config.cache.ttl(), config.cache.sweep_interval());
        let resolver = SkinResolver::new(fetcher, Arc::clone(&cache), store.clone());

        let workers = Arc::new(WorkerPool::new(config.workers.size));

        // Resolve default skins up front
        let default_pool =
            Arc::new(DefaultSkinPool::populate(&resolver, &config.default_skins).await);

        let service = Arc::new(SkinService::new(
            resolver.clone(),
            Arc::clone(&default_pool),
            Arc::clone(&workers),
        ));

        info!(
            "Skin service ready: {} workers, {} default skins",
            workers.size(),
            default_pool.len()
        );

        Ok(Self {
            config: Arc::new(config),
            store,
            cache,
            resolver,
            default_pool,
            workers,
            service,
        })
    }

    /// Drain background work, then release the store
    pub async fn shutdown(&self) {
        info!("Disabling skin service");

        let aborted = self
            .workers
            .shutdown(self.config.workers.shutdown_grace())
            .await;
        if aborted > 0 {
            info!("{} background tasks were interrupted", aborted);
        }

        self.cache.shutdown();
        self.store.close().await;

        info!("Skin service disabled");
    }
}
