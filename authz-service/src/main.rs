use std::sync::Arc;

use authz_service::cache::{CacheStore, RedisCache};
use authz_service::config::AuthzConfig;
use authz_service::db;
use authz_service::services::{
    CacheWarmingService, DirectoryCache, EntitlementResolver, GroupService,
    HttpSchemaSyncClient, InvalidationCoordinator, NullSchemaSyncClient, OrganizationService,
    PgAuditSink, RoleService, SchemaSyncClient,
};
use authz_service::store::{DirectoryStore, PgDirectoryStore};
use authz_service::AppState;
use service_core::error::AppError;
use service_core::observability::logging::init_tracing;
use tokio::signal;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let config = AuthzConfig::from_env()?;

    init_tracing(&config.service_name, &config.log_level);

    tracing::info!(
        service = %config.service_name,
        version = %config.service_version,
        environment = ?config.environment,
        "Starting authorization service"
    );

    let pool = db::create_pool(&config.database)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))?;
    db::run_migrations(&pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))?;
    tracing::info!("Database initialized");

    let store: Arc<dyn DirectoryStore> = Arc::new(PgDirectoryStore::new(pool.clone()));
    let cache: Arc<dyn CacheStore> = Arc::new(RedisCache::new(&config.redis).await?);
    tracing::info!("Redis cache initialized");

    let directory_cache = DirectoryCache::new(cache.clone());
    let invalidation = Arc::new(InvalidationCoordinator::new(directory_cache.clone()));
    let audit = Arc::new(PgAuditSink::new(pool));

    let schema_sync: Arc<dyn SchemaSyncClient> = if config.schema_sync.enabled {
        Arc::new(HttpSchemaSyncClient::new(&config.schema_sync))
    } else {
        tracing::info!("Schema sync disabled, vocabulary pushes are dropped");
        Arc::new(NullSchemaSyncClient)
    };

    let organizations = OrganizationService::new(
        store.clone(),
        directory_cache.clone(),
        audit.clone(),
        invalidation.clone(),
    );
    let groups = GroupService::new(
        store.clone(),
        directory_cache.clone(),
        audit.clone(),
        invalidation.clone(),
    );
    let roles = RoleService::new(
        store.clone(),
        directory_cache.clone(),
        audit,
        invalidation.clone(),
        schema_sync,
    );
    let resolver = EntitlementResolver::new(store.clone(), directory_cache.clone());

    let warming = Arc::new(CacheWarmingService::new(
        &config.warming,
        organizations.clone(),
        resolver.clone(),
    ));
    if config.warming.enabled {
        warming.start();
        tracing::info!(
            interval_seconds = config.warming.interval_seconds,
            "Cache warming started"
        );
    }

    // Push the vocabulary once at startup so the schema engine starts from
    // the current state.
    roles.sync_vocabulary().await;

    let state = AppState {
        store,
        cache,
        directory_cache,
        invalidation,
        organizations,
        groups,
        roles,
        resolver,
        warming: warming.clone(),
    };

    authz_service::health_check(&state).await?;
    tracing::info!(port = config.common.port, "Authorization service ready");

    signal::ctrl_c().await?;
    tracing::info!("Shutdown signal received");

    warming.stop();
    tracing::info!("Authorization service stopped");
    Ok(())
}
