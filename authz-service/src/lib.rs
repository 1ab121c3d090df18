pub mod cache;
pub mod config;
pub mod db;
pub mod models;
pub mod services;
pub mod store;

use std::sync::Arc;

use crate::cache::CacheStore;
use crate::services::{
    CacheWarmingService, DirectoryCache, EntitlementResolver, GroupService,
    InvalidationCoordinator, OrganizationService, RoleService,
};
use crate::store::DirectoryStore;
use service_core::error::AppError;

/// Wired service graph shared by the binary and integration tests.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn DirectoryStore>,
    pub cache: Arc<dyn CacheStore>,
    pub directory_cache: DirectoryCache,
    pub invalidation: Arc<InvalidationCoordinator>,
    pub organizations: OrganizationService,
    pub groups: GroupService,
    pub roles: RoleService,
    pub resolver: EntitlementResolver,
    pub warming: Arc<CacheWarmingService>,
}

/// Liveness check against both backing stores.
pub async fn health_check(state: &AppState) -> Result<(), AppError> {
    state
        .store
        .health_check()
        .await
        .map_err(AppError::DatabaseError)?;
    state
        .cache
        .health_check()
        .await
        .map_err(AppError::InternalError)?;
    Ok(())
}
