//! Periodic cache warming for hot organizations and users.
//!
//! Warming is read-through: each pass resolves the registered views, which
//! repopulates their cache entries. Individual failures are logged and
//! counted without stopping the pass.

use futures::future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::config::WarmingConfig;

use super::organization::OrganizationService;
use super::resolver::EntitlementResolver;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WarmTarget {
    Organization(Uuid),
    User { org_id: Uuid, user_id: Uuid },
}

#[derive(Debug, Clone, Copy, Default)]
pub struct WarmingReport {
    pub warmed: usize,
    pub failed: usize,
}

pub struct CacheWarmingService {
    orgs: OrganizationService,
    resolver: EntitlementResolver,
    interval: Duration,
    max_concurrent: usize,
    warm_hierarchies: bool,
    warm_stats: bool,
    warm_effective_roles: bool,
    targets: Mutex<Vec<WarmTarget>>,
    running: AtomicBool,
    cancel: CancellationToken,
}

impl CacheWarmingService {
    pub fn new(
        config: &WarmingConfig,
        orgs: OrganizationService,
        resolver: EntitlementResolver,
    ) -> Self {
        let mut targets: Vec<WarmTarget> = config
            .organizations
            .iter()
            .map(|&org_id| WarmTarget::Organization(org_id))
            .collect();
        targets.extend(
            config
                .users
                .iter()
                .map(|&(org_id, user_id)| WarmTarget::User { org_id, user_id }),
        );

        Self {
            orgs,
            resolver,
            interval: Duration::from_secs(config.interval_seconds),
            max_concurrent: config.max_concurrent_warms,
            warm_hierarchies: config.warm_hierarchies,
            warm_stats: config.warm_stats,
            warm_effective_roles: config.warm_effective_roles,
            targets: Mutex::new(targets),
            running: AtomicBool::new(false),
            cancel: CancellationToken::new(),
        }
    }

    pub fn register_organization(&self, org_id: Uuid) {
        if let Ok(mut targets) = self.targets.lock() {
            let target = WarmTarget::Organization(org_id);
            if !targets.contains(&target) {
                targets.push(target);
            }
        }
    }

    pub fn register_user(&self, org_id: Uuid, user_id: Uuid) {
        if let Ok(mut targets) = self.targets.lock() {
            let target = WarmTarget::User { org_id, user_id };
            if !targets.contains(&target) {
                targets.push(target);
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Spawn the background warming loop. A second call while running is a
    /// no-op.
    pub fn start(self: &Arc<Self>) {
        if self.running.swap(true, Ordering::SeqCst) {
            return;
        }

        let service = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(service.interval);
            // The first tick fires immediately; warm on startup.
            loop {
                tokio::select! {
                    _ = service.cancel.cancelled() => {
                        tracing::info!("Cache warming loop stopped");
                        break;
                    }
                    _ = ticker.tick() => {
                        let report = service.warm_now().await;
                        tracing::debug!(
                            warmed = report.warmed,
                            failed = report.failed,
                            "Cache warming pass finished"
                        );
                    }
                }
            }
            service.running.store(false, Ordering::SeqCst);
        });
    }

    pub fn stop(&self) {
        self.cancel.cancel();
    }

    /// Run one warming pass over the registered targets, bounded by the
    /// configured concurrency.
    pub async fn warm_now(self: &Arc<Self>) -> WarmingReport {
        let targets: Vec<WarmTarget> = match self.targets.lock() {
            Ok(targets) => targets.clone(),
            Err(_) => return WarmingReport::default(),
        };

        let semaphore = Arc::new(Semaphore::new(self.max_concurrent.max(1)));
        let handles: Vec<_> = targets
            .into_iter()
            .map(|target| {
                let service = self.clone();
                let semaphore = semaphore.clone();
                tokio::spawn(async move {
                    let Ok(_permit) = semaphore.acquire().await else {
                        return false;
                    };
                    service.warm_target(target).await
                })
            })
            .collect();

        let mut report = WarmingReport::default();
        for outcome in future::join_all(handles).await {
            match outcome {
                Ok(true) => report.warmed += 1,
                _ => report.failed += 1,
            }
        }
        report
    }

    async fn warm_target(&self, target: WarmTarget) -> bool {
        match target {
            WarmTarget::Organization(org_id) => {
                let mut ok = true;
                if self.warm_hierarchies {
                    if let Err(e) = self.orgs.get_hierarchy(org_id).await {
                        tracing::warn!(org_id = %org_id, error = %e, "Hierarchy warm failed");
                        ok = false;
                    }
                }
                if self.warm_stats {
                    if let Err(e) = self.orgs.get_stats(org_id).await {
                        tracing::warn!(org_id = %org_id, error = %e, "Stats warm failed");
                        ok = false;
                    }
                }
                ok
            }
            WarmTarget::User { org_id, user_id } => {
                if !self.warm_effective_roles {
                    return true;
                }
                match self.resolver.resolve_effective_roles(org_id, user_id).await {
                    Ok(_) => true,
                    Err(e) => {
                        tracing::warn!(
                            org_id = %org_id,
                            user_id = %user_id,
                            error = %e,
                            "Effective-role warm failed"
                        );
                        false
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;
    use crate::models::CreateOrganizationRequest;
    use crate::services::audit::RecordingAuditSink;
    use crate::services::directory_cache::DirectoryCache;
    use crate::services::invalidation::InvalidationCoordinator;
    use crate::store::InMemoryDirectory;

    struct Fixture {
        warming: Arc<CacheWarmingService>,
        cache: DirectoryCache,
        org_id: Uuid,
    }

    fn test_config() -> WarmingConfig {
        WarmingConfig {
            enabled: true,
            interval_seconds: 60,
            max_concurrent_warms: 2,
            warm_hierarchies: true,
            warm_stats: true,
            warm_effective_roles: true,
            organizations: Vec::new(),
            users: Vec::new(),
        }
    }

    async fn fixture_with(config: WarmingConfig) -> Fixture {
        let store = Arc::new(InMemoryDirectory::new());
        let cache = DirectoryCache::new(Arc::new(MemoryCache::new()));
        let audit = Arc::new(RecordingAuditSink::new());
        let invalidation = Arc::new(InvalidationCoordinator::new(cache.clone()));

        let orgs = OrganizationService::new(
            store.clone(),
            cache.clone(),
            audit,
            invalidation,
        );
        let org = orgs
            .create_organization(
                CreateOrganizationRequest {
                    name: "acme".to_string(),
                    description: None,
                    parent_id: None,
                },
                "admin",
            )
            .await
            .unwrap();

        let resolver = EntitlementResolver::new(store.clone(), cache.clone());
        let warming = Arc::new(CacheWarmingService::new(&config, orgs, resolver));

        Fixture {
            warming,
            cache,
            org_id: org.id,
        }
    }

    async fn fixture() -> Fixture {
        fixture_with(test_config()).await
    }

    #[tokio::test]
    async fn test_warm_now_populates_cache() {
        let f = fixture().await;
        let user = Uuid::new_v4();
        f.warming.register_organization(f.org_id);
        f.warming.register_user(f.org_id, user);

        assert!(f.cache.get_hierarchy(f.org_id).await.is_none());

        let report = f.warming.warm_now().await;
        assert_eq!(report.warmed, 2);
        assert_eq!(report.failed, 0);

        assert!(f.cache.get_hierarchy(f.org_id).await.is_some());
        assert!(f.cache.get_stats(f.org_id).await.is_some());
        assert!(f.cache.get_effective_roles(f.org_id, user).await.is_some());
    }

    #[tokio::test]
    async fn test_missing_organization_counts_as_failure() {
        let f = fixture().await;
        f.warming.register_organization(Uuid::new_v4());

        let report = f.warming.warm_now().await;
        assert_eq!(report.warmed, 0);
        assert_eq!(report.failed, 1);
    }

    #[tokio::test]
    async fn test_start_and_stop_toggle_running() {
        let f = fixture().await;
        assert!(!f.warming.is_running());

        f.warming.start();
        assert!(f.warming.is_running());
        // Starting again while running is a no-op.
        f.warming.start();

        f.warming.stop();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!f.warming.is_running());
    }

    #[tokio::test]
    async fn test_duplicate_targets_registered_once() {
        let f = fixture().await;
        f.warming.register_organization(f.org_id);
        f.warming.register_organization(f.org_id);

        let report = f.warming.warm_now().await;
        assert_eq!(report.warmed, 1);
    }

    #[tokio::test]
    async fn test_disabled_stats_stay_cold() {
        let mut config = test_config();
        config.warm_stats = false;
        let f = fixture_with(config).await;
        f.warming.register_organization(f.org_id);

        let report = f.warming.warm_now().await;
        assert_eq!(report.warmed, 1);

        assert!(f.cache.get_hierarchy(f.org_id).await.is_some());
        assert!(f.cache.get_stats(f.org_id).await.is_none());
    }
}
