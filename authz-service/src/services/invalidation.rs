//! Event-driven cache invalidation coordinator.
//!
//! Mutating services publish typed events; the coordinator maps each event
//! type to an invalidation strategy and drops the affected cache entries.
//! All processing serializes through one async mutex so overlapping events
//! cannot interleave their key deletions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::cache::keys;

use super::directory_cache::DirectoryCache;
use super::error::ServiceError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    OrganizationCreated,
    OrganizationUpdated,
    OrganizationDeleted,
    OrganizationHierarchyChanged,
    GroupCreated,
    GroupUpdated,
    GroupDeleted,
    GroupHierarchyChanged,
    UserGroupMembershipChanged,
    RoleAssignedToGroup,
    RoleRemovedFromGroup,
    RoleUpdated,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::OrganizationCreated => "organization_created",
            EventKind::OrganizationUpdated => "organization_updated",
            EventKind::OrganizationDeleted => "organization_deleted",
            EventKind::OrganizationHierarchyChanged => "organization_hierarchy_changed",
            EventKind::GroupCreated => "group_created",
            EventKind::GroupUpdated => "group_updated",
            EventKind::GroupDeleted => "group_deleted",
            EventKind::GroupHierarchyChanged => "group_hierarchy_changed",
            EventKind::UserGroupMembershipChanged => "user_group_membership_changed",
            EventKind::RoleAssignedToGroup => "role_assigned_to_group",
            EventKind::RoleRemovedFromGroup => "role_removed_from_group",
            EventKind::RoleUpdated => "role_updated",
        }
    }

    pub fn all() -> [EventKind; 12] {
        [
            EventKind::OrganizationCreated,
            EventKind::OrganizationUpdated,
            EventKind::OrganizationDeleted,
            EventKind::OrganizationHierarchyChanged,
            EventKind::GroupCreated,
            EventKind::GroupUpdated,
            EventKind::GroupDeleted,
            EventKind::GroupHierarchyChanged,
            EventKind::UserGroupMembershipChanged,
            EventKind::RoleAssignedToGroup,
            EventKind::RoleRemovedFromGroup,
            EventKind::RoleUpdated,
        ]
    }
}

/// A cache-relevant mutation. Optional fields are typed per event family:
/// membership events carry `user_id`, role events carry `role_id`, hierarchy
/// events carry the parent endpoints. `affected_ids` lists ancestors or
/// descendants whose cached views the mutation also staled; deletion and
/// hierarchy-change handlers purge each listed id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvalidationEvent {
    pub event_type: String,
    pub organization_id: Uuid,
    pub resource_type: String,
    pub resource_id: Uuid,
    pub parent_id: Option<Uuid>,
    pub old_parent_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
    pub role_id: Option<Uuid>,
    #[serde(default)]
    pub affected_ids: Vec<Uuid>,
    pub occurred_at: DateTime<Utc>,
}

impl InvalidationEvent {
    pub fn new(kind: EventKind, organization_id: Uuid, resource_type: &str, resource_id: Uuid) -> Self {
        Self {
            event_type: kind.as_str().to_string(),
            organization_id,
            resource_type: resource_type.to_string(),
            resource_id,
            parent_id: None,
            old_parent_id: None,
            user_id: None,
            role_id: None,
            affected_ids: Vec::new(),
            occurred_at: Utc::now(),
        }
    }

    pub fn with_parent(mut self, parent_id: Option<Uuid>) -> Self {
        self.parent_id = parent_id;
        self
    }

    pub fn with_old_parent(mut self, old_parent_id: Option<Uuid>) -> Self {
        self.old_parent_id = old_parent_id;
        self
    }

    pub fn with_user(mut self, user_id: Uuid) -> Self {
        self.user_id = Some(user_id);
        self
    }

    pub fn with_role(mut self, role_id: Uuid) -> Self {
        self.role_id = Some(role_id);
        self
    }

    pub fn with_affected(mut self, affected_ids: Vec<Uuid>) -> Self {
        self.affected_ids = affected_ids;
        self
    }
}

/// What an event type invalidates.
#[derive(Debug, Clone)]
pub struct InvalidationStrategy {
    pub kind: EventKind,
    pub description: &'static str,
    /// Whether per-user entries (group listings, effective roles) are
    /// affected and must be swept.
    pub affects_users: bool,
}

/// The default strategy table. Built once at startup and handed to the
/// coordinator; callers may supply their own table instead.
pub fn default_strategies() -> HashMap<String, InvalidationStrategy> {
    let entry = |kind: EventKind, description: &'static str, affects_users: bool| {
        (
            kind.as_str().to_string(),
            InvalidationStrategy {
                kind,
                description,
                affects_users,
            },
        )
    };

    HashMap::from([
        entry(
            EventKind::OrganizationCreated,
            "drop the parent's children listings",
            false,
        ),
        entry(
            EventKind::OrganizationUpdated,
            "drop the organization's cached views",
            false,
        ),
        entry(
            EventKind::OrganizationDeleted,
            "drop the organization's views, each listed affected organization's, and every per-user entry",
            true,
        ),
        entry(
            EventKind::OrganizationHierarchyChanged,
            "drop the organization's views plus both parents' and each listed affected organization's",
            true,
        ),
        entry(EventKind::GroupCreated, "drop the org's group listings", false),
        entry(EventKind::GroupUpdated, "drop the group's cached views", false),
        entry(
            EventKind::GroupDeleted,
            "drop the group's views, listed affected groups', and member entries",
            true,
        ),
        entry(
            EventKind::GroupHierarchyChanged,
            "drop the group tree, listed affected groups', and member entries",
            true,
        ),
        entry(
            EventKind::UserGroupMembershipChanged,
            "drop the user's group and effective-role entries",
            true,
        ),
        entry(
            EventKind::RoleAssignedToGroup,
            "drop the group's views and org effective roles",
            true,
        ),
        entry(
            EventKind::RoleRemovedFromGroup,
            "drop the group's views and org effective roles",
            true,
        ),
        entry(
            EventKind::RoleUpdated,
            "sweep effective roles and every key mentioning the role",
            true,
        ),
    ])
}

#[derive(Debug, Clone, Serialize)]
pub struct InvalidationStats {
    pub keys_by_pattern: HashMap<String, usize>,
    pub strategy_count: usize,
    pub user_affecting_strategies: usize,
}

pub struct InvalidationCoordinator {
    cache: DirectoryCache,
    strategies: HashMap<String, InvalidationStrategy>,
    // Serializes event processing.
    lock: Mutex<()>,
}

impl InvalidationCoordinator {
    pub fn new(cache: DirectoryCache) -> Self {
        Self::with_strategies(cache, default_strategies())
    }

    pub fn with_strategies(
        cache: DirectoryCache,
        strategies: HashMap<String, InvalidationStrategy>,
    ) -> Self {
        Self {
            cache,
            strategies,
            lock: Mutex::new(()),
        }
    }

    /// Process one event. Unknown event types are a hard error; sweep-level
    /// key failures inside a supported event are logged and tolerated.
    pub async fn invalidate(&self, event: &InvalidationEvent) -> Result<(), ServiceError> {
        self.validate_event(event)?;

        let strategy = self
            .strategies
            .get(&event.event_type)
            .ok_or_else(|| ServiceError::UnsupportedEventType(event.event_type.clone()))?;

        let _guard = self.lock.lock().await;

        tracing::debug!(
            event_type = %event.event_type,
            organization_id = %event.organization_id,
            resource_id = %event.resource_id,
            "Applying invalidation strategy"
        );

        let org_id = event.organization_id;
        match strategy.kind {
            EventKind::OrganizationCreated => {
                if let Some(parent_id) = event.parent_id {
                    self.cache
                        .store()
                        .delete(&keys::org_children(parent_id))
                        .await
                        .map_err(ServiceError::Cache)?;
                    self.cache
                        .store()
                        .delete(&keys::org_active_children(parent_id))
                        .await
                        .map_err(ServiceError::Cache)?;
                    self.cache
                        .store()
                        .delete(&keys::org_hierarchy(parent_id))
                        .await
                        .map_err(ServiceError::Cache)?;
                }
            }
            EventKind::OrganizationUpdated => {
                self.cache.invalidate_organization(org_id).await;
            }
            EventKind::OrganizationDeleted => {
                self.cache.invalidate_organization(org_id).await;
                for affected_id in &event.affected_ids {
                    self.cache.invalidate_organization(*affected_id).await;
                }
            }
            EventKind::OrganizationHierarchyChanged => {
                self.cache.invalidate_organization(org_id).await;
                if let Some(parent_id) = event.parent_id {
                    self.cache.invalidate_organization(parent_id).await;
                }
                if let Some(old_parent_id) = event.old_parent_id {
                    if event.parent_id != Some(old_parent_id) {
                        self.cache.invalidate_organization(old_parent_id).await;
                    }
                }
                for affected_id in &event.affected_ids {
                    self.cache.invalidate_organization(*affected_id).await;
                }
            }
            EventKind::GroupCreated | EventKind::GroupUpdated => {
                self.cache.invalidate_group(org_id, event.resource_id).await;
            }
            EventKind::GroupDeleted | EventKind::GroupHierarchyChanged => {
                self.cache.invalidate_group(org_id, event.resource_id).await;
                for affected_id in &event.affected_ids {
                    self.cache.invalidate_group(org_id, *affected_id).await;
                }
                self.cache.sweep(&keys::org_user_pattern(org_id)).await;
            }
            EventKind::UserGroupMembershipChanged => {
                // validate_event guarantees user_id is present.
                if let Some(user_id) = event.user_id {
                    self.cache.invalidate_user(org_id, user_id).await;
                }
                self.cache.invalidate_group(org_id, event.resource_id).await;
            }
            EventKind::RoleAssignedToGroup | EventKind::RoleRemovedFromGroup => {
                self.cache.invalidate_group(org_id, event.resource_id).await;
                self.cache.invalidate_effective_roles(org_id).await;
            }
            EventKind::RoleUpdated => {
                self.cache.invalidate_effective_roles(org_id).await;
                if let Some(role_id) = event.role_id {
                    // Global sweep; per-key failures inside are tolerated.
                    self.cache.sweep(&keys::role_pattern(role_id)).await;
                }
            }
        }

        Ok(())
    }

    /// Process events in order, collecting failures instead of stopping at
    /// the first.
    pub async fn batch_invalidate(&self, events: &[InvalidationEvent]) -> Result<(), ServiceError> {
        let mut failures = 0usize;
        for event in events {
            if let Err(e) = self.invalidate(event).await {
                tracing::warn!(
                    event_type = %event.event_type,
                    error = %e,
                    "Invalidation event failed in batch"
                );
                failures += 1;
            }
        }

        if failures > 0 {
            return Err(ServiceError::Internal(anyhow::anyhow!(
                "batch invalidation completed with {} errors",
                failures
            )));
        }
        Ok(())
    }

    pub fn validate_event(&self, event: &InvalidationEvent) -> Result<(), ServiceError> {
        if event.event_type.is_empty() {
            return Err(ServiceError::InvalidEvent("missing event type".to_string()));
        }
        if event.organization_id.is_nil() {
            return Err(ServiceError::InvalidEvent(
                "missing organization id".to_string(),
            ));
        }
        if event.resource_id.is_nil() {
            return Err(ServiceError::InvalidEvent("missing resource id".to_string()));
        }
        if event.resource_type.is_empty() {
            return Err(ServiceError::InvalidEvent(
                "missing resource type".to_string(),
            ));
        }

        let strategy = self
            .strategies
            .get(&event.event_type)
            .ok_or_else(|| ServiceError::UnsupportedEventType(event.event_type.clone()))?;

        match strategy.kind {
            EventKind::UserGroupMembershipChanged if event.user_id.is_none() => Err(
                ServiceError::InvalidEvent("membership event requires user_id".to_string()),
            ),
            EventKind::RoleAssignedToGroup
            | EventKind::RoleRemovedFromGroup
            | EventKind::RoleUpdated
                if event.role_id.is_none() =>
            {
                Err(ServiceError::InvalidEvent(
                    "role event requires role_id".to_string(),
                ))
            }
            _ => Ok(()),
        }
    }

    /// Live key counts per family plus strategy-table shape, for diagnostics.
    pub async fn stats(&self) -> Result<InvalidationStats, ServiceError> {
        let patterns = [
            "org:*",
            "*:group:*",
            "*:user:*",
            "*:role:*",
            "*:effective_roles",
        ];

        let mut keys_by_pattern = HashMap::new();
        for pattern in patterns {
            let keys = self
                .cache
                .store()
                .keys(pattern)
                .await
                .map_err(ServiceError::Cache)?;
            keys_by_pattern.insert(pattern.to_string(), keys.len());
        }

        Ok(InvalidationStats {
            keys_by_pattern,
            strategy_count: self.strategies.len(),
            user_affecting_strategies: self
                .strategies
                .values()
                .filter(|s| s.affects_users)
                .count(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CacheStore, MemoryCache};
    use std::sync::Arc;

    fn coordinator() -> (Arc<dyn CacheStore>, InvalidationCoordinator) {
        let store: Arc<dyn CacheStore> = Arc::new(MemoryCache::new());
        let coordinator = InvalidationCoordinator::new(DirectoryCache::new(store.clone()));
        (store, coordinator)
    }

    #[tokio::test]
    async fn test_unknown_event_type_is_hard_error() {
        let (_, coordinator) = coordinator();
        let mut event = InvalidationEvent::new(
            EventKind::OrganizationUpdated,
            Uuid::new_v4(),
            "organization",
            Uuid::new_v4(),
        );
        event.event_type = "organization_renamed".to_string();

        let result = coordinator.invalidate(&event).await;
        assert!(matches!(result, Err(ServiceError::UnsupportedEventType(_))));
    }

    #[tokio::test]
    async fn test_membership_event_requires_user_id() {
        let (_, coordinator) = coordinator();
        let event = InvalidationEvent::new(
            EventKind::UserGroupMembershipChanged,
            Uuid::new_v4(),
            "group_membership",
            Uuid::new_v4(),
        );

        let result = coordinator.invalidate(&event).await;
        assert!(matches!(result, Err(ServiceError::InvalidEvent(_))));
    }

    #[tokio::test]
    async fn test_nil_ids_rejected() {
        let (_, coordinator) = coordinator();
        let event = InvalidationEvent::new(
            EventKind::OrganizationUpdated,
            Uuid::nil(),
            "organization",
            Uuid::new_v4(),
        );
        assert!(matches!(
            coordinator.invalidate(&event).await,
            Err(ServiceError::InvalidEvent(_))
        ));
    }

    #[tokio::test]
    async fn test_org_update_clears_org_keys() {
        let (store, coordinator) = coordinator();
        let org = Uuid::new_v4();
        store
            .set(&keys::org_hierarchy(org), "cached", 60)
            .await
            .unwrap();
        store
            .set(&keys::user_effective_roles(org, Uuid::new_v4()), "[]", 60)
            .await
            .unwrap();

        let event =
            InvalidationEvent::new(EventKind::OrganizationUpdated, org, "organization", org);
        coordinator.invalidate(&event).await.unwrap();

        assert!(!store.exists(&keys::org_hierarchy(org)).await.unwrap());
        assert!(store.keys("org:*:user:*").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_role_updated_sweeps_role_keys() {
        let (store, coordinator) = coordinator();
        let org = Uuid::new_v4();
        let role = Uuid::new_v4();
        let user = Uuid::new_v4();

        store
            .set(&keys::user_effective_roles(org, user), "[]", 60)
            .await
            .unwrap();
        store
            .set(&format!("org:{}:role:{}:grants", org, role), "x", 60)
            .await
            .unwrap();
        store.set("unrelated", "keep", 60).await.unwrap();

        let event = InvalidationEvent::new(EventKind::RoleUpdated, org, "role", role)
            .with_role(role);
        coordinator.invalidate(&event).await.unwrap();

        assert!(!store
            .exists(&keys::user_effective_roles(org, user))
            .await
            .unwrap());
        assert!(store.keys(&keys::role_pattern(role)).await.unwrap().is_empty());
        assert!(store.exists("unrelated").await.unwrap());
    }

    #[tokio::test]
    async fn test_hierarchy_change_invalidates_both_parents() {
        let (store, coordinator) = coordinator();
        let org = Uuid::new_v4();
        let old_parent = Uuid::new_v4();
        let new_parent = Uuid::new_v4();

        for id in [org, old_parent, new_parent] {
            store.set(&keys::org_children(id), "[]", 60).await.unwrap();
        }

        let event = InvalidationEvent::new(
            EventKind::OrganizationHierarchyChanged,
            org,
            "organization",
            org,
        )
        .with_parent(Some(new_parent))
        .with_old_parent(Some(old_parent));
        coordinator.invalidate(&event).await.unwrap();

        for id in [org, old_parent, new_parent] {
            assert!(!store.exists(&keys::org_children(id)).await.unwrap());
        }
    }

    #[tokio::test]
    async fn test_org_delete_clears_affected_organizations() {
        let (store, coordinator) = coordinator();
        let parent = Uuid::new_v4();
        let child = Uuid::new_v4();

        store
            .set(&keys::org_children(parent), "[child]", 60)
            .await
            .unwrap();
        store
            .set(&keys::org_hierarchy(parent), "h", 60)
            .await
            .unwrap();

        let event =
            InvalidationEvent::new(EventKind::OrganizationDeleted, child, "organization", child)
                .with_affected(vec![parent]);
        coordinator.invalidate(&event).await.unwrap();

        assert!(!store.exists(&keys::org_children(parent)).await.unwrap());
        assert!(!store.exists(&keys::org_hierarchy(parent)).await.unwrap());
    }

    #[tokio::test]
    async fn test_group_delete_clears_affected_groups() {
        let (store, coordinator) = coordinator();
        let org = Uuid::new_v4();
        let group = Uuid::new_v4();
        let descendant = Uuid::new_v4();

        store
            .set(&keys::group_members(org, descendant), "[]", 60)
            .await
            .unwrap();

        let event = InvalidationEvent::new(EventKind::GroupDeleted, org, "group", group)
            .with_affected(vec![descendant]);
        coordinator.invalidate(&event).await.unwrap();

        assert!(!store
            .exists(&keys::group_members(org, descendant))
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_batch_collects_errors() {
        let (_, coordinator) = coordinator();
        let org = Uuid::new_v4();

        let good =
            InvalidationEvent::new(EventKind::OrganizationUpdated, org, "organization", org);
        let mut bad = good.clone();
        bad.event_type = "nonsense".to_string();

        let result = coordinator.batch_invalidate(&[good, bad]).await;
        let err = result.unwrap_err();
        assert!(err.to_string().contains("1 errors"));
    }

    #[tokio::test]
    async fn test_stats_counts_strategies() {
        let (store, coordinator) = coordinator();
        let org = Uuid::new_v4();
        store
            .set(&keys::org_hierarchy(org), "h", 60)
            .await
            .unwrap();

        let stats = coordinator.stats().await.unwrap();
        assert_eq!(stats.strategy_count, 12);
        assert!(stats.user_affecting_strategies > 0);
        assert_eq!(stats.keys_by_pattern.get("org:*"), Some(&1));
    }
}
