//! Typed read-through caching and per-entity invalidation over a
//! [`CacheStore`].

use std::sync::Arc;
use uuid::Uuid;

use crate::cache::{self, keys, CacheStore};
use crate::models::{
    EffectiveRole, Group, GroupMembership, GroupNode, Organization, OrganizationHierarchy,
    OrganizationStats,
};

#[derive(Clone)]
pub struct DirectoryCache {
    store: Arc<dyn CacheStore>,
}

impl DirectoryCache {
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn CacheStore> {
        &self.store
    }

    // Hierarchy views (30 min TTL).

    pub async fn get_hierarchy(&self, org_id: Uuid) -> Option<OrganizationHierarchy> {
        self.read(&keys::org_hierarchy(org_id)).await
    }

    pub async fn put_hierarchy(&self, org_id: Uuid, hierarchy: &OrganizationHierarchy) {
        self.write(
            &keys::org_hierarchy(org_id),
            hierarchy,
            keys::HIERARCHY_TTL_SECONDS,
        )
        .await;
    }

    pub async fn get_parent_chain(&self, org_id: Uuid) -> Option<Vec<Organization>> {
        self.read(&keys::org_parent_hierarchy(org_id)).await
    }

    pub async fn put_parent_chain(&self, org_id: Uuid, chain: &[Organization]) {
        self.write(
            &keys::org_parent_hierarchy(org_id),
            &chain.to_vec(),
            keys::HIERARCHY_TTL_SECONDS,
        )
        .await;
    }

    pub async fn get_children(&self, org_id: Uuid, active_only: bool) -> Option<Vec<Organization>> {
        let key = if active_only {
            keys::org_active_children(org_id)
        } else {
            keys::org_children(org_id)
        };
        self.read(&key).await
    }

    pub async fn put_children(&self, org_id: Uuid, active_only: bool, children: &[Organization]) {
        let key = if active_only {
            keys::org_active_children(org_id)
        } else {
            keys::org_children(org_id)
        };
        self.write(&key, &children.to_vec(), keys::HIERARCHY_TTL_SECONDS)
            .await;
    }

    // Group listings (15 min TTL).

    pub async fn get_groups(&self, org_id: Uuid, active_only: bool) -> Option<Vec<Group>> {
        let key = if active_only {
            keys::org_active_groups(org_id)
        } else {
            keys::org_groups(org_id)
        };
        self.read(&key).await
    }

    pub async fn put_groups(&self, org_id: Uuid, active_only: bool, groups: &[Group]) {
        let key = if active_only {
            keys::org_active_groups(org_id)
        } else {
            keys::org_groups(org_id)
        };
        self.write(&key, &groups.to_vec(), keys::GROUPS_TTL_SECONDS)
            .await;
    }

    pub async fn get_group_tree(&self, org_id: Uuid) -> Option<Vec<GroupNode>> {
        self.read(&keys::org_group_hierarchy(org_id)).await
    }

    pub async fn put_group_tree(&self, org_id: Uuid, tree: &[GroupNode]) {
        self.write(
            &keys::org_group_hierarchy(org_id),
            &tree.to_vec(),
            keys::GROUPS_TTL_SECONDS,
        )
        .await;
    }

    pub async fn get_group_members(
        &self,
        org_id: Uuid,
        group_id: Uuid,
    ) -> Option<Vec<GroupMembership>> {
        self.read(&keys::group_members(org_id, group_id)).await
    }

    pub async fn put_group_members(
        &self,
        org_id: Uuid,
        group_id: Uuid,
        members: &[GroupMembership],
    ) {
        self.write(
            &keys::group_members(org_id, group_id),
            &members.to_vec(),
            keys::GROUPS_TTL_SECONDS,
        )
        .await;
    }

    // Per-user views.

    pub async fn get_user_groups(&self, org_id: Uuid, user_id: Uuid) -> Option<Vec<Group>> {
        self.read(&keys::user_groups(org_id, user_id)).await
    }

    pub async fn put_user_groups(&self, org_id: Uuid, user_id: Uuid, groups: &[Group]) {
        self.write(
            &keys::user_groups(org_id, user_id),
            &groups.to_vec(),
            keys::USER_GROUPS_TTL_SECONDS,
        )
        .await;
    }

    pub async fn get_effective_roles(
        &self,
        org_id: Uuid,
        user_id: Uuid,
    ) -> Option<Vec<EffectiveRole>> {
        self.read(&keys::user_effective_roles(org_id, user_id)).await
    }

    pub async fn put_effective_roles(
        &self,
        org_id: Uuid,
        user_id: Uuid,
        roles: &[EffectiveRole],
    ) {
        self.write(
            &keys::user_effective_roles(org_id, user_id),
            &roles.to_vec(),
            keys::EFFECTIVE_ROLES_TTL_SECONDS,
        )
        .await;
    }

    pub async fn get_stats(&self, org_id: Uuid) -> Option<OrganizationStats> {
        self.read(&keys::org_stats(org_id)).await
    }

    pub async fn put_stats(&self, org_id: Uuid, stats: &OrganizationStats) {
        self.write(&keys::org_stats(org_id), stats, keys::STATS_TTL_SECONDS)
            .await;
    }

    // Invalidation. Per-key failures are logged and skipped so one bad key
    // never blocks the rest of a sweep.

    pub async fn invalidate_organization(&self, org_id: Uuid) {
        for key in keys::org_invalidation_keys(org_id) {
            self.drop_key(&key).await;
        }
        self.sweep(&keys::org_user_pattern(org_id)).await;
    }

    pub async fn invalidate_group(&self, org_id: Uuid, group_id: Uuid) {
        for key in [
            keys::group_members(org_id, group_id),
            keys::group_active_members(org_id, group_id),
            keys::org_groups(org_id),
            keys::org_active_groups(org_id),
            keys::org_group_hierarchy(org_id),
        ] {
            self.drop_key(&key).await;
        }
    }

    pub async fn invalidate_user(&self, org_id: Uuid, user_id: Uuid) {
        for key in [
            keys::user_groups(org_id, user_id),
            keys::user_active_groups(org_id, user_id),
            keys::user_effective_roles(org_id, user_id),
        ] {
            self.drop_key(&key).await;
        }
    }

    pub async fn invalidate_effective_roles(&self, org_id: Uuid) {
        self.sweep(&keys::org_effective_roles_pattern(org_id)).await;
    }

    /// Delete everything matching `pattern`, tolerating per-key failures.
    pub async fn sweep(&self, pattern: &str) {
        let keys = match self.store.keys(pattern).await {
            Ok(keys) => keys,
            Err(e) => {
                tracing::warn!(pattern = %pattern, error = %e, "Cache sweep scan failed");
                return;
            }
        };

        for key in keys {
            self.drop_key(&key).await;
        }
    }

    async fn drop_key(&self, key: &str) {
        if let Err(e) = self.store.delete(key).await {
            tracing::warn!(key = %key, error = %e, "Cache invalidation failed for key");
        }
    }

    async fn read<T: serde::de::DeserializeOwned>(&self, key: &str) -> Option<T> {
        match cache::get_json(self.store.as_ref(), key).await {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Cache read failed, treating as miss");
                None
            }
        }
    }

    async fn write<T: serde::Serialize>(&self, key: &str, value: &T, ttl_seconds: i64) {
        if let Err(e) = cache::set_json(self.store.as_ref(), key, value, ttl_seconds).await {
            tracing::warn!(key = %key, error = %e, "Cache write failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;

    fn cache() -> DirectoryCache {
        DirectoryCache::new(Arc::new(MemoryCache::new()))
    }

    #[tokio::test]
    async fn test_org_invalidation_clears_user_keys() {
        let dc = cache();
        let org = Uuid::new_v4();
        let user = Uuid::new_v4();

        dc.put_stats(
            org,
            &OrganizationStats {
                organization_id: org,
                child_count: 0,
                group_count: 0,
                user_count: 0,
                generated_at: chrono::Utc::now(),
            },
        )
        .await;
        dc.put_effective_roles(org, user, &[]).await;

        assert!(dc.get_stats(org).await.is_some());
        assert!(dc.get_effective_roles(org, user).await.is_some());

        dc.invalidate_organization(org).await;
        assert!(dc.get_stats(org).await.is_none());
        assert!(dc.get_effective_roles(org, user).await.is_none());
    }

    #[tokio::test]
    async fn test_group_invalidation_keeps_other_groups() {
        let dc = cache();
        let org = Uuid::new_v4();
        let (g1, g2) = (Uuid::new_v4(), Uuid::new_v4());

        dc.put_group_members(org, g1, &[]).await;
        dc.put_group_members(org, g2, &[]).await;

        dc.invalidate_group(org, g1).await;
        assert!(dc.get_group_members(org, g1).await.is_none());
        assert!(dc.get_group_members(org, g2).await.is_some());
    }
}
