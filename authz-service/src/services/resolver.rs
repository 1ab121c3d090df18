//! Effective-role resolution.
//!
//! A user's effective roles in an organization are the union of direct
//! grants, grants on groups the user belongs to, and grants inherited from
//! ancestor groups. The same role reached through several paths collapses to
//! one entry labeled with the closest source.

use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use uuid::Uuid;

use crate::models::{EffectiveRole, RoleSource};
use crate::store::DirectoryStore;

use super::directory_cache::DirectoryCache;
use super::error::ServiceError;

#[derive(Clone)]
pub struct EntitlementResolver {
    store: Arc<dyn DirectoryStore>,
    cache: DirectoryCache,
}

impl EntitlementResolver {
    pub fn new(store: Arc<dyn DirectoryStore>, cache: DirectoryCache) -> Self {
        Self { store, cache }
    }

    /// Resolve the user's current effective roles, reading through the cache.
    pub async fn resolve_effective_roles(
        &self,
        org_id: Uuid,
        user_id: Uuid,
    ) -> Result<Vec<EffectiveRole>, ServiceError> {
        if let Some(roles) = self.cache.get_effective_roles(org_id, user_id).await {
            return Ok(roles);
        }

        let roles = self.resolve_at(org_id, user_id, Utc::now()).await?;
        self.cache
            .put_effective_roles(org_id, user_id, &roles)
            .await;
        Ok(roles)
    }

    /// Resolve at an explicit instant. Bypasses the cache, since cached
    /// entries are only valid for "now".
    pub async fn resolve_at(
        &self,
        org_id: Uuid,
        user_id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<Vec<EffectiveRole>, ServiceError> {
        let (user_roles, memberships) = tokio::try_join!(
            self.store.list_user_roles(org_id, user_id),
            self.store.list_user_memberships(org_id, user_id),
        )
        .map_err(ServiceError::Store)?;

        let mut merged: HashMap<Uuid, EffectiveRole> = HashMap::new();

        for grant in user_roles.iter().filter(|g| g.is_effective(at)) {
            if let Some(role) = self.load_active_role(grant.role_id).await? {
                merge(&mut merged, EffectiveRole::direct(role));
            }
        }

        for membership in memberships.iter().filter(|m| m.is_effective(at)) {
            self.collect_group_chain(membership.group_id, at, &mut merged)
                .await?;
        }

        let mut roles: Vec<EffectiveRole> = merged.into_values().collect();
        roles.sort_by(|a, b| {
            a.source
                .rank()
                .cmp(&b.source.rank())
                .then(a.distance.cmp(&b.distance))
                .then_with(|| a.role.name.cmp(&b.role.name))
        });
        Ok(roles)
    }

    /// Walk from the member's group up through its ancestors, collecting
    /// effective grants. A soft-deleted group ends the chain; an inactive
    /// group contributes no grants but its ancestors still apply.
    async fn collect_group_chain(
        &self,
        start_group_id: Uuid,
        at: DateTime<Utc>,
        merged: &mut HashMap<Uuid, EffectiveRole>,
    ) -> Result<(), ServiceError> {
        let mut visited = HashSet::new();
        let mut path: Vec<Uuid> = Vec::new();
        let mut current = Some(start_group_id);
        let mut distance: u32 = 0;

        while let Some(group_id) = current {
            if !visited.insert(group_id) {
                tracing::error!(
                    group_id = %group_id,
                    "Cycle encountered in group hierarchy during resolution"
                );
                break;
            }

            let Some(group) = self
                .store
                .find_group_by_id(group_id)
                .await
                .map_err(ServiceError::Store)?
            else {
                break;
            };
            if group.lifecycle.is_deleted() {
                break;
            }

            path.push(group.id);

            if group.is_active {
                let grants = self
                    .store
                    .list_group_roles(group.id)
                    .await
                    .map_err(ServiceError::Store)?;

                for grant in grants.iter().filter(|g| g.is_effective(at)) {
                    let Some(role) = self.load_active_role(grant.role_id).await? else {
                        continue;
                    };
                    let source = if distance == 0 {
                        RoleSource::GroupDirect
                    } else {
                        RoleSource::GroupInherited
                    };
                    merge(
                        merged,
                        EffectiveRole {
                            role,
                            source,
                            group_id: Some(group.id),
                            group_name: Some(group.name.clone()),
                            inheritance_path: path.clone(),
                            distance,
                        },
                    );
                }
            }

            current = group.parent_id;
            distance += 1;
        }

        Ok(())
    }

    async fn load_active_role(
        &self,
        role_id: Uuid,
    ) -> Result<Option<crate::models::Role>, ServiceError> {
        let role = self
            .store
            .find_role_by_id(role_id)
            .await
            .map_err(ServiceError::Store)?;
        Ok(role.filter(|r| r.is_active))
    }
}

/// Keep the candidate with the higher-precedence source; on a tie, the
/// shorter inheritance distance wins.
fn merge(merged: &mut HashMap<Uuid, EffectiveRole>, candidate: EffectiveRole) {
    match merged.get(&candidate.role.id) {
        Some(existing)
            if (existing.source.rank(), existing.distance)
                <= (candidate.source.rank(), candidate.distance) => {}
        _ => {
            merged.insert(candidate.role.id, candidate);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;
    use crate::models::{Group, GroupMembership, GroupRole, Organization, Role, UserRole};
    use crate::store::InMemoryDirectory;
    use chrono::Duration;

    struct Fixture {
        resolver: EntitlementResolver,
        store: Arc<InMemoryDirectory>,
        cache: DirectoryCache,
        org_id: Uuid,
        user_id: Uuid,
    }

    async fn fixture() -> Fixture {
        let store = Arc::new(InMemoryDirectory::new());
        let cache = DirectoryCache::new(Arc::new(MemoryCache::new()));
        let org = Organization::new("acme".to_string(), None, None);
        store.insert_organization(&org).await.unwrap();

        Fixture {
            resolver: EntitlementResolver::new(store.clone(), cache.clone()),
            store,
            cache,
            org_id: org.id,
            user_id: Uuid::new_v4(),
        }
    }

    async fn seed_group(f: &Fixture, name: &str, parent_id: Option<Uuid>) -> Group {
        let group = Group::new(f.org_id, name.to_string(), None, parent_id);
        f.store.insert_group(&group).await.unwrap();
        group
    }

    async fn seed_role(f: &Fixture, name: &str) -> Role {
        let role = Role::new(name.to_string(), None, None);
        f.store.insert_role(&role).await.unwrap();
        role
    }

    async fn join(f: &Fixture, group: &Group) {
        let membership =
            GroupMembership::new(group.id, f.org_id, f.user_id, "admin", None, None);
        f.store.insert_membership(&membership).await.unwrap();
    }

    async fn grant_group(f: &Fixture, group: &Group, role: &Role) {
        let assignment = GroupRole::new(group.id, role.id, f.org_id, "admin", None, None);
        f.store.insert_group_role(&assignment).await.unwrap();
    }

    async fn grant_user(f: &Fixture, role: &Role) {
        let assignment = UserRole::new(f.user_id, role.id, f.org_id, "admin", None, None);
        f.store.insert_user_role(&assignment).await.unwrap();
    }

    #[tokio::test]
    async fn test_direct_source_wins_over_group_paths() {
        let f = fixture().await;
        let role = seed_role(&f, "admin").await;
        let group = seed_group(&f, "devs", None).await;
        join(&f, &group).await;
        grant_group(&f, &group, &role).await;
        grant_user(&f, &role).await;

        let roles = f
            .resolver
            .resolve_effective_roles(f.org_id, f.user_id)
            .await
            .unwrap();
        assert_eq!(roles.len(), 1);
        assert_eq!(roles[0].source, RoleSource::Direct);
        assert!(roles[0].group_id.is_none());
    }

    #[tokio::test]
    async fn test_inherited_grant_carries_path_and_distance() {
        let f = fixture().await;
        let role = seed_role(&f, "viewer").await;
        let parent = seed_group(&f, "org-wide", None).await;
        let child = seed_group(&f, "devs", Some(parent.id)).await;
        join(&f, &child).await;
        grant_group(&f, &parent, &role).await;

        let roles = f
            .resolver
            .resolve_effective_roles(f.org_id, f.user_id)
            .await
            .unwrap();
        assert_eq!(roles.len(), 1);
        assert_eq!(roles[0].source, RoleSource::GroupInherited);
        assert_eq!(roles[0].distance, 1);
        assert_eq!(roles[0].inheritance_path, vec![child.id, parent.id]);
        assert_eq!(roles[0].group_name.as_deref(), Some("org-wide"));
    }

    #[tokio::test]
    async fn test_closest_path_wins_for_same_role() {
        let f = fixture().await;
        let role = seed_role(&f, "viewer").await;
        let parent = seed_group(&f, "parent", None).await;
        let child = seed_group(&f, "child", Some(parent.id)).await;
        join(&f, &child).await;
        grant_group(&f, &parent, &role).await;
        grant_group(&f, &child, &role).await;

        let roles = f
            .resolver
            .resolve_effective_roles(f.org_id, f.user_id)
            .await
            .unwrap();
        assert_eq!(roles.len(), 1);
        assert_eq!(roles[0].source, RoleSource::GroupDirect);
        assert_eq!(roles[0].distance, 0);
    }

    #[tokio::test]
    async fn test_membership_window_end_is_exclusive() {
        let f = fixture().await;
        let role = seed_role(&f, "viewer").await;
        let group = seed_group(&f, "devs", None).await;
        grant_group(&f, &group, &role).await;

        let at = Utc::now();
        let membership = GroupMembership::new(
            group.id,
            f.org_id,
            f.user_id,
            "admin",
            Some(at - Duration::hours(1)),
            Some(at),
        );
        f.store.insert_membership(&membership).await.unwrap();

        let roles = f.resolver.resolve_at(f.org_id, f.user_id, at).await.unwrap();
        assert!(roles.is_empty());

        let roles = f
            .resolver
            .resolve_at(f.org_id, f.user_id, at - Duration::seconds(1))
            .await
            .unwrap();
        assert_eq!(roles.len(), 1);
    }

    #[tokio::test]
    async fn test_soft_deleted_group_ends_the_chain() {
        let f = fixture().await;
        let role = seed_role(&f, "viewer").await;
        let grandparent = seed_group(&f, "grandparent", None).await;
        let mut parent = seed_group(&f, "parent", Some(grandparent.id)).await;
        let child = seed_group(&f, "child", Some(parent.id)).await;
        join(&f, &child).await;
        grant_group(&f, &grandparent, &role).await;

        parent.soft_delete("admin", Utc::now());
        f.store.update_group(&parent).await.unwrap();

        let roles = f
            .resolver
            .resolve_effective_roles(f.org_id, f.user_id)
            .await
            .unwrap();
        assert!(roles.is_empty());
    }

    #[tokio::test]
    async fn test_inactive_group_skips_grants_but_chain_continues() {
        let f = fixture().await;
        let skipped = seed_role(&f, "skipped").await;
        let inherited = seed_role(&f, "inherited").await;
        let grandparent = seed_group(&f, "grandparent", None).await;
        let mut parent = seed_group(&f, "parent", Some(grandparent.id)).await;
        let child = seed_group(&f, "child", Some(parent.id)).await;
        join(&f, &child).await;
        grant_group(&f, &parent, &skipped).await;
        grant_group(&f, &grandparent, &inherited).await;

        parent.is_active = false;
        f.store.update_group(&parent).await.unwrap();

        let roles = f
            .resolver
            .resolve_effective_roles(f.org_id, f.user_id)
            .await
            .unwrap();
        assert_eq!(roles.len(), 1);
        assert_eq!(roles[0].role.name, "inherited");
        assert_eq!(roles[0].distance, 2);
    }

    #[tokio::test]
    async fn test_inactive_role_filtered_out() {
        let f = fixture().await;
        let mut role = seed_role(&f, "stale").await;
        grant_user(&f, &role).await;

        role.is_active = false;
        f.store.update_role(&role).await.unwrap();

        let roles = f
            .resolver
            .resolve_effective_roles(f.org_id, f.user_id)
            .await
            .unwrap();
        assert!(roles.is_empty());
    }

    #[tokio::test]
    async fn test_cached_result_is_returned_as_is() {
        let f = fixture().await;
        let role = seed_role(&f, "admin").await;
        grant_user(&f, &role).await;

        f.cache.put_effective_roles(f.org_id, f.user_id, &[]).await;
        let roles = f
            .resolver
            .resolve_effective_roles(f.org_id, f.user_id)
            .await
            .unwrap();
        assert!(roles.is_empty());
    }

    #[tokio::test]
    async fn test_results_sorted_by_source_then_distance_then_name() {
        let f = fixture().await;
        let direct = seed_role(&f, "zeta").await;
        let near = seed_role(&f, "beta").await;
        let far = seed_role(&f, "alpha").await;

        let parent = seed_group(&f, "parent", None).await;
        let child = seed_group(&f, "child", Some(parent.id)).await;
        join(&f, &child).await;
        grant_user(&f, &direct).await;
        grant_group(&f, &child, &near).await;
        grant_group(&f, &parent, &far).await;

        let roles = f
            .resolver
            .resolve_effective_roles(f.org_id, f.user_id)
            .await
            .unwrap();
        let names: Vec<&str> = roles.iter().map(|r| r.role.name.as_str()).collect();
        assert_eq!(names, vec!["zeta", "beta", "alpha"]);
    }
}
