//! Group management within an organization: group tree maintenance,
//! windowed memberships, and group-role assignment.

use chrono::Utc;
use std::collections::HashSet;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::models::{
    AddMemberRequest, AssignRoleRequest, CreateGroupRequest, Group, GroupMembership, GroupRole,
    UpdateGroupRequest,
};
use crate::store::DirectoryStore;

use super::audit::{AuditEntry, AuditSink, HierarchyChangeEntry};
use super::directory_cache::DirectoryCache;
use super::error::ServiceError;
use super::invalidation::{EventKind, InvalidationCoordinator, InvalidationEvent};

#[derive(Clone)]
pub struct GroupService {
    store: Arc<dyn DirectoryStore>,
    cache: DirectoryCache,
    audit: Arc<dyn AuditSink>,
    invalidation: Arc<InvalidationCoordinator>,
}

impl GroupService {
    pub fn new(
        store: Arc<dyn DirectoryStore>,
        cache: DirectoryCache,
        audit: Arc<dyn AuditSink>,
        invalidation: Arc<InvalidationCoordinator>,
    ) -> Self {
        Self {
            store,
            cache,
            audit,
            invalidation,
        }
    }

    pub async fn create_group(
        &self,
        org_id: Uuid,
        req: CreateGroupRequest,
        actor: &str,
    ) -> Result<Group, ServiceError> {
        req.validate()
            .map_err(|e| ServiceError::Validation(e.to_string()))?;

        let org = self
            .store
            .find_organization_by_id(org_id)
            .await
            .map_err(ServiceError::Store)?
            .ok_or(ServiceError::OrganizationNotFound)?;
        if !org.is_operational() {
            return Err(ServiceError::Validation(
                "organization is not active".to_string(),
            ));
        }

        if let Some(existing) = self
            .store
            .find_group_by_name(org_id, &req.name)
            .await
            .map_err(ServiceError::Store)?
        {
            if !existing.lifecycle.is_deleted() {
                return Err(ServiceError::NameConflict(req.name));
            }
        }

        if let Some(parent_id) = req.parent_id {
            self.check_parent_group(org_id, parent_id).await?;
        }

        let group = Group::new(org_id, req.name, req.description, req.parent_id);
        self.store
            .insert_group(&group)
            .await
            .map_err(ServiceError::Store)?;

        self.audit_op(
            actor,
            "group.create",
            &group,
            format!("Created group {}", group.name),
            serde_json::json!({ "name": group.name, "parent_id": group.parent_id }),
        )
        .await;
        self.publish(InvalidationEvent::new(
            EventKind::GroupCreated,
            org_id,
            "group",
            group.id,
        ))
        .await;

        tracing::info!(group_id = %group.id, org_id = %org_id, "Group created");
        Ok(group)
    }

    pub async fn get_group(&self, id: Uuid) -> Result<Group, ServiceError> {
        let group = self
            .store
            .find_group_by_id(id)
            .await
            .map_err(ServiceError::Store)?
            .ok_or(ServiceError::GroupNotFound)?;
        if group.lifecycle.is_deleted() {
            return Err(ServiceError::GroupNotFound);
        }
        Ok(group)
    }

    pub async fn update_group(
        &self,
        id: Uuid,
        patch: UpdateGroupRequest,
        actor: &str,
    ) -> Result<Group, ServiceError> {
        patch
            .validate()
            .map_err(|e| ServiceError::Validation(e.to_string()))?;

        let mut group = self.get_group(id).await?;
        let old_parent_id = group.parent_id;

        if let Some(name) = &patch.name {
            if *name != group.name {
                if let Some(existing) = self
                    .store
                    .find_group_by_name(group.organization_id, name)
                    .await
                    .map_err(ServiceError::Store)?
                {
                    if existing.id != id && !existing.lifecycle.is_deleted() {
                        return Err(ServiceError::NameConflict(name.clone()));
                    }
                }
                group.name = name.clone();
            }
        }

        if let Some(description) = patch.description {
            group.description = Some(description);
        }

        let mut hierarchy_changed = false;
        if let Some(new_parent) = patch.parent_id {
            if new_parent != old_parent_id {
                if let Some(parent_id) = new_parent {
                    if parent_id == id {
                        return Err(ServiceError::CircularHierarchy);
                    }
                    self.check_parent_group(group.organization_id, parent_id)
                        .await?;
                    self.ensure_no_cycle(id, parent_id).await?;
                }
                group.parent_id = new_parent;
                hierarchy_changed = true;
            }
        }

        group.updated_at = Utc::now();
        self.store
            .update_group(&group)
            .await
            .map_err(ServiceError::Store)?;

        self.audit_op(
            actor,
            "group.update",
            &group,
            format!("Updated group {}", group.name),
            serde_json::json!({
                "name": group.name,
                "old_parent_id": old_parent_id,
                "new_parent_id": group.parent_id,
            }),
        )
        .await;

        if hierarchy_changed {
            if let Err(e) = self
                .audit
                .log_hierarchy_change(HierarchyChangeEntry {
                    actor_id: actor.to_string(),
                    action: "group.reparent".to_string(),
                    resource_type: "group".to_string(),
                    resource_id: group.id.to_string(),
                    old_parent_id,
                    new_parent_id: group.parent_id,
                    message: format!("Moved group {}", group.name),
                    success: true,
                    created_at: Utc::now(),
                })
                .await
            {
                tracing::warn!(error = %e, group_id = %group.id, "Failed to audit hierarchy change");
            }
            let affected = self.collect_descendant_ids(group.id).await?;
            self.publish(
                InvalidationEvent::new(
                    EventKind::GroupHierarchyChanged,
                    group.organization_id,
                    "group",
                    group.id,
                )
                .with_affected(affected),
            )
            .await;
        } else {
            self.publish(InvalidationEvent::new(
                EventKind::GroupUpdated,
                group.organization_id,
                "group",
                group.id,
            ))
            .await;
        }

        Ok(group)
    }

    pub async fn delete_group(&self, id: Uuid, actor: &str) -> Result<(), ServiceError> {
        let mut group = self
            .store
            .find_group_by_id(id)
            .await
            .map_err(ServiceError::Store)?
            .ok_or(ServiceError::GroupNotFound)?;
        if group.lifecycle.is_deleted() {
            return Err(ServiceError::AlreadyDeleted);
        }

        let children = self
            .store
            .list_child_groups(id)
            .await
            .map_err(ServiceError::Store)?;
        if children.iter().any(|g| g.is_operational()) {
            return Err(ServiceError::HasActiveChildren);
        }

        group.soft_delete(actor, Utc::now());
        self.store
            .update_group(&group)
            .await
            .map_err(ServiceError::Store)?;

        self.audit_op(
            actor,
            "group.delete",
            &group,
            format!("Soft-deleted group {}", group.name),
            serde_json::json!({ "name": group.name }),
        )
        .await;
        // Remaining inactive descendants may still have cached member listings.
        let affected = self.collect_descendant_ids(group.id).await?;
        self.publish(
            InvalidationEvent::new(
                EventKind::GroupDeleted,
                group.organization_id,
                "group",
                group.id,
            )
            .with_affected(affected),
        )
        .await;

        Ok(())
    }

    pub async fn list_groups(
        &self,
        org_id: Uuid,
        active_only: bool,
    ) -> Result<Vec<Group>, ServiceError> {
        if let Some(groups) = self.cache.get_groups(org_id, active_only).await {
            return Ok(groups);
        }

        let groups = if active_only {
            self.store.list_active_groups(org_id).await
        } else {
            self.store.list_groups(org_id).await
        }
        .map_err(ServiceError::Store)?;

        self.cache.put_groups(org_id, active_only, &groups).await;
        Ok(groups)
    }

    // Memberships

    pub async fn add_member(
        &self,
        group_id: Uuid,
        req: AddMemberRequest,
        actor: &str,
    ) -> Result<GroupMembership, ServiceError> {
        check_window(req.starts_at, req.ends_at)?;

        let group = self.get_group(group_id).await?;
        if !group.is_operational() {
            return Err(ServiceError::Validation("group is not active".to_string()));
        }

        if let Some(existing) = self
            .store
            .find_membership(group_id, req.user_id)
            .await
            .map_err(ServiceError::Store)?
        {
            if existing.is_active {
                return Err(ServiceError::DuplicateAssignment);
            }
        }

        let mut membership = GroupMembership::new(
            group_id,
            group.organization_id,
            req.user_id,
            actor,
            req.starts_at,
            req.ends_at,
        );
        if let Some(principal_type) = req.principal_type {
            membership.principal_type = principal_type;
        }
        self.store
            .insert_membership(&membership)
            .await
            .map_err(ServiceError::Store)?;

        self.audit_op(
            actor,
            "group.member.add",
            &group,
            format!("Added user {} to group {}", req.user_id, group.name),
            serde_json::json!({ "user_id": req.user_id }),
        )
        .await;
        self.publish(
            InvalidationEvent::new(
                EventKind::UserGroupMembershipChanged,
                group.organization_id,
                "group_membership",
                group_id,
            )
            .with_user(req.user_id),
        )
        .await;

        Ok(membership)
    }

    pub async fn remove_member(
        &self,
        group_id: Uuid,
        user_id: Uuid,
        actor: &str,
    ) -> Result<(), ServiceError> {
        let group = self.get_group(group_id).await?;

        let mut membership = self
            .store
            .find_membership(group_id, user_id)
            .await
            .map_err(ServiceError::Store)?
            .filter(|m| m.is_active)
            .ok_or(ServiceError::MembershipNotFound)?;

        membership.is_active = false;
        self.store
            .update_membership(&membership)
            .await
            .map_err(ServiceError::Store)?;

        self.audit_op(
            actor,
            "group.member.remove",
            &group,
            format!("Removed user {} from group {}", user_id, group.name),
            serde_json::json!({ "user_id": user_id }),
        )
        .await;
        self.publish(
            InvalidationEvent::new(
                EventKind::UserGroupMembershipChanged,
                group.organization_id,
                "group_membership",
                group_id,
            )
            .with_user(user_id),
        )
        .await;

        Ok(())
    }

    pub async fn get_group_members(
        &self,
        group_id: Uuid,
    ) -> Result<Vec<GroupMembership>, ServiceError> {
        let group = self.get_group(group_id).await?;

        if let Some(members) = self
            .cache
            .get_group_members(group.organization_id, group_id)
            .await
        {
            return Ok(members);
        }

        let members = self
            .store
            .list_group_members(group_id)
            .await
            .map_err(ServiceError::Store)?;
        self.cache
            .put_group_members(group.organization_id, group_id, &members)
            .await;
        Ok(members)
    }

    /// Groups the user currently belongs to through active memberships.
    pub async fn get_user_groups(
        &self,
        org_id: Uuid,
        user_id: Uuid,
    ) -> Result<Vec<Group>, ServiceError> {
        if let Some(groups) = self.cache.get_user_groups(org_id, user_id).await {
            return Ok(groups);
        }

        let memberships = self
            .store
            .list_user_memberships(org_id, user_id)
            .await
            .map_err(ServiceError::Store)?;

        let mut groups = Vec::new();
        let mut seen = HashSet::new();
        for membership in memberships.iter().filter(|m| m.is_active) {
            if !seen.insert(membership.group_id) {
                continue;
            }
            let Some(group) = self
                .store
                .find_group_by_id(membership.group_id)
                .await
                .map_err(ServiceError::Store)?
            else {
                continue;
            };
            if !group.lifecycle.is_deleted() {
                groups.push(group);
            }
        }

        self.cache.put_user_groups(org_id, user_id, &groups).await;
        Ok(groups)
    }

    // Role assignment

    pub async fn assign_role(
        &self,
        group_id: Uuid,
        req: AssignRoleRequest,
        actor: &str,
    ) -> Result<GroupRole, ServiceError> {
        check_window(req.starts_at, req.ends_at)?;

        let group = self.get_group(group_id).await?;
        if !group.is_operational() {
            return Err(ServiceError::Validation("group is not active".to_string()));
        }

        let role = self
            .store
            .find_role_by_id(req.role_id)
            .await
            .map_err(ServiceError::Store)?
            .ok_or(ServiceError::RoleNotFound)?;
        if !role.is_active {
            return Err(ServiceError::Validation("role is not active".to_string()));
        }

        if let Some(existing) = self
            .store
            .find_group_role(group_id, req.role_id)
            .await
            .map_err(ServiceError::Store)?
        {
            if existing.is_active {
                return Err(ServiceError::DuplicateAssignment);
            }
        }

        let assignment = GroupRole::new(
            group_id,
            req.role_id,
            group.organization_id,
            actor,
            req.starts_at,
            req.ends_at,
        );
        self.store
            .insert_group_role(&assignment)
            .await
            .map_err(ServiceError::Store)?;

        self.audit_op(
            actor,
            "group.role.assign",
            &group,
            format!("Assigned role {} to group {}", role.name, group.name),
            serde_json::json!({ "role_id": role.id, "role_name": role.name }),
        )
        .await;
        self.publish(
            InvalidationEvent::new(
                EventKind::RoleAssignedToGroup,
                group.organization_id,
                "group_role",
                group_id,
            )
            .with_role(req.role_id),
        )
        .await;

        Ok(assignment)
    }

    pub async fn remove_role(
        &self,
        group_id: Uuid,
        role_id: Uuid,
        actor: &str,
    ) -> Result<(), ServiceError> {
        let group = self.get_group(group_id).await?;

        let mut assignment = self
            .store
            .find_group_role(group_id, role_id)
            .await
            .map_err(ServiceError::Store)?
            .filter(|a| a.is_active)
            .ok_or(ServiceError::AssignmentNotFound)?;

        assignment.is_active = false;
        self.store
            .update_group_role(&assignment)
            .await
            .map_err(ServiceError::Store)?;

        self.audit_op(
            actor,
            "group.role.remove",
            &group,
            format!("Removed role {} from group {}", role_id, group.name),
            serde_json::json!({ "role_id": role_id }),
        )
        .await;
        self.publish(
            InvalidationEvent::new(
                EventKind::RoleRemovedFromGroup,
                group.organization_id,
                "group_role",
                group_id,
            )
            .with_role(role_id),
        )
        .await;

        Ok(())
    }

    async fn check_parent_group(&self, org_id: Uuid, parent_id: Uuid) -> Result<(), ServiceError> {
        let parent = self
            .store
            .find_group_by_id(parent_id)
            .await
            .map_err(ServiceError::Store)?
            .ok_or(ServiceError::ParentNotFound)?;
        if parent.organization_id != org_id {
            return Err(ServiceError::Validation(
                "parent group belongs to a different organization".to_string(),
            ));
        }
        if !parent.is_operational() {
            return Err(ServiceError::ParentInactive);
        }
        Ok(())
    }

    /// Breadth-first walk collecting every descendant group id.
    async fn collect_descendant_ids(&self, group_id: Uuid) -> Result<Vec<Uuid>, ServiceError> {
        let mut ids = Vec::new();
        let mut visited = HashSet::from([group_id]);
        let mut queue = vec![group_id];

        while let Some(node_id) = queue.pop() {
            for child in self
                .store
                .list_child_groups(node_id)
                .await
                .map_err(ServiceError::Store)?
            {
                if visited.insert(child.id) {
                    ids.push(child.id);
                    queue.push(child.id);
                }
            }
        }
        Ok(ids)
    }

    async fn ensure_no_cycle(&self, group_id: Uuid, new_parent_id: Uuid) -> Result<(), ServiceError> {
        let mut visited = HashSet::new();
        let mut current = Some(new_parent_id);

        while let Some(node_id) = current {
            if node_id == group_id {
                return Err(ServiceError::CircularHierarchy);
            }
            if !visited.insert(node_id) {
                return Err(ServiceError::CircularHierarchy);
            }
            current = self
                .store
                .find_group_by_id(node_id)
                .await
                .map_err(ServiceError::Store)?
                .and_then(|g| g.parent_id);
        }
        Ok(())
    }

    async fn audit_op(
        &self,
        actor: &str,
        action: &str,
        group: &Group,
        message: String,
        details: serde_json::Value,
    ) {
        let entry = AuditEntry::new(
            actor,
            action,
            "group",
            &group.id.to_string(),
            message,
            true,
            details,
        );
        if let Err(e) = self.audit.log_operation(entry).await {
            tracing::warn!(error = %e, action = %action, "Failed to write audit entry");
        }
    }

    async fn publish(&self, event: InvalidationEvent) {
        if let Err(e) = self.invalidation.invalidate(&event).await {
            tracing::warn!(
                error = %e,
                event_type = %event.event_type,
                "Cache invalidation failed after mutation"
            );
        }
    }
}

fn check_window(
    starts_at: Option<chrono::DateTime<Utc>>,
    ends_at: Option<chrono::DateTime<Utc>>,
) -> Result<(), ServiceError> {
    if let (Some(start), Some(end)) = (starts_at, ends_at) {
        if start > end {
            return Err(ServiceError::InvalidTimeRange);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;
    use crate::models::{CreateOrganizationRequest, Role};
    use crate::services::audit::RecordingAuditSink;
    use crate::services::organization::OrganizationService;
    use crate::store::InMemoryDirectory;
    use chrono::Duration;

    struct Fixture {
        groups: GroupService,
        store: Arc<InMemoryDirectory>,
        cache: DirectoryCache,
        org_id: Uuid,
    }

    async fn fixture() -> Fixture {
        let store = Arc::new(InMemoryDirectory::new());
        let cache = DirectoryCache::new(Arc::new(MemoryCache::new()));
        let audit = Arc::new(RecordingAuditSink::new());
        let invalidation = Arc::new(InvalidationCoordinator::new(cache.clone()));

        let orgs = OrganizationService::new(
            store.clone(),
            cache.clone(),
            audit.clone(),
            invalidation.clone(),
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

        let groups = GroupService::new(store.clone(), cache.clone(), audit, invalidation);
        Fixture {
            groups,
            store,
            cache,
            org_id: org.id,
        }
    }

    fn create_req(name: &str, parent_id: Option<Uuid>) -> CreateGroupRequest {
        CreateGroupRequest {
            name: name.to_string(),
            description: None,
            parent_id,
        }
    }

    async fn seed_role(store: &InMemoryDirectory, name: &str) -> Role {
        let role = Role::new(name.to_string(), None, None);
        store.insert_role(&role).await.unwrap();
        role
    }

    #[tokio::test]
    async fn test_create_and_duplicate_name() {
        let f = fixture().await;
        f.groups
            .create_group(f.org_id, create_req("devs", None), "admin")
            .await
            .unwrap();

        let result = f
            .groups
            .create_group(f.org_id, create_req("devs", None), "admin")
            .await;
        assert!(matches!(result, Err(ServiceError::NameConflict(_))));
    }

    #[tokio::test]
    async fn test_reparent_cycle_rejected() {
        let f = fixture().await;
        let a = f
            .groups
            .create_group(f.org_id, create_req("a", None), "admin")
            .await
            .unwrap();
        let b = f
            .groups
            .create_group(f.org_id, create_req("b", Some(a.id)), "admin")
            .await
            .unwrap();

        let patch = UpdateGroupRequest {
            parent_id: Some(Some(b.id)),
            ..Default::default()
        };
        let result = f.groups.update_group(a.id, patch, "admin").await;
        assert!(matches!(result, Err(ServiceError::CircularHierarchy)));
    }

    #[tokio::test]
    async fn test_cross_org_parent_rejected() {
        let f = fixture().await;
        let other_org = crate::models::Organization::new("other".to_string(), None, None);
        f.store.insert_organization(&other_org).await.unwrap();
        let foreign = Group::new(other_org.id, "foreign".to_string(), None, None);
        f.store.insert_group(&foreign).await.unwrap();

        let result = f
            .groups
            .create_group(f.org_id, create_req("local", Some(foreign.id)), "admin")
            .await;
        assert!(matches!(result, Err(ServiceError::Validation(_))));
    }

    #[tokio::test]
    async fn test_membership_lifecycle() {
        let f = fixture().await;
        let group = f
            .groups
            .create_group(f.org_id, create_req("devs", None), "admin")
            .await
            .unwrap();
        let user = Uuid::new_v4();

        f.groups
            .add_member(
                group.id,
                AddMemberRequest {
                    user_id: user,
                    principal_type: None,
                    starts_at: None,
                    ends_at: None,
                },
                "admin",
            )
            .await
            .unwrap();

        // Duplicate active membership is rejected.
        let result = f
            .groups
            .add_member(
                group.id,
                AddMemberRequest {
                    user_id: user,
                    principal_type: None,
                    starts_at: None,
                    ends_at: None,
                },
                "admin",
            )
            .await;
        assert!(matches!(result, Err(ServiceError::DuplicateAssignment)));

        let user_groups = f.groups.get_user_groups(f.org_id, user).await.unwrap();
        assert_eq!(user_groups.len(), 1);

        f.groups.remove_member(group.id, user, "admin").await.unwrap();
        let user_groups = f.groups.get_user_groups(f.org_id, user).await.unwrap();
        assert!(user_groups.is_empty());

        // Removing again fails.
        assert!(matches!(
            f.groups.remove_member(group.id, user, "admin").await,
            Err(ServiceError::MembershipNotFound)
        ));
    }

    #[tokio::test]
    async fn test_invalid_window_rejected() {
        let f = fixture().await;
        let group = f
            .groups
            .create_group(f.org_id, create_req("devs", None), "admin")
            .await
            .unwrap();
        let now = Utc::now();

        let result = f
            .groups
            .add_member(
                group.id,
                AddMemberRequest {
                    user_id: Uuid::new_v4(),
                    principal_type: None,
                    starts_at: Some(now),
                    ends_at: Some(now - Duration::hours(1)),
                },
                "admin",
            )
            .await;
        assert!(matches!(result, Err(ServiceError::InvalidTimeRange)));
    }

    #[tokio::test]
    async fn test_role_assignment_lifecycle() {
        let f = fixture().await;
        let group = f
            .groups
            .create_group(f.org_id, create_req("devs", None), "admin")
            .await
            .unwrap();
        let role = seed_role(&f.store, "admin-role").await;

        f.groups
            .assign_role(
                group.id,
                AssignRoleRequest {
                    role_id: role.id,
                    starts_at: None,
                    ends_at: None,
                },
                "admin",
            )
            .await
            .unwrap();

        let result = f
            .groups
            .assign_role(
                group.id,
                AssignRoleRequest {
                    role_id: role.id,
                    starts_at: None,
                    ends_at: None,
                },
                "admin",
            )
            .await;
        assert!(matches!(result, Err(ServiceError::DuplicateAssignment)));

        f.groups.remove_role(group.id, role.id, "admin").await.unwrap();
        assert!(matches!(
            f.groups.remove_role(group.id, role.id, "admin").await,
            Err(ServiceError::AssignmentNotFound)
        ));
    }

    #[tokio::test]
    async fn test_assigning_inactive_role_rejected() {
        let f = fixture().await;
        let group = f
            .groups
            .create_group(f.org_id, create_req("devs", None), "admin")
            .await
            .unwrap();
        let mut role = seed_role(&f.store, "stale").await;
        role.is_active = false;
        f.store.update_role(&role).await.unwrap();

        let result = f
            .groups
            .assign_role(
                group.id,
                AssignRoleRequest {
                    role_id: role.id,
                    starts_at: None,
                    ends_at: None,
                },
                "admin",
            )
            .await;
        assert!(matches!(result, Err(ServiceError::Validation(_))));
    }

    #[tokio::test]
    async fn test_reparent_purges_descendant_member_caches() {
        let f = fixture().await;
        let parent = f
            .groups
            .create_group(f.org_id, create_req("parent", None), "admin")
            .await
            .unwrap();
        let child = f
            .groups
            .create_group(f.org_id, create_req("child", Some(parent.id)), "admin")
            .await
            .unwrap();
        let new_root = f
            .groups
            .create_group(f.org_id, create_req("new-root", None), "admin")
            .await
            .unwrap();

        // Warm the descendant's member listing.
        f.groups.get_group_members(child.id).await.unwrap();
        assert!(f
            .cache
            .get_group_members(f.org_id, child.id)
            .await
            .is_some());

        let patch = UpdateGroupRequest {
            parent_id: Some(Some(new_root.id)),
            ..Default::default()
        };
        f.groups.update_group(parent.id, patch, "admin").await.unwrap();

        assert!(f
            .cache
            .get_group_members(f.org_id, child.id)
            .await
            .is_none());
    }

    #[tokio::test]
    async fn test_delete_refused_with_active_children() {
        let f = fixture().await;
        let parent = f
            .groups
            .create_group(f.org_id, create_req("parent", None), "admin")
            .await
            .unwrap();
        f.groups
            .create_group(f.org_id, create_req("child", Some(parent.id)), "admin")
            .await
            .unwrap();

        assert!(matches!(
            f.groups.delete_group(parent.id, "admin").await,
            Err(ServiceError::HasActiveChildren)
        ));
    }
}
