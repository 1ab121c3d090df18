//! In-memory directory store for tests and embedded use.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;

use crate::models::{
    Group, GroupMembership, GroupRole, Organization, Permission, Role, RolePermission, UserRole,
};

use super::{DirectoryStore, StoreResult};

#[derive(Default)]
struct Inner {
    organizations: HashMap<Uuid, Organization>,
    groups: HashMap<Uuid, Group>,
    memberships: Vec<GroupMembership>,
    roles: HashMap<Uuid, Role>,
    permissions: HashMap<Uuid, Permission>,
    role_permissions: Vec<RolePermission>,
    group_roles: Vec<GroupRole>,
    user_roles: Vec<UserRole>,
}

#[derive(Default)]
pub struct InMemoryDirectory {
    inner: Mutex<Inner>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Inner>, anyhow::Error> {
        self.inner
            .lock()
            .map_err(|e| anyhow::anyhow!("directory mutex poisoned: {}", e))
    }
}

fn sorted_by_name(mut orgs: Vec<Organization>) -> Vec<Organization> {
    orgs.sort_by(|a, b| a.name.cmp(&b.name));
    orgs
}

fn sorted_groups(mut groups: Vec<Group>) -> Vec<Group> {
    groups.sort_by(|a, b| a.name.cmp(&b.name));
    groups
}

#[async_trait]
impl DirectoryStore for InMemoryDirectory {
    async fn insert_organization(&self, org: &Organization) -> StoreResult<()> {
        self.lock()?.organizations.insert(org.id, org.clone());
        Ok(())
    }

    async fn find_organization_by_id(&self, id: Uuid) -> StoreResult<Option<Organization>> {
        Ok(self.lock()?.organizations.get(&id).cloned())
    }

    async fn find_organization_by_name(&self, name: &str) -> StoreResult<Option<Organization>> {
        Ok(self
            .lock()?
            .organizations
            .values()
            .find(|o| o.name == name)
            .cloned())
    }

    async fn update_organization(&self, org: &Organization) -> StoreResult<()> {
        self.lock()?.organizations.insert(org.id, org.clone());
        Ok(())
    }

    async fn list_children(&self, parent_id: Uuid) -> StoreResult<Vec<Organization>> {
        let children = self
            .lock()?
            .organizations
            .values()
            .filter(|o| o.parent_id == Some(parent_id) && !o.lifecycle.is_deleted())
            .cloned()
            .collect();
        Ok(sorted_by_name(children))
    }

    async fn list_active_children(&self, parent_id: Uuid) -> StoreResult<Vec<Organization>> {
        let children = self
            .lock()?
            .organizations
            .values()
            .filter(|o| o.parent_id == Some(parent_id) && o.is_operational())
            .cloned()
            .collect();
        Ok(sorted_by_name(children))
    }

    async fn count_children(&self, org_id: Uuid) -> StoreResult<i64> {
        Ok(self
            .lock()?
            .organizations
            .values()
            .filter(|o| o.parent_id == Some(org_id) && !o.lifecycle.is_deleted())
            .count() as i64)
    }

    async fn count_groups(&self, org_id: Uuid) -> StoreResult<i64> {
        Ok(self
            .lock()?
            .groups
            .values()
            .filter(|g| g.organization_id == org_id && !g.lifecycle.is_deleted())
            .count() as i64)
    }

    async fn count_users(&self, org_id: Uuid) -> StoreResult<i64> {
        let inner = self.lock()?;
        let users: std::collections::HashSet<Uuid> = inner
            .memberships
            .iter()
            .filter(|m| m.organization_id == org_id && m.is_active)
            .map(|m| m.user_id)
            .collect();
        Ok(users.len() as i64)
    }

    async fn insert_group(&self, group: &Group) -> StoreResult<()> {
        self.lock()?.groups.insert(group.id, group.clone());
        Ok(())
    }

    async fn find_group_by_id(&self, id: Uuid) -> StoreResult<Option<Group>> {
        Ok(self.lock()?.groups.get(&id).cloned())
    }

    async fn find_group_by_name(&self, org_id: Uuid, name: &str) -> StoreResult<Option<Group>> {
        Ok(self
            .lock()?
            .groups
            .values()
            .find(|g| g.organization_id == org_id && g.name == name)
            .cloned())
    }

    async fn update_group(&self, group: &Group) -> StoreResult<()> {
        self.lock()?.groups.insert(group.id, group.clone());
        Ok(())
    }

    async fn list_groups(&self, org_id: Uuid) -> StoreResult<Vec<Group>> {
        let groups = self
            .lock()?
            .groups
            .values()
            .filter(|g| g.organization_id == org_id && !g.lifecycle.is_deleted())
            .cloned()
            .collect();
        Ok(sorted_groups(groups))
    }

    async fn list_active_groups(&self, org_id: Uuid) -> StoreResult<Vec<Group>> {
        let groups = self
            .lock()?
            .groups
            .values()
            .filter(|g| g.organization_id == org_id && g.is_operational())
            .cloned()
            .collect();
        Ok(sorted_groups(groups))
    }

    async fn list_child_groups(&self, group_id: Uuid) -> StoreResult<Vec<Group>> {
        let groups = self
            .lock()?
            .groups
            .values()
            .filter(|g| g.parent_id == Some(group_id) && !g.lifecycle.is_deleted())
            .cloned()
            .collect();
        Ok(sorted_groups(groups))
    }

    async fn has_active_groups(&self, org_id: Uuid) -> StoreResult<bool> {
        Ok(self
            .lock()?
            .groups
            .values()
            .any(|g| g.organization_id == org_id && g.is_operational()))
    }

    async fn insert_membership(&self, membership: &GroupMembership) -> StoreResult<()> {
        self.lock()?.memberships.push(membership.clone());
        Ok(())
    }

    async fn find_membership(
        &self,
        group_id: Uuid,
        user_id: Uuid,
    ) -> StoreResult<Option<GroupMembership>> {
        Ok(self
            .lock()?
            .memberships
            .iter()
            .filter(|m| m.group_id == group_id && m.user_id == user_id)
            .max_by_key(|m| m.created_at)
            .cloned())
    }

    async fn update_membership(&self, membership: &GroupMembership) -> StoreResult<()> {
        let mut inner = self.lock()?;
        if let Some(existing) = inner.memberships.iter_mut().find(|m| m.id == membership.id) {
            *existing = membership.clone();
        }
        Ok(())
    }

    async fn list_group_members(&self, group_id: Uuid) -> StoreResult<Vec<GroupMembership>> {
        Ok(self
            .lock()?
            .memberships
            .iter()
            .filter(|m| m.group_id == group_id)
            .cloned()
            .collect())
    }

    async fn list_user_memberships(
        &self,
        org_id: Uuid,
        user_id: Uuid,
    ) -> StoreResult<Vec<GroupMembership>> {
        Ok(self
            .lock()?
            .memberships
            .iter()
            .filter(|m| m.organization_id == org_id && m.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn insert_role(&self, role: &Role) -> StoreResult<()> {
        self.lock()?.roles.insert(role.id, role.clone());
        Ok(())
    }

    async fn find_role_by_id(&self, id: Uuid) -> StoreResult<Option<Role>> {
        Ok(self.lock()?.roles.get(&id).cloned())
    }

    async fn find_role_by_name(&self, name: &str) -> StoreResult<Option<Role>> {
        Ok(self.lock()?.roles.values().find(|r| r.name == name).cloned())
    }

    async fn update_role(&self, role: &Role) -> StoreResult<()> {
        self.lock()?.roles.insert(role.id, role.clone());
        Ok(())
    }

    async fn list_roles(&self) -> StoreResult<Vec<Role>> {
        let mut roles: Vec<Role> = self.lock()?.roles.values().cloned().collect();
        roles.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(roles)
    }

    async fn insert_permission(&self, permission: &Permission) -> StoreResult<()> {
        self.lock()?
            .permissions
            .insert(permission.id, permission.clone());
        Ok(())
    }

    async fn find_permission_by_id(&self, id: Uuid) -> StoreResult<Option<Permission>> {
        Ok(self.lock()?.permissions.get(&id).cloned())
    }

    async fn find_permission_by_name(&self, name: &str) -> StoreResult<Option<Permission>> {
        Ok(self
            .lock()?
            .permissions
            .values()
            .find(|p| p.name == name)
            .cloned())
    }

    async fn list_permissions(&self) -> StoreResult<Vec<Permission>> {
        let mut permissions: Vec<Permission> =
            self.lock()?.permissions.values().cloned().collect();
        permissions.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(permissions)
    }

    async fn insert_role_permission(&self, rp: &RolePermission) -> StoreResult<()> {
        self.lock()?.role_permissions.push(rp.clone());
        Ok(())
    }

    async fn list_role_permissions(&self, role_id: Uuid) -> StoreResult<Vec<RolePermission>> {
        Ok(self
            .lock()?
            .role_permissions
            .iter()
            .filter(|rp| rp.role_id == role_id)
            .cloned()
            .collect())
    }

    async fn insert_group_role(&self, assignment: &GroupRole) -> StoreResult<()> {
        self.lock()?.group_roles.push(assignment.clone());
        Ok(())
    }

    async fn find_group_role(
        &self,
        group_id: Uuid,
        role_id: Uuid,
    ) -> StoreResult<Option<GroupRole>> {
        Ok(self
            .lock()?
            .group_roles
            .iter()
            .filter(|a| a.group_id == group_id && a.role_id == role_id)
            .max_by_key(|a| a.created_at)
            .cloned())
    }

    async fn update_group_role(&self, assignment: &GroupRole) -> StoreResult<()> {
        let mut inner = self.lock()?;
        if let Some(existing) = inner.group_roles.iter_mut().find(|a| a.id == assignment.id) {
            *existing = assignment.clone();
        }
        Ok(())
    }

    async fn list_group_roles(&self, group_id: Uuid) -> StoreResult<Vec<GroupRole>> {
        Ok(self
            .lock()?
            .group_roles
            .iter()
            .filter(|a| a.group_id == group_id)
            .cloned()
            .collect())
    }

    async fn insert_user_role(&self, assignment: &UserRole) -> StoreResult<()> {
        self.lock()?.user_roles.push(assignment.clone());
        Ok(())
    }

    async fn find_user_role(
        &self,
        org_id: Uuid,
        user_id: Uuid,
        role_id: Uuid,
    ) -> StoreResult<Option<UserRole>> {
        Ok(self
            .lock()?
            .user_roles
            .iter()
            .filter(|a| {
                a.organization_id == org_id && a.user_id == user_id && a.role_id == role_id
            })
            .max_by_key(|a| a.created_at)
            .cloned())
    }

    async fn update_user_role(&self, assignment: &UserRole) -> StoreResult<()> {
        let mut inner = self.lock()?;
        if let Some(existing) = inner.user_roles.iter_mut().find(|a| a.id == assignment.id) {
            *existing = assignment.clone();
        }
        Ok(())
    }

    async fn list_user_roles(&self, org_id: Uuid, user_id: Uuid) -> StoreResult<Vec<UserRole>> {
        Ok(self
            .lock()?
            .user_roles
            .iter()
            .filter(|a| a.organization_id == org_id && a.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn health_check(&self) -> StoreResult<()> {
        Ok(())
    }
}
