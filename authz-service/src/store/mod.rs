//! Directory store: persistence contract for organizations, groups,
//! memberships, roles, and assignments.

pub mod memory;
pub mod postgres;

pub use memory::InMemoryDirectory;
pub use postgres::PgDirectoryStore;

use async_trait::async_trait;
use uuid::Uuid;

use crate::models::{
    Group, GroupMembership, GroupRole, Organization, Permission, Role, RolePermission, UserRole,
};

pub type StoreResult<T> = Result<T, anyhow::Error>;

/// Persistence seam for the directory. Soft-deleted organizations and groups
/// stay in the store; `find_*` methods return them as-is and callers apply
/// lifecycle filtering.
#[async_trait]
pub trait DirectoryStore: Send + Sync {
    // Organizations
    async fn insert_organization(&self, org: &Organization) -> StoreResult<()>;
    async fn find_organization_by_id(&self, id: Uuid) -> StoreResult<Option<Organization>>;
    async fn find_organization_by_name(&self, name: &str) -> StoreResult<Option<Organization>>;
    async fn update_organization(&self, org: &Organization) -> StoreResult<()>;
    async fn list_children(&self, parent_id: Uuid) -> StoreResult<Vec<Organization>>;
    async fn list_active_children(&self, parent_id: Uuid) -> StoreResult<Vec<Organization>>;
    async fn count_children(&self, org_id: Uuid) -> StoreResult<i64>;
    async fn count_groups(&self, org_id: Uuid) -> StoreResult<i64>;
    async fn count_users(&self, org_id: Uuid) -> StoreResult<i64>;

    // Groups
    async fn insert_group(&self, group: &Group) -> StoreResult<()>;
    async fn find_group_by_id(&self, id: Uuid) -> StoreResult<Option<Group>>;
    async fn find_group_by_name(&self, org_id: Uuid, name: &str) -> StoreResult<Option<Group>>;
    async fn update_group(&self, group: &Group) -> StoreResult<()>;
    async fn list_groups(&self, org_id: Uuid) -> StoreResult<Vec<Group>>;
    async fn list_active_groups(&self, org_id: Uuid) -> StoreResult<Vec<Group>>;
    async fn list_child_groups(&self, group_id: Uuid) -> StoreResult<Vec<Group>>;
    async fn has_active_groups(&self, org_id: Uuid) -> StoreResult<bool>;

    // Memberships
    async fn insert_membership(&self, membership: &GroupMembership) -> StoreResult<()>;
    async fn find_membership(
        &self,
        group_id: Uuid,
        user_id: Uuid,
    ) -> StoreResult<Option<GroupMembership>>;
    async fn update_membership(&self, membership: &GroupMembership) -> StoreResult<()>;
    async fn list_group_members(&self, group_id: Uuid) -> StoreResult<Vec<GroupMembership>>;
    async fn list_user_memberships(
        &self,
        org_id: Uuid,
        user_id: Uuid,
    ) -> StoreResult<Vec<GroupMembership>>;

    // Roles and permissions
    async fn insert_role(&self, role: &Role) -> StoreResult<()>;
    async fn find_role_by_id(&self, id: Uuid) -> StoreResult<Option<Role>>;
    async fn find_role_by_name(&self, name: &str) -> StoreResult<Option<Role>>;
    async fn update_role(&self, role: &Role) -> StoreResult<()>;
    async fn list_roles(&self) -> StoreResult<Vec<Role>>;
    async fn insert_permission(&self, permission: &Permission) -> StoreResult<()>;
    async fn find_permission_by_id(&self, id: Uuid) -> StoreResult<Option<Permission>>;
    async fn find_permission_by_name(&self, name: &str) -> StoreResult<Option<Permission>>;
    async fn list_permissions(&self) -> StoreResult<Vec<Permission>>;
    async fn insert_role_permission(&self, rp: &RolePermission) -> StoreResult<()>;
    async fn list_role_permissions(&self, role_id: Uuid) -> StoreResult<Vec<RolePermission>>;

    // Assignments
    async fn insert_group_role(&self, assignment: &GroupRole) -> StoreResult<()>;
    async fn find_group_role(
        &self,
        group_id: Uuid,
        role_id: Uuid,
    ) -> StoreResult<Option<GroupRole>>;
    async fn update_group_role(&self, assignment: &GroupRole) -> StoreResult<()>;
    async fn list_group_roles(&self, group_id: Uuid) -> StoreResult<Vec<GroupRole>>;
    async fn insert_user_role(&self, assignment: &UserRole) -> StoreResult<()>;
    async fn find_user_role(
        &self,
        org_id: Uuid,
        user_id: Uuid,
        role_id: Uuid,
    ) -> StoreResult<Option<UserRole>>;
    async fn update_user_role(&self, assignment: &UserRole) -> StoreResult<()>;
    async fn list_user_roles(&self, org_id: Uuid, user_id: Uuid) -> StoreResult<Vec<UserRole>>;

    async fn health_check(&self) -> StoreResult<()>;
}
