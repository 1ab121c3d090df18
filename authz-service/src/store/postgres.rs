//! PostgreSQL-backed directory store.

use async_trait::async_trait;
use sqlx::postgres::PgPool;
use uuid::Uuid;

use crate::models::{
    Group, GroupMembership, GroupRole, Organization, Permission, Role, RolePermission, UserRole,
};

use super::{DirectoryStore, StoreResult};

#[derive(Clone)]
pub struct PgDirectoryStore {
    pool: PgPool,
}

impl PgDirectoryStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl DirectoryStore for PgDirectoryStore {
    async fn insert_organization(&self, org: &Organization) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO organizations
                (id, name, description, parent_id, is_active, deleted_at, deleted_by, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(org.id)
        .bind(&org.name)
        .bind(&org.description)
        .bind(org.parent_id)
        .bind(org.is_active)
        .bind(org.lifecycle.deleted_at())
        .bind(org.lifecycle.deleted_by())
        .bind(org.created_at)
        .bind(org.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_organization_by_id(&self, id: Uuid) -> StoreResult<Option<Organization>> {
        let org = sqlx::query_as::<_, Organization>("SELECT * FROM organizations WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(org)
    }

    async fn find_organization_by_name(&self, name: &str) -> StoreResult<Option<Organization>> {
        let org =
            sqlx::query_as::<_, Organization>("SELECT * FROM organizations WHERE name = $1")
                .bind(name)
                .fetch_optional(&self.pool)
                .await?;
        Ok(org)
    }

    async fn update_organization(&self, org: &Organization) -> StoreResult<()> {
        sqlx::query(
            r#"
            UPDATE organizations
            SET name = $2, description = $3, parent_id = $4, is_active = $5,
                deleted_at = $6, deleted_by = $7, updated_at = $8
            WHERE id = $1
            "#,
        )
        .bind(org.id)
        .bind(&org.name)
        .bind(&org.description)
        .bind(org.parent_id)
        .bind(org.is_active)
        .bind(org.lifecycle.deleted_at())
        .bind(org.lifecycle.deleted_by())
        .bind(org.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_children(&self, parent_id: Uuid) -> StoreResult<Vec<Organization>> {
        let orgs = sqlx::query_as::<_, Organization>(
            "SELECT * FROM organizations WHERE parent_id = $1 AND deleted_at IS NULL ORDER BY name",
        )
        .bind(parent_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(orgs)
    }

    async fn list_active_children(&self, parent_id: Uuid) -> StoreResult<Vec<Organization>> {
        let orgs = sqlx::query_as::<_, Organization>(
            r#"
            SELECT * FROM organizations
            WHERE parent_id = $1 AND is_active = TRUE AND deleted_at IS NULL
            ORDER BY name
            "#,
        )
        .bind(parent_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(orgs)
    }

    async fn count_children(&self, org_id: Uuid) -> StoreResult<i64> {
        let count: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM organizations WHERE parent_id = $1 AND deleted_at IS NULL",
        )
        .bind(org_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count.0)
    }

    async fn count_groups(&self, org_id: Uuid) -> StoreResult<i64> {
        let count: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM groups WHERE organization_id = $1 AND deleted_at IS NULL",
        )
        .bind(org_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count.0)
    }

    async fn count_users(&self, org_id: Uuid) -> StoreResult<i64> {
        let count: (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(DISTINCT user_id) FROM group_memberships
            WHERE organization_id = $1 AND is_active = TRUE
            "#,
        )
        .bind(org_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count.0)
    }

    async fn insert_group(&self, group: &Group) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO groups
                (id, organization_id, name, description, parent_id, is_active,
                 deleted_at, deleted_by, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(group.id)
        .bind(group.organization_id)
        .bind(&group.name)
        .bind(&group.description)
        .bind(group.parent_id)
        .bind(group.is_active)
        .bind(group.lifecycle.deleted_at())
        .bind(group.lifecycle.deleted_by())
        .bind(group.created_at)
        .bind(group.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_group_by_id(&self, id: Uuid) -> StoreResult<Option<Group>> {
        let group = sqlx::query_as::<_, Group>("SELECT * FROM groups WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(group)
    }

    async fn find_group_by_name(&self, org_id: Uuid, name: &str) -> StoreResult<Option<Group>> {
        let group = sqlx::query_as::<_, Group>(
            "SELECT * FROM groups WHERE organization_id = $1 AND name = $2",
        )
        .bind(org_id)
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;
        Ok(group)
    }

    async fn update_group(&self, group: &Group) -> StoreResult<()> {
        sqlx::query(
            r#"
            UPDATE groups
            SET name = $2, description = $3, parent_id = $4, is_active = $5,
                deleted_at = $6, deleted_by = $7, updated_at = $8
            WHERE id = $1
            "#,
        )
        .bind(group.id)
        .bind(&group.name)
        .bind(&group.description)
        .bind(group.parent_id)
        .bind(group.is_active)
        .bind(group.lifecycle.deleted_at())
        .bind(group.lifecycle.deleted_by())
        .bind(group.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_groups(&self, org_id: Uuid) -> StoreResult<Vec<Group>> {
        let groups = sqlx::query_as::<_, Group>(
            "SELECT * FROM groups WHERE organization_id = $1 AND deleted_at IS NULL ORDER BY name",
        )
        .bind(org_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(groups)
    }

    async fn list_active_groups(&self, org_id: Uuid) -> StoreResult<Vec<Group>> {
        let groups = sqlx::query_as::<_, Group>(
            r#"
            SELECT * FROM groups
            WHERE organization_id = $1 AND is_active = TRUE AND deleted_at IS NULL
            ORDER BY name
            "#,
        )
        .bind(org_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(groups)
    }

    async fn list_child_groups(&self, group_id: Uuid) -> StoreResult<Vec<Group>> {
        let groups = sqlx::query_as::<_, Group>(
            "SELECT * FROM groups WHERE parent_id = $1 AND deleted_at IS NULL ORDER BY name",
        )
        .bind(group_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(groups)
    }

    async fn has_active_groups(&self, org_id: Uuid) -> StoreResult<bool> {
        let count: (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*) FROM groups
            WHERE organization_id = $1 AND is_active = TRUE AND deleted_at IS NULL
            "#,
        )
        .bind(org_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count.0 > 0)
    }

    async fn insert_membership(&self, membership: &GroupMembership) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO group_memberships
                (id, group_id, organization_id, user_id, principal_type, added_by,
                 starts_at, ends_at, is_active, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(membership.id)
        .bind(membership.group_id)
        .bind(membership.organization_id)
        .bind(membership.user_id)
        .bind(&membership.principal_type)
        .bind(&membership.added_by)
        .bind(membership.starts_at)
        .bind(membership.ends_at)
        .bind(membership.is_active)
        .bind(membership.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_membership(
        &self,
        group_id: Uuid,
        user_id: Uuid,
    ) -> StoreResult<Option<GroupMembership>> {
        let membership = sqlx::query_as::<_, GroupMembership>(
            r#"
            SELECT * FROM group_memberships
            WHERE group_id = $1 AND user_id = $2
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(group_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(membership)
    }

    async fn update_membership(&self, membership: &GroupMembership) -> StoreResult<()> {
        sqlx::query(
            r#"
            UPDATE group_memberships
            SET starts_at = $2, ends_at = $3, is_active = $4
            WHERE id = $1
            "#,
        )
        .bind(membership.id)
        .bind(membership.starts_at)
        .bind(membership.ends_at)
        .bind(membership.is_active)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_group_members(&self, group_id: Uuid) -> StoreResult<Vec<GroupMembership>> {
        let members = sqlx::query_as::<_, GroupMembership>(
            "SELECT * FROM group_memberships WHERE group_id = $1 ORDER BY created_at",
        )
        .bind(group_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(members)
    }

    async fn list_user_memberships(
        &self,
        org_id: Uuid,
        user_id: Uuid,
    ) -> StoreResult<Vec<GroupMembership>> {
        let memberships = sqlx::query_as::<_, GroupMembership>(
            r#"
            SELECT * FROM group_memberships
            WHERE organization_id = $1 AND user_id = $2
            ORDER BY created_at
            "#,
        )
        .bind(org_id)
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(memberships)
    }

    async fn insert_role(&self, role: &Role) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO roles (id, name, description, organization_id, is_active, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(role.id)
        .bind(&role.name)
        .bind(&role.description)
        .bind(role.organization_id)
        .bind(role.is_active)
        .bind(role.created_at)
        .bind(role.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_role_by_id(&self, id: Uuid) -> StoreResult<Option<Role>> {
        let role = sqlx::query_as::<_, Role>("SELECT * FROM roles WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(role)
    }

    async fn find_role_by_name(&self, name: &str) -> StoreResult<Option<Role>> {
        let role = sqlx::query_as::<_, Role>("SELECT * FROM roles WHERE name = $1")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;
        Ok(role)
    }

    async fn update_role(&self, role: &Role) -> StoreResult<()> {
        sqlx::query(
            r#"
            UPDATE roles
            SET name = $2, description = $3, is_active = $4, updated_at = $5
            WHERE id = $1
            "#,
        )
        .bind(role.id)
        .bind(&role.name)
        .bind(&role.description)
        .bind(role.is_active)
        .bind(role.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_roles(&self) -> StoreResult<Vec<Role>> {
        let roles = sqlx::query_as::<_, Role>("SELECT * FROM roles ORDER BY name")
            .fetch_all(&self.pool)
            .await?;
        Ok(roles)
    }

    async fn insert_permission(&self, permission: &Permission) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO permissions
                (id, name, description, action, resource, source,
                 valid_starts_at, valid_ends_at, is_active, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(permission.id)
        .bind(&permission.name)
        .bind(&permission.description)
        .bind(&permission.action)
        .bind(&permission.resource)
        .bind(&permission.source)
        .bind(permission.valid_starts_at)
        .bind(permission.valid_ends_at)
        .bind(permission.is_active)
        .bind(permission.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_permission_by_id(&self, id: Uuid) -> StoreResult<Option<Permission>> {
        let permission = sqlx::query_as::<_, Permission>("SELECT * FROM permissions WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(permission)
    }

    async fn find_permission_by_name(&self, name: &str) -> StoreResult<Option<Permission>> {
        let permission =
            sqlx::query_as::<_, Permission>("SELECT * FROM permissions WHERE name = $1")
                .bind(name)
                .fetch_optional(&self.pool)
                .await?;
        Ok(permission)
    }

    async fn list_permissions(&self) -> StoreResult<Vec<Permission>> {
        let permissions = sqlx::query_as::<_, Permission>("SELECT * FROM permissions ORDER BY name")
            .fetch_all(&self.pool)
            .await?;
        Ok(permissions)
    }

    async fn insert_role_permission(&self, rp: &RolePermission) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO role_permissions (id, role_id, permission_id, created_at)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(rp.id)
        .bind(rp.role_id)
        .bind(rp.permission_id)
        .bind(rp.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_role_permissions(&self, role_id: Uuid) -> StoreResult<Vec<RolePermission>> {
        let rps = sqlx::query_as::<_, RolePermission>(
            "SELECT * FROM role_permissions WHERE role_id = $1",
        )
        .bind(role_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rps)
    }

    async fn insert_group_role(&self, assignment: &GroupRole) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO group_roles
                (id, group_id, role_id, organization_id, assigned_by, starts_at, ends_at, is_active, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(assignment.id)
        .bind(assignment.group_id)
        .bind(assignment.role_id)
        .bind(assignment.organization_id)
        .bind(&assignment.assigned_by)
        .bind(assignment.starts_at)
        .bind(assignment.ends_at)
        .bind(assignment.is_active)
        .bind(assignment.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_group_role(
        &self,
        group_id: Uuid,
        role_id: Uuid,
    ) -> StoreResult<Option<GroupRole>> {
        let assignment = sqlx::query_as::<_, GroupRole>(
            r#"
            SELECT * FROM group_roles
            WHERE group_id = $1 AND role_id = $2
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(group_id)
        .bind(role_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(assignment)
    }

    async fn update_group_role(&self, assignment: &GroupRole) -> StoreResult<()> {
        sqlx::query(
            r#"
            UPDATE group_roles
            SET starts_at = $2, ends_at = $3, is_active = $4
            WHERE id = $1
            "#,
        )
        .bind(assignment.id)
        .bind(assignment.starts_at)
        .bind(assignment.ends_at)
        .bind(assignment.is_active)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_group_roles(&self, group_id: Uuid) -> StoreResult<Vec<GroupRole>> {
        let assignments = sqlx::query_as::<_, GroupRole>(
            "SELECT * FROM group_roles WHERE group_id = $1 ORDER BY created_at",
        )
        .bind(group_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(assignments)
    }

    async fn insert_user_role(&self, assignment: &UserRole) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO user_roles
                (id, user_id, role_id, organization_id, assigned_by, starts_at, ends_at, is_active, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(assignment.id)
        .bind(assignment.user_id)
        .bind(assignment.role_id)
        .bind(assignment.organization_id)
        .bind(&assignment.assigned_by)
        .bind(assignment.starts_at)
        .bind(assignment.ends_at)
        .bind(assignment.is_active)
        .bind(assignment.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_user_role(
        &self,
        org_id: Uuid,
        user_id: Uuid,
        role_id: Uuid,
    ) -> StoreResult<Option<UserRole>> {
        let assignment = sqlx::query_as::<_, UserRole>(
            r#"
            SELECT * FROM user_roles
            WHERE organization_id = $1 AND user_id = $2 AND role_id = $3
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(org_id)
        .bind(user_id)
        .bind(role_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(assignment)
    }

    async fn update_user_role(&self, assignment: &UserRole) -> StoreResult<()> {
        sqlx::query(
            r#"
            UPDATE user_roles
            SET starts_at = $2, ends_at = $3, is_active = $4
            WHERE id = $1
            "#,
        )
        .bind(assignment.id)
        .bind(assignment.starts_at)
        .bind(assignment.ends_at)
        .bind(assignment.is_active)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_user_roles(&self, org_id: Uuid, user_id: Uuid) -> StoreResult<Vec<UserRole>> {
        let assignments = sqlx::query_as::<_, UserRole>(
            r#"
            SELECT * FROM user_roles
            WHERE organization_id = $1 AND user_id = $2
            ORDER BY created_at
            "#,
        )
        .bind(org_id)
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(assignments)
    }

    async fn health_check(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
