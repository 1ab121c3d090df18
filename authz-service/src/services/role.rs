//! Role and permission management, plus direct user-role grants.
//!
//! Role and permission mutations push the refreshed vocabulary to the
//! schema engine; vocabulary push failures are logged and never fail the
//! mutation that triggered them.

use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::cache::keys;
use crate::models::{
    AssignRoleRequest, CreatePermissionRequest, CreateRoleRequest, Permission, Role,
    RolePermission, UpdateRoleRequest, UserRole,
};
use crate::store::DirectoryStore;

use super::audit::{AuditEntry, AuditSink};
use super::directory_cache::DirectoryCache;
use super::error::ServiceError;
use super::invalidation::{EventKind, InvalidationCoordinator, InvalidationEvent};
use super::schema_sync::{SchemaSyncClient, Vocabulary};

#[derive(Clone)]
pub struct RoleService {
    store: Arc<dyn DirectoryStore>,
    cache: DirectoryCache,
    audit: Arc<dyn AuditSink>,
    invalidation: Arc<InvalidationCoordinator>,
    schema_sync: Arc<dyn SchemaSyncClient>,
}

impl RoleService {
    pub fn new(
        store: Arc<dyn DirectoryStore>,
        cache: DirectoryCache,
        audit: Arc<dyn AuditSink>,
        invalidation: Arc<InvalidationCoordinator>,
        schema_sync: Arc<dyn SchemaSyncClient>,
    ) -> Self {
        Self {
            store,
            cache,
            audit,
            invalidation,
            schema_sync,
        }
    }

    pub async fn create_role(
        &self,
        req: CreateRoleRequest,
        actor: &str,
    ) -> Result<Role, ServiceError> {
        req.validate()
            .map_err(|e| ServiceError::Validation(e.to_string()))?;

        if self
            .store
            .find_role_by_name(&req.name)
            .await
            .map_err(ServiceError::Store)?
            .is_some()
        {
            return Err(ServiceError::NameConflict(req.name));
        }

        let role = Role::new(req.name, req.description, req.organization_id);
        self.store
            .insert_role(&role)
            .await
            .map_err(ServiceError::Store)?;

        self.audit_op(
            actor,
            "role.create",
            "role",
            role.id,
            format!("Created role {}", role.name),
        )
        .await;
        self.sync_vocabulary().await;

        tracing::info!(role_id = %role.id, name = %role.name, "Role created");
        Ok(role)
    }

    pub async fn get_role(&self, id: Uuid) -> Result<Role, ServiceError> {
        self.store
            .find_role_by_id(id)
            .await
            .map_err(ServiceError::Store)?
            .ok_or(ServiceError::RoleNotFound)
    }

    pub async fn update_role(
        &self,
        id: Uuid,
        patch: UpdateRoleRequest,
        actor: &str,
    ) -> Result<Role, ServiceError> {
        patch
            .validate()
            .map_err(|e| ServiceError::Validation(e.to_string()))?;

        let mut role = self.get_role(id).await?;
        let mut renamed = false;

        if let Some(name) = &patch.name {
            if *name != role.name {
                if let Some(existing) = self
                    .store
                    .find_role_by_name(name)
                    .await
                    .map_err(ServiceError::Store)?
                {
                    if existing.id != id {
                        return Err(ServiceError::NameConflict(name.clone()));
                    }
                }
                role.name = name.clone();
                renamed = true;
            }
        }

        if let Some(description) = patch.description {
            role.description = Some(description);
        }

        role.updated_at = Utc::now();
        self.store
            .update_role(&role)
            .await
            .map_err(ServiceError::Store)?;

        self.audit_op(
            actor,
            "role.update",
            "role",
            role.id,
            format!("Updated role {}", role.name),
        )
        .await;
        self.invalidate_role(&role).await;
        if renamed {
            self.sync_vocabulary().await;
        }

        Ok(role)
    }

    pub async fn deactivate_role(&self, id: Uuid, actor: &str) -> Result<Role, ServiceError> {
        let mut role = self.get_role(id).await?;
        if role.is_active {
            role.is_active = false;
            role.updated_at = Utc::now();
            self.store
                .update_role(&role)
                .await
                .map_err(ServiceError::Store)?;
        }

        self.audit_op(
            actor,
            "role.deactivate",
            "role",
            role.id,
            format!("Deactivated role {}", role.name),
        )
        .await;
        self.invalidate_role(&role).await;
        self.sync_vocabulary().await;

        Ok(role)
    }

    pub async fn list_roles(&self) -> Result<Vec<Role>, ServiceError> {
        self.store.list_roles().await.map_err(ServiceError::Store)
    }

    // Permissions

    pub async fn create_permission(
        &self,
        req: CreatePermissionRequest,
        actor: &str,
    ) -> Result<Permission, ServiceError> {
        req.validate()
            .map_err(|e| ServiceError::Validation(e.to_string()))?;
        if let (Some(start), Some(end)) = (req.valid_starts_at, req.valid_ends_at) {
            if start > end {
                return Err(ServiceError::InvalidTimeRange);
            }
        }

        if self
            .store
            .find_permission_by_name(&req.name)
            .await
            .map_err(ServiceError::Store)?
            .is_some()
        {
            return Err(ServiceError::NameConflict(req.name));
        }

        let mut permission = Permission::new(
            req.name,
            req.description,
            req.action,
            req.resource,
            req.source.unwrap_or_else(|| "api".to_string()),
        );
        permission.valid_starts_at = req.valid_starts_at;
        permission.valid_ends_at = req.valid_ends_at;
        self.store
            .insert_permission(&permission)
            .await
            .map_err(ServiceError::Store)?;

        self.audit_op(
            actor,
            "permission.create",
            "permission",
            permission.id,
            format!("Created permission {}", permission.name),
        )
        .await;
        self.sync_vocabulary().await;

        Ok(permission)
    }

    pub async fn list_permissions(&self) -> Result<Vec<Permission>, ServiceError> {
        self.store
            .list_permissions()
            .await
            .map_err(ServiceError::Store)
    }

    /// Attach a permission to a role. Changes what the role grants, so the
    /// role's cached entries are invalidated like any other role update.
    pub async fn attach_permission(
        &self,
        role_id: Uuid,
        permission_id: Uuid,
        actor: &str,
    ) -> Result<RolePermission, ServiceError> {
        let role = self.get_role(role_id).await?;
        let permission = self
            .store
            .find_permission_by_id(permission_id)
            .await
            .map_err(ServiceError::Store)?
            .ok_or_else(|| ServiceError::Validation("permission not found".to_string()))?;

        let existing = self
            .store
            .list_role_permissions(role_id)
            .await
            .map_err(ServiceError::Store)?;
        if existing.iter().any(|rp| rp.permission_id == permission_id) {
            return Err(ServiceError::DuplicateAssignment);
        }

        let rp = RolePermission::new(role_id, permission_id);
        self.store
            .insert_role_permission(&rp)
            .await
            .map_err(ServiceError::Store)?;

        self.audit_op(
            actor,
            "role.permission.attach",
            "role",
            role.id,
            format!("Attached permission {} to role {}", permission.name, role.name),
        )
        .await;
        self.invalidate_role(&role).await;

        Ok(rp)
    }

    /// Permissions the role currently grants. Inactive permissions and
    /// permissions outside their validity window are filtered out.
    pub async fn list_role_permissions(
        &self,
        role_id: Uuid,
    ) -> Result<Vec<Permission>, ServiceError> {
        let links = self
            .store
            .list_role_permissions(role_id)
            .await
            .map_err(ServiceError::Store)?;

        let now = Utc::now();
        let mut permissions = Vec::with_capacity(links.len());
        for link in links {
            if let Some(permission) = self
                .store
                .find_permission_by_id(link.permission_id)
                .await
                .map_err(ServiceError::Store)?
            {
                if permission.is_valid(now) {
                    permissions.push(permission);
                }
            }
        }
        Ok(permissions)
    }

    // Direct user-role grants

    pub async fn assign_user_role(
        &self,
        org_id: Uuid,
        user_id: Uuid,
        req: AssignRoleRequest,
        actor: &str,
    ) -> Result<UserRole, ServiceError> {
        if let (Some(start), Some(end)) = (req.starts_at, req.ends_at) {
            if start > end {
                return Err(ServiceError::InvalidTimeRange);
            }
        }

        let role = self.get_role(req.role_id).await?;
        if !role.is_active {
            return Err(ServiceError::Validation("role is not active".to_string()));
        }

        if let Some(existing) = self
            .store
            .find_user_role(org_id, user_id, req.role_id)
            .await
            .map_err(ServiceError::Store)?
        {
            if existing.is_active {
                return Err(ServiceError::DuplicateAssignment);
            }
        }

        let assignment = UserRole::new(
            user_id,
            req.role_id,
            org_id,
            actor,
            req.starts_at,
            req.ends_at,
        );
        self.store
            .insert_user_role(&assignment)
            .await
            .map_err(ServiceError::Store)?;

        self.audit_op(
            actor,
            "user.role.assign",
            "user_role",
            assignment.id,
            format!("Assigned role {} to user {}", role.name, user_id),
        )
        .await;
        // Direct grants only change this user's resolution.
        self.cache.invalidate_user(org_id, user_id).await;

        Ok(assignment)
    }

    pub async fn remove_user_role(
        &self,
        org_id: Uuid,
        user_id: Uuid,
        role_id: Uuid,
        actor: &str,
    ) -> Result<(), ServiceError> {
        let mut assignment = self
            .store
            .find_user_role(org_id, user_id, role_id)
            .await
            .map_err(ServiceError::Store)?
            .filter(|a| a.is_active)
            .ok_or(ServiceError::AssignmentNotFound)?;

        assignment.is_active = false;
        self.store
            .update_user_role(&assignment)
            .await
            .map_err(ServiceError::Store)?;

        self.audit_op(
            actor,
            "user.role.remove",
            "user_role",
            assignment.id,
            format!("Removed role {} from user {}", role_id, user_id),
        )
        .await;
        self.cache.invalidate_user(org_id, user_id).await;

        Ok(())
    }

    /// Push the current active vocabulary to the schema engine. Empty lists
    /// are replaced with placeholders before pushing. Failures are logged,
    /// never propagated.
    pub async fn sync_vocabulary(&self) {
        let vocabulary = match self.build_vocabulary().await {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to build vocabulary for schema sync");
                return;
            }
        };

        if let Err(e) = self.schema_sync.push_vocabulary(&vocabulary).await {
            tracing::warn!(error = %e, "Schema vocabulary push failed");
        }
    }

    async fn build_vocabulary(&self) -> Result<Vocabulary, ServiceError> {
        let roles = self.store.list_roles().await.map_err(ServiceError::Store)?;
        let permissions = self
            .store
            .list_permissions()
            .await
            .map_err(ServiceError::Store)?;

        let now = Utc::now();
        let role_names = roles
            .iter()
            .filter(|r| r.is_active)
            .map(|r| r.name.clone())
            .collect();
        let permission_names = permissions
            .iter()
            .filter(|p| p.is_valid(now))
            .map(|p| p.name.clone())
            .collect();
        let action_names = permissions
            .iter()
            .filter(|p| p.is_valid(now))
            .map(|p| p.action.clone())
            .collect();

        Ok(Vocabulary::new(role_names, permission_names, action_names).with_fallbacks())
    }

    /// Tenant-scoped roles publish through the coordinator; global roles have
    /// no single owning organization, so their cached entries are swept
    /// directly.
    async fn invalidate_role(&self, role: &Role) {
        match role.organization_id {
            Some(org_id) => {
                let event = InvalidationEvent::new(EventKind::RoleUpdated, org_id, "role", role.id)
                    .with_role(role.id);
                if let Err(e) = self.invalidation.invalidate(&event).await {
                    tracing::warn!(
                        error = %e,
                        role_id = %role.id,
                        "Cache invalidation failed after role update"
                    );
                }
            }
            None => {
                self.cache.sweep("*:effective_roles").await;
                self.cache.sweep(&keys::role_pattern(role.id)).await;
            }
        }
    }

    async fn audit_op(
        &self,
        actor: &str,
        action: &str,
        resource_type: &str,
        resource_id: Uuid,
        message: String,
    ) {
        let entry = AuditEntry::new(
            actor,
            action,
            resource_type,
            &resource_id.to_string(),
            message,
            true,
            serde_json::Value::Null,
        );
        if let Err(e) = self.audit.log_operation(entry).await {
            tracing::warn!(error = %e, action = %action, "Failed to write audit entry");
        }
    }
}
