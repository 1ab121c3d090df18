use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

use super::in_window;

/// A named role. `organization_id` scopes the role to one tenant; `None`
/// means the role is defined globally.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Role {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub organization_id: Option<Uuid>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Role {
    pub fn new(name: String, description: Option<String>, organization_id: Option<Uuid>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name,
            description,
            organization_id,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }
}

/// A named permission over a resource, optionally bounded by a validity
/// window. `source` records where the permission came from (API, seed,
/// schema sync).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Permission {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub action: String,
    pub resource: String,
    pub source: String,
    pub valid_starts_at: Option<DateTime<Utc>>,
    pub valid_ends_at: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl Permission {
    pub fn new(
        name: String,
        description: Option<String>,
        action: String,
        resource: String,
        source: String,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            description,
            action,
            resource,
            source,
            valid_starts_at: None,
            valid_ends_at: None,
            is_active: true,
            created_at: Utc::now(),
        }
    }

    /// Whether the permission grants anything at instant `at`.
    pub fn is_valid(&self, at: DateTime<Utc>) -> bool {
        self.is_active && in_window(self.valid_starts_at, self.valid_ends_at, at)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct RolePermission {
    pub id: Uuid,
    pub role_id: Uuid,
    pub permission_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl RolePermission {
    pub fn new(role_id: Uuid, permission_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            role_id,
            permission_id,
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateRoleRequest {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[validate(length(max = 1024))]
    pub description: Option<String>,
    pub organization_id: Option<Uuid>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateRoleRequest {
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,
    #[validate(length(max = 1024))]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreatePermissionRequest {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[validate(length(max = 1024))]
    pub description: Option<String>,
    #[validate(length(min = 1, max = 255))]
    pub action: String,
    #[validate(length(min = 1, max = 255))]
    pub resource: String,
    #[serde(default)]
    #[validate(length(max = 255))]
    pub source: Option<String>,
    #[serde(default)]
    pub valid_starts_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub valid_ends_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_permission_window_is_half_open() {
        let start = Utc::now();
        let end = start + Duration::hours(1);
        let mut permission = Permission::new(
            "documents.read".to_string(),
            None,
            "read".to_string(),
            "documents".to_string(),
            "api".to_string(),
        );
        permission.valid_starts_at = Some(start);
        permission.valid_ends_at = Some(end);

        assert!(permission.is_valid(start));
        assert!(permission.is_valid(end - Duration::seconds(1)));
        assert!(!permission.is_valid(end));
        assert!(!permission.is_valid(start - Duration::seconds(1)));
    }

    #[test]
    fn test_inactive_permission_never_valid() {
        let mut permission = Permission::new(
            "documents.read".to_string(),
            None,
            "read".to_string(),
            "documents".to_string(),
            "api".to_string(),
        );
        assert!(permission.is_valid(Utc::now()));
        permission.is_active = false;
        assert!(!permission.is_valid(Utc::now()));
    }
}
