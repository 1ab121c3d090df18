use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::in_window;

/// A role granted to a group, optionally windowed.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct GroupRole {
    pub id: Uuid,
    pub group_id: Uuid,
    pub role_id: Uuid,
    pub organization_id: Uuid,
    pub assigned_by: String,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl GroupRole {
    pub fn new(
        group_id: Uuid,
        role_id: Uuid,
        organization_id: Uuid,
        assigned_by: &str,
        starts_at: Option<DateTime<Utc>>,
        ends_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            group_id,
            role_id,
            organization_id,
            assigned_by: assigned_by.to_string(),
            starts_at,
            ends_at,
            is_active: true,
            created_at: Utc::now(),
        }
    }

    pub fn is_effective(&self, at: DateTime<Utc>) -> bool {
        self.is_active && in_window(self.starts_at, self.ends_at, at)
    }
}

/// A role granted directly to a user, optionally windowed.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UserRole {
    pub id: Uuid,
    pub user_id: Uuid,
    pub role_id: Uuid,
    pub organization_id: Uuid,
    pub assigned_by: String,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl UserRole {
    pub fn new(
        user_id: Uuid,
        role_id: Uuid,
        organization_id: Uuid,
        assigned_by: &str,
        starts_at: Option<DateTime<Utc>>,
        ends_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            role_id,
            organization_id,
            assigned_by: assigned_by.to_string(),
            starts_at,
            ends_at,
            is_active: true,
            created_at: Utc::now(),
        }
    }

    pub fn is_effective(&self, at: DateTime<Utc>) -> bool {
        self.is_active && in_window(self.starts_at, self.ends_at, at)
    }
}

/// Windowed role grant request, shared by group and direct-user assignment.
#[derive(Debug, Clone, Deserialize)]
pub struct AssignRoleRequest {
    pub role_id: Uuid,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
}
