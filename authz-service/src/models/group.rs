use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::postgres::PgRow;
use sqlx::{FromRow, Row};
use uuid::Uuid;
use validator::Validate;

use super::Lifecycle;

/// A group within an organization. Groups form their own tree per
/// organization; role grants at a group flow down to members of its
/// descendant groups.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Group {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub parent_id: Option<Uuid>,
    pub is_active: bool,
    pub lifecycle: Lifecycle,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Group {
    pub fn new(
        organization_id: Uuid,
        name: String,
        description: Option<String>,
        parent_id: Option<Uuid>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            organization_id,
            name,
            description,
            parent_id,
            is_active: true,
            lifecycle: Lifecycle::Active,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_operational(&self) -> bool {
        self.is_active && !self.lifecycle.is_deleted()
    }

    pub fn soft_delete(&mut self, by: &str, at: DateTime<Utc>) {
        self.lifecycle = Lifecycle::SoftDeleted {
            at,
            by: by.to_string(),
        };
        self.is_active = false;
        self.updated_at = at;
    }
}

impl FromRow<'_, PgRow> for Group {
    fn from_row(row: &PgRow) -> Result<Self, sqlx::Error> {
        let deleted_at: Option<DateTime<Utc>> = row.try_get("deleted_at")?;
        let deleted_by: Option<String> = row.try_get("deleted_by")?;

        Ok(Self {
            id: row.try_get("id")?,
            organization_id: row.try_get("organization_id")?,
            name: row.try_get("name")?,
            description: row.try_get("description")?,
            parent_id: row.try_get("parent_id")?,
            is_active: row.try_get("is_active")?,
            lifecycle: Lifecycle::from_columns(deleted_at, deleted_by),
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateGroupRequest {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[validate(length(max = 1024))]
    pub description: Option<String>,
    pub parent_id: Option<Uuid>,
}

/// Partial update; `parent_id` follows the same double-`Option` convention
/// as organizations.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateGroupRequest {
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,
    #[validate(length(max = 1024))]
    pub description: Option<String>,
    #[serde(default)]
    pub parent_id: Option<Option<Uuid>>,
}
