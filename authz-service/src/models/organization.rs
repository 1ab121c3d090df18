use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::postgres::PgRow;
use sqlx::{FromRow, Row};
use uuid::Uuid;
use validator::Validate;

use super::Lifecycle;

/// A tenant node in the organization tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Organization {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub parent_id: Option<Uuid>,
    pub is_active: bool,
    pub lifecycle: Lifecycle,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Organization {
    pub fn new(name: String, description: Option<String>, parent_id: Option<Uuid>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name,
            description,
            parent_id,
            is_active: true,
            lifecycle: Lifecycle::Active,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    /// Active and not soft-deleted: usable as a parent, a group host, etc.
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

// Lifecycle spans two nullable columns, so the row mapping is manual.
impl FromRow<'_, PgRow> for Organization {
    fn from_row(row: &PgRow) -> Result<Self, sqlx::Error> {
        let deleted_at: Option<DateTime<Utc>> = row.try_get("deleted_at")?;
        let deleted_by: Option<String> = row.try_get("deleted_by")?;

        Ok(Self {
            id: row.try_get("id")?,
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

/// Request to create an organization.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateOrganizationRequest {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[validate(length(max = 1024))]
    pub description: Option<String>,
    pub parent_id: Option<Uuid>,
}

/// Partial update. Absent fields are left untouched; `parent_id` uses a
/// double `Option` so a present inner `None` detaches the organization from
/// its parent.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateOrganizationRequest {
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,
    #[validate(length(max = 1024))]
    pub description: Option<String>,
    #[serde(default)]
    pub parent_id: Option<Option<Uuid>>,
}
