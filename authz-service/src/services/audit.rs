//! Audit sink: every mutating operation records who did what, including
//! failed attempts. Audit failures are logged but never fail the operation
//! they describe.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::postgres::PgPool;
use uuid::Uuid;

/// A single audited operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub actor_id: String,
    pub action: String,
    pub resource_type: String,
    pub resource_id: String,
    pub message: String,
    pub success: bool,
    pub details: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl AuditEntry {
    pub fn new(
        actor_id: &str,
        action: &str,
        resource_type: &str,
        resource_id: &str,
        message: impl Into<String>,
        success: bool,
        details: serde_json::Value,
    ) -> Self {
        Self {
            actor_id: actor_id.to_string(),
            action: action.to_string(),
            resource_type: resource_type.to_string(),
            resource_id: resource_id.to_string(),
            message: message.into(),
            success,
            details,
            created_at: Utc::now(),
        }
    }
}

/// A parent reassignment, with both endpoints recorded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HierarchyChangeEntry {
    pub actor_id: String,
    pub action: String,
    pub resource_type: String,
    pub resource_id: String,
    pub old_parent_id: Option<Uuid>,
    pub new_parent_id: Option<Uuid>,
    pub message: String,
    pub success: bool,
    pub created_at: DateTime<Utc>,
}

#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn log_operation(&self, entry: AuditEntry) -> Result<(), anyhow::Error>;
    async fn log_hierarchy_change(&self, entry: HierarchyChangeEntry) -> Result<(), anyhow::Error>;
}

/// Postgres-backed sink writing to `audit_events`.
#[derive(Clone)]
pub struct PgAuditSink {
    pool: PgPool,
}

impl PgAuditSink {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuditSink for PgAuditSink {
    async fn log_operation(&self, entry: AuditEntry) -> Result<(), anyhow::Error> {
        sqlx::query(
            r#"
            INSERT INTO audit_events
                (id, actor_id, action, resource_type, resource_id, message, success, details, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&entry.actor_id)
        .bind(&entry.action)
        .bind(&entry.resource_type)
        .bind(&entry.resource_id)
        .bind(&entry.message)
        .bind(entry.success)
        .bind(&entry.details)
        .bind(entry.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn log_hierarchy_change(&self, entry: HierarchyChangeEntry) -> Result<(), anyhow::Error> {
        sqlx::query(
            r#"
            INSERT INTO audit_events
                (id, actor_id, action, resource_type, resource_id,
                 old_parent_id, new_parent_id, message, success, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&entry.actor_id)
        .bind(&entry.action)
        .bind(&entry.resource_type)
        .bind(&entry.resource_id)
        .bind(entry.old_parent_id)
        .bind(entry.new_parent_id)
        .bind(&entry.message)
        .bind(entry.success)
        .bind(entry.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

/// Captures entries in memory; used by tests.
#[derive(Default)]
pub struct RecordingAuditSink {
    pub operations: std::sync::Mutex<Vec<AuditEntry>>,
    pub hierarchy_changes: std::sync::Mutex<Vec<HierarchyChangeEntry>>,
}

impl RecordingAuditSink {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AuditSink for RecordingAuditSink {
    async fn log_operation(&self, entry: AuditEntry) -> Result<(), anyhow::Error> {
        self.operations
            .lock()
            .map_err(|e| anyhow::anyhow!("audit mutex poisoned: {}", e))?
            .push(entry);
        Ok(())
    }

    async fn log_hierarchy_change(&self, entry: HierarchyChangeEntry) -> Result<(), anyhow::Error> {
        self.hierarchy_changes
            .lock()
            .map_err(|e| anyhow::anyhow!("audit mutex poisoned: {}", e))?
            .push(entry);
        Ok(())
    }
}
