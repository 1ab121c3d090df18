use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Soft-deletion state carried by organizations and groups. A soft-deleted
/// record keeps its row but is invisible to normal reads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Lifecycle {
    Active,
    SoftDeleted { at: DateTime<Utc>, by: String },
}

impl Lifecycle {
    /// Reconstruct from the store's nullable columns.
    pub fn from_columns(deleted_at: Option<DateTime<Utc>>, deleted_by: Option<String>) -> Self {
        match deleted_at {
            Some(at) => Lifecycle::SoftDeleted {
                at,
                by: deleted_by.unwrap_or_default(),
            },
            None => Lifecycle::Active,
        }
    }

    pub fn is_deleted(&self) -> bool {
        matches!(self, Lifecycle::SoftDeleted { .. })
    }

    pub fn deleted_at(&self) -> Option<DateTime<Utc>> {
        match self {
            Lifecycle::SoftDeleted { at, .. } => Some(*at),
            Lifecycle::Active => None,
        }
    }

    pub fn deleted_by(&self) -> Option<&str> {
        match self {
            Lifecycle::SoftDeleted { by, .. } => Some(by),
            Lifecycle::Active => None,
        }
    }
}

impl Default for Lifecycle {
    fn default() -> Self {
        Lifecycle::Active
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_columns() {
        assert_eq!(Lifecycle::from_columns(None, None), Lifecycle::Active);

        let at = Utc::now();
        let lc = Lifecycle::from_columns(Some(at), Some("admin-1".to_string()));
        assert!(lc.is_deleted());
        assert_eq!(lc.deleted_at(), Some(at));
        assert_eq!(lc.deleted_by(), Some("admin-1"));
    }

    #[test]
    fn test_missing_actor_defaults_to_empty() {
        let lc = Lifecycle::from_columns(Some(Utc::now()), None);
        assert_eq!(lc.deleted_by(), Some(""));
    }
}
