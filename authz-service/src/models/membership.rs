use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::in_window;

/// A principal's membership in a group, optionally bounded by a validity
/// window. `principal_type` distinguishes users from service identities;
/// `user_id` holds the principal id regardless of type.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct GroupMembership {
    pub id: Uuid,
    pub group_id: Uuid,
    pub organization_id: Uuid,
    pub user_id: Uuid,
    pub principal_type: String,
    pub added_by: String,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl GroupMembership {
    pub fn new(
        group_id: Uuid,
        organization_id: Uuid,
        user_id: Uuid,
        added_by: &str,
        starts_at: Option<DateTime<Utc>>,
        ends_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            group_id,
            organization_id,
            user_id,
            principal_type: "user".to_string(),
            added_by: added_by.to_string(),
            starts_at,
            ends_at,
            is_active: true,
            created_at: Utc::now(),
        }
    }

    /// Whether the membership grants anything at instant `at`.
    pub fn is_effective(&self, at: DateTime<Utc>) -> bool {
        self.is_active && in_window(self.starts_at, self.ends_at, at)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AddMemberRequest {
    pub user_id: Uuid,
    /// Defaults to `"user"` when absent.
    #[serde(default)]
    pub principal_type: Option<String>,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_inactive_membership_never_effective() {
        let mut m = GroupMembership::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            Uuid::new_v4(),
            "admin",
            None,
            None,
        );
        assert!(m.is_effective(Utc::now()));
        m.is_active = false;
        assert!(!m.is_effective(Utc::now()));
    }

    #[test]
    fn test_new_membership_is_user_principal() {
        let m = GroupMembership::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            Uuid::new_v4(),
            "admin",
            None,
            None,
        );
        assert_eq!(m.principal_type, "user");
    }

    #[test]
    fn test_expired_membership_not_effective() {
        let now = Utc::now();
        let m = GroupMembership::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            Uuid::new_v4(),
            "admin",
            Some(now - Duration::days(2)),
            Some(now - Duration::days(1)),
        );
        assert!(!m.is_effective(now));
        assert!(m.is_effective(now - Duration::days(1) - Duration::hours(1)));
    }
}
