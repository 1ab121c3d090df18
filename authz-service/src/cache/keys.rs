//! Cache key builders and TTL policy.
//!
//! Key families, coarsest to finest:
//! - org hierarchy views (30 min)
//! - org group listings and member lists (15 min)
//! - per-user group listings (10 min)
//! - stats and effective roles (5 min)

use uuid::Uuid;

pub const HIERARCHY_TTL_SECONDS: i64 = 1800;
pub const GROUPS_TTL_SECONDS: i64 = 900;
pub const USER_GROUPS_TTL_SECONDS: i64 = 600;
pub const STATS_TTL_SECONDS: i64 = 300;
pub const EFFECTIVE_ROLES_TTL_SECONDS: i64 = 300;

pub fn org_hierarchy(org_id: Uuid) -> String {
    format!("org:{}:hierarchy", org_id)
}

pub fn org_parent_hierarchy(org_id: Uuid) -> String {
    format!("org:{}:parent_hierarchy", org_id)
}

pub fn org_children(org_id: Uuid) -> String {
    format!("org:{}:children", org_id)
}

pub fn org_active_children(org_id: Uuid) -> String {
    format!("org:{}:active_children", org_id)
}

pub fn org_groups(org_id: Uuid) -> String {
    format!("org:{}:groups", org_id)
}

pub fn org_active_groups(org_id: Uuid) -> String {
    format!("org:{}:active_groups", org_id)
}

pub fn org_group_hierarchy(org_id: Uuid) -> String {
    format!("org:{}:group_hierarchy", org_id)
}

pub fn group_members(org_id: Uuid, group_id: Uuid) -> String {
    format!("org:{}:group:{}:members", org_id, group_id)
}

pub fn group_active_members(org_id: Uuid, group_id: Uuid) -> String {
    format!("org:{}:group:{}:active_members", org_id, group_id)
}

pub fn user_groups(org_id: Uuid, user_id: Uuid) -> String {
    format!("org:{}:user:{}:groups", org_id, user_id)
}

pub fn user_active_groups(org_id: Uuid, user_id: Uuid) -> String {
    format!("org:{}:user:{}:active_groups", org_id, user_id)
}

pub fn org_stats(org_id: Uuid) -> String {
    format!("org:{}:stats", org_id)
}

pub fn user_effective_roles(org_id: Uuid, user_id: Uuid) -> String {
    format!("org:{}:user:{}:effective_roles", org_id, user_id)
}

// Sweep patterns.

pub fn org_user_pattern(org_id: Uuid) -> String {
    format!("org:{}:user:*", org_id)
}

pub fn org_effective_roles_pattern(org_id: Uuid) -> String {
    format!("org:{}:user:*:effective_roles", org_id)
}

pub fn role_pattern(role_id: Uuid) -> String {
    format!("*:role:{}:*", role_id)
}

/// The fixed org-scoped keys dropped when an organization changes.
pub fn org_invalidation_keys(org_id: Uuid) -> Vec<String> {
    vec![
        org_hierarchy(org_id),
        org_parent_hierarchy(org_id),
        org_children(org_id),
        org_active_children(org_id),
        org_groups(org_id),
        org_active_groups(org_id),
        org_group_hierarchy(org_id),
        org_stats(org_id),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_shapes() {
        let org = Uuid::nil();
        let user = Uuid::nil();
        assert_eq!(
            org_hierarchy(org),
            "org:00000000-0000-0000-0000-000000000000:hierarchy"
        );
        assert!(user_effective_roles(org, user).ends_with(":effective_roles"));
        assert_eq!(org_invalidation_keys(org).len(), 8);
    }
}
