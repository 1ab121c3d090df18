pub mod assignment;
pub mod effective_role;
pub mod group;
pub mod hierarchy;
pub mod lifecycle;
pub mod membership;
pub mod organization;
pub mod role;

pub use assignment::{AssignRoleRequest, GroupRole, UserRole};
pub use effective_role::{EffectiveRole, RoleSource};
pub use group::{CreateGroupRequest, Group, UpdateGroupRequest};
pub use hierarchy::{GroupNode, OrganizationHierarchy, OrganizationStats};
pub use lifecycle::Lifecycle;
pub use membership::{AddMemberRequest, GroupMembership};
pub use organization::{CreateOrganizationRequest, Organization, UpdateOrganizationRequest};
pub use role::{CreatePermissionRequest, CreateRoleRequest, Permission, Role, RolePermission, UpdateRoleRequest};

use chrono::{DateTime, Utc};

/// Half-open validity window check: `[starts_at, ends_at)`, either bound
/// optional. Shared by memberships and role assignments.
pub(crate) fn in_window(
    starts_at: Option<DateTime<Utc>>,
    ends_at: Option<DateTime<Utc>>,
    at: DateTime<Utc>,
) -> bool {
    if let Some(start) = starts_at {
        if at < start {
            return false;
        }
    }
    if let Some(end) = ends_at {
        if at >= end {
            return false;
        }
    }
    true
}
